use crate::errors::{ParserError, Result};
use crate::storage::Storage;
use crate::transforms::base::TransformStep;
use crate::values::as_text;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fmt::Write;

const DEFAULT_OUTPUT: &str = "%Y-%m-%d";

/// Parse with `from` (chrono format; RFC 3339 or `%Y-%m-%d` when absent)
/// and reformat with `to`. Unparseable input yields `null`.
pub(super) fn date(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let text = as_text(&value);
    let text = text.trim();
    let to = step.str_option("to").unwrap_or(DEFAULT_OUTPUT);

    let parsed = match step.str_option("from") {
        Some(from) => parse_with(text, from),
        None => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.naive_local())
            .ok()
            .or_else(|| parse_with(text, DEFAULT_OUTPUT)),
    };

    let Some(parsed) = parsed else {
        return Ok(Value::Null);
    };

    let mut out = String::new();
    write!(out, "{}", parsed.format(to)).map_err(|_| {
        ParserError::invalid_transform(&step.kind, format!("cannot format date with `{}`", to))
    })?;
    Ok(Value::String(out))
}

fn parse_with(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}
