use crate::errors::{ParserError, Result};
use crate::storage::Storage;
use crate::transforms::base::TransformStep;
use crate::transforms::pattern::Pattern;
use crate::values::as_text;
use serde_json::Value;

pub(super) fn split(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let text = as_text(&value);
    let pieces: Vec<String> = match step.option("separator") {
        Some(separator @ Value::Array(_)) => {
            let pattern = Pattern::from_value(separator)
                .map_err(|e| ParserError::invalid_transform(&step.kind, e))?;
            pattern
                .regex()
                .split(&text)
                .map(|piece| piece.trim().to_string())
                .collect()
        }
        Some(Value::String(separator)) if separator.is_empty() => {
            text.chars().map(String::from).collect()
        }
        Some(Value::String(separator)) => text
            .split(separator.as_str())
            .map(|piece| piece.trim().to_string())
            .collect(),
        Some(other) => {
            return Err(ParserError::invalid_transform(
                &step.kind,
                format!("separator must be a string or [pattern, flags], got {}", other),
            ))
        }
        None => text.split(',').map(|piece| piece.trim().to_string()).collect(),
    };

    if step.str_option("dataType") == Some("array") {
        return Ok(Value::Array(pieces.into_iter().map(Value::String).collect()));
    }

    let index = step.option("index").and_then(Value::as_u64).unwrap_or(0) as usize;
    Ok(pieces
        .into_iter()
        .nth(index)
        .map(Value::String)
        .unwrap_or(Value::Null))
}

pub(super) fn join(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let glue = step.str_option("glue").unwrap_or(" ");
    match value {
        Value::Array(items) => Ok(Value::String(
            items.iter().map(as_text).collect::<Vec<_>>().join(glue),
        )),
        other => Ok(Value::String(as_text(&other))),
    }
}

pub(super) fn trim(value: Value, _step: &TransformStep, _storage: &Storage) -> Result<Value> {
    Ok(map_strings(value, |s| s.trim().to_string()))
}

pub(super) fn to_lower_case(value: Value, _step: &TransformStep, _storage: &Storage) -> Result<Value> {
    Ok(map_strings(value, |s| s.to_lowercase()))
}

pub(super) fn to_upper_case(value: Value, _step: &TransformStep, _storage: &Storage) -> Result<Value> {
    Ok(map_strings(value, |s| s.to_uppercase()))
}

pub(super) fn prefix(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let prefix = step.option("value").map(as_text).unwrap_or_default();
    Ok(Value::String(format!("{}{}", prefix, as_text(&value))))
}

pub(super) fn postfix(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let postfix = step.option("value").map(as_text).unwrap_or_default();
    Ok(Value::String(format!("{}{}", as_text(&value), postfix)))
}

/// Apply `f` to a string, or to every string of an array.
fn map_strings(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(f(&s)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}
