use crate::errors::{ParserError, Result};
use crate::storage::Storage;
use crate::transforms::base::TransformStep;
use crate::values::{as_number, as_text, is_truthy};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Read `fields` from storage and cast each per `dataType`.
pub(super) fn combine(_value: Value, step: &TransformStep, storage: &Storage) -> Result<Value> {
    let fields = match step.option("fields") {
        Some(Value::Array(fields)) => fields,
        _ => return Err(ParserError::invalid_transform(&step.kind, "missing `fields`")),
    };
    let data_type = step.str_option("dataType").unwrap_or("string");

    fields
        .iter()
        .map(|field| {
            let name = field.as_str().ok_or_else(|| {
                ParserError::invalid_transform(&step.kind, "field names must be strings")
            })?;
            let stored = storage.get(name).unwrap_or(Value::Null);
            cast(&stored, data_type)
                .ok_or_else(|| {
                    ParserError::invalid_transform(
                        &step.kind,
                        format!("unknown dataType `{}`", data_type),
                    )
                })
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// `None` only for an unknown data type; failed casts become `null`.
fn cast(value: &Value, data_type: &str) -> Option<Value> {
    let cast = match data_type {
        "string" => Value::String(as_text(value)),
        "int" => as_text(value)
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| as_number(value).map(|f| f.trunc() as i64))
            .map(Value::from)
            .unwrap_or(Value::Null),
        "float" => as_number(value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "bool" | "boolean" => Value::Bool(is_truthy(value)),
        _ => return None,
    };
    Some(cast)
}

/// The right-hand side: storage `field` when given, else literal `value`.
fn operand(step: &TransformStep, storage: &Storage) -> Value {
    match step.str_option("field") {
        Some(field) => storage.get(field).unwrap_or(Value::Null),
        None => step.option("value").cloned().unwrap_or(Value::Null),
    }
}

pub(super) fn equal(value: Value, step: &TransformStep, storage: &Storage) -> Result<Value> {
    let other = operand(step, storage);
    Ok(Value::Bool(value == other || as_text(&value) == as_text(&other)))
}

pub(super) fn compare(value: Value, step: &TransformStep, storage: &Storage) -> Result<Value> {
    let other = operand(step, storage);
    let ordering = match (as_number(&value), as_number(&other)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(as_text(&value).cmp(&as_text(&other))),
    };

    let operator = step.str_option("operator").unwrap_or("eq");
    let result = match (operator, ordering) {
        (_, None) => false,
        ("eq", Some(o)) => o == Ordering::Equal,
        ("ne", Some(o)) => o != Ordering::Equal,
        ("gt", Some(o)) => o == Ordering::Greater,
        ("gte", Some(o)) => o != Ordering::Less,
        ("lt", Some(o)) => o == Ordering::Less,
        ("lte", Some(o)) => o != Ordering::Greater,
        (other, _) => {
            return Err(ParserError::invalid_transform(
                &step.kind,
                format!("unknown operator `{}`", other),
            ))
        }
    };
    Ok(Value::Bool(result))
}
