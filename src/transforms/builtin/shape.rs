use crate::errors::{ParserError, Result};
use crate::storage::Storage;
use crate::transforms::base::TransformStep;
use crate::values::lookup_path;
use serde_json::{Map, Value};

/// Keep only the listed keys of an object.
pub(super) fn pick(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let props: Vec<&str> = match step.option("props").or_else(|| step.option("prop")) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(prop)) => vec![prop.as_str()],
        _ => return Err(ParserError::invalid_transform(&step.kind, "missing `props`")),
    };

    match value {
        Value::Object(map) => {
            let picked: Map<String, Value> = map
                .into_iter()
                .filter(|(key, _)| props.contains(&key.as_str()))
                .collect();
            Ok(Value::Object(picked))
        }
        _ => Ok(Value::Object(Map::new())),
    }
}

/// Map an array of objects to the value at `path` in each.
pub(super) fn pluck(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let path = path_option(step)?;
    match value {
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| lookup_path(item, path).cloned().unwrap_or(Value::Null))
                .collect(),
        )),
        _ => Ok(Value::Array(vec![])),
    }
}

pub(super) fn get(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let path = path_option(step)?;
    let fallback = step.option("default").cloned().unwrap_or(Value::Null);
    Ok(lookup_path(&value, path).cloned().unwrap_or(fallback))
}

fn path_option(step: &TransformStep) -> Result<&str> {
    step.str_option("path")
        .ok_or_else(|| ParserError::invalid_transform(&step.kind, "missing `path`"))
}
