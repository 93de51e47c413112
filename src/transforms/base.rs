use crate::errors::Result;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step of a transform chain: a `type` tag plus its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl TransformStep {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key).filter(|v| !v.is_null())
    }

    pub fn str_option(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(Value::as_str)
    }
}

/// A value conversion resolved by `type` from the registry.
///
/// Any `Fn(Value, &TransformStep, &Storage) -> Result<Value>` qualifies.
pub trait Transform: Send + Sync {
    fn apply(&self, value: Value, step: &TransformStep, storage: &Storage) -> Result<Value>;
}

impl<F> Transform for F
where
    F: Fn(Value, &TransformStep, &Storage) -> Result<Value> + Send + Sync,
{
    fn apply(&self, value: Value, step: &TransformStep, storage: &Storage) -> Result<Value> {
        self(value, step, storage)
    }
}
