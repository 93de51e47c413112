use crate::errors::{ParserError, Result};
use crate::storage::Storage;
use crate::transforms::base::{Transform, TransformStep};
use crate::transforms::builtin;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Registry for value transforms, keyed by `type`.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// An empty registry. Most callers want [`TransformRegistry::default`].
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Register a transform. Re-registering a name overrides it.
    pub fn register<T: Transform + 'static>(&mut self, kind: &str, transform: T) -> Result<()> {
        if kind.trim().is_empty() {
            return Err(ParserError::Registration(
                "transform type must be a non-empty string".to_string(),
            ));
        }
        self.transforms.insert(kind.to_string(), Arc::new(transform));
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Transform>> {
        self.transforms.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.transforms.contains_key(kind)
    }

    pub fn list_transforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transforms.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run `steps` left to right over `value`. `null` enters as `""`.
    pub fn produce(&self, steps: &[TransformStep], value: Value, storage: &Storage) -> Result<Value> {
        let initial = match value {
            Value::Null => Value::String(String::new()),
            other => other,
        };

        steps.iter().try_fold(initial, |value, step| {
            let transform = self
                .get(&step.kind)
                .ok_or_else(|| ParserError::UnsupportedTransform(step.kind.clone()))?;
            trace!(transform = %step.kind, "applying transform");
            transform.apply(value, step, storage)
        })
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.list_transforms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn split_array() -> TransformStep {
        TransformStep::new("split")
            .with("separator", ",")
            .with("dataType", "array")
    }

    #[test]
    fn empty_chain_coerces_null() {
        let registry = TransformRegistry::default();
        let storage = Storage::new();
        assert_eq!(registry.produce(&[], Value::Null, &storage).unwrap(), json!(""));
        assert_eq!(registry.produce(&[], json!("x"), &storage).unwrap(), json!("x"));
    }

    #[test]
    fn steps_apply_left_to_right() {
        let registry = TransformRegistry::default();
        let storage = Storage::new();
        let upper = TransformStep::new("toUpperCase");
        let prefix = TransformStep::new("prefix").with("value", "id-");

        let a = registry
            .produce(&[prefix.clone(), upper.clone()], json!("x"), &storage)
            .unwrap();
        let b = registry.produce(&[upper, prefix], json!("x"), &storage).unwrap();
        assert_eq!(a, json!("ID-X"));
        assert_eq!(b, json!("id-X"));
    }

    #[test]
    fn split_recovers_joined_pieces() {
        let registry = TransformRegistry::default();
        let storage = Storage::new();
        let joined = registry
            .produce(
                &[TransformStep::new("join").with("glue", ",")],
                json!(["a", "b", "c"]),
                &storage,
            )
            .unwrap();
        let split = registry.produce(&[split_array()], joined, &storage).unwrap();
        assert_eq!(split, json!(["a", "b", "c"]));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let registry = TransformRegistry::default();
        let err = registry
            .produce(&[TransformStep::new("nope")], json!("x"), &Storage::new())
            .unwrap_err();
        assert!(matches!(err, ParserError::UnsupportedTransform(kind) if kind == "nope"));
    }

    #[test]
    fn custom_transforms_register_and_override() {
        let mut registry = TransformRegistry::default();
        registry
            .register(
                "trim",
                |_value: Value, _step: &TransformStep, _storage: &Storage| -> Result<Value> {
                    Ok(json!("overridden"))
                },
            )
            .unwrap();
        let out = registry
            .produce(&[TransformStep::new("trim")], json!(" a "), &Storage::new())
            .unwrap();
        assert_eq!(out, json!("overridden"));
    }

    #[test]
    fn blank_type_names_are_rejected() {
        let mut registry = TransformRegistry::new();
        let err = registry
            .register("  ", |v: Value, _: &TransformStep, _: &Storage| -> Result<Value> {
                Ok(v)
            })
            .unwrap_err();
        assert!(matches!(err, ParserError::Registration(_)));
    }
}
