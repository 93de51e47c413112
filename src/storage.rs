use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Flat key/value side channel shared by the rules of one parse.
///
/// Cloning yields a handle onto the same map.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    values: Arc<Mutex<HashMap<String, Value>>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.lock().insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn clear(&self) {
        self.values.lock().clear();
    }

    pub fn to_map(&self) -> HashMap<String, Value> {
        self.values.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_values() {
        let storage = Storage::new();
        let handle = storage.clone();
        handle.set("price", json!("10"));

        assert_eq!(storage.get("price"), Some(json!("10")));
        assert!(storage.contains("price"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn fresh_storage_is_isolated() {
        let first = Storage::new();
        first.set("a", json!(1));
        let second = Storage::new();
        assert!(second.get("a").is_none());
        assert!(second.is_empty());
    }
}
