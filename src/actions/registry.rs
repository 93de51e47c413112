use crate::actions::builtin;
use crate::actions::Action;
use crate::errors::{ParserError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registry of actions keyed by their type tag
#[derive(Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// An empty registry, without the built-in actions.
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register an action under its own name, replacing any previous one
    pub fn register<A: Action + 'static>(&mut self, action: A) -> Result<()> {
        self.register_arc(Arc::new(action))
    }

    pub fn register_arc(&mut self, action: Arc<dyn Action>) -> Result<()> {
        let name = action.name().trim().to_string();
        if name.is_empty() {
            return Err(ParserError::Registration(
                "action type must be a non-empty string".to_string(),
            ));
        }
        self.actions.insert(name, action);
        Ok(())
    }

    /// Get an action by type
    pub fn get(&self, kind: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.actions.contains_key(kind)
    }

    /// List all registered action types
    pub fn list_actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.list_actions())
            .finish()
    }
}
