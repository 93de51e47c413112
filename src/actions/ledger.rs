use crate::actions::base::ActionId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Record of `once` actions that completed successfully during one parse.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLedger {
    done: Arc<Mutex<HashSet<ActionId>>>,
}

impl ExecutionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` completed. Returns `false` when it already was.
    pub fn record(&self, id: ActionId) -> bool {
        self.done.lock().insert(id)
    }

    pub fn is_done(&self, id: ActionId) -> bool {
        self.done.lock().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.done.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.lock().is_empty()
    }
}
