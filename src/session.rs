use crate::actions::{ActionOrchestrator, ActionRegistry, ExecutionLedger};
use crate::core::{Environment, ParserConfig};
use crate::rules::RuleEvaluator;
use crate::storage::Storage;
use crate::transforms::TransformRegistry;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// State shared by everything taking part in one parse.
///
/// Cheap to clone; clones refer to the same parse. Racing `cases` chains
/// each hold a clone.
#[derive(Clone)]
pub struct ParseSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    env: Arc<dyn Environment>,
    actions: Arc<ActionRegistry>,
    transforms: Arc<TransformRegistry>,
    config: Arc<ParserConfig>,
    storage: Storage,
    ledger: ExecutionLedger,
}

impl ParseSession {
    pub fn new(
        env: Arc<dyn Environment>,
        actions: Arc<ActionRegistry>,
        transforms: Arc<TransformRegistry>,
        config: Arc<ParserConfig>,
        storage: Storage,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                env,
                actions,
                transforms,
                config,
                storage,
                ledger: ExecutionLedger::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn env(&self) -> &Arc<dyn Environment> {
        &self.inner.env
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.inner.actions
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.inner.transforms
    }

    pub fn config(&self) -> &ParserConfig {
        &self.inner.config
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    pub fn ledger(&self) -> &ExecutionLedger {
        &self.inner.ledger
    }

    pub fn orchestrator(&self) -> ActionOrchestrator {
        ActionOrchestrator::new(self.clone())
    }

    pub fn evaluator(&self) -> RuleEvaluator {
        RuleEvaluator::new(self.clone())
    }

    /// Capture a snapshot, logging instead of failing.
    pub async fn snapshot(&self, label: &str) {
        if let Err(e) = self.inner.env.snapshot(label).await {
            warn!(session = %self.inner.id, label, error = %e, "snapshot failed");
        }
    }
}
