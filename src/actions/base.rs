use crate::actions::orchestrator::ActionOrchestrator;
use crate::errors::{ParserError, Result};
use crate::rules::Rule;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Identity of an action description, used by the execution ledger.
///
/// Clones of a spec share its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(Uuid);

impl ActionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Caller-supplied predicate that aborts an in-progress wait.
#[derive(Clone)]
pub struct Breaker(Arc<dyn Fn() -> bool + Send + Sync>);

impl Breaker {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn is_broken(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for Breaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Breaker(..)")
    }
}

/// Description of one interaction. Type-specific fields land in `params`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    #[serde(skip)]
    pub id: ActionId,
    #[serde(rename = "type")]
    pub kind: String,
    pub scope: Option<String>,
    pub parent_scope: Option<String>,
    #[serde(default)]
    pub once: bool,
    /// Milliseconds.
    pub timeout: Option<u64>,
    /// Polling interval in milliseconds.
    pub interval: Option<u64>,
    #[serde(skip)]
    pub breaker: Option<Breaker>,
    /// Reaching this step successfully wins the enclosing `cases` race.
    #[serde(default)]
    pub true_case: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ActionSpec>,
    pub else_actions: Option<Vec<ActionSpec>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cases: Vec<Vec<ActionSpec>>,
    pub rules: Option<Box<Rule>>,
    #[serde(default)]
    pub wait_for_page: bool,
    /// URI pattern of a request to await after performing the action.
    pub wait_for_query: Option<String>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ActionSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: ActionId::generate(),
            kind: kind.into(),
            scope: None,
            parent_scope: None,
            once: false,
            timeout: None,
            interval: None,
            breaker: None,
            true_case: false,
            actions: vec![],
            conditions: vec![],
            else_actions: None,
            cases: vec![],
            rules: None,
            wait_for_page: false,
            wait_for_query: None,
            params: Map::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval = Some(interval_ms);
        self
    }

    pub fn with_breaker(mut self, breaker: Breaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn run_once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn true_case(mut self) -> Self {
        self.true_case = true;
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.str_param(key)
            .ok_or_else(|| ParserError::invalid_action(&self.kind, format!("missing `{}`", key)))
    }

    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.map(Duration::from_millis).unwrap_or(default)
    }

    pub fn interval_or(&self, default: Duration) -> Duration {
        self.interval.map(Duration::from_millis).unwrap_or(default)
    }
}

/// Where and with what an action runs.
pub struct ActionContext<'a> {
    pub orchestrator: &'a ActionOrchestrator,
    /// Fully resolved selector for this action.
    pub selector: String,
    pub prev_result: Value,
}

/// Base trait for all actions
#[async_trait]
pub trait Action: Send + Sync {
    /// Type tag this action is registered under
    fn name(&self) -> &str;

    /// Perform the action and return its result
    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value>;
}
