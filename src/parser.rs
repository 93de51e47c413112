use crate::actions::{Action, ActionRegistry, ActionSpec};
use crate::core::{Environment, ParserConfig};
use crate::errors::{ParserError, Result};
use crate::pagination::{merge_page, PageStep, PaginationConfig, PaginationController, PaginationStrategy};
use crate::rules::Rule;
use crate::session::ParseSession;
use crate::storage::Storage;
use crate::transforms::{Transform, TransformRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Everything one `parse` call needs besides the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseConfig {
    pub rules: Rule,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionSpec>,
    pub pagination: Option<PaginationConfig>,
}

impl ParseConfig {
    pub fn new(rules: Rule) -> Self {
        Self {
            rules,
            actions: vec![],
            pagination: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<ActionSpec>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ParserError::InvalidRule(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ParserError::InvalidRule(e.to_string()))
    }
}

/// Drives rule evaluation against one environment.
///
/// Each `parse` call gets its own session, so concurrent parses through
/// the same parser do not share scope, storage or executed `once` actions.
pub struct Parser {
    env: Arc<dyn Environment>,
    actions: Arc<ActionRegistry>,
    transforms: Arc<TransformRegistry>,
    config: Arc<ParserConfig>,
}

impl Parser {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            actions: Arc::new(ActionRegistry::default()),
            transforms: Arc::new(TransformRegistry::default()),
            config: Arc::new(ParserConfig::default()),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Add or override an action type.
    pub fn register_action<A: Action + 'static>(&mut self, action: A) -> Result<()> {
        Arc::make_mut(&mut self.actions).register(action)
    }

    /// Add or override a transform type.
    pub fn register_transform<T: Transform + 'static>(&mut self, kind: &str, transform: T) -> Result<()> {
        Arc::make_mut(&mut self.transforms).register(kind, transform)
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// Run one parse with fresh storage.
    pub async fn parse(&self, config: &ParseConfig) -> Result<Value> {
        self.parse_with_storage(config, Storage::new()).await
    }

    /// Run one parse writing into `storage`, which the caller keeps.
    #[instrument(skip_all, fields(session = tracing::field::Empty))]
    pub async fn parse_with_storage(&self, config: &ParseConfig, storage: Storage) -> Result<Value> {
        let session = ParseSession::new(
            self.env.clone(),
            self.actions.clone(),
            self.transforms.clone(),
            self.config.clone(),
            storage,
        );
        tracing::Span::current().record("session", tracing::field::display(session.id()));

        let outcome = match self.env.prepare().await {
            Ok(()) => self.run(&session, config).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            error!(error = %e, "parse failed");
            if self.config.snapshot_on_error {
                session.snapshot("error").await;
            }
        }
        if let Err(e) = self.env.tear_down().await {
            warn!(error = %e, "environment teardown failed");
        }
        outcome
    }

    async fn run(&self, session: &ParseSession, config: &ParseConfig) -> Result<Value> {
        if !config.actions.is_empty() {
            debug!(count = config.actions.len(), "running pre-actions");
            session
                .orchestrator()
                .perform_actions(&config.actions, "", Value::Null)
                .await?;
        }

        let evaluator = session.evaluator();
        let mut result = evaluator.evaluate(&config.rules).await?;

        if let Some(pagination) = &config.pagination {
            let mut controller = PaginationController::new(pagination.clone(), session.clone());
            while let PageStep::Page(index) = controller.next().await {
                let offset = match (controller.strategy(), &result) {
                    (PaginationStrategy::Accumulate, Value::Array(rows)) => rows.len(),
                    _ => 0,
                };
                debug!(page = index, offset, "evaluating next page");
                let page = evaluator.evaluate_from(&config.rules, offset).await?;
                result = merge_page(result, page);
            }
        }

        info!("parse completed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_maps_errors_to_invalid_rule() {
        let err = ParseConfig::from_json(r#"{"rules": {"collection": 5}}"#).unwrap_err();
        assert!(matches!(err, ParserError::InvalidRule(_)));

        let err = ParseConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, ParserError::InvalidRule(_)));
    }

    #[test]
    fn from_value_reads_actions_and_pagination() {
        let config = ParseConfig::from_value(json!({
            "rules": {"scope": "h1"},
            "actions": [{"type": "waitForElement", "scope": "h1"}],
            "pagination": {"type": "scroll", "maxPagesCount": 2}
        }))
        .unwrap();

        assert_eq!(config.actions.len(), 1);
        assert_eq!(config.pagination.and_then(|p| p.max_pages_count()), Some(2));
    }
}
