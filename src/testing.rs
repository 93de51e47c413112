use crate::actions::ActionSpec;
use crate::browser::HtmlEnvironment;
use crate::core::{ParserConfig, WaitConfig};
use crate::errors::{ParserError, Result};
use crate::parser::{ParseConfig, Parser};
use crate::rules::Rule;
use crate::session::ParseSession;
use crate::storage::Storage;
use serde_json::Value;
use std::sync::Arc;

/// Shortcuts for driving parsers over static documents.
pub struct TestHelper;

impl TestHelper {
    pub fn html_env(html: &str) -> Arc<HtmlEnvironment> {
        Arc::new(HtmlEnvironment::new(html))
    }

    /// Short waits, so failing expectations fail fast.
    pub fn fast_config() -> ParserConfig {
        let mut config = ParserConfig::default();
        config.wait = WaitConfig {
            interval_ms: 5,
            timeout_ms: 200,
        };
        config.pagination.interval_ms = 5;
        config.pagination.timeout_ms = 100;
        config
    }

    pub fn parser_for(env: Arc<HtmlEnvironment>) -> Parser {
        Parser::new(env).with_config(Self::fast_config())
    }

    /// A standalone session, for driving the evaluator or orchestrator
    /// directly without `Parser::parse`.
    pub fn session_for(env: Arc<HtmlEnvironment>) -> ParseSession {
        let parser = Self::parser_for(env.clone());
        ParseSession::new(
            env,
            Arc::new(parser.actions().clone()),
            Arc::new(parser.transforms().clone()),
            Arc::new(parser.config().clone()),
            Storage::new(),
        )
    }

    pub fn rule(value: Value) -> Result<Rule> {
        serde_json::from_value(value).map_err(|e| ParserError::InvalidRule(e.to_string()))
    }

    pub fn actions(value: Value) -> Result<Vec<ActionSpec>> {
        serde_json::from_value(value).map_err(|e| ParserError::InvalidRule(e.to_string()))
    }

    /// Parse `html` with a JSON parse config in one call.
    pub async fn parse_html(html: &str, config: Value) -> Result<Value> {
        let parser = Self::parser_for(Self::html_env(html));
        parser.parse(&ParseConfig::from_value(config)?).await
    }
}
