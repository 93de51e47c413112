use crate::actions::base::{ActionContext, ActionSpec};
use crate::actions::wait::{self, WaitOptions};
use crate::core::{PageCall, PageEvent};
use crate::errors::{ParserError, Result};
use crate::rules::scope::join_selectors;
use crate::session::ParseSession;
use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Executes action descriptions against the session's environment.
#[derive(Clone)]
pub struct ActionOrchestrator {
    session: ParseSession,
}

impl ActionOrchestrator {
    pub fn new(session: ParseSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &ParseSession {
        &self.session
    }

    /// Run `actions` in order, each receiving the previous one's result.
    /// Stops at the first failure.
    pub fn perform_actions<'a>(
        &'a self,
        actions: &'a [ActionSpec],
        parent_selector: &'a str,
        prev_result: Value,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            let mut prev = prev_result;
            for spec in actions {
                prev = self.perform_action(spec, parent_selector, prev).await?;
            }
            Ok(prev)
        }
        .boxed()
    }

    /// Run one action. A `once` action that already succeeded this parse
    /// is skipped and passes `prev_result` through; a failed attempt does
    /// not count.
    pub fn perform_action<'a>(
        &'a self,
        spec: &'a ActionSpec,
        parent_selector: &'a str,
        prev_result: Value,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            if spec.once && self.session.ledger().is_done(spec.id) {
                trace!(action = %spec.kind, "once action already performed");
                return Ok(prev_result);
            }

            let action = self
                .session
                .actions()
                .get(&spec.kind)
                .ok_or_else(|| ParserError::UnsupportedAction(spec.kind.clone()))?;

            let selector = resolve_selector(spec, parent_selector);
            let env = self.session.env();
            // Subscribe before acting so a fast page cannot slip past us.
            let page_events = spec.wait_for_page.then(|| env.subscribe());
            let query_events = spec.wait_for_query.as_ref().map(|_| env.subscribe());

            debug!(action = %spec.kind, selector = %selector, "performing action");
            let ctx = ActionContext {
                orchestrator: self,
                selector,
                prev_result,
            };
            let result = action.perform(spec, &ctx).await?;

            if let Some(events) = page_events {
                self.await_navigation(spec, events).await?;
            }
            if let (Some(events), Some(uri)) = (query_events, spec.wait_for_query.as_deref()) {
                self.await_request(spec, uri, events).await?;
            }
            if spec.once {
                self.session.ledger().record(spec.id);
            }
            Ok(result)
        }
        .boxed()
    }

    /// Wait for the next navigation, then re-inject the page helpers.
    pub async fn await_navigation(
        &self,
        spec: &ActionSpec,
        events: broadcast::Receiver<PageEvent>,
    ) -> Result<Value> {
        let options = WaitOptions::from_spec(spec, &self.session.config().wait);
        let event = wait::wait_for_event(&options, events, |event| {
            matches!(event, PageEvent::Navigated { .. })
        })
        .await?;
        self.session.env().evaluate(PageCall::InjectHelpers).await?;

        match event {
            PageEvent::Navigated { url } => Ok(Value::String(url)),
            _ => Ok(Value::Null),
        }
    }

    /// Wait for a request whose URL matches `uri`.
    pub async fn await_request(
        &self,
        spec: &ActionSpec,
        uri: &str,
        events: broadcast::Receiver<PageEvent>,
    ) -> Result<Value> {
        let pattern = Regex::new(uri)
            .map_err(|e| ParserError::invalid_action(&spec.kind, format!("bad uri pattern: {}", e)))?;
        let options = WaitOptions::from_spec(spec, &self.session.config().wait);
        let event = wait::wait_for_event(&options, events, |event| {
            matches!(event, PageEvent::Request { url } if pattern.is_match(url))
        })
        .await?;

        match event {
            PageEvent::Request { url } => Ok(Value::String(url)),
            _ => Ok(Value::Null),
        }
    }
}

/// The action's own scope, under its `parentScope` when given, otherwise
/// under the selector of the enclosing rule.
pub fn resolve_selector(spec: &ActionSpec, parent_selector: &str) -> String {
    let base = spec.parent_scope.as_deref().unwrap_or(parent_selector);
    join_selectors(&[base, spec.scope.as_deref().unwrap_or("")])
}
