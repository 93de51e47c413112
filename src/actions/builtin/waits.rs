use super::target;
use crate::actions::base::{Action, ActionContext, ActionSpec};
use crate::actions::wait::{poll_until, WaitOptions};
use crate::core::PageCall;
use crate::errors::{ParserError, Result};
use crate::transforms::Pattern;
use crate::values::{as_number, as_text};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Pauses for `timeout` milliseconds.
pub struct Sleep;

#[async_trait]
impl Action for Sleep {
    fn name(&self) -> &str {
        "wait"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let millis = spec
            .timeout
            .ok_or_else(|| ParserError::invalid_action(&spec.kind, "missing `timeout`"))?;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(ctx.prev_result.clone())
    }
}

#[derive(Clone, Copy)]
enum Condition {
    Element,
    Visible,
    Invisible,
    ReadyState,
}

/// Polls a page condition until it holds, the timeout passes, or the
/// breaker trips.
pub struct WaitFor {
    name: &'static str,
    condition: Condition,
}

impl WaitFor {
    pub fn element() -> Self {
        Self {
            name: "waitForElement",
            condition: Condition::Element,
        }
    }

    pub fn visible() -> Self {
        Self {
            name: "waitForVisible",
            condition: Condition::Visible,
        }
    }

    pub fn invisible() -> Self {
        Self {
            name: "waitForInvisible",
            condition: Condition::Invisible,
        }
    }

    pub fn ready_state() -> Self {
        Self {
            name: "waitForReadyState",
            condition: Condition::ReadyState,
        }
    }
}

#[async_trait]
impl Action for WaitFor {
    fn name(&self) -> &str {
        self.name
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let session = ctx.orchestrator.session();
        let env = session.env();
        let options = WaitOptions::from_spec(spec, &session.config().wait);

        let call = match self.condition {
            Condition::Element => PageCall::count(target(spec, ctx)?),
            Condition::Visible | Condition::Invisible => PageCall::Visible {
                selector: target(spec, ctx)?.to_string(),
            },
            Condition::ReadyState => PageCall::ReadyState,
        };
        let expected = spec.str_param("state").unwrap_or("complete").to_string();
        let condition = self.condition;

        poll_until(&options, || env.evaluate(call.clone()), move |value| match condition {
            Condition::Element => as_number(value).map_or(false, |n| n > 0.0),
            Condition::Visible => value.as_bool() == Some(true),
            Condition::Invisible => value.as_bool() == Some(false),
            Condition::ReadyState => as_text(value) == expected,
        })
        .await
        .map(|_| Value::Bool(true))
    }
}

/// Polls the matched text until it matches `pattern`; resolves to the text.
pub struct WaitForPattern;

#[async_trait]
impl Action for WaitForPattern {
    fn name(&self) -> &str {
        "waitForPattern"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let session = ctx.orchestrator.session();
        let env = session.env();
        let pattern = spec
            .param("pattern")
            .ok_or_else(|| ParserError::invalid_action(&spec.kind, "missing `pattern`"))
            .and_then(|raw| {
                Pattern::from_value(raw)
                    .map_err(|e| ParserError::invalid_action(&spec.kind, e.to_string()))
            })?;
        let call = PageCall::Query {
            selector: target(spec, ctx)?.to_string(),
            attr: spec.str_param("attr").map(str::to_string),
            prop: None,
        };
        let options = WaitOptions::from_spec(spec, &session.config().wait);

        let value = poll_until(&options, || env.evaluate(call.clone()), |value| {
            pattern.is_match(&joined(value))
        })
        .await?;
        Ok(Value::String(joined(&value)))
    }
}

fn joined(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>().join(" "),
        other => as_text(other),
    }
}

/// Waits for the next navigation and resolves to the new URL.
pub struct WaitForPage;

#[async_trait]
impl Action for WaitForPage {
    fn name(&self) -> &str {
        "waitForPage"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let events = ctx.orchestrator.session().env().subscribe();
        ctx.orchestrator.await_navigation(spec, events).await
    }
}

/// Waits for a request whose URL matches `uri`; resolves to that URL.
pub struct WaitForQuery;

#[async_trait]
impl Action for WaitForQuery {
    fn name(&self) -> &str {
        "waitForQuery"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let uri = spec.require_str("uri")?;
        let events = ctx.orchestrator.session().env().subscribe();
        ctx.orchestrator.await_request(spec, uri, events).await
    }
}
