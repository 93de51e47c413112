use crate::actions::base::{Action, ActionContext, ActionSpec};
use crate::core::PageCall;
use crate::errors::{ParserError, Result};
use crate::values::as_text;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Resolves to the current page URL.
pub struct Url;

#[async_trait]
impl Action for Url {
    fn name(&self) -> &str {
        "url"
    }

    async fn perform(&self, _spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        ctx.orchestrator.session().env().evaluate(PageCall::Url).await
    }
}

/// Navigates to `url`, resolved against the current page URL.
pub struct Open;

#[async_trait]
impl Action for Open {
    fn name(&self) -> &str {
        "open"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let env = ctx.orchestrator.session().env();
        let target = spec.require_str("url")?;
        let current = as_text(&env.evaluate(PageCall::Url).await?);
        let resolved = resolve_url(&current, target)
            .map_err(|message| ParserError::invalid_action(&spec.kind, message))?;

        debug!(url = %resolved, "opening page");
        env.evaluate(PageCall::Open {
            url: resolved.clone(),
        })
        .await?;
        env.evaluate(PageCall::InjectHelpers).await?;
        Ok(Value::String(resolved))
    }
}

fn resolve_url(current: &str, target: &str) -> std::result::Result<String, String> {
    if let Ok(absolute) = url::Url::parse(target) {
        return Ok(absolute.to_string());
    }
    let base = url::Url::parse(current)
        .map_err(|_| format!("cannot resolve `{}` without an absolute page url", target))?;
    base.join(target)
        .map(|joined| joined.to_string())
        .map_err(|e| format!("cannot resolve `{}`: {}", target, e))
}

/// Goes back one entry in history.
pub struct Back;

#[async_trait]
impl Action for Back {
    fn name(&self) -> &str {
        "back"
    }

    async fn perform(&self, _spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let env = ctx.orchestrator.session().env();
        let result = env.evaluate(PageCall::Back).await?;
        env.evaluate(PageCall::InjectHelpers).await?;
        Ok(result)
    }
}

/// Best-effort diagnostic capture; never fails the chain.
pub struct Snapshot;

#[async_trait]
impl Action for Snapshot {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let label = spec.str_param("label").unwrap_or("snapshot");
        ctx.orchestrator.session().snapshot(label).await;
        Ok(ctx.prev_result.clone())
    }
}
