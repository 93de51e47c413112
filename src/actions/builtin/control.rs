use super::target;
use crate::actions::base::{Action, ActionContext, ActionSpec};
use crate::actions::race::race_cases;
use crate::core::PageCall;
use crate::errors::{ParserError, Result};
use crate::values::{as_number, is_truthy};
use async_trait::async_trait;
use serde_json::Value;

/// `true` when the selector matches at least one node.
pub struct Exist;

#[async_trait]
impl Action for Exist {
    fn name(&self) -> &str {
        "exist"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let count = ctx
            .orchestrator
            .session()
            .env()
            .evaluate(PageCall::count(target(spec, ctx)?))
            .await?;
        Ok(Value::Bool(as_number(&count).map_or(false, |n| n > 0.0)))
    }
}

/// Evaluates nested `rules` rooted at the action's selector.
pub struct ParseRules;

#[async_trait]
impl Action for ParseRules {
    fn name(&self) -> &str {
        "parse"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let rules = spec
            .rules
            .as_deref()
            .ok_or_else(|| ParserError::invalid_action(&spec.kind, "missing `rules`"))?;
        ctx.orchestrator
            .session()
            .evaluator()
            .evaluate_within(rules, &ctx.selector)
            .await
    }
}

/// Runs `conditions`; a truthy verdict runs `actions`, otherwise
/// `elseActions`. Without `elseActions` a falsy verdict yields `false`.
pub struct Condition;

#[async_trait]
impl Action for Condition {
    fn name(&self) -> &str {
        "condition"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let orchestrator = ctx.orchestrator;
        let verdict = orchestrator
            .perform_actions(&spec.conditions, &ctx.selector, ctx.prev_result.clone())
            .await?;

        if is_truthy(&verdict) {
            orchestrator
                .perform_actions(&spec.actions, &ctx.selector, verdict)
                .await
        } else {
            match &spec.else_actions {
                Some(else_actions) => {
                    orchestrator
                        .perform_actions(else_actions, &ctx.selector, verdict)
                        .await
                }
                None => Ok(Value::Bool(false)),
            }
        }
    }
}

/// Races the chains in `cases`; see [`race_cases`].
pub struct Cases;

#[async_trait]
impl Action for Cases {
    fn name(&self) -> &str {
        "cases"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        race_cases(ctx.orchestrator, &spec.cases, &ctx.selector, ctx.prev_result.clone()).await
    }
}
