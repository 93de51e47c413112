use crate::core::PageCall;
use crate::errors::{ParserError, Result};
use crate::rules::rule::{ResultType, Rule, RuleKind};
use crate::rules::scope::{ScopeFrame, ScopeStack};
use crate::session::ParseSession;
use crate::values::{as_number, as_text};
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

const DOCUMENT_ROOT: &str = "html";

/// Recursive interpreter turning a rule tree into scoped page queries.
///
/// Every evaluation owns its [`ScopeStack`]; nothing is shared between
/// concurrent evaluations except the session's storage.
#[derive(Clone)]
pub struct RuleEvaluator {
    session: ParseSession,
}

impl RuleEvaluator {
    pub fn new(session: ParseSession) -> Self {
        Self { session }
    }

    /// Evaluate `rule` from the document root.
    pub async fn evaluate(&self, rule: &Rule) -> Result<Value> {
        self.evaluate_from(rule, 0).await
    }

    /// Like [`evaluate`](Self::evaluate), skipping the first `offset` rows
    /// when `rule` is a grid.
    pub async fn evaluate_from(&self, rule: &Rule, offset: usize) -> Result<Value> {
        let mut stack = ScopeStack::new();
        self.evaluate_rule(rule, &mut stack, offset).await
    }

    /// Evaluate `rule` nested under an already-resolved selector.
    pub fn evaluate_within<'a>(
        &'a self,
        rule: &'a Rule,
        selector: &'a str,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            let mut stack = ScopeStack::rooted_at(selector);
            self.evaluate_rule(rule, &mut stack, 0).await
        }
        .boxed()
    }

    fn evaluate_rule<'a>(
        &'a self,
        rule: &'a Rule,
        stack: &'a mut ScopeStack,
        offset: usize,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            let kind = rule.kind()?;

            if !rule.actions.is_empty() {
                let parent = stack.selector();
                self.session
                    .orchestrator()
                    .perform_actions(&rule.actions, &parent, Value::Null)
                    .await?;
            }

            match kind {
                RuleKind::Simple => self.evaluate_simple(rule, stack).await,
                RuleKind::Collection(children) => {
                    let pushed = push_own_scope(rule, stack);
                    let outcome = self.collect_fields(children, stack).await;
                    if pushed {
                        stack.pop();
                    }
                    self.transform_whole(rule, outcome?)
                }
                RuleKind::Grid(template) => {
                    let rows = self.evaluate_grid(rule, template, stack, offset).await?;
                    self.transform_whole(rule, rows)
                }
            }
        }
        .boxed()
    }

    async fn evaluate_simple(&self, rule: &Rule, stack: &mut ScopeStack) -> Result<Value> {
        let pushed = push_own_scope(rule, stack);
        let mut selector = stack.selector();
        if pushed {
            stack.pop();
        }
        if selector.is_empty() {
            selector = DOCUMENT_ROOT.to_string();
        }

        trace!(selector = %selector, "querying");
        let raw = self
            .session
            .env()
            .evaluate(PageCall::Query {
                selector: selector.clone(),
                attr: rule.attr.clone(),
                prop: rule.prop.clone(),
            })
            .await?;

        let texts: Vec<String> = match raw {
            Value::Null => return Err(ParserError::EmptyQuery { selector }),
            Value::Array(items) => items.iter().map(|v| as_text(v).trim().to_string()).collect(),
            other => vec![as_text(&other).trim().to_string()],
        };

        let transforms = self.session.transforms();
        let storage = self.session.storage();
        match rule.result_type {
            ResultType::Array => texts
                .into_iter()
                .map(|text| transforms.produce(&rule.transform, Value::String(text), storage))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            ResultType::String => {
                let joined = texts.join(rule.separator());
                transforms.produce(&rule.transform, Value::String(joined), storage)
            }
        }
    }

    /// Evaluate named sub-rules in order into a mapping, writing each
    /// result to storage under its name.
    fn collect_fields<'a>(
        &'a self,
        rules: Vec<&'a Rule>,
        stack: &'a mut ScopeStack,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            let mut fields = Map::new();
            for child in rules {
                let name = child.name.as_deref().ok_or_else(|| {
                    ParserError::InvalidRule(format!(
                        "collection member {} has no name",
                        child.describe()
                    ))
                })?;
                let value = self.evaluate_rule(child, stack, 0).await?;
                self.session.storage().set(name, value.clone());
                if !child.is_virtual {
                    fields.insert(name.to_string(), value);
                }
            }
            Ok(Value::Object(fields))
        }
        .boxed()
    }

    async fn evaluate_grid(
        &self,
        rule: &Rule,
        template: &[Rule],
        stack: &mut ScopeStack,
        offset: usize,
    ) -> Result<Value> {
        let scope = rule.scope.as_deref().ok_or_else(|| {
            ParserError::InvalidRule(format!("grid rule {} needs a scope", rule.describe()))
        })?;

        stack.push(ScopeFrame::new(scope, rule.parent_scope.clone()));
        let selector = stack.selector();
        stack.pop();
        let counted = self.session.env().evaluate(PageCall::count(&selector)).await?;
        let count = as_number(&counted).map_or(0, |n| n.max(0.0) as usize);
        debug!(selector = %selector, count, offset, "evaluating grid");

        let mut rows = Vec::with_capacity(count.saturating_sub(offset));
        for index in offset..count {
            stack.push(ScopeFrame::new(
                format!("{}:eq({})", scope, index),
                rule.parent_scope.clone(),
            ));
            let outcome = self.collect_fields(template.iter().collect(), stack).await;
            stack.pop();

            match outcome {
                Ok(row) => rows.push(row),
                Err(error) if error.is_configuration() => return Err(error),
                Err(error) => {
                    warn!(selector = %selector, row = index, %error, "grid row failed, keeping earlier rows");
                    break;
                }
            }
        }
        Ok(Value::Array(rows))
    }

    fn transform_whole(&self, rule: &Rule, value: Value) -> Result<Value> {
        if rule.transform.is_empty() {
            return Ok(value);
        }
        self.session
            .transforms()
            .produce(&rule.transform, value, self.session.storage())
    }
}

fn push_own_scope(rule: &Rule, stack: &mut ScopeStack) -> bool {
    if rule.scope.is_none() && rule.parent_scope.is_none() {
        return false;
    }
    stack.push(ScopeFrame::new(
        rule.scope.clone().unwrap_or_default(),
        rule.parent_scope.clone(),
    ));
    true
}
