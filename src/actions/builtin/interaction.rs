use super::target;
use crate::actions::base::{Action, ActionContext, ActionSpec};
use crate::core::PageCall;
use crate::errors::{ParserError, Result};
use crate::values::as_text;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Pointer and focus actions: one page call on the matched nodes.
///
/// Resolves to whatever the page reports, `false` when nothing matched.
pub struct Interaction {
    name: &'static str,
    call: fn(String) -> PageCall,
}

impl Interaction {
    pub fn click() -> Self {
        Self {
            name: "click",
            call: |selector| PageCall::Click { selector },
        }
    }

    /// Alias of `click` kept for rule files written against it.
    pub fn mouse_click() -> Self {
        Self {
            name: "mouseClick",
            call: |selector| PageCall::Click { selector },
        }
    }

    pub fn mouse_down() -> Self {
        Self {
            name: "mouseDown",
            call: |selector| PageCall::MouseDown { selector },
        }
    }

    pub fn mouse_up() -> Self {
        Self {
            name: "mouseUp",
            call: |selector| PageCall::MouseUp { selector },
        }
    }

    pub fn focus() -> Self {
        Self {
            name: "focus",
            call: |selector| PageCall::Focus { selector },
        }
    }

    pub fn blur() -> Self {
        Self {
            name: "blur",
            call: |selector| PageCall::Blur { selector },
        }
    }
}

#[async_trait]
impl Action for Interaction {
    fn name(&self) -> &str {
        self.name
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let selector = target(spec, ctx)?.to_string();
        ctx.orchestrator
            .session()
            .env()
            .evaluate((self.call)(selector))
            .await
    }
}

/// Types `text` into the matched fields, or the previous action's result
/// when `useActionResult` is set.
pub struct TypeText;

#[async_trait]
impl Action for TypeText {
    fn name(&self) -> &str {
        "type"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let selector = target(spec, ctx)?.to_string();
        let use_prev = spec
            .param("useActionResult")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let text = if use_prev {
            as_text(&ctx.prev_result)
        } else {
            spec.require_str("text")?.to_string()
        };

        ctx.orchestrator
            .session()
            .env()
            .evaluate(PageCall::Type { selector, text })
            .await
    }
}

/// Sets inline styles and attributes on the matched nodes.
pub struct ChangeElement;

fn object_param(spec: &ActionSpec, key: &str) -> Result<Map<String, Value>> {
    match spec.param(key) {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(ParserError::invalid_action(
            &spec.kind,
            format!("`{}` must be an object", key),
        )),
    }
}

#[async_trait]
impl Action for ChangeElement {
    fn name(&self) -> &str {
        "changeElement"
    }

    async fn perform(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let selector = target(spec, ctx)?.to_string();
        let style = object_param(spec, "style")?;
        let attr = object_param(spec, "attr")?;

        ctx.orchestrator
            .session()
            .env()
            .evaluate(PageCall::ChangeElement {
                selector,
                style,
                attr,
            })
            .await
    }
}

/// Scrolls the matched node, or the window without a scope.
pub struct Scroll;

#[async_trait]
impl Action for Scroll {
    fn name(&self) -> &str {
        "scroll"
    }

    async fn perform(&self, _spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let selector = (!ctx.selector.is_empty()).then(|| ctx.selector.clone());
        ctx.orchestrator
            .session()
            .env()
            .evaluate(PageCall::Scroll { selector })
            .await
    }
}
