//! Actions available to every parser unless overridden.

mod control;
mod interaction;
mod navigation;
mod waits;

use crate::actions::base::{ActionContext, ActionSpec};
use crate::actions::registry::ActionRegistry;
use crate::errors::{ParserError, Result};
use std::sync::Arc;

pub use control::{Cases, Condition, Exist, ParseRules};
pub use interaction::{ChangeElement, Interaction, Scroll, TypeText};
pub use navigation::{Back, Open, Snapshot, Url};
pub use waits::{Sleep, WaitFor, WaitForPage, WaitForPattern, WaitForQuery};

pub(crate) fn register_all(registry: &mut ActionRegistry) {
    let builtins: Vec<Arc<dyn crate::actions::Action>> = vec![
        Arc::new(Interaction::click()),
        Arc::new(Interaction::mouse_click()),
        Arc::new(Interaction::mouse_down()),
        Arc::new(Interaction::mouse_up()),
        Arc::new(Interaction::focus()),
        Arc::new(Interaction::blur()),
        Arc::new(TypeText),
        Arc::new(ChangeElement),
        Arc::new(Scroll),
        Arc::new(Sleep),
        Arc::new(WaitFor::element()),
        Arc::new(WaitFor::visible()),
        Arc::new(WaitFor::invisible()),
        Arc::new(WaitFor::ready_state()),
        Arc::new(WaitForPattern),
        Arc::new(WaitForPage),
        Arc::new(WaitForQuery),
        Arc::new(Exist),
        Arc::new(Url),
        Arc::new(Open),
        Arc::new(Back),
        Arc::new(Snapshot),
        Arc::new(ParseRules),
        Arc::new(Condition),
        Arc::new(Cases),
    ];
    for action in builtins {
        // Built-in names are non-empty, registration cannot fail.
        let _ = registry.register_arc(action);
    }
}

/// The resolved selector, or an error for actions that need a target.
fn target<'c>(spec: &ActionSpec, ctx: &'c ActionContext<'_>) -> Result<&'c str> {
    if ctx.selector.is_empty() {
        Err(ParserError::invalid_action(&spec.kind, "requires a scope"))
    } else {
        Ok(&ctx.selector)
    }
}
