pub mod base;
mod builtin;
pub mod ledger;
pub mod orchestrator;
pub mod race;
pub mod registry;
pub mod wait;

pub use base::{Action, ActionContext, ActionId, ActionSpec, Breaker};
pub use builtin::{
    Back, Cases, ChangeElement, Condition, Exist, Interaction, Open, ParseRules, Scroll, Sleep,
    Snapshot, TypeText, Url, WaitFor, WaitForPage, WaitForPattern, WaitForQuery,
};
pub use ledger::ExecutionLedger;
pub use orchestrator::ActionOrchestrator;
pub use registry::ActionRegistry;
