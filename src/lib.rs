pub mod actions;
pub mod browser;
pub mod core;
pub mod errors;
pub mod pagination;
pub mod parser;
pub mod rules;
pub mod session;
pub mod storage;
pub mod testing;
pub mod transforms;
pub mod values;

pub use actions::{Action, ActionContext, ActionOrchestrator, ActionRegistry, ActionSpec, Breaker};
#[cfg(feature = "chrome")]
pub use browser::ChromeEnvironment;
pub use browser::HtmlEnvironment;
pub use core::{ChromeConfig, Environment, PageCall, PageEvent, ParserConfig, Viewport, WaitConfig};
pub use errors::{ParserError, Result};
pub use pagination::{PageStep, PaginationConfig, PaginationController};
pub use parser::{ParseConfig, Parser};
pub use rules::{Rule, RuleEvaluator};
pub use session::ParseSession;
pub use storage::Storage;
pub use transforms::{Transform, TransformRegistry, TransformStep};
