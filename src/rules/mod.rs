pub mod evaluator;
pub mod rule;
pub mod scope;

pub use evaluator::RuleEvaluator;
pub use rule::{ResultType, Rule, RuleKind, RuleNode};
pub use scope::{ScopeFrame, ScopeStack};
