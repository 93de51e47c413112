pub mod base;
mod builtin;
pub mod pattern;
pub mod registry;

pub use base::{Transform, TransformStep};
pub use pattern::Pattern;
pub use registry::TransformRegistry;
