pub mod config;
pub mod environment;

pub use config::{ChromeConfig, PaginationDefaults, ParserConfig, Viewport, WaitConfig};
pub use environment::{Environment, PageCall, PageEvent};
