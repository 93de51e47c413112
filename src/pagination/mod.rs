pub mod config;
pub mod controller;

pub use config::{PaginationConfig, PaginationStrategy};
pub use controller::{merge_page, PageStep, PaginationController};
