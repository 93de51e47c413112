use crate::core::PaginationDefaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How further pages are reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PaginationConfig {
    /// Infinite scroll: scroll, then wait for the document to grow.
    #[serde(rename_all = "camelCase")]
    Scroll {
        scope: Option<String>,
        interval: Option<u64>,
        timeout: Option<u64>,
        max_pages_count: Option<usize>,
    },
    /// Numbered pages: click `scope`, then wait for `page_scope` to change.
    #[serde(rename_all = "camelCase")]
    Page {
        scope: String,
        page_scope: String,
        interval: Option<u64>,
        timeout: Option<u64>,
        max_pages_count: Option<usize>,
    },
}

/// How a new page's rows relate to the ones already collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStrategy {
    /// The document keeps earlier rows; skip them with an offset.
    Accumulate,
    /// The document shows only the new page; evaluate from row 0.
    Replace,
}

impl PaginationConfig {
    pub fn strategy(&self) -> PaginationStrategy {
        match self {
            PaginationConfig::Scroll { .. } => PaginationStrategy::Accumulate,
            PaginationConfig::Page { .. } => PaginationStrategy::Replace,
        }
    }

    pub fn max_pages_count(&self) -> Option<usize> {
        match self {
            PaginationConfig::Scroll {
                max_pages_count, ..
            }
            | PaginationConfig::Page {
                max_pages_count, ..
            } => *max_pages_count,
        }
    }

    pub fn interval(&self, defaults: &PaginationDefaults) -> Duration {
        let interval = match self {
            PaginationConfig::Scroll { interval, .. } | PaginationConfig::Page { interval, .. } => {
                *interval
            }
        };
        Duration::from_millis(interval.unwrap_or(defaults.interval_ms))
    }

    pub fn timeout(&self, defaults: &PaginationDefaults) -> Duration {
        let timeout = match self {
            PaginationConfig::Scroll { timeout, .. } | PaginationConfig::Page { timeout, .. } => {
                *timeout
            }
        };
        Duration::from_millis(timeout.unwrap_or(defaults.timeout_ms))
    }
}
