use crate::actions::wait::{poll_until, WaitOptions};
use crate::core::PageCall;
use crate::errors::{ParserError, Result};
use crate::pagination::config::{PaginationConfig, PaginationStrategy};
use crate::session::ParseSession;
use crate::values::{as_number, as_text};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Outcome of one [`PaginationController::next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    Done,
    /// Zero-based index of the page now showing.
    Page(usize),
}

/// Moves the document to its next page and reports whether it got there.
pub struct PaginationController {
    config: PaginationConfig,
    session: ParseSession,
    pages_seen: usize,
}

impl PaginationController {
    /// The first page counts as already seen.
    pub fn new(config: PaginationConfig, session: ParseSession) -> Self {
        Self {
            config,
            session,
            pages_seen: 1,
        }
    }

    pub fn strategy(&self) -> PaginationStrategy {
        self.config.strategy()
    }

    /// Advance one page. A progress probe that fails ends pagination
    /// instead of failing the parse.
    pub async fn next(&mut self) -> PageStep {
        if let Some(max) = self.config.max_pages_count() {
            if self.pages_seen >= max {
                debug!(max, "page limit reached");
                return PageStep::Done;
            }
        }

        match self.advance().await {
            Ok(true) => {
                self.pages_seen += 1;
                debug!(page = self.pages_seen - 1, "advanced to next page");
                PageStep::Page(self.pages_seen - 1)
            }
            Ok(false) => {
                info!(pages = self.pages_seen, "no further pages");
                PageStep::Done
            }
            Err(error) => {
                warn!(pages = self.pages_seen, %error, "pagination stopped");
                PageStep::Done
            }
        }
    }

    async fn advance(&self) -> Result<bool> {
        let defaults = &self.session.config().pagination;
        let options = WaitOptions::new(
            "pagination",
            self.config.interval(defaults),
            self.config.timeout(defaults),
        );
        let env = self.session.env();

        match &self.config {
            PaginationConfig::Scroll { scope, .. } => {
                let height_call = PageCall::ScrollHeight {
                    selector: scope.clone(),
                };
                let before = height(&env.evaluate(height_call.clone()).await?);
                env.evaluate(PageCall::Scroll {
                    selector: scope.clone(),
                })
                .await?;

                poll_until(&options, || env.evaluate(height_call.clone()), |value| {
                    height(value) > before
                })
                .await
                .map_err(probe_failed)?;
                Ok(true)
            }
            PaginationConfig::Page {
                scope, page_scope, ..
            } => {
                let controls = env.evaluate(PageCall::count(scope.as_str())).await?;
                if as_number(&controls).map_or(true, |n| n < 1.0) {
                    return Ok(false);
                }

                let marker_call = PageCall::query(page_scope.as_str());
                let before = page_marker(&env.evaluate(marker_call.clone()).await?);
                env.evaluate(PageCall::Click {
                    selector: scope.clone(),
                })
                .await?;

                poll_until(&options, || env.evaluate(marker_call.clone()), |value| {
                    page_marker(value) != before
                })
                .await
                .map_err(probe_failed)?;
                Ok(true)
            }
        }
    }
}

fn height(value: &Value) -> f64 {
    as_number(value).unwrap_or(0.0)
}

fn page_marker(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>().join(" "),
        other => as_text(other),
    }
}

fn probe_failed(error: ParserError) -> ParserError {
    ParserError::PaginationProbe(error.to_string())
}

/// Fold a freshly evaluated page into the result so far: rows are
/// appended, anything else is replaced by the newer page.
pub fn merge_page(collected: Value, page: Value) -> Value {
    match (collected, page) {
        (Value::Array(mut rows), Value::Array(more)) => {
            rows.extend(more);
            Value::Array(rows)
        }
        (_, page) => page,
    }
}
