//! Wait primitives shared by the wait actions and pagination probes.
//!
//! A wait ends in exactly one of: satisfied, timed out, broken, errored.
//! Its ticker and deadline are owned by the wait future and dropped with
//! it, so nothing keeps firing once it has settled.

use crate::actions::base::{ActionSpec, Breaker};
use crate::core::{PageEvent, WaitConfig};
use crate::errors::{ParserError, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{trace, warn};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub what: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub breaker: Option<Breaker>,
}

impl WaitOptions {
    pub fn new(what: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            what: what.into(),
            interval: interval.max(MIN_INTERVAL),
            timeout,
            breaker: None,
        }
    }

    pub fn from_spec(spec: &ActionSpec, defaults: &WaitConfig) -> Self {
        let mut options = Self::new(
            spec.kind.clone(),
            spec.interval_or(defaults.interval()),
            spec.timeout_or(defaults.timeout()),
        );
        options.breaker = spec.breaker.clone();
        options
    }

    pub fn with_breaker(mut self, breaker: Option<Breaker>) -> Self {
        self.breaker = breaker;
        self
    }

    fn check_breaker(&self) -> Result<()> {
        match &self.breaker {
            Some(breaker) if breaker.is_broken() => Err(ParserError::WaitBroken {
                what: self.what.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn timed_out(&self) -> ParserError {
        ParserError::WaitTimeout {
            what: self.what.clone(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

/// Run `probe` every `interval` until `checker` accepts its value.
///
/// The first probe runs immediately. The breaker is consulted before each
/// probe; the deadline covers probes in flight.
pub async fn poll_until<P, Fut, C>(options: &WaitOptions, mut probe: P, checker: C) -> Result<Value>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<Value>>,
    C: Fn(&Value) -> bool,
{
    let polling = async {
        let mut ticker = interval(options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            options.check_breaker()?;
            let value = probe().await?;
            if checker(&value) {
                return Ok(value);
            }
            trace!(wait = %options.what, "probe not satisfied");
        }
    };

    match timeout(options.timeout, polling).await {
        Ok(outcome) => outcome,
        Err(_) => Err(options.timed_out()),
    }
}

/// Wait for the first event accepted by `accept`.
///
/// An `Error` event fails the wait. The breaker is checked every interval.
pub async fn wait_for_event<F>(
    options: &WaitOptions,
    mut events: broadcast::Receiver<PageEvent>,
    accept: F,
) -> Result<PageEvent>
where
    F: Fn(&PageEvent) -> bool,
{
    let waiting = async {
        let mut ticker = interval(options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(PageEvent::Error { message }) => return Err(ParserError::PageError(message)),
                    Ok(event) if accept(&event) => return Ok(event),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(wait = %options.what, skipped, "page events lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(ParserError::Environment("page event channel closed".to_string()))
                    }
                },
                _ = ticker.tick() => options.check_breaker()?,
            }
        }
    };

    match timeout(options.timeout, waiting).await {
        Ok(outcome) => outcome,
        Err(_) => Err(options.timed_out()),
    }
}
