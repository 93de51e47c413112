//! The `cases` combinator: run several action chains concurrently and
//! settle on the first one that succeeds.

use crate::actions::base::ActionSpec;
use crate::actions::orchestrator::ActionOrchestrator;
use crate::errors::{ParserError, Result};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

enum ChainReport {
    /// A step flagged `trueCase` succeeded; the chain keeps running.
    Won { chain: usize, value: Value },
    Finished { chain: usize, outcome: Result<Value> },
}

/// Start every chain and resolve with the first success.
///
/// Chains that lose keep running to completion in the background; their
/// results are discarded. Fails only once every chain has failed.
pub async fn race_cases(
    orchestrator: &ActionOrchestrator,
    cases: &[Vec<ActionSpec>],
    selector: &str,
    prev_result: Value,
) -> Result<Value> {
    if cases.is_empty() {
        return Err(ParserError::invalid_action("cases", "no chains to run"));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    for (chain, steps) in cases.iter().enumerate() {
        let orchestrator = orchestrator.clone();
        let steps = steps.clone();
        let selector = selector.to_string();
        let prev = prev_result.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let outcome = run_chain(&orchestrator, chain, &steps, &selector, prev, &tx).await;
            // The race may already be settled; nobody is listening then.
            let _ = tx.send(ChainReport::Finished { chain, outcome });
        });
    }
    drop(tx);

    let mut last_error = None;
    while let Some(report) = rx.recv().await {
        match report {
            ChainReport::Won { chain, value } => {
                debug!(chain, "case won by trueCase step");
                return Ok(value);
            }
            ChainReport::Finished {
                chain,
                outcome: Ok(value),
            } => {
                debug!(chain, "case won by completion");
                return Ok(value);
            }
            ChainReport::Finished {
                chain,
                outcome: Err(error),
            } => {
                debug!(chain, %error, "case failed");
                last_error = Some(error);
            }
        }
    }

    let source = last_error.unwrap_or_else(|| {
        warn!("case chains ended without reporting");
        ParserError::Environment("case chain aborted".to_string())
    });
    Err(ParserError::RaceFailed {
        chains: cases.len(),
        source: Box::new(source),
    })
}

async fn run_chain(
    orchestrator: &ActionOrchestrator,
    chain: usize,
    steps: &[ActionSpec],
    selector: &str,
    mut prev: Value,
    tx: &mpsc::UnboundedSender<ChainReport>,
) -> Result<Value> {
    let mut reported = false;
    for step in steps {
        prev = orchestrator.perform_action(step, selector, prev).await?;
        if step.true_case && !reported {
            reported = true;
            let _ = tx.send(ChainReport::Won {
                chain,
                value: prev.clone(),
            });
        }
    }
    Ok(prev)
}
