//! Quiescence detection (component C8).
//!
//! A single background task polls every second. `ActiveWorkers == 0 &&
//! Frontier.len() == 0` is sound because the decrement of `ActiveWorkers`
//! for a given URL is sequenced after every enqueue that URL's processing
//! could have produced — see [`crate::stats::Stats`] and
//! [`crate::processor::Processor::process`], which enqueues discovered
//! links before returning and only then lets the worker decrement its
//! active count.

use crate::cancel::Cancel;
use crate::frontier::Frontier;
use crate::stats::Stats;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(stats: Stats, frontier: Arc<Frontier>, cancel: Cancel) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                if stats.active_workers() == 0 && frontier.is_empty() {
                    tracing::debug!("quiescence reached, stopping crawl");
                    cancel.cancel();
                    return;
                }
            }
        }
    }
}
