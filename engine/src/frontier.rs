//! Bounded FIFO frontier with at-most-once admission (component C4).
//!
//! Built on `tokio::sync::mpsc`: `try_send` is the non-blocking admission
//! primitive and `recv().await` is the cooperative, cancellation-aware
//! dequeue. Dropping every `Sender` closes the channel, so `recv` returning
//! `None` doubles as the "queue closed" signal without a separate flag.

use crate::cancel::Cancel;
use crate::error::Error;
use crate::url_normalize::{normalize, NormalizePolicy, NormalizedUrl};
use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of a single `enqueue` batch call.
#[derive(Debug, Default)]
pub struct EnqueueReport {
    pub admitted: usize,
    pub cancelled: bool,
}

pub struct Frontier {
    sender: mpsc::Sender<NormalizedUrl>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<NormalizedUrl>>,
    seen: DashSet<NormalizedUrl>,
    occupancy: AtomicUsize,
    policy: NormalizePolicy,
    max_urls: u64,
    processed: Arc<AtomicU64>,
}

impl Frontier {
    pub fn new(capacity: usize, policy: NormalizePolicy, max_urls: u64, processed: Arc<AtomicU64>) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            seen: DashSet::new(),
            occupancy: AtomicUsize::new(0),
            policy,
            max_urls,
            processed,
        }
    }

    /// Seeds the seen-set without admitting anything to the queue, for
    /// `KnownURLs`-style resume.
    pub fn mark_seen(&self, raw: &str) {
        if let Ok(normalized) = normalize(self.policy, raw) {
            self.seen.insert(normalized);
        }
    }

    fn remaining_budget(&self) -> Option<u64> {
        if self.max_urls == 0 {
            return None;
        }
        let processed = self.processed.load(Ordering::Relaxed);
        Some(self.max_urls.saturating_sub(processed))
    }

    /// Normalizes and admits each URL in `raw_urls`. Already-seen URLs are
    /// dropped silently; a full queue leaves the URL eligible for retry
    /// (it is not marked seen). The `MaxURLs` budget truncates the batch
    /// before any admission is attempted. If `cancel` fires partway through
    /// the batch, admission stops immediately and the report's `cancelled`
    /// flag is set, alongside whatever partial count was already admitted.
    pub fn enqueue(&self, raw_urls: &[impl AsRef<str>], cancel: &Cancel) -> Result<EnqueueReport, Error> {
        let mut report = EnqueueReport::default();

        let budget = match self.remaining_budget() {
            Some(0) => return Ok(report),
            Some(n) => Some(n as usize),
            None => None,
        };
        let limited: Vec<&str> = match budget {
            Some(n) => raw_urls.iter().map(AsRef::as_ref).take(n).collect(),
            None => raw_urls.iter().map(AsRef::as_ref).collect(),
        };

        for raw in limited {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let Ok(normalized) = normalize(self.policy, raw) else {
                tracing::warn!(url = raw, "invalid url, dropping from batch");
                continue;
            };

            // `insert` is DashSet's atomic test-and-set: it returns `false`
            // (and leaves the set untouched) if the value was already
            // present, so the check and the mark happen as one
            // linearizable operation instead of a separate contains+insert.
            if !self.seen.insert(normalized.clone()) {
                continue;
            }

            match self.sender.try_send(normalized.clone()) {
                Ok(()) => {
                    self.occupancy.fetch_add(1, Ordering::SeqCst);
                    report.admitted += 1;
                }
                Err(_) => {
                    // Full queue: undo the mark so the URL remains eligible
                    // for retry once capacity frees up.
                    self.seen.remove(&normalized);
                    tracing::warn!(url = %normalized, "frontier full, dropping without marking seen");
                }
            }
        }
        Ok(report)
    }

    /// Cooperatively waits for the next URL, returning `None` once the
    /// frontier is closed (all senders dropped).
    pub async fn dequeue(&self) -> Option<NormalizedUrl> {
        let mut receiver = self.receiver.lock().await;
        let next = receiver.recv().await;
        if next.is_some() {
            self.occupancy.fetch_sub(1, Ordering::SeqCst);
        }
        next
    }

    /// Current occupancy, used only by the quiescence monitor.
    pub fn len(&self) -> usize {
        self.occupancy.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
