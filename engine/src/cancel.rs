//! A small hand-rolled cancellation token (§5, §9).
//!
//! No dedicated cancellation-token crate appears anywhere in this
//! codebase's dependency stack, and the contract is small: trip once
//! (idempotent), check cheaply on every dequeue and between I/O-bound
//! pipeline stages, and wake any tasks already waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct Cancel(Arc<Inner>);

#[derive(Default)]
struct Inner {
    tripped: AtomicBool,
    notify: Notify,
}

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.tripped.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.tripped.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already cancelled, otherwise waits.
    ///
    /// The `Notified` future is created before the flag check (rather than
    /// after) so a `cancel()` racing with this call is never missed —
    /// `notify_waiters` only wakes futures that exist at the time it runs.
    pub async fn cancelled(&self) {
        let notified = self.0.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
