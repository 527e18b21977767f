//! Retry primitive for the fetch step (§6, §9).
//!
//! Whether retries run on the calling task or via delegated timers is left
//! to the implementer by the spec; this engine runs them inline on the
//! worker task with `tokio::time::sleep`, doubling the backoff each attempt
//! up to `max_backoff`. No external retry crate appears anywhere in this
//! codebase's dependency stack, so this is hand-rolled rather than imported.

use crate::error::Error;
use crate::traits::RetryOptions;
use std::future::Future;

pub async fn with_retry<T, F, Fut>(opts: &RetryOptions, mut attempt_fn: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut backoff = opts.initial_backoff;
    let mut last_err = None;

    for attempt in 1..=opts.max_attempts.max(1) {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < opts.max_attempts {
                    if let Some(hook) = &opts.on_retry {
                        hook(attempt, &err);
                    }
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(opts.max_backoff);
                }
                last_err = Some(err);
            }
        }
    }
    Err(last_err.expect("at least one attempt runs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let opts = RetryOptions {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            on_retry: None,
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result = with_retry(&opts, move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_then_returns_last_error() {
        let opts = RetryOptions {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            on_retry: None,
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<i32, Error> = with_retry(&opts, move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Fetch(anyhow::anyhow!("boom")))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn on_retry_hook_invoked_between_attempts() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = seen.clone();
        let opts = RetryOptions {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            on_retry: Some(Arc::new(move |_attempt, _err| {
                seen2.fetch_add(1, Ordering::SeqCst);
            })),
        };
        let _: Result<i32, Error> =
            with_retry(&opts, || async { Err(Error::Fetch(anyhow::anyhow!("x"))) }).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
