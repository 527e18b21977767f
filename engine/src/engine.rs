//! Public façade: construction, rule registration, crawl/stop, stats (component C9),
//! plus the worker pool loop (component C6).

use crate::cancel::Cancel;
use crate::error::{Error, Result};
use crate::frontier::Frontier;
use crate::options::{EngineOptions, FollowBehavior};
use crate::processor::{Callback, Processor};
use crate::robots::{FetcherRules, RobotsGate};
use crate::rules::{RuleMatcher, RuleSpec};
use crate::stats::{Stats, StatsSnapshot};
use crate::traits::{Cache, Fetcher, Parser, RetryOptions};
use crate::url_normalize::NormalizePolicy;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

type ParserRules<T> = Arc<RwLock<RuleMatcher<Arc<dyn Parser<T>>>>>;

/// The crawl engine: owns the rule lists, robots cache, and stats for one
/// or more sequential `crawl` calls. Not reentrant — a second `crawl` call
/// while one is in flight is rejected with [`Error::AlreadyRunning`].
pub struct Engine<T> {
    workers: usize,
    max_urls: u64,
    queue_size: usize,
    request_delay: Duration,
    follow_behavior: FollowBehavior,
    normalize_policy: NormalizePolicy,
    retry_options: Option<RetryOptions>,
    show_progress: bool,
    show_progress_interval: Duration,
    known_urls: Vec<String>,
    cache: Option<Arc<dyn Cache>>,
    fetcher_rules: FetcherRules,
    parser_rules: ParserRules<T>,
    robots: Arc<RobotsGate>,
    stats: Stats,
    running: AtomicBool,
    current_cancel: parking_lot::Mutex<Option<Cancel>>,
}

impl<T: Send + 'static> Engine<T> {
    /// Validates and applies defaults (already done by [`EngineOptions::default`]
    /// for fields the caller omits), compiles both rule lists, and sorts them
    /// by priority. Fails on the first rule-compilation error.
    pub fn new(options: EngineOptions<T>) -> Result<Self> {
        if options.workers == 0 {
            return Err(Error::InvalidRulePattern("Workers must be >= 1".into()));
        }

        let mut fetcher_matcher = match options.default_fetcher {
            Some(d) => RuleMatcher::with_default(d),
            None => RuleMatcher::new(),
        };
        fetcher_matcher.add_rules(options.fetcher_rules)?;

        let mut parser_matcher = match options.default_parser {
            Some(d) => RuleMatcher::with_default(d),
            None => RuleMatcher::new(),
        };
        parser_matcher.add_rules(options.parser_rules)?;

        let fetcher_rules: FetcherRules = Arc::new(RwLock::new(fetcher_matcher));
        let robots = Arc::new(RobotsGate::new(
            options.respect_robots_txt,
            options.robots_txt_user_agent,
            fetcher_rules.clone(),
        ));

        Ok(Self {
            workers: options.workers,
            max_urls: options.max_urls,
            queue_size: options.queue_size,
            request_delay: options.request_delay,
            follow_behavior: options.follow_behavior,
            normalize_policy: NormalizePolicy {
                allow_http: options.allow_http,
                preserve_query_params: options.preserve_query_params,
            },
            retry_options: options.retry_options,
            show_progress: options.show_progress,
            show_progress_interval: options.show_progress_interval,
            known_urls: options.known_urls,
            cache: options.cache,
            fetcher_rules,
            parser_rules: Arc::new(RwLock::new(parser_matcher)),
            robots,
            stats: Stats::new(),
            running: AtomicBool::new(false),
            current_cancel: parking_lot::Mutex::new(None),
        })
    }

    /// Callable before `crawl`; behavior while a crawl is in flight is undefined.
    pub fn add_fetcher_rules(&self, specs: impl IntoIterator<Item = RuleSpec<Arc<dyn Fetcher>>>) -> Result<()> {
        self.fetcher_rules.write().add_rules(specs)
    }

    /// Callable before `crawl`; behavior while a crawl is in flight is undefined.
    pub fn add_parser_rules(&self, specs: impl IntoIterator<Item = RuleSpec<Arc<dyn Parser<T>>>>) -> Result<()> {
        self.parser_rules.write().add_rules(specs)
    }

    /// Trips the current crawl's cancellation token, if any. Safe to call
    /// multiple times and before/after `crawl`.
    pub fn stop(&self) {
        if let Some(cancel) = self.current_cancel.lock().as_ref() {
            cancel.cancel();
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Runs one crawl to completion: enqueues `seeds`, spawns the worker
    /// pool and quiescence monitor, and blocks until every worker exits.
    /// Returns `Ok(())` on graceful quiescence, `Err(Error::Cancelled)` if
    /// `stop()` was called before the frontier went quiet on its own.
    pub async fn crawl(&self, seeds: &[impl AsRef<str>], callback: Callback<T>) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }
        let outcome = self.run_crawl(seeds, callback).await;
        self.running.store(false, Ordering::SeqCst);
        *self.current_cancel.lock() = None;
        outcome
    }

    async fn run_crawl(&self, seeds: &[impl AsRef<str>], callback: Callback<T>) -> Result<()> {
        let cancel = Cancel::new();
        *self.current_cancel.lock() = Some(cancel.clone());

        let frontier = Arc::new(Frontier::new(
            self.queue_size,
            self.normalize_policy,
            self.max_urls,
            self.stats.processed_handle(),
        ));
        for known in &self.known_urls {
            frontier.mark_seen(known);
        }

        let report = frontier.enqueue(seeds, &cancel)?;
        if report.cancelled {
            return Err(Error::Cancelled);
        }
        if report.admitted == 0 {
            return Ok(());
        }

        let processor = Arc::new(Processor {
            stats: self.stats.clone(),
            normalize_policy: self.normalize_policy,
            fetcher_rules: self.fetcher_rules.clone(),
            parser_rules: self.parser_rules.clone(),
            robots: self.robots.clone(),
            cache: self.cache.clone(),
            retry_options: self.retry_options.clone(),
            follow_behavior: self.follow_behavior,
            frontier: frontier.clone(),
            cancel: cancel.clone(),
        });

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            handles.push(tokio::spawn(worker_loop(
                processor.clone(),
                frontier.clone(),
                cancel.clone(),
                self.request_delay,
                callback.clone(),
            )));
        }

        let quiescence = tokio::spawn(crate::quiescence::run(
            self.stats.clone(),
            frontier.clone(),
            cancel.clone(),
        ));

        let progress = self.show_progress.then(|| {
            tokio::spawn(progress_loop(
                self.stats.clone(),
                cancel.clone(),
                self.show_progress_interval,
            ))
        });

        for handle in handles {
            let _ = handle.await;
        }
        let _ = quiescence.await;
        if let Some(p) = progress {
            let _ = p.await;
        }

        if cancel.is_cancelled() && !frontier.is_empty() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

async fn worker_loop<T: Send + 'static>(
    processor: Arc<Processor<T>>,
    frontier: Arc<Frontier>,
    cancel: Cancel,
    request_delay: Duration,
    callback: Callback<T>,
) {
    loop {
        let url = tokio::select! {
            _ = cancel.cancelled() => return,
            next = frontier.dequeue() => match next {
                Some(url) => url,
                None => return,
            },
        };

        processor.stats.incr_active_workers();
        processor.process(url, &callback).await;
        processor.stats.decr_active_workers();

        if !request_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(request_delay) => {}
            }
        }
    }
}

async fn progress_loop(stats: Stats, cancel: Cancel, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick fires immediately; skip it
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let snap = stats.snapshot();
                tracing::info!(
                    processed = snap.processed,
                    succeeded = snap.succeeded,
                    failed = snap.failed,
                    active_workers = snap.active_workers,
                    "crawl progress"
                );
            }
        }
    }
}
