use thiserror::Error;

/// Error taxonomy for the crawl engine core.
///
/// Pipeline errors (`NoFetcherConfigured`, `BlockedByRobots`, `Fetch`) are
/// delivered through [`crate::CrawlResult::error`] and never abort a crawl;
/// only [`Error::AlreadyRunning`] and [`Error::Cancelled`] are ever returned
/// directly from [`crate::Engine::crawl`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid rule pattern: {0}")]
    InvalidRulePattern(String),

    #[error("no fetcher configured for host {0}")]
    NoFetcherConfigured(String),

    #[error("blocked by robots.txt")]
    BlockedByRobots,

    #[error("fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("parse failed: {0}")]
    Parse(#[source] anyhow::Error),

    #[error("cache write failed: {0}")]
    CacheWrite(#[source] anyhow::Error),

    #[error("crawl already running")]
    AlreadyRunning,

    #[error("crawl cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
