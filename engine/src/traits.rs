//! External collaborator contracts consumed by the core (§6).
//!
//! The engine owns no HTTP client, no HTML parser, and no cache backend —
//! callers supply implementations of these traits. `async_trait` is used so
//! they remain dyn-safe (`Arc<dyn Fetcher>`, `Arc<dyn Parser<Output = ...>>`),
//! since the rule matcher stores heterogeneous handler objects behind a
//! single type parameter.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A single outgoing link discovered on a fetched page. `url` may be
/// relative; resolution against the page URL happens in the page
/// processor, not here.
#[derive(Debug, Clone)]
pub struct Link {
    pub url: String,
}

/// What a [`Fetcher`] is asked to retrieve.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// What a [`Fetcher`] returns.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub html: String,
    pub status_code: u16,
    pub links: Vec<Link>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

#[async_trait]
pub trait Parser<T>: Send + Sync {
    async fn parse(&self, response: &FetchResponse) -> Result<T>;
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// `{MaxAttempts, InitialBackoff, MaxBackoff}` plus an optional notification
/// hook, invoked before each retry sleep with the attempt number (1-based)
/// and the error that triggered the retry.
#[derive(Clone)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub on_retry: Option<std::sync::Arc<dyn Fn(u32, &crate::error::Error) + Send + Sync>>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            on_retry: None,
        }
    }
}

impl std::fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}
