//! The per-URL delivery handed to the caller's callback exactly once.

use crate::error::Error;
use crate::traits::FetchResponse;
use crate::url_normalize::NormalizedUrl;

/// Named `CrawlResult` (not `Result`) to avoid shadowing `std::result::Result`.
pub struct CrawlResult<T> {
    pub url: NormalizedUrl,
    pub parsed: Option<T>,
    pub links: Vec<NormalizedUrl>,
    pub response: Option<FetchResponse>,
    pub error: Option<Error>,
}

impl<T> CrawlResult<T> {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
