//! Engine configuration (§6 option table).

use crate::rules::RuleSpec;
use crate::traits::{Cache, Fetcher, Parser, RetryOptions};
use std::sync::Arc;
use std::time::Duration;

/// Which discovered links survive follow filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowBehavior {
    Any,
    SameDomain,
    RelatedSubdomains,
    None,
}

impl Default for FollowBehavior {
    fn default() -> Self {
        FollowBehavior::SameDomain
    }
}

/// Construction-time options for [`crate::Engine`].
pub struct EngineOptions<T> {
    pub workers: usize,
    pub max_urls: u64,
    pub queue_size: usize,
    pub request_delay: Duration,
    pub follow_behavior: FollowBehavior,
    pub allow_http: bool,
    pub preserve_query_params: bool,
    pub respect_robots_txt: bool,
    pub robots_txt_user_agent: String,
    pub retry_options: Option<RetryOptions>,
    pub show_progress: bool,
    pub show_progress_interval: Duration,
    pub parser_rules: Vec<RuleSpec<Arc<dyn Parser<T>>>>,
    pub fetcher_rules: Vec<RuleSpec<Arc<dyn Fetcher>>>,
    pub default_parser: Option<Arc<dyn Parser<T>>>,
    pub default_fetcher: Option<Arc<dyn Fetcher>>,
    pub cache: Option<Arc<dyn Cache>>,
    pub known_urls: Vec<String>,
}

impl<T> Default for EngineOptions<T> {
    fn default() -> Self {
        Self {
            workers: 1,
            max_urls: 0,
            queue_size: 10_000,
            request_delay: Duration::ZERO,
            follow_behavior: FollowBehavior::default(),
            allow_http: false,
            preserve_query_params: false,
            respect_robots_txt: true,
            robots_txt_user_agent: "*".to_string(),
            retry_options: None,
            show_progress: false,
            show_progress_interval: Duration::from_secs(30),
            parser_rules: Vec::new(),
            fetcher_rules: Vec::new(),
            default_parser: None,
            default_fetcher: None,
            cache: None,
            known_urls: Vec::new(),
        }
    }
}
