//! Per-URL pipeline: cache -> fetch(+retry) -> parse -> link-extract ->
//! enqueue, invoking the user callback exactly once (component C7).

use crate::cancel::Cancel;
use crate::error::Error;
use crate::frontier::Frontier;
use crate::options::FollowBehavior;
use crate::result::CrawlResult;
use crate::retry::with_retry;
use crate::robots::RobotsGate;
use crate::rules::RuleMatcher;
use crate::stats::Stats;
use crate::traits::{Cache, FetchRequest, FetchResponse, Fetcher, Parser, RetryOptions};
use crate::url_normalize::{resolve_link, NormalizePolicy, NormalizedUrl};
use parking_lot::RwLock;
use std::sync::Arc;
use url::Url;

pub type Callback<T> = Arc<dyn Fn(CrawlResult<T>) + Send + Sync>;

pub struct Processor<T> {
    pub stats: Stats,
    pub normalize_policy: NormalizePolicy,
    pub fetcher_rules: Arc<RwLock<RuleMatcher<Arc<dyn Fetcher>>>>,
    pub parser_rules: Arc<RwLock<RuleMatcher<Arc<dyn Parser<T>>>>>,
    pub robots: Arc<RobotsGate>,
    pub cache: Option<Arc<dyn Cache>>,
    pub retry_options: Option<RetryOptions>,
    pub follow_behavior: FollowBehavior,
    pub frontier: Arc<Frontier>,
    pub cancel: Cancel,
}

impl<T: Send + 'static> Processor<T> {
    #[tracing::instrument(skip(self, callback), fields(url = %url))]
    pub async fn process(&self, url: NormalizedUrl, callback: &Callback<T>) {
        self.stats.incr_processed();

        let Some(host) = Url::parse(url.as_str())
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
        else {
            self.fail(url, Error::InvalidUrl("missing host".into()), callback);
            return;
        };

        let cached = match &self.cache {
            Some(cache) => match cache.get(url.as_str()).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "cache read failed");
                    None
                }
            },
            None => None,
        };

        let fetcher = { self.fetcher_rules.read().lookup(&host) };
        let Some(fetcher) = fetcher else {
            self.fail(url, Error::NoFetcherConfigured(host), callback);
            return;
        };

        if !self.robots.is_allowed(url.as_str()).await {
            self.fail(url, Error::BlockedByRobots, callback);
            return;
        }

        let response = match cached {
            Some(bytes) => FetchResponse {
                url: url.to_string(),
                html: String::from_utf8_lossy(&bytes).into_owned(),
                status_code: 200,
                links: Vec::new(),
            },
            None => match self.fetch(&fetcher, &url).await {
                Ok(resp) => {
                    self.write_through_cache(&url, &resp).await;
                    resp
                }
                Err(e) => {
                    self.fail(url, e, callback);
                    return;
                }
            },
        };

        let parser = { self.parser_rules.read().lookup(&host) };
        let (parsed, parse_error) = match parser {
            Some(parser) => match parser.parse(&response).await {
                Ok(v) => (Some(v), None),
                Err(e) => (None, Some(e)),
            },
            None => (None, None),
        };

        let mut links: Vec<NormalizedUrl> = response
            .links
            .iter()
            .filter_map(|l| resolve_link(self.normalize_policy, url.as_str(), &l.url))
            .collect();
        links.sort();
        links.dedup();

        self.stats.incr_succeeded();
        let survivors: Vec<String> = links
            .iter()
            .filter(|link| passes_follow(self.follow_behavior, &host, link))
            .map(ToString::to_string)
            .collect();

        callback(CrawlResult {
            url,
            parsed,
            links,
            response: Some(response),
            error: parse_error,
        });

        if !survivors.is_empty() {
            if let Err(e) = self.frontier.enqueue(&survivors, &self.cancel) {
                tracing::warn!(error = %e, "failed to enqueue discovered links");
            }
        }
    }

    async fn fetch(
        &self,
        fetcher: &Arc<dyn Fetcher>,
        url: &NormalizedUrl,
    ) -> Result<FetchResponse, Error> {
        let request = FetchRequest::new(url.to_string());
        match &self.retry_options {
            Some(opts) => with_retry(opts, || fetcher.fetch(&request)).await,
            None => fetcher.fetch(&request).await,
        }
    }

    async fn write_through_cache(&self, url: &NormalizedUrl, response: &FetchResponse) {
        let Some(cache) = &self.cache else { return };
        if response.html.is_empty() {
            return;
        }
        if let Err(e) = cache.set(url.as_str(), response.html.as_bytes()).await {
            tracing::warn!(error = %e, "cache write failed");
        }
    }

    fn fail(&self, url: NormalizedUrl, error: Error, callback: &Callback<T>) {
        self.stats.incr_failed();
        callback(CrawlResult {
            url,
            parsed: None,
            links: Vec::new(),
            response: None,
            error: Some(error),
        });
    }
}

fn base_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 1 {
        host.to_lowercase()
    } else {
        format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]).to_lowercase()
    }
}

fn passes_follow(behavior: FollowBehavior, page_host: &str, link: &NormalizedUrl) -> bool {
    match behavior {
        FollowBehavior::None => false,
        FollowBehavior::Any => true,
        FollowBehavior::SameDomain => link
            .host()
            .map(|h| h.eq_ignore_ascii_case(page_host))
            .unwrap_or(false),
        FollowBehavior::RelatedSubdomains => link
            .host()
            .map(|h| base_domain(&h) == base_domain(page_host))
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url_normalize::normalize;

    fn policy() -> NormalizePolicy {
        NormalizePolicy {
            allow_http: false,
            preserve_query_params: false,
        }
    }

    fn url(raw: &str) -> NormalizedUrl {
        normalize(policy(), raw).unwrap()
    }

    #[test]
    fn same_domain_is_case_insensitive_exact_match() {
        assert!(passes_follow(
            FollowBehavior::SameDomain,
            "Example.com",
            &url("https://example.COM/page")
        ));
        assert!(!passes_follow(
            FollowBehavior::SameDomain,
            "example.com",
            &url("https://other.com/page")
        ));
    }

    #[test]
    fn related_subdomains_matches_last_two_labels() {
        assert!(passes_follow(
            FollowBehavior::RelatedSubdomains,
            "www.example.com",
            &url("https://blog.example.com/post")
        ));
        assert!(!passes_follow(
            FollowBehavior::RelatedSubdomains,
            "www.example.com",
            &url("https://example.org/post")
        ));
    }

    #[test]
    fn none_rejects_everything_any_accepts_everything() {
        let link = url("https://anywhere.example/page");
        assert!(!passes_follow(FollowBehavior::None, "example.com", &link));
        assert!(passes_follow(FollowBehavior::Any, "example.com", &link));
    }
}
