/*!
Crate `crawlcore` is a concurrent, polite, rule-driven web crawl engine.

It owns the parts of a crawler where the real engineering lives: a bounded
frontier with at-most-once admission, host-to-handler rule dispatch for
fetchers and parsers, a robots.txt compliance cache, a fixed-size worker
pool, and a quiescence monitor that stops the crawl once there is nothing
left to do. It deliberately owns no HTTP client and no HTML parser — those
are supplied by the caller through the [`Fetcher`] and [`Parser`] traits.

# Overview of usage

Construct an [`Engine`] from [`EngineOptions`], register fetcher/parser
rules (or a default handler), then call [`Engine::crawl`] with a set of
seed URLs and a callback invoked once per processed URL:

```ignore
let mut options: EngineOptions<()> = EngineOptions::default();
options.default_fetcher = Some(my_fetcher);
let engine = Engine::new(options)?;
engine.crawl(&["https://example.com"], Arc::new(|result| {
    println!("{}", result.url);
})).await?;
```

`crawl` returns once the frontier drains and every worker has exited, or
immediately with [`Error::Cancelled`] if [`Engine::stop`] was called first.
*/

mod cancel;
mod engine;
mod error;
mod frontier;
mod options;
mod processor;
mod quiescence;
mod result;
mod retry;
mod robots;
mod rules;
mod stats;
mod traits;
mod url_normalize;

pub use cancel::Cancel;
pub use engine::Engine;
pub use error::{Error, Result};
pub use frontier::{EnqueueReport, Frontier};
pub use options::{EngineOptions, FollowBehavior};
pub use processor::Callback;
pub use result::CrawlResult;
pub use retry::with_retry;
pub use robots::{FetcherRules, RobotsGate};
pub use rules::{MatchType, RuleMatcher, RuleSpec};
pub use stats::{Stats, StatsSnapshot};
pub use traits::{Cache, FetchRequest, FetchResponse, Fetcher, Link, Parser, RetryOptions};
pub use url_normalize::{normalize, resolve_link, NormalizePolicy, NormalizedUrl};
