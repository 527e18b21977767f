use async_trait::async_trait;
use crawlcore::{
    Engine, EngineOptions, Error, FetchRequest, FetchResponse, Fetcher, FollowBehavior, Link,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serves canned HTML (and, for `/robots.txt` paths, canned robots rules)
/// from a fixed URL-to-response map. Any URL not in the map returns an
/// empty, link-free page.
struct MapFetcher {
    pages: HashMap<String, Vec<&'static str>>,
    robots: HashMap<String, &'static str>,
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        if request.url.ends_with("/robots.txt") {
            let origin = request.url.trim_end_matches("/robots.txt");
            let body = self.robots.get(origin).copied().unwrap_or("");
            return Ok(FetchResponse {
                url: request.url.clone(),
                html: body.to_string(),
                status_code: 200,
                links: Vec::new(),
            });
        }
        let links = self
            .pages
            .get(&request.url)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|l| Link { url: l.to_string() })
            .collect();
        Ok(FetchResponse {
            url: request.url.clone(),
            html: String::new(),
            status_code: 200,
            links,
        })
    }
}

fn collecting_callback<T: Send + 'static>() -> (crawlcore::Callback<T>, Arc<Mutex<Vec<crawlcore::CrawlResult<T>>>>)
{
    let results = Arc::new(Mutex::new(Vec::new()));
    let results2 = results.clone();
    let callback: crawlcore::Callback<T> = Arc::new(move |r| {
        results2.lock().unwrap().push(r);
    });
    (callback, results)
}

#[tokio::test]
async fn basic_crawl_follows_same_domain_only() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com".to_string(),
        vec!["/about", "/products", "/contact", "https://external.com"],
    );

    let mut options: EngineOptions<()> = EngineOptions::default();
    options.workers = 1;
    options.max_urls = 10;
    options.follow_behavior = FollowBehavior::SameDomain;
    options.default_fetcher = Some(Arc::new(MapFetcher {
        pages,
        robots: HashMap::new(),
    }));
    options.respect_robots_txt = false;

    let engine = Engine::new(options).unwrap();
    let (callback, results) = collecting_callback::<()>();
    engine
        .crawl(&["https://example.com"], callback)
        .await
        .unwrap();

    let urls: Vec<String> = results
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.url.to_string())
        .collect();
    assert!(urls.contains(&"https://example.com".to_string()));
    assert!(urls.contains(&"https://example.com/about".to_string()));
    assert!(urls.contains(&"https://example.com/products".to_string()));
    assert!(urls.contains(&"https://example.com/contact".to_string()));
    assert!(!urls.iter().any(|u| u.contains("external.com")));

    let snap = engine.stats();
    assert_eq!(snap.processed, 4);
    assert_eq!(snap.failed, 0);
}

#[tokio::test]
async fn max_urls_budget_is_enforced() {
    let mut options: EngineOptions<()> = EngineOptions::default();
    options.workers = 2;
    options.max_urls = 3;
    options.respect_robots_txt = false;
    options.default_fetcher = Some(Arc::new(MapFetcher {
        pages: HashMap::new(),
        robots: HashMap::new(),
    }));

    let engine = Engine::new(options).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = calls.clone();
    let callback: crawlcore::Callback<()> = Arc::new(move |_| {
        calls2.fetch_add(1, Ordering::SeqCst);
    });

    let seeds = [
        "https://a.example",
        "https://b.example",
        "https://c.example",
        "https://d.example",
        "https://e.example",
    ];
    engine.crawl(&seeds, callback).await.unwrap();

    assert!(engine.stats().processed <= 3);
    assert!(calls.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn http_seed_is_upgraded_to_https() {
    let mut options: EngineOptions<()> = EngineOptions::default();
    options.workers = 1;
    options.respect_robots_txt = false;
    options.default_fetcher = Some(Arc::new(MapFetcher {
        pages: HashMap::new(),
        robots: HashMap::new(),
    }));

    let engine = Engine::new(options).unwrap();
    let (callback, results) = collecting_callback::<()>();
    engine
        .crawl(&["http://example.com"], callback)
        .await
        .unwrap();

    let urls: Vec<String> = results
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.url.to_string())
        .collect();
    assert_eq!(urls, vec!["https://example.com".to_string()]);
}

#[tokio::test]
async fn query_params_are_stripped_by_default() {
    let mut options: EngineOptions<()> = EngineOptions::default();
    options.workers = 1;
    options.respect_robots_txt = false;
    options.default_fetcher = Some(Arc::new(MapFetcher {
        pages: HashMap::new(),
        robots: HashMap::new(),
    }));

    let engine = Engine::new(options).unwrap();
    let (callback, results) = collecting_callback::<()>();
    engine
        .crawl(&["https://example.com/page?id=123&page=2"], callback)
        .await
        .unwrap();

    let urls: Vec<String> = results
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.url.to_string())
        .collect();
    assert_eq!(urls, vec!["https://example.com/page".to_string()]);
}

#[tokio::test]
async fn robots_disallow_surfaces_as_failed_result() {
    let mut robots = HashMap::new();
    robots.insert(
        "https://example.com".to_string(),
        "User-agent: *\nDisallow: /blocked\nAllow: /allowed\n",
    );

    let mut options: EngineOptions<()> = EngineOptions::default();
    options.workers = 1;
    options.respect_robots_txt = true;
    options.default_fetcher = Some(Arc::new(MapFetcher {
        pages: HashMap::new(),
        robots,
    }));

    let engine = Engine::new(options).unwrap();
    let (callback, results) = collecting_callback::<()>();
    engine
        .crawl(
            &["https://example.com/allowed", "https://example.com/blocked"],
            callback,
        )
        .await
        .unwrap();

    let results = results.lock().unwrap();
    assert_eq!(results.len(), 2);
    let blocked = results
        .iter()
        .find(|r| r.url.as_str() == "https://example.com/blocked")
        .unwrap();
    assert!(matches!(blocked.error, Some(Error::BlockedByRobots)));
    let allowed = results
        .iter()
        .find(|r| r.url.as_str() == "https://example.com/allowed")
        .unwrap();
    assert!(allowed.is_success());

    let snap = engine.stats();
    assert_eq!(snap.succeeded, 1);
    assert_eq!(snap.failed, 1);
}

#[tokio::test]
async fn graceful_quiescence_on_leaf_seed() {
    let mut options: EngineOptions<()> = EngineOptions::default();
    options.workers = 4;
    options.respect_robots_txt = false;
    options.default_fetcher = Some(Arc::new(MapFetcher {
        pages: HashMap::new(),
        robots: HashMap::new(),
    }));

    let engine = Engine::new(options).unwrap();
    let (callback, _results) = collecting_callback::<()>();
    let outcome = engine.crawl(&["https://example.com"], callback).await;

    assert!(outcome.is_ok());
    assert_eq!(engine.stats().processed, 1);
}
