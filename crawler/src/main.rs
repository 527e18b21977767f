use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::Parser as ClapParser;
use crawlcore::{
    Engine, EngineOptions, FetchRequest, FetchResponse, Fetcher, FollowBehavior, Link, Parser,
    RetryOptions,
};
use reqwest::{header, Client};
use scraper::{Html, Selector};
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(ClapParser, Debug)]
#[command(name = "crawlcli")]
#[command(about = "Crawl the web to JSONL, respecting robots.txt")]
struct Cli {
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: String,
    /// Output JSONL file path
    #[arg(long, default_value = "./sample_data/crawl.jsonl")]
    output: String,
    /// Hard cap on total processed URLs (0 = unbounded)
    #[arg(long, default_value_t = 100_000)]
    max_urls: u64,
    /// Number of worker tasks
    #[arg(long, default_value_t = 16)]
    workers: usize,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string used for robots.txt and page fetches
    #[arg(long, default_value = "crawlcli/0.1 (+https://example.com/bot)")]
    user_agent: String,
    /// If true, only follow links that stay on the seed's domain
    #[arg(long, default_value_t = true)]
    same_host_only: bool,
    /// Number of fetch attempts per URL before giving up
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,
}

#[derive(Debug, Clone)]
struct ParsedDoc {
    title: String,
    body: String,
}

#[derive(Serialize)]
struct OutDoc<'a> {
    id: String,
    title: &'a str,
    body: &'a str,
    url: &'a str,
    timestamp: String,
}

/// Fetches pages over HTTP and extracts outgoing links, in the spirit of
/// the teacher's inline `reqwest` + `scraper` handling — but collecting
/// links rather than resolving them, since resolution is the engine's job.
struct ReqwestFetcher {
    client: Client,
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &FetchRequest) -> crawlcore::Result<FetchResponse> {
        let resp = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| crawlcore::Error::Fetch(e.into()))?;

        if !resp.status().is_success() {
            return Err(crawlcore::Error::Fetch(anyhow!(
                "status {}",
                resp.status()
            )));
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            if let Ok(v) = ct.to_str() {
                if !v.starts_with("text/html") {
                    return Ok(FetchResponse {
                        url: request.url.clone(),
                        html: String::new(),
                        status_code: resp.status().as_u16(),
                        links: Vec::new(),
                    });
                }
            }
        }

        let status_code = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| crawlcore::Error::Fetch(e.into()))?;
        if bytes.len() > 2 * 1024 * 1024 {
            return Ok(FetchResponse {
                url: request.url.clone(),
                html: String::new(),
                status_code,
                links: Vec::new(),
            });
        }
        let html = String::from_utf8_lossy(&bytes).into_owned();

        let doc = Html::parse_document(&html);
        let sel_a = Selector::parse("a").expect("static selector");
        let links = doc
            .select(&sel_a)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| Link {
                url: href.to_string(),
            })
            .collect();

        Ok(FetchResponse {
            url: request.url.clone(),
            html,
            status_code,
            links,
        })
    }
}

/// Extracts `<title>` and `<body>` text, matching the teacher's extraction
/// shape (`OutDoc { title, body, url, timestamp }`).
struct ScraperParser;

#[async_trait]
impl Parser<ParsedDoc> for ScraperParser {
    async fn parse(&self, response: &FetchResponse) -> crawlcore::Result<ParsedDoc> {
        let doc = Html::parse_document(&response.html);
        let sel_title = Selector::parse("title").expect("static selector");
        let sel_body = Selector::parse("body").expect("static selector");
        let title = doc
            .select(&sel_title)
            .next()
            .map(|n| n.text().collect::<String>())
            .unwrap_or_default();
        let body = doc
            .select(&sel_body)
            .next()
            .map(|n| n.text().collect::<String>())
            .unwrap_or_default();
        Ok(ParsedDoc {
            title: title.trim().to_string(),
            body: body.trim().to_string(),
        })
    }
}

fn load_seeds(path: &str) -> Result<Vec<String>> {
    let mut seeds = Vec::new();
    for line in BufReader::new(File::open(path).context("opening seeds file")?).lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        seeds.push(s);
    }
    Ok(seeds)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Cli::parse();
    if let Some(dir) = std::path::Path::new(&args.output).parent() {
        fs::create_dir_all(dir).ok();
    }

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let seeds = load_seeds(&args.seeds)?;
    if seeds.is_empty() {
        return Err(anyhow!("no valid seeds"));
    }
    tracing::info!(
        seeds = seeds.len(),
        max_urls = args.max_urls,
        workers = args.workers,
        same_host_only = args.same_host_only,
        output = %args.output,
        "crawlcli starting"
    );

    let out = Arc::new(Mutex::new(BufWriter::new(File::create(&args.output)?)));

    let mut options: EngineOptions<ParsedDoc> = EngineOptions::default();
    options.workers = args.workers.max(1);
    options.max_urls = args.max_urls;
    options.follow_behavior = if args.same_host_only {
        FollowBehavior::SameDomain
    } else {
        FollowBehavior::Any
    };
    options.robots_txt_user_agent = args.user_agent.clone();
    options.default_fetcher = Some(Arc::new(ReqwestFetcher {
        client: client.clone(),
    }));
    options.default_parser = Some(Arc::new(ScraperParser));
    options.retry_options = Some(RetryOptions {
        max_attempts: args.max_attempts,
        ..RetryOptions::default()
    });
    options.show_progress = true;

    let engine = Engine::new(options)?;

    let out_cb = out.clone();
    let callback: crawlcore::Callback<ParsedDoc> = Arc::new(move |result| {
        let Some(parsed) = result.parsed.as_ref() else {
            if let Some(err) = &result.error {
                tracing::warn!(url = %result.url, error = %err, "page skipped");
            }
            return;
        };
        let mut hasher = Sha1::new();
        hasher.update(result.url.as_str().as_bytes());
        let id = format!("{:x}", hasher.finalize());
        let ts = time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let rec = OutDoc {
            id,
            title: &parsed.title,
            body: &parsed.body,
            url: result.url.as_str(),
            timestamp: ts,
        };
        let mut writer = out_cb.lock().unwrap();
        if serde_json::to_writer(&mut *writer, &rec).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    });

    engine.crawl(&seeds, callback).await?;

    out.lock().unwrap().flush()?;
    let snap = engine.stats();
    tracing::info!(
        processed = snap.processed,
        succeeded = snap.succeeded,
        failed = snap.failed,
        output = %args.output,
        "crawlcli done"
    );
    Ok(())
}
