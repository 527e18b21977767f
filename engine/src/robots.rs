//! robots.txt compliance cache (component C3).

use crate::rules::RuleMatcher;
use crate::traits::{FetchRequest, Fetcher};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

pub type FetcherRules = Arc<RwLock<RuleMatcher<Arc<dyn Fetcher>>>>;

const TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct RobotsEntry {
    allow_rules: Vec<String>,
    disallow_rules: Vec<String>,
    crawl_delay: Option<Duration>,
    fetched_at: Instant,
}

impl RobotsEntry {
    fn permissive() -> Self {
        Self {
            allow_rules: Vec::new(),
            disallow_rules: Vec::new(),
            crawl_delay: None,
            fetched_at: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.fetched_at.elapsed() >= TTL
    }

    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
    }
}

struct Group {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

impl Group {
    fn new() -> Self {
        Self {
            agents: Vec::new(),
            allow: Vec::new(),
            disallow: Vec::new(),
            crawl_delay: None,
        }
    }
}

/// Line-oriented robots.txt parser: directives are matched
/// case-insensitively, `#` begins a comment, and groups are associated with
/// the most recently opened run of `User-agent` lines.
fn parse_groups(txt: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut awaiting_agents = true;

    for raw_line in txt.lines() {
        let line = match raw_line.find('#') {
            Some(idx) => &raw_line[..idx],
            None => raw_line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, val)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let val = val.trim();

        match key.as_str() {
            "user-agent" => {
                if groups.is_empty() || !awaiting_agents {
                    groups.push(Group::new());
                    awaiting_agents = true;
                }
                groups.last_mut().unwrap().agents.push(val.to_lowercase());
            }
            "allow" => {
                if !val.is_empty() {
                    if let Some(g) = groups.last_mut() {
                        g.allow.push(val.to_string());
                        awaiting_agents = false;
                    }
                }
            }
            "disallow" => {
                if !val.is_empty() {
                    if let Some(g) = groups.last_mut() {
                        g.disallow.push(val.to_string());
                        awaiting_agents = false;
                    }
                }
            }
            "crawl-delay" => {
                if let Some(g) = groups.last_mut() {
                    if let Ok(n) = val.parse::<f64>() {
                        g.crawl_delay = Some(n);
                        awaiting_agents = false;
                    }
                }
            }
            _ => {}
        }
    }
    groups
}

fn select_group<'a>(groups: &'a [Group], user_agent: &str) -> Option<&'a Group> {
    let ua_lower = user_agent.to_lowercase();
    groups
        .iter()
        .find(|g| {
            g.agents
                .iter()
                .any(|a| a != "*" && (ua_lower == *a || ua_lower.contains(a.as_str())))
        })
        .or_else(|| groups.iter().find(|g| g.agents.iter().any(|a| a == "*")))
}

pub fn parse_robots(txt: &str, user_agent: &str) -> RobotsEntry {
    let groups = parse_groups(txt);
    match select_group(&groups, user_agent) {
        Some(g) => RobotsEntry {
            allow_rules: g.allow.clone(),
            disallow_rules: g.disallow.clone(),
            crawl_delay: g.crawl_delay.map(Duration::from_secs_f64),
            fetched_at: Instant::now(),
        },
        None => RobotsEntry::permissive(),
    }
}

/// A rule containing `*` is split into an ordered sequence of literal
/// substrings that must occur in order; a trailing `$` anchors the final
/// substring to the end of the path. Without `*` it is a plain prefix
/// match (or, when anchored, an exact match). An empty rule matches
/// nothing (callers already filter those out at parse time, but this stays
/// defensive).
fn rule_matches(path: &str, rule: &str) -> bool {
    if rule.is_empty() {
        return false;
    }
    let anchored = rule.ends_with('$');
    let body = if anchored { &rule[..rule.len() - 1] } else { rule };

    if !body.contains('*') {
        return if anchored {
            path == body
        } else {
            path.starts_with(body)
        };
    }

    let segments: Vec<&str> = body.split('*').collect();
    let mut rest = path;
    if !rest.starts_with(segments[0]) {
        return false;
    }
    rest = &rest[segments[0].len()..];

    for (i, seg) in segments.iter().enumerate().skip(1) {
        let is_last = i == segments.len() - 1;
        if is_last && anchored {
            return rest.ends_with(seg);
        }
        if seg.is_empty() {
            continue;
        }
        match rest.find(seg) {
            Some(idx) => rest = &rest[idx + seg.len()..],
            None => return false,
        }
    }
    true
}

/// Allow rules are checked first: if any matches, permit. Otherwise permit
/// unless a disallow rule matches.
pub(crate) fn path_allowed(path: &str, entry: &RobotsEntry) -> bool {
    if entry.allow_rules.iter().any(|r| rule_matches(path, r)) {
        return true;
    }
    !entry.disallow_rules.iter().any(|r| rule_matches(path, r))
}

/// Fetches, parses, caches, and evaluates robots.txt per host.
pub struct RobotsGate {
    enabled: bool,
    user_agent: String,
    cache: DashMap<String, RobotsEntry>,
    fetchers: FetcherRules,
}

impl RobotsGate {
    pub fn new(enabled: bool, user_agent: impl Into<String>, fetchers: FetcherRules) -> Self {
        Self {
            enabled,
            user_agent: user_agent.into(),
            cache: DashMap::new(),
            fetchers,
        }
    }

    pub async fn is_allowed(&self, url: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        let Some(host) = parsed.host_str() else {
            return true;
        };
        let origin = format!("{}://{}", parsed.scheme(), host);

        let needs_fetch = match self.cache.get(&origin) {
            Some(entry) => entry.expired(),
            None => true,
        };
        if needs_fetch {
            let entry = self.fetch_and_parse(&origin, host).await;
            self.cache.insert(origin.clone(), entry);
        }

        let mut path = parsed.path().to_string();
        if let Some(q) = parsed.query() {
            path.push('?');
            path.push_str(q);
        }
        self.cache
            .get(&origin)
            .map(|entry| path_allowed(&path, &entry))
            .unwrap_or(true)
    }

    pub fn crawl_delay(&self, url: &str) -> Option<Duration> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        let origin = format!("{}://{}", parsed.scheme(), host);
        self.cache.get(&origin).and_then(|e| e.crawl_delay())
    }

    async fn fetch_and_parse(&self, origin: &str, host: &str) -> RobotsEntry {
        let fetcher = { self.fetchers.read().lookup(host) };
        let Some(fetcher) = fetcher else {
            return RobotsEntry::permissive();
        };
        let request = FetchRequest::new(format!("{origin}/robots.txt"));
        match fetcher.fetch(&request).await {
            Ok(response) => parse_robots(&response.html, &self.user_agent),
            Err(_) => RobotsEntry::permissive(),
        }
    }
}
