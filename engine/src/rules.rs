//! Host-to-handler rule matching (component C2).
//!
//! One [`RuleMatcher`] implementation serves both the parser rule list and
//! the fetcher rule list — it is generic over the handler type rather than
//! being duplicated.

use crate::error::{Error, Result};
use regex::Regex;
use std::cmp::Reverse;

/// How a rule's pattern is compared against a host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Prefix,
    Suffix,
    Glob,
    Regex,
}

/// A single `{pattern, match-type, priority, handler}` registration.
pub struct RuleSpec<H> {
    pub pattern: String,
    pub match_type: MatchType,
    pub priority: i64,
    pub handler: H,
}

impl<H> RuleSpec<H> {
    pub fn new(pattern: impl Into<String>, match_type: MatchType, priority: i64, handler: H) -> Self {
        Self {
            pattern: pattern.into(),
            match_type,
            priority,
            handler,
        }
    }
}

enum Matcher {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Compiled(Regex),
}

impl Matcher {
    fn compile(pattern: &str, match_type: MatchType) -> Result<Self> {
        match match_type {
            MatchType::Exact => Ok(Matcher::Exact(pattern.to_string())),
            MatchType::Prefix => Ok(Matcher::Prefix(pattern.to_string())),
            MatchType::Suffix => Ok(Matcher::Suffix(pattern.to_string())),
            MatchType::Glob => {
                let translated = glob_to_regex(pattern);
                Regex::new(&translated)
                    .map(Matcher::Compiled)
                    .map_err(|e| Error::InvalidRulePattern(format!("{pattern}: {e}")))
            }
            MatchType::Regex => Regex::new(pattern)
                .map(Matcher::Compiled)
                .map_err(|e| Error::InvalidRulePattern(format!("{pattern}: {e}"))),
        }
    }

    fn is_match(&self, host: &str) -> bool {
        match self {
            Matcher::Exact(p) => host == p,
            Matcher::Prefix(p) => host.starts_with(p.as_str()),
            Matcher::Suffix(p) => host.ends_with(p.as_str()),
            Matcher::Compiled(re) => re.is_match(host),
        }
    }
}

/// Translate a glob pattern to an anchored regex: meta-characters are
/// escaped, then `*` becomes `.*` and `?` becomes `.`.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&ch.to_string())),
        }
    }
    out.push('$');
    out
}

struct CompiledRule<H> {
    matcher: Matcher,
    priority: i64,
    handler: H,
}

/// An ordered, precompiled rule list sorted by descending priority, with
/// ties preserving registration order.
pub struct RuleMatcher<H> {
    rules: Vec<CompiledRule<H>>,
    default: Option<H>,
}

impl<H: Clone> RuleMatcher<H> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: None,
        }
    }

    pub fn with_default(default: H) -> Self {
        Self {
            rules: Vec::new(),
            default: Some(default),
        }
    }

    /// Precompile and register rules, then resort by priority.
    ///
    /// Registration order is preserved across calls for tie-breaking, so
    /// this may be called more than once before a crawl starts.
    pub fn add_rules(&mut self, specs: impl IntoIterator<Item = RuleSpec<H>>) -> Result<()> {
        for spec in specs {
            let matcher = Matcher::compile(&spec.pattern, spec.match_type)?;
            self.rules.push(CompiledRule {
                matcher,
                priority: spec.priority,
                handler: spec.handler,
            });
        }
        // `sort_by_key` is stable, so equal priorities keep insertion order.
        self.rules.sort_by_key(|r| Reverse(r.priority));
        Ok(())
    }

    /// First match wins in priority order; falls back to the default
    /// handler (if configured) when nothing matches.
    pub fn lookup(&self, host: &str) -> Option<H> {
        for rule in &self.rules {
            if rule.matcher.is_match(host) {
                return Some(rule.handler.clone());
            }
        }
        self.default.clone()
    }
}

impl<H: Clone> Default for RuleMatcher<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_wins_on_tie_match() {
        let mut m: RuleMatcher<&'static str> = RuleMatcher::new();
        m.add_rules([
            RuleSpec::new(".com", MatchType::Suffix, 50, "low"),
            RuleSpec::new("api.", MatchType::Prefix, 100, "high"),
        ])
        .unwrap();
        assert_eq!(m.lookup("api.example.com"), Some("high"));
    }

    #[test]
    fn falls_back_to_default_when_nothing_matches() {
        let mut m: RuleMatcher<&'static str> = RuleMatcher::with_default("default");
        m.add_rules([RuleSpec::new("foo.com", MatchType::Exact, 1, "foo")])
            .unwrap();
        assert_eq!(m.lookup("bar.com"), Some("default"));
    }

    #[test]
    fn no_match_no_default_returns_none() {
        let m: RuleMatcher<&'static str> = RuleMatcher::new();
        assert_eq!(m.lookup("anything.com"), None);
    }

    #[test]
    fn glob_translates_star_and_question_mark() {
        let mut m: RuleMatcher<&'static str> = RuleMatcher::new();
        m.add_rules([RuleSpec::new("*.ex?mple.com", MatchType::Glob, 1, "glob")])
            .unwrap();
        assert_eq!(m.lookup("www.example.com"), Some("glob"));
        assert_eq!(m.lookup("example.org"), None);
    }

    #[test]
    fn regex_pattern_matches() {
        let mut m: RuleMatcher<&'static str> = RuleMatcher::new();
        m.add_rules([RuleSpec::new(r"^api\d*\.example\.com$", MatchType::Regex, 1, "re")])
            .unwrap();
        assert_eq!(m.lookup("api2.example.com"), Some("re"));
    }

    #[test]
    fn invalid_regex_is_rejected_at_registration() {
        let mut m: RuleMatcher<&'static str> = RuleMatcher::new();
        let err = m.add_rules([RuleSpec::new("(unclosed", MatchType::Regex, 1, "x")]);
        assert!(err.is_err());
    }

    #[test]
    fn ties_preserve_insertion_order() {
        let mut m: RuleMatcher<&'static str> = RuleMatcher::new();
        m.add_rules([
            RuleSpec::new("a.com", MatchType::Exact, 10, "first"),
            RuleSpec::new("a.com", MatchType::Exact, 10, "second"),
        ])
        .unwrap();
        assert_eq!(m.lookup("a.com"), Some("first"));
    }

    proptest::proptest! {
        #[test]
        fn prop_exact_matches_equivalently(host in "[a-z]{1,10}\\.[a-z]{2,4}") {
            let mut m: RuleMatcher<bool> = RuleMatcher::new();
            m.add_rules([RuleSpec::new(host.clone(), MatchType::Exact, 1, true)]).unwrap();
            let oracle = m.lookup(&host) == Some(true);
            proptest::prop_assert!(oracle);
        }
    }
}
