//! URL canonicalization and relative-link resolution (component C1).
//!
//! A single canonical string form doubles as the frontier dedup key and the
//! robots-lookup key, so normalization and link resolution share the same
//! [`NormalizePolicy`] rather than living in separate modules.

use crate::error::{Error, Result};
use std::fmt;
use std::ops::Deref;
use url::Url;

/// The canonical string form of a URL, used as the dedup key everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.0).ok()?.host_str().map(str::to_owned)
    }
}

impl Deref for NormalizedUrl {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NormalizedUrl> for String {
    fn from(u: NormalizedUrl) -> String {
        u.0
    }
}

/// Policy flags shared by [`normalize`] and [`resolve_link`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizePolicy {
    pub allow_http: bool,
    pub preserve_query_params: bool,
}

/// Canonicalize a raw URL string.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)` for any input that
/// normalizes successfully.
pub fn normalize(policy: NormalizePolicy, raw: &str) -> Result<NormalizedUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty input".into()));
    }

    let mut url = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => Url::parse(&format!("https://{trimmed}"))
            .map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.scheme() == "http" && !policy.allow_http {
        let _ = url.set_scheme("https");
    }
    url.set_fragment(None);
    if !policy.preserve_query_params {
        url.set_query(None);
    }

    Ok(NormalizedUrl(strip_trailing_slash(url.as_str())))
}

/// Resolve `href` (absolute or relative) against `base`, then normalize.
///
/// Returns `None` on any parse failure or on an unsupported scheme — callers
/// should treat that as "drop this link", not an error.
pub fn resolve_link(policy: NormalizePolicy, base: &str, href: &str) -> Option<NormalizedUrl> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = match Url::parse(href) {
        Ok(abs) => {
            if abs.scheme() != "http" && abs.scheme() != "https" {
                return None;
            }
            abs
        }
        Err(_) => {
            let base_url = Url::parse(base).ok()?;
            base_url.join(href).ok()?
        }
    };
    resolved.set_fragment(None);

    normalize(policy, resolved.as_str()).ok()
}

/// Strips exactly one trailing `/` from the path portion of a URL string,
/// which both reduces a lone root path (`https://host/`) to
/// `https://host` and trims a trailing slash on any deeper path
/// (`https://host/a/` -> `https://host/a`). The query string, if present,
/// is left untouched so `?` always survives the trim.
fn strip_trailing_slash(s: &str) -> String {
    let (path_part, query_part) = match s.find('?') {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    };
    let path_part = path_part.strip_suffix('/').unwrap_or(path_part);
    format!("{path_part}{query_part}")
}
