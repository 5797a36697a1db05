use std::fmt;
use url::Url;

/// Stable dedupe key for a crawl target
///
/// Two jobs with the same identity are the same logical crawl target. The
/// identity is the normalized form `scheme://host[:port]/path?sorted-query`:
///
/// 1. Scheme and host as parsed (the `url` crate lowercases the host)
/// 2. Explicit port kept only when it differs from the scheme default
/// 3. Path with the trailing slash trimmed (root `/` is kept)
/// 4. Fragment dropped
/// 5. Query pairs sorted by key, then value; empty query dropped
///
/// Unlike a display URL, nothing else is rewritten: `http` and `https`
/// targets are distinct crawls, and every query parameter participates in
/// the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobIdentity(String);

impl JobIdentity {
    /// Derives the identity for an already-parsed URL
    pub fn from_url(url: &Url) -> Self {
        let mut key = String::new();
        key.push_str(url.scheme());
        key.push_str("://");
        key.push_str(url.host_str().unwrap_or_default());

        if let Some(port) = url.port() {
            key.push(':');
            key.push_str(&port.to_string());
        }

        key.push_str(&trim_trailing_slash(url.path()));

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.sort();

        if !pairs.is_empty() {
            key.push('?');
            let query = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            key.push_str(&query);
        }

        Self(key)
    }

    /// Returns the normalized key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims the trailing slash from a path, keeping the root `/`
fn trim_trailing_slash(path: &str) -> String {
    if path.len() > 1 && path.ends_with('/') {
        path[..path.len() - 1].to_string()
    } else {
        path.to_string()
    }
}
