//! Host normalization.
//!
//! Every component that compares hosts goes through this module. The policy
//! lookup, the tab tracker, and the logout debounce all key on [`HostKey`],
//! so a mismatch here would show up as interventions applying to one spelling
//! of a site but not another.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Canonical site identity: lowercase hostname with a single leading `www.`
/// stripped. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostKey(String);

impl HostKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HostKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a full URL as reported by the browser for a tab.
///
/// Returns `None` for anything that is not a parsable `http`/`https` URL
/// with a hostname (`about:blank`, `chrome://`, extension pages, ...).
pub fn from_url(raw: &str) -> Option<HostKey> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    canonical(url.host_str()?)
}

/// Normalize loosely-formatted user input ("Reddit.com", "www.x.com/home",
/// "https://facebook.com"). Bare domains are parsed as if prefixed with
/// `https://`; input that still fails to parse is lowercased directly.
pub fn from_input(raw: &str) -> Option<HostKey> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().and_then(canonical))
        .or_else(|| canonical(trimmed))
}

/// Origin patterns covering both spellings of a host, in the shape the
/// permission probe expects.
pub fn origin_patterns(host: &HostKey) -> Vec<String> {
    vec![
        format!("*://{}/*", host.as_str()),
        format!("*://www.{}/*", host.as_str()),
    ]
}

fn canonical(host: &str) -> Option<HostKey> {
    let lowered = host.to_ascii_lowercase();
    let stripped = lowered.strip_prefix("www.").unwrap_or(&lowered);
    if stripped.is_empty() {
        None
    } else {
        Some(HostKey(stripped.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_www_and_lowercases() {
        assert_eq!(
            from_url("https://WWW.Reddit.com/r/rust").unwrap().as_str(),
            "reddit.com"
        );
        assert_eq!(
            from_url("http://x.com/home?tab=1").unwrap().as_str(),
            "x.com"
        );
    }

    #[test]
    fn rejects_non_web_urls() {
        assert!(from_url("chrome://extensions").is_none());
        assert!(from_url("about:blank").is_none());
        assert!(from_url("file:///tmp/x.html").is_none());
        assert!(from_url("not a url").is_none());
    }

    #[test]
    fn loose_input_accepts_bare_domains() {
        assert_eq!(from_input("Facebook.com").unwrap().as_str(), "facebook.com");
        assert_eq!(
            from_input("  www.tiktok.com/foo ").unwrap().as_str(),
            "tiktok.com"
        );
        assert_eq!(
            from_input("https://news.ycombinator.com").unwrap().as_str(),
            "news.ycombinator.com"
        );
        assert!(from_input("").is_none());
        assert!(from_input("   ").is_none());
    }

    #[test]
    fn patterns_cover_both_spellings() {
        let host = from_input("reddit.com").unwrap();
        assert_eq!(
            origin_patterns(&host),
            vec!["*://reddit.com/*".to_string(), "*://www.reddit.com/*".to_string()]
        );
    }

    proptest! {
        #[test]
        fn www_prefix_is_irrelevant(host in "[a-z][a-z0-9-]{0,20}\\.[a-z]{2,6}") {
            // Only a single leading www. is ever stripped, so the property
            // holds for hosts that do not already start with one.
            prop_assume!(!host.starts_with("www."));
            let bare = from_input(&host);
            let www = from_input(&format!("www.{host}"));
            prop_assert_eq!(bare, www);
        }

        #[test]
        fn normalization_is_idempotent(host in "[a-zA-Z][a-zA-Z0-9-]{0,20}\\.[a-zA-Z]{2,6}") {
            if let Some(key) = from_input(&host) {
                let again = from_input(key.as_str());
                prop_assert_eq!(Some(key), again);
            }
        }
    }
}
