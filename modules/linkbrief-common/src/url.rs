//! URL canonicalization for duplicate detection.
//!
//! Two URLs that differ only by case, `http`/`https`, a leading `www.` or
//! trailing slashes map to the same [`CanonicalUrl`]. Query strings and
//! fragments are kept, so `?a=1` and `?a=2` stay distinct.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s<>]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Normalize any string. Never fails; blank input yields an empty value.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self(String::new());
        }

        let with_scheme = if SCHEME_RE.is_match(raw) {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let mut url = with_scheme.to_lowercase();
        if let Some(rest) = url.strip_prefix("http://") {
            url = format!("https://{rest}");
        }

        // Split after "://" so the scheme separator is never trimmed away.
        let split = url.find("://").map(|i| i + 3).unwrap_or(0);
        let (scheme, mut rest) = url.split_at(split);
        while let Some(stripped) = rest.strip_prefix("www.") {
            rest = stripped;
        }
        let rest = rest.trim_end_matches(|c: char| c == '/' || c.is_whitespace());

        Self(format!("{scheme}{rest}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Host, path and query without the `scheme://` prefix.
    pub fn without_scheme(&self) -> &str {
        match self.0.find("://") {
            Some(i) => &self.0[i + 3..],
            None => &self.0,
        }
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Pull `http(s)://` links out of free text, in order of appearance.
/// Sentence punctuation stuck to the end of a link is dropped.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', '!', '?', ';', ':'])
                .to_string()
        })
        .filter(|u| u.len() > "https://".len())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> String {
        CanonicalUrl::normalize(s).as_str().to_string()
    }

    #[test]
    fn scheme_case_www_and_slash_variants_are_equal() {
        let expected = "https://example.com/tools";
        for raw in [
            "https://example.com/tools",
            "http://example.com/tools",
            "HTTPS://EXAMPLE.COM/TOOLS",
            "https://www.example.com/tools",
            "http://www.Example.com/tools///",
            "example.com/tools/",
            "www.example.com/tools",
            "  https://example.com/tools/  ",
        ] {
            assert_eq!(n(raw), expected, "input: {raw}");
        }
    }

    #[test]
    fn stored_url_matches_bare_http_www_variant() {
        assert_eq!(n("https://Example.com/"), n("http://www.example.com"));
    }

    #[test]
    fn query_and_fragment_are_significant() {
        assert_ne!(n("https://a.com/p?x=1"), n("https://a.com/p?x=2"));
        assert_eq!(n("https://a.com/p?x=1"), "https://a.com/p?x=1");
        assert_eq!(n("https://a.com/p#top"), "https://a.com/p#top");
    }

    #[test]
    fn other_schemes_are_kept() {
        assert_eq!(n("FTP://www.Files.example/"), "ftp://files.example");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "",
            "   ",
            "/",
            "https:///",
            "www.",
            "www.www.example.com",
            "http://www.example.com/ /",
            "HTTP://WWW.EXAMPLE.COM/?Q=1",
            "example",
            "https://",
            "mailto:someone@example.com",
            "a://b/",
        ] {
            let once = CanonicalUrl::normalize(raw);
            let twice = CanonicalUrl::normalize(once.as_str());
            assert_eq!(once, twice, "input: {raw:?}");
        }
    }

    #[test]
    fn blank_input_is_empty() {
        assert!(CanonicalUrl::normalize("  ").is_empty());
    }

    #[test]
    fn without_scheme_drops_prefix() {
        let url = CanonicalUrl::normalize("http://www.example.com/a");
        assert_eq!(url.without_scheme(), "example.com/a");
    }

    #[test]
    fn extracts_links_from_chat_text() {
        let urls = extract_urls(
            "look at https://a.example/x, and <http://b.example/y?q=1>. also https://",
        );
        assert_eq!(urls, vec!["https://a.example/x", "http://b.example/y?q=1"]);
    }

    #[test]
    fn no_links_yields_empty() {
        assert!(extract_urls("nothing here").is_empty());
    }
}
