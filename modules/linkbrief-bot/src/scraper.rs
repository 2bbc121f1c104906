use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

use crate::traits::PageScraper;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

/// Plain HTTP fetch + Readability extraction. Pages that need JavaScript
/// come back thin but never fail the run.
pub struct HttpScraper {
    client: reqwest::Client,
}

impl HttpScraper {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("Only http/https URLs are allowed, got: {}", parsed.scheme());
        }

        let resp = self.client.get(parsed).send().await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// `<title>` text with whitespace collapsed.
pub fn page_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

/// Title line followed by the Readability main content as markdown.
pub fn extract_text(url: &str, html: &[u8]) -> String {
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html,
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };
    let body = transform_content_input(input, &config);

    match page_title(&String::from_utf8_lossy(html)) {
        Some(title) => format!("{title}\n\n{}", body.trim()),
        None => body.trim().to_string(),
    }
}

#[async_trait]
impl PageScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        info!(url, scraper = "http", "Scraping URL");

        let html = match self.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url, scraper = "http", error = %e, "Fetch failed");
                return Ok(String::new());
            }
        };

        let text = extract_text(url, &html);
        if text.trim().is_empty() {
            warn!(url, scraper = "http", "Empty content after Readability extraction");
            return Ok(String::new());
        }

        info!(url, scraper = "http", bytes = text.len(), "Scraped successfully");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed_and_collapsed() {
        let html = "<html><head><TITLE>\n  Tool  —\n Home </TITLE></head></html>";
        assert_eq!(page_title(html).as_deref(), Some("Tool — Home"));
    }

    #[test]
    fn missing_or_blank_title_is_none() {
        assert_eq!(page_title("<p>no title</p>"), None);
        assert_eq!(page_title("<title>   </title>"), None);
    }

    #[test]
    fn extracted_text_starts_with_title() {
        let html = b"<html><head><title>Tool</title></head><body><article><p>Tool writes drafts for you.</p></article></body></html>";
        let text = extract_text("https://tool.example", html);
        assert!(text.starts_with("Tool\n\n"));
    }
}
