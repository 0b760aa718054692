//! Web Fetcher
//!
//! Fetches a provider website and reduces the HTML to plain text.
//!
//! # Behavior
//! - Bare hosts (`example.com`) are fetched as `http://example.com`
//! - Non-2xx responses are errors (`ExtractionError::Status`)
//! - `<script>`/`<style>` bodies are dropped, tags become line breaks

use super::WebFetcher;
use crate::error::ExtractionError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("pv-batch/", env!("CARGO_PKG_VERSION"));

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid script regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("valid blank-line regex"));

/// HTTP implementation of [`WebFetcher`]
pub struct HttpWebFetcher {
    http_client: Client,
}

impl HttpWebFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ExtractionError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ExtractionError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl WebFetcher for HttpWebFetcher {
    fn name(&self) -> &'static str {
        "HttpWeb"
    }

    async fn fetch(&self, url: &str) -> Result<String, ExtractionError> {
        let url = normalize_url(url);
        debug!(url = %url, "Fetching website");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        Ok(html_to_text(&html))
    }
}

/// Prefix `http://` when the URL has no scheme
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// Reduce HTML to newline-separated visible text
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, "");
    let text = TAG_RE.replace_all(&without_scripts, "\n");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    BLANK_LINES_RE.replace_all(&text, "\n").trim().to_string()
}
