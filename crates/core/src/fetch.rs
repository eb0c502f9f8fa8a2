//! Page fetching from URLs, files, and stdin.
//!
//! This module is the document source of the pipeline: it retrieves raw
//! markup together with the page title and the final URL after redirects.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::parse::Document;
use crate::{Result, TabexError};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Time allowed for the page to load, in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Run a browser-backed source without a visible window.
    ///
    /// The HTTP source never renders, so it accepts but ignores this hint.
    pub headless: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            headless: true,
        }
    }
}

/// A fetched page: raw markup plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedPage {
    /// Raw response body.
    pub html: String,
    /// Content of the `<title>` element, empty when the page has none.
    pub title: String,
    /// URL after redirects.
    pub final_url: String,
}

/// Normalizes user input into an absolute URL.
///
/// Input without a scheme is assumed to be `https`.
pub fn normalize_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TabexError::InvalidUrl("URL must not be empty".to_string()));
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| TabexError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    if url.host_str().is_none() {
        return Err(TabexError::InvalidUrl(format!("{}: missing host", trimmed)));
    }
    Ok(url)
}

/// Fetches a page and reports its title and final URL.
///
/// Redirects are followed. A page that does not answer within
/// `config.timeout` seconds yields [`TabexError::Timeout`].
pub async fn fetch_page(url: &str, config: &FetchConfig) -> Result<FetchedPage> {
    let parsed_url = normalize_url(url)?;
    debug!(url = %parsed_url, timeout = config.timeout, "fetching page");

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(TabexError::HttpError)?;

    let response = client
        .get(parsed_url.clone())
        .header("User-Agent", &config.user_agent)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| timeout_or_http(e, config.timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TabexError::HttpStatus { status: status.as_u16(), url: parsed_url.to_string() });
    }

    let final_url = response.url().to_string();
    let html = response.text().await.map_err(|e| timeout_or_http(e, config.timeout))?;
    let title = Document::parse(&html).title().unwrap_or_default().trim().to_string();

    debug!(final_url = %final_url, bytes = html.len(), "page fetched");
    Ok(FetchedPage { html, title, final_url })
}

fn timeout_or_http(e: reqwest::Error, timeout: u64) -> TabexError {
    if e.is_timeout() { TabexError::Timeout { timeout } } else { TabexError::HttpError(e) }
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(TabexError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(TabexError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(TabexError::from)?;

    Ok(buffer)
}
