//! Error types for tabex operations.
//!
//! This module defines the main error type [`TabexError`] which represents
//! every failure that can occur while fetching a page, cleaning its markup,
//! calling the language model, or recovering a table from the model's answer.
//!
//! Extraction itself never returns these errors to the caller: the
//! [`Extractor`](crate::Extractor) folds them into
//! [`ExtractionResult::Failure`](crate::ExtractionResult::Failure).
//!
//! # Example
//!
//! ```rust
//! use tabex_core::{TabexError, Result};
//!
//! fn require_query(query: &str) -> Result<&str> {
//!     if query.trim().is_empty() {
//!         return Err(TabexError::EmptyQuery);
//!     }
//!     Ok(query)
//! }
//! # assert!(require_query("  ").is_err());
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Category of a language-model provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The API key was rejected.
    Auth,
    /// The provider throttled the request (tokens or requests per minute).
    RateLimit,
    /// The request never produced an HTTP response.
    Network,
    /// Any other non-success response.
    Api,
    /// The provider answered without a completion.
    EmptyResponse,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Auth => "authentication failed",
            Self::RateLimit => "rate limit exceeded",
            Self::Network => "network error",
            Self::Api => "API error",
            Self::EmptyResponse => "empty response",
        };
        f.write_str(label)
    }
}

/// Main error type for fetch, clean, and extraction operations.
///
/// # Example
///
/// ```rust
/// use tabex_core::TabexError;
///
/// let err = TabexError::Timeout { timeout: 30 };
/// assert!(err.to_string().contains("30"));
/// ```
#[derive(Error, Debug)]
pub enum TabexError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps DNS failures, refused connections, TLS problems and body
    /// decoding errors raised while fetching a page.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The page answered with a non-success status.
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// Request timeout.
    ///
    /// Returned when the page does not finish loading within the configured timeout.
    #[error("Page failed to load within {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The extraction query was empty or whitespace.
    #[error("Extraction query must not be empty")]
    EmptyQuery,

    /// HTML parsing errors, usually from an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Standard I/O errors for file and stdin input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The language-model provider call failed.
    ///
    /// Covers bad credentials, throttling, transport failures and error
    /// responses. Never retried.
    #[error("Model provider error ({kind}): {message}")]
    Provider { kind: ProviderErrorKind, message: String },

    /// The model response could not be coerced into a table, even after repair.
    ///
    /// `excerpt` holds at most the first 500 characters of the response.
    #[error(
        "Failed to parse LLM response. Original error: {original}. Attempted fix also failed: {repair}. LLM response: {excerpt}"
    )]
    Schema { original: String, repair: String, excerpt: String },

    /// Serializing a table to CSV or JSON failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl TabexError {
    /// Shorthand for a provider error of the given kind.
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        TabexError::Provider { kind, message: message.into() }
    }
}

impl From<csv::Error> for TabexError {
    fn from(err: csv::Error) -> Self {
        TabexError::Export(err.to_string())
    }
}

/// Result type alias for TabexError.
pub type Result<T> = std::result::Result<T, TabexError>;
