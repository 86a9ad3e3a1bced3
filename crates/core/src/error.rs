//! Error types for clipvault operations.
//!
//! This module defines the main error type [`ClipvaultError`] which represents
//! all possible errors that can occur while fetching, rendering, extracting,
//! and persisting clipped documents.

use thiserror::Error;

/// Main error type for pipeline operations.
///
/// The pipeline catches most of these at the per-task boundary and converts
/// them into a skip or a stub document; only batch-level failures (such as
/// the browser refusing to launch) reach the caller.
#[derive(Error, Debug)]
pub enum ClipvaultError {
    /// HTTP request errors from reqwest.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request or navigation exceeded the configured timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Target resource declared a non-HTML content type.
    ///
    /// The pipeline treats this as a structural skip, never a failure:
    /// no fallback attempt is made and the line stays unmarked.
    #[error("Resource is not an HTML document (content type: {0})")]
    NotHtml(String),

    /// Server answered with a non-success HTTP status.
    #[error("Server returned status {0}")]
    HttpStatus(u16),

    /// Browser navigation or capture failed.
    ///
    /// Covers crashes, navigation errors, and anti-bot challenges. Render
    /// failures escalate to the fetch-strategy fallback.
    #[error("Browser render failed: {0}")]
    Render(String),

    /// Extraction produced no usable body content.
    ///
    /// An empty body after extraction is the single failure signal the
    /// extractor surfaces; a technically successful parse with an empty
    /// body is indistinguishable from a failed one.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// Document persistence errors.
    #[error("Failed to write document: {0}")]
    Write(#[from] std::io::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for ClipvaultError.
pub type Result<T> = std::result::Result<T, ClipvaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClipvaultError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_timeout_error() {
        let err = ClipvaultError::Timeout { timeout: 30 };
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_not_html_error() {
        let err = ClipvaultError::NotHtml("application/pdf".to_string());
        assert!(err.to_string().contains("application/pdf"));
    }
}
