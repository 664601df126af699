//! Error types for the fetch module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching pages or downloading files.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level error (DNS resolution, connection refused, reset).
    ///
    /// Raised only after the single fixed-delay retry also failed.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP error response, surfaced only when the caller asked for strict
    /// handling.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing a downloaded body.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_carries_url_and_code() {
        let error = FetchError::http_status("https://example.com/g/1", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/g/1"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_io_display_carries_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = FetchError::io(PathBuf::from("/tmp/img.jpg"), io_error);
        assert!(error.to_string().contains("/tmp/img.jpg"));
    }
}
