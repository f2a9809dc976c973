//! Error types for DocFetch

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching a single page
///
/// These never abort a crawl; the crawler records them against the page
/// and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request did not complete within the per-fetch timeout
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Redirect chain exceeded the configured limit
    #[error("Too many redirects")]
    TooManyRedirects,

    /// Server answered with a non-success status code
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Content type is binary and cannot be converted
    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_redirect() {
            FetchError::TooManyRedirects
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else {
            FetchError::RequestError(err.to_string())
        }
    }
}

/// Fatal configuration errors, reported before any network activity
#[derive(Debug, Error)]
pub enum ConfigError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL could not be parsed
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// URL has a scheme other than http/https
    #[error("Invalid URL: only http:// and https:// are supported, got '{0}'")]
    UnsupportedScheme(String),

    /// URL points at a loopback, private or otherwise internal host
    #[error("Access to private or internal host '{0}' is not allowed")]
    PrivateHost(String),

    /// Crawl depth above the hard limit
    #[error("Max depth {depth} is too high (maximum allowed: {max})")]
    DepthTooHigh { depth: u32, max: u32 },

    /// Worker count outside 1..=max
    #[error("Concurrent workers must be between 1 and {max}, got {workers}")]
    InvalidWorkers { workers: usize, max: usize },

    /// Page budget of zero
    #[error("Max pages must be at least 1")]
    ZeroPageBudget,
}

/// Errors raised while persisting output
#[derive(Debug, Error)]
pub enum WriteError {
    /// Destination cannot be created or written
    #[error("Output path '{}' is not writable: {source}", path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An individual write failed
    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every artifact write of the run failed
    #[error("No output could be written ({failed} write failures)")]
    NothingWritten { failed: usize },
}

/// Errors that abort a whole run
#[derive(Debug, Error)]
pub enum DocFetchError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Output could not be written
    #[error(transparent)]
    Output(#[from] WriteError),

    /// HTTP client could not be constructed
    #[error("Failed to initialise fetcher: {0}")]
    Fetcher(#[source] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::InvalidUrlScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(FetchError::HttpStatus(500).to_string(), "HTTP status 500");
        assert_eq!(FetchError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            ConfigError::MissingUrl.to_string(),
            "Missing required parameter: url"
        );
        assert_eq!(
            ConfigError::DepthTooHigh { depth: 11, max: 10 }.to_string(),
            "Max depth 11 is too high (maximum allowed: 10)"
        );
    }

    #[test]
    fn test_config_error_wraps_into_run_error() {
        let err: DocFetchError = ConfigError::ZeroPageBudget.into();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Max pages must be at least 1"
        );
    }

    #[test]
    fn test_write_error_mentions_path() {
        let err = WriteError::Unwritable {
            path: PathBuf::from("out/docs.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("out/docs.md"));
    }
}
