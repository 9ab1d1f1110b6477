//! Error types for LinkText

use thiserror::Error;

/// Errors that can occur while extracting link content
///
/// Provider misses and metadata parse failures are not errors; they are
/// reported through diagnostics notes instead.
#[derive(Debug, Error)]
pub enum LinkError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL could not be parsed or has an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL rejected by the client allow/block lists
    #[error("Blocked URL: prefix not allowed")]
    BlockedUrl,

    /// The generic transcript provider is not registered
    #[error("Transcript provider registry has no generic provider")]
    MissingGenericProvider,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Server answered with a non-success status
    #[error("Failed to fetch {url} (status {status})")]
    HttpStatus { status: u16, url: String },

    /// Response body is not textual
    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    /// Enhanced fetch service failure
    #[error("Enhanced fetch failed: {0}")]
    Enhanced(String),

    /// Cache store failure
    #[error("Transcript cache error: {0}")]
    Cache(String),
}

impl LinkError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LinkError::Timeout
        } else if err.is_connect() {
            LinkError::ConnectError(err)
        } else {
            LinkError::RequestError(err.to_string())
        }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Cache(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            LinkError::MissingUrl.to_string(),
            "Missing required parameter: url"
        );
        assert_eq!(
            LinkError::MissingGenericProvider.to_string(),
            "Transcript provider registry has no generic provider"
        );
        assert_eq!(
            LinkError::HttpStatus {
                status: 403,
                url: "https://example.com".to_string()
            }
            .to_string(),
            "Failed to fetch https://example.com (status 403)"
        );
        assert_eq!(
            LinkError::BlockedUrl.to_string(),
            "Blocked URL: prefix not allowed"
        );
        assert_eq!(
            LinkError::InvalidUrl("nope".to_string()).to_string(),
            "Invalid URL: nope"
        );
    }

    #[test]
    fn test_io_error_maps_to_cache() {
        let err: LinkError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(matches!(err, LinkError::Cache(msg) if msg == "disk full"));
    }
}
