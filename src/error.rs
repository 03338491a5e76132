use thiserror::Error;

/// Errors returned by operations against the inference server.
///
/// Each variant maps to a different user remedy, so callers should match on
/// the variant rather than flattening everything into one message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The base URL was rejected before any network call was made.
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    /// The request was aborted after the configured deadline.
    #[error("request timed out")]
    Timeout,

    /// DNS, connect, or other transport-level failure.
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server was reachable but returned a non-success status.
    #[error("server returned HTTP {status}")]
    Http { status: u16, body: String },

    /// The server returned 2xx but the body was not in the expected shape.
    #[error("unexpected response format from server")]
    MalformedResponse,
}

impl ApiError {
    /// Classify a reqwest failure into the taxonomy above.
    ///
    /// Timeouts get their own variant so the UI can suggest the right fix
    /// (server not running vs. slow model load).
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::MalformedResponse
        } else {
            ApiError::Transport(err)
        }
    }

    /// True for transport-level failures where a loopback URL on a remote
    /// setup is a likely cause.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_status() {
        let err = ApiError::Http {
            status: 500,
            body: "internal".to_string(),
        };
        assert_eq!(err.to_string(), "server returned HTTP 500");
    }

    #[test]
    fn connection_failure_classification() {
        assert!(ApiError::Timeout.is_connection_failure());
        assert!(!ApiError::MalformedResponse.is_connection_failure());
        assert!(!ApiError::InvalidUrl("".into()).is_connection_failure());
    }
}
