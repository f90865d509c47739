//! Chat transport error types

use thiserror::Error;

/// Transport-level error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::ServerError, message)
    }

    pub fn client_error(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::ClientError, message)
    }

    /// Classifies a non-success HTTP status. The body text, when present,
    /// becomes the user-visible message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("request failed with status {status}")
        } else {
            format!("request failed with status {status}: {}", body.trim())
        };
        match status {
            429 => Self::rate_limit(message),
            400..=499 => Self::client_error(message),
            500..=599 => Self::server_error(message),
            _ => Self::network(message),
        }
    }
}

/// Error classification for surfacing decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// Network issues, timeouts, mid-stream disconnects
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Client error (4xx other than 429), terminal for this request
    ClientError,
}

impl ChatErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            ChatError::from_status(429, "slow down").kind,
            ChatErrorKind::RateLimit
        );
        assert_eq!(
            ChatError::from_status(404, "").kind,
            ChatErrorKind::ClientError
        );
        assert_eq!(
            ChatError::from_status(500, "boom").kind,
            ChatErrorKind::ServerError
        );
    }

    #[test]
    fn errors_compare_structurally() {
        assert_eq!(ChatError::network("lost"), ChatError::network("lost"));
        assert_ne!(ChatError::network("lost"), ChatError::server_error("lost"));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!ChatErrorKind::ClientError.is_retryable());
        assert!(ChatErrorKind::RateLimit.is_retryable());
    }

    #[test]
    fn message_includes_body_when_present() {
        let err = ChatError::from_status(503, " overloaded ");
        assert_eq!(err.message, "request failed with status 503: overloaded");
        let err = ChatError::from_status(503, "  ");
        assert_eq!(err.message, "request failed with status 503");
    }
}
