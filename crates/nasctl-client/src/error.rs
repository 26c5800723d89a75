//! Client error types.

use thiserror::Error;

use nasctl_proto::ProtoError;

/// Errors surfaced by [`TrueNasClient`](crate::TrueNasClient) and
/// [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration; detected before any network I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// The channel could not be opened or died mid-session. Fatal; there
    /// is no reconnection.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server rejected the protocol negotiation.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server rejected the credential. Fatal to the session.
    #[error("authentication failed ({kind}): {message}")]
    Auth {
        /// Failure classification, derived from the server's message.
        kind: AuthErrorKind,
        /// Server-reported detail.
        message: String,
    },

    /// The server reported an error on a correlated call.
    #[error("method '{method}' failed: {message}")]
    Method {
        /// Remote method name.
        method: String,
        /// Server-reported detail.
        message: String,
    },

    /// The server sent something the protocol does not allow here.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A connect or call deadline elapsed.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The named application does not exist on the appliance.
    #[error("app not found: {0}")]
    AppNotFound(String),

    /// A mutating operation's job failed or did not finish in time.
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

impl From<ProtoError> for ClientError {
    fn from(err: ProtoError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Classification of an authentication failure, for diagnostics only.
/// The client never retries authentication on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The key is invalid or malformed.
    InvalidKey,
    /// The key exists but has expired.
    ExpiredKey,
    /// Anything else the server reported.
    Other,
}

impl AuthErrorKind {
    /// Classify a server-reported authentication error by its text.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("expired") {
            Self::ExpiredKey
        } else if lower.contains("invalid") || lower.contains("malformed") {
            Self::InvalidKey
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid key"),
            Self::ExpiredKey => write!(f, "expired key"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_invalid_key() {
        assert_eq!(
            AuthErrorKind::classify("Invalid API key"),
            AuthErrorKind::InvalidKey
        );
        assert_eq!(
            AuthErrorKind::classify("malformed token"),
            AuthErrorKind::InvalidKey
        );
    }

    #[test]
    fn classify_expired_key() {
        assert_eq!(
            AuthErrorKind::classify("API key has expired"),
            AuthErrorKind::ExpiredKey
        );
    }

    #[test]
    fn classify_other() {
        assert_eq!(
            AuthErrorKind::classify("rate limit exceeded"),
            AuthErrorKind::Other
        );
    }

    #[test]
    fn error_display_includes_method_name() {
        let err = ClientError::Method {
            method: "app.stop".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "method 'app.stop' failed: boom");
    }

    #[test]
    fn auth_error_display_includes_kind() {
        let err = ClientError::Auth {
            kind: AuthErrorKind::ExpiredKey,
            message: "key expired last week".into(),
        };
        assert!(err.to_string().contains("expired key"));
    }
}
