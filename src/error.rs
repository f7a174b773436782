//! Typed error hierarchy for deluge-web
//!
//! Every error type includes context about what went wrong and whether
//! the operation can be retried.

use thiserror::Error;

/// Main error type for the Deluge client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network/timeout/HTTP-status failures below the RPC layer
    #[error("Transport error: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
        retryable: bool,
    },

    /// The daemon rejected `auth.login`
    #[error("Incorrect password")]
    IncorrectPassword,

    /// The daemon has zero configured downstream hosts
    #[error("No hosts exist on the daemon")]
    NoHostsExist,

    /// The selected host's daemon process is not reachable to connect to
    #[error("Host is not online (status: {0})")]
    HostNotOnline(String),

    /// Response JSON did not match any expected/polymorphic shape
    #[error("Unable to parse server response: {0}")]
    Decoding(String),

    /// The daemon returned a non-null `error` member in the envelope
    #[error("Daemon error: {message}")]
    Rpc { code: Option<i64>, message: String },

    /// Envelope well-formed but missing an expected `result`
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Multipart upload did not return a usable file path
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Catch-all for uncategorized underlying failures
    #[error("{0}")]
    Other(String),
}

/// Transport error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request timed out
    Timeout,
    /// Connection could not be established
    ConnectionFailed,
    /// Connection dropped mid-request
    ConnectionReset,
    /// Server returned an error status
    HttpStatus(u16),
    /// Other transport error
    Other,
}

/// Deluge's web API signals a lost session with RPC error code 1.
const AUTH_REJECTED_CODE: i64 = 1;

impl ClientError {
    /// Check if this error is retryable at the transport level
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Check if the daemon rejected the call because the session expired.
    ///
    /// The session layer uses this to transparently re-run the full
    /// authenticate/connect chain instead of surfacing the error.
    pub fn is_auth_rejected(&self) -> bool {
        match self {
            Self::Rpc { code, message } => {
                *code == Some(AUTH_REJECTED_CODE) || message.contains("Not authenticated")
            }
            _ => false,
        }
    }

    /// Create a transport error
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        let retryable = matches!(
            kind,
            TransportErrorKind::Timeout | TransportErrorKind::ConnectionReset
        );
        Self::Transport {
            kind,
            message: message.into(),
            retryable,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::ConnectionFailed
        } else if let Some(status) = err.status() {
            TransportErrorKind::HttpStatus(status.as_u16())
        } else {
            TransportErrorKind::Other
        };

        let retryable = matches!(
            kind,
            TransportErrorKind::Timeout | TransportErrorKind::ConnectionFailed
        );

        Self::Transport {
            kind,
            message: err.to_string(),
            retryable,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::Other(format!("Invalid URL: {}", err))
    }
}
