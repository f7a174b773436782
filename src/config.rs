//! Connection profiles and transport tuning
//!
//! A [`ConnectionProfile`] describes one configured Deluge daemon: where it
//! lives, how to authenticate, and whether to trust its certificate.
//! [`TransportConfig`] tunes timeouts and the retry policy shared by every
//! profile.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// One configured Deluge daemon endpoint.
///
/// Immutable once constructed; equality is by all fields. Profiles are
/// persisted by the [`crate::registry::ClientRegistry`] through the external
/// credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Display name, also used as the persistence key
    pub nickname: String,

    /// Daemon web UI host
    pub host: String,

    /// Daemon web UI port
    pub port: u16,

    /// Relative base path under which the web UI is mounted (usually empty)
    #[serde(default)]
    pub base_path: String,

    /// Web UI password
    pub password: String,

    /// Connect over HTTPS
    #[serde(default)]
    pub tls: bool,

    /// Skip certificate validation for this host only (self-signed daemons).
    /// Standard validation applies everywhere else.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl ConnectionProfile {
    /// Validate the profile before building a client from it
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Other("Profile host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ClientError::Other("Profile port must not be zero".to_string()));
        }
        Ok(())
    }

    /// Base URL of the web UI: `{scheme}://{host}:{port}{base_path}`
    pub fn base_url(&self) -> Result<Url> {
        let scheme = if self.tls { "https" } else { "http" };
        let path = normalize_base_path(&self.base_path);
        Ok(Url::parse(&format!(
            "{}://{}:{}{}",
            scheme, self.host, self.port, path
        ))?)
    }

    /// JSON-RPC endpoint: `{base}/json`
    pub fn json_url(&self) -> Result<Url> {
        let scheme = if self.tls { "https" } else { "http" };
        let path = normalize_base_path(&self.base_path);
        Ok(Url::parse(&format!(
            "{}://{}:{}{}/json",
            scheme, self.host, self.port, path
        ))?)
    }

    /// Torrent-file upload endpoint: `{base}/upload`
    pub fn upload_url(&self) -> Result<Url> {
        let scheme = if self.tls { "https" } else { "http" };
        let path = normalize_base_path(&self.base_path);
        Ok(Url::parse(&format!(
            "{}://{}:{}{}/upload",
            scheme, self.host, self.port, path
        ))?)
    }
}

/// Collapse a user-entered base path into `""` or `/segment[/...]` form
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Transport-level tuning shared by all RPC calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Retry attempts after the initial try (idempotent calls only)
    pub max_retries: u32,

    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,

    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,

    /// HTTP status codes that count as retryable transport failures
    pub retryable_statuses: Vec<u16>,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 35,
            connect_timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            user_agent: format!("deluge-web/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
