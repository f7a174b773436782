//! HTTP transport with bounded retry
//!
//! One logical RPC call is one HTTP POST of a JSON envelope to the daemon's
//! `/json` endpoint. Transport-level failures in the retryable set are
//! retried with exponential backoff and jitter, but only for calls the
//! caller has declared idempotent: mutating RPC methods are attempted
//! exactly once. Retry state is local to each call.

use crate::config::{ConnectionProfile, TransportConfig};
use crate::error::{ClientError, Result, TransportErrorKind};
use crate::rpc::envelope::{RpcRequest, RpcResponse};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use url::Url;

/// Whether a call may be re-sent after a retryable transport failure.
///
/// Reads opt in; mutations are non-retryable by default because the daemon
/// may have partially processed an attempt whose response was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    Idempotent,
    NonIdempotent,
}

/// Retry policy with exponential backoff and jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (retry limit + 1)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Build a policy from transport config (`max_retries` retries after
    /// the initial attempt)
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_attempts: config.max_retries + 1,
            initial_delay_ms: config.retry_delay_ms,
            max_delay_ms: config.max_retry_delay_ms,
            jitter_factor: 0.25,
        }
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms * 2u64.pow(attempt.min(10));
        let capped = base.min(self.max_delay_ms);

        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * self.jitter_factor;
        let with_jitter = (capped as f64 * (1.0 + jitter)) as u64;

        Duration::from_millis(with_jitter)
    }

    /// Check whether another attempt should be made
    pub fn should_retry(&self, attempt: u32, idempotency: Idempotency, error: &ClientError) -> bool {
        if idempotency != Idempotency::Idempotent {
            return false;
        }
        if attempt + 1 >= self.max_attempts {
            return false;
        }
        error.is_retryable()
    }
}

/// Issues RPC calls and multipart uploads against one daemon endpoint.
///
/// The underlying reqwest client keeps the session cookie the web UI sets
/// on successful `auth.login`, so authentication state rides along with
/// this transport.
pub struct Transport {
    client: Client,
    json_url: Url,
    upload_url: Url,
    policy: RetryPolicy,
    retryable_statuses: Vec<u16>,
    next_id: AtomicU32,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("json_url", &self.json_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Create a transport for one connection profile
    pub fn new(profile: &ConnectionProfile, config: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            // Per-host override for self-signed daemons; this client only
            // ever talks to the profile's host.
            .danger_accept_invalid_certs(profile.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            json_url: profile.json_url()?,
            upload_url: profile.upload_url()?,
            policy: RetryPolicy::from_config(config),
            retryable_statuses: config.retryable_statuses.clone(),
            next_id: AtomicU32::new(1),
        })
    }

    /// Perform one logical RPC call, retrying per policy.
    ///
    /// Retries happen below envelope decoding: an HTTP status outside the
    /// retryable set, or a body that fails to parse, surfaces immediately.
    pub async fn call(
        &self,
        method: &str,
        params: Vec<Value>,
        idempotency: Idempotency,
    ) -> Result<RpcResponse> {
        let request = RpcRequest::new(
            self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        );

        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !self.policy.should_retry(attempt, idempotency, &e) {
                        return Err(e);
                    }
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::debug!(
                        method,
                        attempt = attempt + 1,
                        ?delay,
                        error = %e,
                        "RPC call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Send one HTTP POST and decode the envelope
    async fn send_once(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let response = self
            .client
            .post(self.json_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            return Err(ClientError::Transport {
                kind: TransportErrorKind::HttpStatus(code),
                message: format!("daemon returned HTTP {}", status),
                retryable: self.retryable_statuses.contains(&code),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decoding(e.to_string()))
    }

    /// Upload raw `.torrent` bytes to the `/upload` endpoint.
    ///
    /// This is a plain multipart POST, not JSON-RPC. Returns the
    /// server-side temporary path for a follow-up `web.get_torrent_info`
    /// or `web.add_torrents` call. Never retried: the server may have
    /// stored the file even when the response was lost.
    pub async fn upload(&self, bytes: Vec<u8>) -> Result<String> {
        let part = Part::bytes(bytes)
            .file_name("upload.torrent")
            .mime_str("application/x-bittorrent")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UploadFailed(format!(
                "upload endpoint returned HTTP {}",
                status
            )));
        }

        #[derive(serde::Deserialize)]
        struct UploadResponse {
            #[serde(default)]
            files: Vec<String>,
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ClientError::UploadFailed(format!("unreadable upload response: {}", e)))?;

        body.files
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::UploadFailed("no file path in upload response".to_string()))
    }
}
