//! Session lifecycle for one daemon connection
//!
//! The web UI authenticates with a password (`auth.login`, which sets a
//! session cookie) and then connects to one of the daemon hosts it proxies.
//! That chain is strictly ordered: authenticate, list hosts, pick the first,
//! check its status, connect. A failure at any step aborts the chain with
//! that step's error.
//!
//! All state transitions are serialized behind one async mutex. Holding the
//! lock across the whole chain also coalesces concurrent connect attempts:
//! waiters re-check the state after acquiring the lock and return
//! immediately if a previous caller already connected, so N concurrent
//! callers produce exactly one `auth.login` on the wire.

use crate::error::{ClientError, Result};
use crate::models::Host;
use crate::rpc::{Idempotency, Transport};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Connection lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No valid session cookie
    Unauthenticated,
    /// Logged in to the web UI, not yet connected to a daemon host
    Authenticated,
    /// Connected to the daemon host with this id
    Connected(String),
}

/// Owns one daemon connection's lifecycle.
///
/// Sessions are transient: never persisted, rebuilt from the profile's
/// password on demand, and dropped back to `Unauthenticated` whenever the
/// daemon rejects a call as unauthenticated.
#[derive(Debug)]
pub struct SessionManager {
    transport: Arc<Transport>,
    password: String,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(transport: Arc<Transport>, password: String) -> Self {
        Self {
            transport,
            password,
            state: Mutex::new(SessionState::Unauthenticated),
        }
    }

    /// Current state snapshot
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Drop back to `Unauthenticated`; the next operation re-runs the full
    /// chain transparently
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        debug!("Session invalidated, will re-authenticate on next call");
        *state = SessionState::Unauthenticated;
    }

    /// Ensure the session is authenticated and connected to a daemon host.
    ///
    /// Idempotent and safe to call before every operation; a connected
    /// session returns immediately.
    pub async fn ensure_connected(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        if matches!(*state, SessionState::Connected(_)) {
            return Ok(());
        }

        if *state == SessionState::Unauthenticated {
            self.login().await?;
            *state = SessionState::Authenticated;
        }

        let host_id = self.connect_first_host().await?;
        debug!(host_id = %host_id, "Connected to daemon host");
        *state = SessionState::Connected(host_id);
        Ok(())
    }

    /// POST `auth.login` with the profile's password
    async fn login(&self) -> Result<()> {
        debug!("Authenticating with daemon web UI");
        let accepted: bool = self
            .transport
            .call(
                "auth.login",
                vec![json!(self.password)],
                Idempotency::Idempotent,
            )
            .await?
            .into_result()?;

        if accepted {
            Ok(())
        } else {
            Err(ClientError::IncorrectPassword)
        }
    }

    /// Walk the host chain: list hosts, take the first, check status,
    /// connect if needed. Returns the connected host's id.
    async fn connect_first_host(&self) -> Result<String> {
        let hosts: Vec<Host> = self
            .transport
            .call("web.get_hosts", vec![], Idempotency::Idempotent)
            .await?
            .into_result()?;

        let host = hosts.into_iter().next().ok_or(ClientError::NoHostsExist)?;

        let status: Host = self
            .transport
            .call(
                "web.get_host_status",
                vec![json!(host.id)],
                Idempotency::Idempotent,
            )
            .await?
            .into_result()?;

        if status.is_connected() {
            // The web UI already holds a connection; nothing to do.
            return Ok(host.id);
        }

        if !status.is_online() {
            return Err(ClientError::HostNotOnline(
                status.status.unwrap_or_else(|| "Unknown".to_string()),
            ));
        }

        // web.connect is idempotent: connecting an already-connected host
        // is a no-op on the daemon side.
        self.transport
            .call("web.connect", vec![json!(host.id)], Idempotency::Idempotent)
            .await?
            .into_ack()?;

        Ok(host.id)
    }
}
