//! Deluge client facade
//!
//! [`DelugeClient`] is the single entry point for callers: one async method
//! per RPC operation. Every method ensures the session is authenticated and
//! connected before issuing its call, and transparently re-runs the whole
//! connect chain once if the daemon signals a lost session mid-call.

use crate::config::{ConnectionProfile, TransportConfig};
use crate::error::{ClientError, Result};
use crate::models::{
    AddTorrentDefaults, AddTorrentOptions, FileNode, MagnetInfo, SessionStats, TorrentDetail,
    TorrentOptions, TorrentOptionsUpdate, TorrentOverview, UploadedTorrentInfo,
    ADD_DEFAULTS_KEYS, OVERVIEW_FIELDS, SESSION_STATS_KEYS, TORRENT_OPTIONS_FIELDS,
};
use crate::rpc::{Idempotency, Transport};
use crate::session::{SessionManager, SessionState};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Client for one configured Deluge daemon.
///
/// Cheap to share behind an `Arc`; all methods take `&self` and concurrent
/// calls are fine; session transitions are serialized internally.
#[derive(Debug)]
pub struct DelugeClient {
    profile: ConnectionProfile,
    transport: Arc<Transport>,
    session: SessionManager,
}

impl DelugeClient {
    /// Build a client for a connection profile. The session starts
    /// unauthenticated; the first operation runs the connect chain.
    pub fn new(profile: ConnectionProfile, config: &TransportConfig) -> Result<Self> {
        profile.validate()?;
        let transport = Arc::new(Transport::new(&profile, config)?);
        let session = SessionManager::new(Arc::clone(&transport), profile.password.clone());
        Ok(Self {
            profile,
            transport,
            session,
        })
    }

    /// The profile this client was built from
    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    /// Current session state (mainly useful for diagnostics)
    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// Issue one RPC call with an established session, recovering once
    /// from a daemon-side session expiry.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
        idempotency: Idempotency,
    ) -> Result<T> {
        self.session.ensure_connected().await?;

        let first = self
            .transport
            .call(method, params.clone(), idempotency)
            .await?
            .into_result();

        match first {
            Err(ref e) if e.is_auth_rejected() => {
                debug!(method, "Session expired mid-call, re-running connect chain");
                self.session.invalidate().await;
                self.session.ensure_connected().await?;
                self.transport
                    .call(method, params, idempotency)
                    .await?
                    .into_result()
            }
            other => other,
        }
    }

    /// Like [`Self::request`] but for mutations, where success is defined
    /// by a non-error envelope and the `result` shape carries nothing.
    async fn request_ack(&self, method: &str, params: Vec<Value>) -> Result<()> {
        self.session.ensure_connected().await?;

        let first = self
            .transport
            .call(method, params.clone(), Idempotency::NonIdempotent)
            .await?
            .into_ack();

        match first {
            Err(ref e) if e.is_auth_rejected() => {
                debug!(method, "Session expired mid-call, re-running connect chain");
                self.session.invalidate().await;
                self.session.ensure_connected().await?;
                self.transport
                    .call(method, params, Idempotency::NonIdempotent)
                    .await?
                    .into_ack()
            }
            other => other,
        }
    }

    // --- Session ---------------------------------------------------------

    /// Whether the web UI currently holds a daemon connection
    /// (`web.connected`)
    pub async fn check_session(&self) -> Result<bool> {
        self.request("web.connected", vec![], Idempotency::Idempotent)
            .await
    }

    /// Authenticate and connect, then report the daemon version
    /// (`daemon.info`). Used to verify a profile before saving it.
    pub async fn test_connection(&self) -> Result<String> {
        self.request("daemon.info", vec![], Idempotency::Idempotent)
            .await
    }

    // --- Torrent queries -------------------------------------------------

    /// Fetch the overview of every torrent, keyed by hash on the wire
    pub async fn get_torrents(&self) -> Result<Vec<TorrentOverview>> {
        let map: HashMap<String, TorrentOverview> = self
            .request(
                "core.get_torrents_status",
                vec![json!({}), json!(OVERVIEW_FIELDS)],
                Idempotency::Idempotent,
            )
            .await?;

        let mut torrents: Vec<TorrentOverview> = map
            .into_iter()
            .map(|(hash, mut torrent)| {
                // The map key is the authoritative identity.
                torrent.hash = hash;
                torrent
            })
            .collect();
        torrents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(torrents)
    }

    /// Fetch full status for one torrent (empty field list = all fields)
    pub async fn get_torrent(&self, hash: &str) -> Result<TorrentDetail> {
        let mut detail: TorrentDetail = self
            .request(
                "core.get_torrent_status",
                // Empty field list asks the daemon for all fields.
                vec![json!(hash), json!([])],
                Idempotency::Idempotent,
            )
            .await?;
        if detail.hash.is_empty() {
            detail.hash = hash.to_string();
        }
        Ok(detail)
    }

    /// Fetch one torrent's file tree
    pub async fn get_torrent_files(&self, hash: &str) -> Result<FileNode> {
        let raw: Value = self
            .request(
                "web.get_torrent_files",
                vec![json!(hash)],
                Idempotency::Idempotent,
            )
            .await?;
        FileNode::from_wire(&raw)
    }

    /// Current per-torrent option values
    pub async fn get_torrent_options(&self, hash: &str) -> Result<TorrentOptions> {
        self.request(
            "core.get_torrent_status",
            vec![json!(hash), json!(TORRENT_OPTIONS_FIELDS)],
            Idempotency::Idempotent,
        )
        .await
    }

    /// Session-wide statistics
    pub async fn get_session_stats(&self) -> Result<SessionStats> {
        self.request(
            "core.get_session_status",
            vec![json!(SESSION_STATS_KEYS)],
            Idempotency::Idempotent,
        )
        .await
    }

    /// Daemon-side defaults for new torrents
    pub async fn get_add_defaults(&self) -> Result<AddTorrentDefaults> {
        self.request(
            "core.get_config_values",
            vec![json!(ADD_DEFAULTS_KEYS)],
            Idempotency::Idempotent,
        )
        .await
    }

    /// Resolve a magnet URI's name and info-hash without adding it
    pub async fn get_magnet_info(&self, magnet_uri: &str) -> Result<MagnetInfo> {
        let raw: Value = self
            .request(
                "web.get_magnet_info",
                vec![json!(magnet_uri)],
                Idempotency::Idempotent,
            )
            .await?;
        if !raw.is_object() {
            // The daemon answers `false` for URIs it cannot parse.
            return Err(ClientError::UnexpectedResponse(
                "daemon could not parse the magnet link".to_string(),
            ));
        }
        serde_json::from_value(raw).map_err(Into::into)
    }

    // --- Mutations -------------------------------------------------------

    /// Pause the given torrents
    pub async fn pause(&self, hashes: &[&str]) -> Result<()> {
        self.request_ack("core.pause_torrent", vec![json!(hashes)])
            .await
    }

    /// Resume the given torrents
    pub async fn resume(&self, hashes: &[&str]) -> Result<()> {
        self.request_ack("core.resume_torrent", vec![json!(hashes)])
            .await
    }

    /// Pause every torrent in the session
    pub async fn pause_all(&self) -> Result<()> {
        self.request_ack("core.pause_all_torrents", vec![]).await
    }

    /// Resume every torrent in the session
    pub async fn resume_all(&self) -> Result<()> {
        self.request_ack("core.resume_all_torrents", vec![]).await
    }

    /// Remove one torrent, optionally deleting its downloaded data
    pub async fn remove(&self, hash: &str, remove_data: bool) -> Result<()> {
        self.request_ack("core.remove_torrent", vec![json!(hash), json!(remove_data)])
            .await
    }

    /// Add a torrent from a magnet URI. Returns the new torrent's hash,
    /// or `None` if the daemon treated it as a duplicate.
    pub async fn add_magnet(
        &self,
        magnet_uri: &str,
        options: &AddTorrentOptions,
    ) -> Result<Option<String>> {
        self.request(
            "core.add_torrent_magnet",
            vec![json!(magnet_uri), serde_json::to_value(options)?],
            Idempotency::NonIdempotent,
        )
        .await
    }

    /// Add a torrent from raw `.torrent` bytes, base64-encoded inline
    pub async fn add_torrent_file(
        &self,
        filename: &str,
        bytes: &[u8],
        options: &AddTorrentOptions,
    ) -> Result<Option<String>> {
        let encoded = BASE64.encode(bytes);
        self.request(
            "core.add_torrent_file",
            vec![json!(filename), json!(encoded), serde_json::to_value(options)?],
            Idempotency::NonIdempotent,
        )
        .await
    }

    /// Add a torrent from a URL the daemon fetches itself
    pub async fn add_torrent_url(
        &self,
        url: &str,
        options: &AddTorrentOptions,
    ) -> Result<Option<String>> {
        self.request(
            "core.add_torrent_url",
            vec![json!(url), serde_json::to_value(options)?],
            Idempotency::NonIdempotent,
        )
        .await
    }

    /// Step 1 of the local-file add flow: multipart-upload raw `.torrent`
    /// bytes, returning the server-side temporary path
    pub async fn upload_torrent(&self, bytes: Vec<u8>) -> Result<String> {
        // The upload endpoint rides on the same session cookie.
        self.session.ensure_connected().await?;
        self.transport.upload(bytes).await
    }

    /// Step 2a: query metadata for an uploaded file. A daemon that cannot
    /// parse the file is a distinct failure from the upload failing.
    pub async fn get_uploaded_torrent_info(&self, path: &str) -> Result<UploadedTorrentInfo> {
        let raw: Value = self
            .request(
                "web.get_torrent_info",
                vec![json!(path)],
                Idempotency::Idempotent,
            )
            .await?;
        UploadedTorrentInfo::from_wire(&raw)
    }

    /// Step 2b: tell the daemon to add the uploaded file
    pub async fn add_uploaded_torrent(
        &self,
        path: &str,
        options: &AddTorrentOptions,
    ) -> Result<()> {
        let options = serde_json::to_value(options)?;
        self.request_ack(
            "web.add_torrents",
            vec![json!([{ "path": path, "options": options }])],
        )
        .await
    }

    /// Apply a partial option update to the given torrents
    pub async fn set_torrent_options(
        &self,
        hashes: &[&str],
        update: &TorrentOptionsUpdate,
    ) -> Result<()> {
        self.request_ack(
            "core.set_torrent_options",
            vec![json!(hashes), serde_json::to_value(update)?],
        )
        .await
    }

    /// Move the given torrents' storage to a new path
    pub async fn move_storage(&self, hashes: &[&str], path: &str) -> Result<()> {
        self.request_ack("core.move_storage", vec![json!(hashes), json!(path)])
            .await
    }
}
