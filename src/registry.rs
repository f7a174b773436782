//! Active-client registry backed by an external credential store
//!
//! Connection profiles (including passwords) live in a platform secure
//! store the library treats as an opaque key-value interface. The registry
//! tracks which profile is "active" and hands out the corresponding
//! [`DelugeClient`] behind a lock, so concurrent readers never observe a
//! half-written value.

use crate::client::DelugeClient;
use crate::config::{ConnectionProfile, TransportConfig};
use crate::error::{ClientError, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Store key for the list of configured profiles
pub const CLIENT_CONFIGS_KEY: &str = "ClientConfigs";
/// Store key for the nickname of the active profile
pub const ACTIVE_CLIENT_KEY: &str = "ActiveClient";

/// Opaque secure key-value store for connection profiles.
///
/// Implementations wrap whatever the platform provides (keychain,
/// keyring, encrypted file); the registry only needs get/set/remove.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, value: Vec<u8>);
    fn remove(&self, key: &str);
}

/// In-memory store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Process-wide holder of the currently active [`DelugeClient`].
///
/// At most one client is active at a time. Replacing it is outright: the
/// new client starts unauthenticated, no session state migrates.
pub struct ClientRegistry {
    store: Box<dyn CredentialStore>,
    transport_config: TransportConfig,
    active: RwLock<Option<Arc<DelugeClient>>>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("active", &self.active.read().is_some())
            .finish_non_exhaustive()
    }
}

impl ClientRegistry {
    pub fn new(store: Box<dyn CredentialStore>, transport_config: TransportConfig) -> Self {
        Self {
            store,
            transport_config,
            active: RwLock::new(None),
        }
    }

    /// All configured profiles, in saved order
    pub fn profiles(&self) -> Vec<ConnectionProfile> {
        self.store
            .get(CLIENT_CONFIGS_KEY)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    /// Insert or replace a profile, keyed by nickname
    pub fn save_profile(&self, profile: &ConnectionProfile) {
        let mut profiles = self.profiles();
        match profiles.iter_mut().find(|p| p.nickname == profile.nickname) {
            Some(existing) => *existing = profile.clone(),
            None => profiles.push(profile.clone()),
        }
        self.persist_profiles(&profiles);
    }

    /// Remove a profile; if it was active, the active client is dropped too
    pub fn remove_profile(&self, nickname: &str) {
        let profiles: Vec<ConnectionProfile> = self
            .profiles()
            .into_iter()
            .filter(|p| p.nickname != nickname)
            .collect();
        self.persist_profiles(&profiles);

        let was_active = {
            let active = self.active.read();
            active
                .as_ref()
                .is_some_and(|c| c.profile().nickname == nickname)
        };
        if was_active {
            self.clear_active();
        }
    }

    /// Make a profile the active one: persist it, mark it active, and
    /// replace any previous client with a fresh unauthenticated one
    pub fn set_active(&self, profile: ConnectionProfile) -> Result<Arc<DelugeClient>> {
        let client = Arc::new(DelugeClient::new(profile.clone(), &self.transport_config)?);
        self.save_profile(&profile);
        self.store
            .set(ACTIVE_CLIENT_KEY, profile.nickname.clone().into_bytes());
        debug!(nickname = %profile.nickname, "Activated client");
        *self.active.write() = Some(Arc::clone(&client));
        Ok(client)
    }

    /// The currently active client, if any
    pub fn active(&self) -> Option<Arc<DelugeClient>> {
        self.active.read().clone()
    }

    /// Drop the active client and clear the persisted marker
    pub fn clear_active(&self) {
        self.store.remove(ACTIVE_CLIENT_KEY);
        *self.active.write() = None;
    }

    /// Rebuild the active client from the persisted marker (startup path).
    /// Returns `Ok(None)` when no profile is marked active.
    pub fn restore_active(&self) -> Result<Option<Arc<DelugeClient>>> {
        let Some(bytes) = self.store.get(ACTIVE_CLIENT_KEY) else {
            return Ok(None);
        };
        let nickname = String::from_utf8(bytes)
            .map_err(|_| ClientError::Other("corrupt active-client marker".to_string()))?;

        let profile = self
            .profiles()
            .into_iter()
            .find(|p| p.nickname == nickname)
            .ok_or_else(|| {
                ClientError::Other(format!("active profile '{}' is not configured", nickname))
            })?;

        let client = Arc::new(DelugeClient::new(profile, &self.transport_config)?);
        *self.active.write() = Some(Arc::clone(&client));
        Ok(Some(client))
    }

    fn persist_profiles(&self, profiles: &[ConnectionProfile]) {
        if let Ok(bytes) = serde_json::to_vec(profiles) {
            self.store.set(CLIENT_CONFIGS_KEY, bytes);
        }
    }
}
