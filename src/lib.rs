//! # deluge-web
//!
//! A client library for remotely controlling a Deluge BitTorrent daemon
//! over its JSON-RPC web API.
//!
//! ## Features
//!
//! - **Typed RPC**: every method returns a strongly-typed model; the wire
//!   protocol's polymorphic shapes (int-encoded booleans, scalar-or-array
//!   progress, variable-arity host tuples) are normalized at decode time
//! - **Transparent sessions**: authentication and daemon-host connection
//!   are established on demand and silently re-established when the
//!   session expires
//! - **Bounded retry**: transport failures are retried with exponential
//!   backoff, but only for idempotent calls; mutations are sent once
//! - **Async**: built on Tokio; concurrent calls share one session safely
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deluge_web::{ConnectionProfile, DelugeClient, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = ConnectionProfile {
//!         nickname: "seedbox".into(),
//!         host: "d.example.com".into(),
//!         port: 8112,
//!         base_path: String::new(),
//!         password: "secret".into(),
//!         tls: true,
//!         accept_invalid_certs: false,
//!     };
//!
//!     let client = DelugeClient::new(profile, &TransportConfig::default())?;
//!     for torrent in client.get_torrents().await? {
//!         println!("{} {} {:.1}%", torrent.hash, torrent.name, torrent.progress);
//!     }
//!     Ok(())
//! }
//! ```

// Modules
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod rpc;
pub mod session;

// Re-exports for convenience
pub use client::DelugeClient;
pub use config::{ConnectionProfile, TransportConfig};
pub use error::{ClientError, Result, TransportErrorKind};
pub use models::{
    AddTorrentDefaults, AddTorrentOptions, FileNode, FileProgress, Flag, Host, MagnetInfo, Peer,
    SessionStats, TorrentDetail, TorrentOptions, TorrentOptionsUpdate, TorrentOverview,
    TorrentState, Tracker, UploadedTorrentInfo,
};
pub use registry::{ClientRegistry, CredentialStore, MemoryStore};
pub use session::{SessionManager, SessionState};
