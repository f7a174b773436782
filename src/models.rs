//! Typed models for RPC result payloads
//!
//! Deluge's wire format is loosely typed and varies across daemon versions:
//! flags arrive as booleans or integers, per-file progress as a scalar or an
//! array, host tuples with 3 or 5 elements. Each ambiguity is modeled as an
//! explicit two-shape union with a fixed decode-attempt order; anything that
//! matches neither shape fails decoding outright rather than producing a
//! partially-populated model.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A flag that older daemons encode as an integer.
///
/// Decode order: native boolean first, then integer. Any other JSON type
/// is a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    /// Normalize: `0` is false, any nonzero integer is true
    pub fn as_bool(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Bool(false)
    }
}

impl From<bool> for Flag {
    fn from(b: bool) -> Self {
        Flag::Bool(b)
    }
}

/// Per-file progress that arrives as a scalar (single file) or an array
/// (directory aggregate). Decode order: scalar first, then array.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FileProgress {
    Scalar(f64),
    PerFile(Vec<f64>),
}

impl FileProgress {
    /// Normalized view: a scalar becomes a one-element slice
    pub fn values(&self) -> &[f64] {
        match self {
            FileProgress::Scalar(v) => std::slice::from_ref(v),
            FileProgress::PerFile(v) => v,
        }
    }

    /// True when the wire sent an array (directories aggregate their
    /// children's progress; files send a scalar)
    pub fn is_aggregate(&self) -> bool {
        matches!(self, FileProgress::PerFile(_))
    }
}

impl Default for FileProgress {
    fn default() -> Self {
        FileProgress::Scalar(0.0)
    }
}

/// One daemon instance the web UI can proxy to.
///
/// The wire tuple arity varies across daemon API versions: 5 elements carry
/// `[id, url, port, status, version]`, while 3 (or anything else) carry only
/// `[id, status, ...]`. The decoder branches on length before indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    pub id: String,
    pub url: Option<String>,
    pub port: Option<u16>,
    pub status: Option<String>,
    pub version: Option<String>,
}

impl Host {
    /// The daemon process is running and accepting connections
    pub fn is_online(&self) -> bool {
        self.status.as_deref() == Some("Online")
    }

    /// The web UI already holds a connection to this daemon
    pub fn is_connected(&self) -> bool {
        self.status.as_deref() == Some("Connected")
    }

    fn from_tuple(raw: &[Value]) -> std::result::Result<Self, String> {
        let text = |v: &Value| -> Option<String> { v.as_str().map(|s| s.to_string()) };

        let id = raw
            .first()
            .and_then(|v| text(v))
            .ok_or_else(|| "host tuple has no id".to_string())?;

        if raw.len() == 5 {
            Ok(Host {
                id,
                url: text(&raw[1]),
                port: raw[2].as_u64().and_then(|p| u16::try_from(p).ok()),
                status: text(&raw[3]),
                version: text(&raw[4]),
            })
        } else {
            Ok(Host {
                id,
                url: None,
                port: None,
                status: raw.get(1).and_then(text),
                version: None,
            })
        }
    }
}

impl<'de> Deserialize<'de> for Host {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<Value>::deserialize(deserializer)?;
        Host::from_tuple(&raw).map_err(serde::de::Error::custom)
    }
}

/// Lifecycle state reported per torrent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TorrentState {
    Downloading,
    Seeding,
    Paused,
    Checking,
    Queued,
    Allocating,
    Moving,
    Error,
    /// Any state string this client does not know about
    Other(String),
}

impl From<String> for TorrentState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Downloading" => Self::Downloading,
            "Seeding" => Self::Seeding,
            "Paused" => Self::Paused,
            "Checking" => Self::Checking,
            "Queued" => Self::Queued,
            "Allocating" => Self::Allocating,
            "Moving" => Self::Moving,
            "Error" => Self::Error,
            _ => Self::Other(s),
        }
    }
}

impl std::fmt::Display for TorrentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloading => write!(f, "Downloading"),
            Self::Seeding => write!(f, "Seeding"),
            Self::Paused => write!(f, "Paused"),
            Self::Checking => write!(f, "Checking"),
            Self::Queued => write!(f, "Queued"),
            Self::Allocating => write!(f, "Allocating"),
            Self::Moving => write!(f, "Moving"),
            Self::Error => write!(f, "Error"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Fields requested for the torrent list view
pub const OVERVIEW_FIELDS: &[&str] = &[
    "hash",
    "name",
    "state",
    "progress",
    "download_payload_rate",
    "upload_payload_rate",
    "ratio",
    "total_size",
    "label",
    "tracker_host",
    "eta",
];

/// One row of the torrent list.
///
/// Identity is by `hash`; the wire keys the status map by hash and the
/// client reconciles wholesale on each poll.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentOverview {
    #[serde(default)]
    pub hash: String,
    pub name: String,
    pub state: TorrentState,
    /// 0-100
    pub progress: f64,
    #[serde(default)]
    pub download_payload_rate: f64,
    #[serde(default)]
    pub upload_payload_rate: f64,
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub total_size: u64,
    /// Only present when the Label plugin is enabled
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tracker_host: String,
    /// Seconds; 0 when unknown
    #[serde(default)]
    pub eta: f64,
}

/// A peer attached to one torrent
#[derive(Debug, Clone, Deserialize)]
pub struct Peer {
    pub ip: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub down_speed: f64,
    #[serde(default)]
    pub up_speed: f64,
    #[serde(default)]
    pub progress: f64,
}

/// A tracker attached to one torrent
#[derive(Debug, Clone, Deserialize)]
pub struct Tracker {
    pub url: String,
    #[serde(default)]
    pub tier: i64,
}

/// Full per-torrent status for the detail view
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentDetail {
    #[serde(default)]
    pub hash: String,
    pub name: String,
    pub state: TorrentState,
    pub progress: f64,
    #[serde(default)]
    pub download_payload_rate: f64,
    #[serde(default)]
    pub upload_payload_rate: f64,
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub eta: f64,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub total_done: u64,
    #[serde(default)]
    pub total_uploaded: u64,
    #[serde(default)]
    pub num_seeds: i64,
    #[serde(default)]
    pub total_seeds: i64,
    #[serde(default)]
    pub num_peers: i64,
    #[serde(default)]
    pub total_peers: i64,
    #[serde(default)]
    pub active_time: i64,
    #[serde(default)]
    pub seeding_time: i64,
    #[serde(default)]
    pub piece_length: u64,
    #[serde(default)]
    pub save_path: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tracker_host: String,
    #[serde(default)]
    pub private: Flag,
    #[serde(default)]
    pub is_auto_managed: Flag,
    #[serde(default)]
    pub prioritize_first_last: Flag,
    #[serde(default)]
    pub move_completed: Flag,
    #[serde(default)]
    pub move_completed_path: String,
    #[serde(default)]
    pub remove_at_ratio: Flag,
    #[serde(default)]
    pub stop_at_ratio: Flag,
    #[serde(default)]
    pub stop_ratio: f64,
    #[serde(default)]
    pub max_connections: i64,
    #[serde(default)]
    pub max_download_speed: f64,
    #[serde(default)]
    pub max_upload_slots: i64,
    #[serde(default)]
    pub max_upload_speed: f64,
    #[serde(default)]
    pub file_progress: Option<FileProgress>,
    #[serde(default)]
    pub peers: Vec<Peer>,
    #[serde(default)]
    pub trackers: Vec<Tracker>,
}

/// One node of a torrent's file tree.
///
/// Directories own their children exclusively and carry an aggregate
/// progress array; files carry a scalar progress plus piece index/offset.
#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    pub name: String,
    pub size: u64,
    pub progress: FileProgress,
    pub index: Option<u64>,
    pub offset: Option<u64>,
    pub directory: bool,
    pub children: Vec<FileNode>,
}

impl FileNode {
    /// Build the tree from the `web.get_torrent_files` result.
    ///
    /// The wire shape is a map keyed by path segment: a node with a
    /// `contents` map is a directory (recurse into each value), otherwise
    /// a leaf. The root is the single key of the top-level `contents` map.
    pub fn from_wire(value: &Value) -> Result<FileNode> {
        let contents = value
            .get("contents")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ClientError::Decoding("file tree has no top-level contents map".to_string())
            })?;

        let (name, node) = contents.iter().next().ok_or_else(|| {
            ClientError::Decoding("file tree contents map is empty".to_string())
        })?;

        Self::from_node(name, node)
    }

    fn from_node(name: &str, value: &Value) -> Result<FileNode> {
        let size = value.get("size").and_then(Value::as_u64).ok_or_else(|| {
            ClientError::Decoding(format!("file tree node '{}' has no size", name))
        })?;

        let progress = match value.get("progress") {
            Some(p) => serde_json::from_value(p.clone()).map_err(|_| {
                ClientError::Decoding(format!(
                    "file tree node '{}' has a malformed progress value",
                    name
                ))
            })?,
            None => FileProgress::default(),
        };

        if let Some(contents) = value.get("contents").and_then(Value::as_object) {
            let mut children = contents
                .iter()
                .map(|(child_name, child)| Self::from_node(child_name, child))
                .collect::<Result<Vec<_>>>()?;
            children.sort_by(|a, b| a.name.cmp(&b.name));

            Ok(FileNode {
                name: name.to_string(),
                size,
                progress,
                index: None,
                offset: None,
                directory: true,
                children,
            })
        } else {
            Ok(FileNode {
                name: name.to_string(),
                size,
                progress,
                index: value.get("index").and_then(Value::as_u64),
                offset: value.get("offset").and_then(Value::as_u64),
                directory: false,
                children: Vec::new(),
            })
        }
    }
}

/// Keys requested from `core.get_session_status`
pub const SESSION_STATS_KEYS: &[&str] = &[
    "payload_download_rate",
    "payload_upload_rate",
    "download_rate",
    "upload_rate",
    "total_download",
    "total_upload",
    "dht_nodes",
    "has_incoming_connections",
    "num_peers",
];

/// Session-wide statistics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub payload_download_rate: f64,
    #[serde(default)]
    pub payload_upload_rate: f64,
    #[serde(default)]
    pub download_rate: f64,
    #[serde(default)]
    pub upload_rate: f64,
    #[serde(default)]
    pub total_download: u64,
    #[serde(default)]
    pub total_upload: u64,
    #[serde(default)]
    pub dht_nodes: u64,
    #[serde(default)]
    pub has_incoming_connections: Flag,
    #[serde(default)]
    pub num_peers: u64,
}

/// Options dict sent with every add-torrent variant
#[derive(Debug, Clone, Serialize)]
pub struct AddTorrentOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_priorities: Vec<u8>,
    pub add_paused: bool,
    /// Only meaningful on 1.x daemons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact_allocation: Option<bool>,
    pub move_completed: bool,
    pub move_completed_path: String,
    pub max_connections: i64,
    pub max_download_speed: f64,
    pub max_upload_slots: i64,
    pub max_upload_speed: f64,
    pub prioritize_first_last_pieces: bool,
}

impl Default for AddTorrentOptions {
    fn default() -> Self {
        Self {
            file_priorities: Vec::new(),
            add_paused: false,
            compact_allocation: None,
            move_completed: false,
            move_completed_path: String::new(),
            max_connections: -1,
            max_download_speed: -1.0,
            max_upload_slots: -1,
            max_upload_speed: -1.0,
            prioritize_first_last_pieces: false,
        }
    }
}

/// Fields requested by `get_torrent_options`
pub const TORRENT_OPTIONS_FIELDS: &[&str] = &[
    "is_auto_managed",
    "prioritize_first_last",
    "move_completed",
    "move_completed_path",
    "remove_at_ratio",
    "stop_at_ratio",
    "stop_ratio",
    "private",
    "max_connections",
    "max_download_speed",
    "max_upload_slots",
    "max_upload_speed",
];

/// Current per-torrent option values (read side)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TorrentOptions {
    #[serde(default)]
    pub is_auto_managed: Flag,
    #[serde(default)]
    pub prioritize_first_last: Flag,
    #[serde(default)]
    pub move_completed: Flag,
    #[serde(default)]
    pub move_completed_path: String,
    #[serde(default)]
    pub remove_at_ratio: Flag,
    #[serde(default)]
    pub stop_at_ratio: Flag,
    #[serde(default)]
    pub stop_ratio: f64,
    #[serde(default)]
    pub private: Flag,
    #[serde(default)]
    pub max_connections: i64,
    #[serde(default)]
    pub max_download_speed: f64,
    #[serde(default)]
    pub max_upload_slots: i64,
    #[serde(default)]
    pub max_upload_speed: f64,
}

/// Partial per-torrent option update (write side).
///
/// Only fields that are set are serialized, so an update touches exactly
/// what the caller asked for.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TorrentOptionsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_auto_managed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritize_first_last: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_completed_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_at_ratio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_at_ratio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_download_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_slots: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_speed: Option<f64>,
}

/// Metadata resolved from a magnet URI by `web.get_magnet_info`
#[derive(Debug, Clone, Deserialize)]
pub struct MagnetInfo {
    pub name: String,
    pub info_hash: String,
}

/// Metadata for an uploaded `.torrent` file from `web.get_torrent_info`
#[derive(Debug, Clone)]
pub struct UploadedTorrentInfo {
    pub name: String,
    pub info_hash: String,
    pub files: Option<FileNode>,
}

impl UploadedTorrentInfo {
    /// Decode the `web.get_torrent_info` result.
    ///
    /// The daemon returns `false` instead of an object when it cannot
    /// parse the uploaded file; that is a distinct failure from the upload
    /// itself failing.
    pub fn from_wire(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            ClientError::UnexpectedResponse(
                "daemon could not parse the uploaded torrent file".to_string(),
            )
        })?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Decoding("torrent info has no name".to_string()))?
            .to_string();
        let info_hash = obj
            .get("info_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Decoding("torrent info has no info_hash".to_string()))?
            .to_string();

        let files = match obj.get("files_tree") {
            Some(tree) if tree.is_object() => Some(FileNode::from_wire(tree)?),
            _ => None,
        };

        Ok(Self {
            name,
            info_hash,
            files,
        })
    }
}

/// Config keys fetched for the default add-torrent options
pub const ADD_DEFAULTS_KEYS: &[&str] = &[
    "add_paused",
    "compact_allocation",
    "download_location",
    "move_completed",
    "move_completed_path",
    "max_connections_per_torrent",
    "max_download_speed_per_torrent",
    "max_upload_slots_per_torrent",
    "max_upload_speed_per_torrent",
    "prioritize_first_last_pieces",
];

/// Daemon-side defaults for new torrents (`core.get_config_values`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddTorrentDefaults {
    #[serde(default)]
    pub add_paused: Flag,
    #[serde(default)]
    pub compact_allocation: Option<Flag>,
    #[serde(default)]
    pub download_location: String,
    #[serde(default)]
    pub move_completed: Flag,
    #[serde(default)]
    pub move_completed_path: String,
    #[serde(default)]
    pub max_connections_per_torrent: i64,
    #[serde(default)]
    pub max_download_speed_per_torrent: f64,
    #[serde(default)]
    pub max_upload_slots_per_torrent: i64,
    #[serde(default)]
    pub max_upload_speed_per_torrent: f64,
    #[serde(default)]
    pub prioritize_first_last_pieces: Flag,
}
