//! RPC plumbing: wire envelopes and the HTTP transport
//!
//! This module handles everything between "a method name and its positional
//! params" and "raw JSON back from the daemon":
//! - Request/response envelope encoding and error-first decoding
//! - HTTP POST with per-call bounded retry and exponential backoff
//! - Session-cookie persistence across calls
//! - Multipart `.torrent` uploads

pub mod envelope;
pub mod transport;

pub use envelope::{RpcError, RpcRequest, RpcResponse};
pub use transport::{Idempotency, RetryPolicy, Transport};
