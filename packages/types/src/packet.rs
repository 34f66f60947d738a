//! IBC Eureka packet and payload types

use serde::{Deserialize, Serialize};

/// Application data carried by a packet, addressed from one port to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Port of the sending application
    pub source_port: String,
    /// Port of the receiving application
    pub dest_port: String,
    /// Application version
    pub version: String,
    /// Encoding of `value`, e.g. `application/json`
    pub encoding: String,
    /// Opaque application bytes
    pub value: Vec<u8>,
}

/// A packet sent from `source_client` on this chain to `dest_client` on the counterparty.
///
/// Packets are never persisted, only their commitment is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Per-client sequence number, starting at 1
    pub sequence: u64,
    /// Client identifier on the sending chain
    pub source_client: String,
    /// Client identifier on the receiving chain
    pub dest_client: String,
    /// Timeout as unix seconds
    pub timeout_timestamp: u64,
    /// Ordered payload list
    pub payloads: Vec<Payload>,
}
