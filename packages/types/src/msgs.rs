//! Router message types, matching the ICS26 router wire messages.
//!
//! All messages are serde types; relayers submit them JSON encoded and proofs
//! are carried as opaque bytes whose format is defined by the light client.

use serde::{Deserialize, Serialize};

use crate::{height::Height, packet::Packet, packet::Payload};

/// Counterparty chain information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyInfo {
    /// Client ID on the counterparty chain
    pub client_id: String,
    /// Merkle prefix for proof verification
    pub merkle_prefix: Vec<Vec<u8>>,
}

/// Message for sending a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSendPacket {
    /// Local client the packet is sent through
    pub source_client: String,
    /// Timeout as unix seconds
    pub timeout_timestamp: u64,
    /// Application payload
    pub payload: Payload,
}

/// Message for receiving a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRecvPacket {
    /// Packet sent by the counterparty
    pub packet: Packet,
    /// Proof of the packet commitment on the counterparty
    pub proof_commitment: Vec<u8>,
    /// Counterparty height the proof is for
    pub proof_height: Height,
}

/// Message for acknowledging a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAckPacket {
    /// Packet originally sent from this chain
    pub packet: Packet,
    /// Acknowledgement written by the counterparty
    pub acknowledgement: Vec<u8>,
    /// Proof of the acknowledgement commitment on the counterparty
    pub proof_acked: Vec<u8>,
    /// Counterparty height the proof is for
    pub proof_height: Height,
}

/// Message for timing out a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTimeoutPacket {
    /// Packet originally sent from this chain
    pub packet: Packet,
    /// Proof of absence of the receipt on the counterparty
    pub proof_timeout: Vec<u8>,
    /// Counterparty height the proof is for
    pub proof_height: Height,
}
