//! Attestor header types for IBC light client

use attestor_packet_membership::{PacketAttestation, PacketCommitments};
use ibc_eureka_types::Height;
use serde::{Deserialize, Serialize};

use crate::{consensus_state::ConsensusState, error::IbcAttestorClientError};

/// Attestor update message: a fact set at a height, signed by attestors.
///
/// Relayers submit it JSON encoded. Each signature is a 65-byte `r‖s‖v`
/// ECDSA signature over [`PacketAttestation::signing_digest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// The height being attested
    pub new_height: Height,
    /// Timestamp of the new height
    pub timestamp: u64,
    /// Ordered attested facts
    pub packets: PacketCommitments,
    /// Raw 65-byte signatures in (r||s||v) format for ECDSA address recovery
    pub signatures: Vec<Vec<u8>>,
}

impl Header {
    /// Create a new [`Header`]
    #[must_use]
    pub const fn new(
        new_height: Height,
        timestamp: u64,
        packets: PacketCommitments,
        signatures: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            new_height,
            timestamp,
            packets,
            signatures,
        }
    }

    /// Decode a JSON encoded header
    ///
    /// # Errors
    /// Returns an error if `bytes` is not a JSON header
    pub fn from_json(bytes: &[u8]) -> Result<Self, IbcAttestorClientError> {
        serde_json::from_slice(bytes)
            .map_err(IbcAttestorClientError::DeserializeClientMessageFailed)
    }

    /// The attestation the signatures are over
    #[must_use]
    pub fn attestation(&self) -> PacketAttestation {
        PacketAttestation::new(self.new_height, self.timestamp, self.packets.clone())
    }

    /// Whether this header attests exactly what `consensus_state` records
    #[must_use]
    pub fn matches(&self, consensus_state: &ConsensusState) -> bool {
        self.new_height == consensus_state.height
            && self.timestamp == consensus_state.timestamp
            && self.packets == consensus_state.packets
    }
}
