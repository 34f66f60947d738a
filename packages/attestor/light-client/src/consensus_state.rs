//! Attestor consensus state: what the quorum attested at one height

use attestor_packet_membership::{PacketAttestation, PacketCommitments};
use ibc_eureka_types::Height;
use serde::{Deserialize, Serialize};

/// Trusted record of a verified header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusState {
    /// Height the record is for
    pub height: Height,
    /// Counterparty timestamp (unix seconds) at `height`
    pub timestamp: u64,
    /// Facts the quorum attested at `height`
    pub packets: PacketCommitments,
}

impl ConsensusState {
    /// The attestation this record was built from
    #[must_use]
    pub fn attestation(&self) -> PacketAttestation {
        PacketAttestation::new(self.height, self.timestamp, self.packets.clone())
    }
}
