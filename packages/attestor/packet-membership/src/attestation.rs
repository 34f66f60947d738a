//! The statement attestors sign: a fact set at a height and timestamp.

use alloy_sol_types::SolValue;
use ibc_eureka_types::Height;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::packet_commitments::{PacketCommitments, B32};

/// ABI shape: `(uint64 revisionNumber, uint64 revisionHeight, uint64 timestamp, (bytes32,bytes32)[] packets)`
type AbiAttestation = (u64, u64, u64, Vec<(B32, B32)>);

/// A set of facts attested at a counterparty height.
///
/// The ABI encoding is canonical and order sensitive: the same facts in a
/// different order produce a different signing digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketAttestation {
    /// Counterparty height the facts hold at
    pub height: Height,
    /// Counterparty timestamp (unix seconds) at `height`
    pub timestamp: u64,
    /// Ordered attested facts
    pub packets: PacketCommitments,
}

impl PacketAttestation {
    /// Create a new [`PacketAttestation`]
    #[must_use]
    pub const fn new(height: Height, timestamp: u64, packets: PacketCommitments) -> Self {
        Self {
            height,
            timestamp,
            packets,
        }
    }

    /// Canonical ABI encoding of the attestation
    #[must_use]
    pub fn to_abi_bytes(&self) -> Vec<u8> {
        let abi: AbiAttestation = (
            self.height.revision_number,
            self.height.revision_height,
            self.timestamp,
            self.packets.to_tuples(),
        );
        abi.abi_encode()
    }

    /// Decode an attestation from its ABI encoding
    ///
    /// # Errors
    /// Returns an error if `raw` is not a valid encoding
    pub fn from_abi_bytes(raw: &[u8]) -> Result<Self, alloy_sol_types::Error> {
        let (revision_number, revision_height, timestamp, packets) =
            <AbiAttestation as SolValue>::abi_decode(raw)?;
        Ok(Self {
            height: Height::new(revision_number, revision_height),
            timestamp,
            packets: packets.into_iter().collect(),
        })
    }

    /// The digest attestors sign: `sha256(abi_encode(attestation))`
    #[must_use]
    pub fn signing_digest(&self) -> [u8; 32] {
        Sha256::digest(self.to_abi_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PacketCompact;

    fn attestation(packets: Vec<PacketCompact>) -> PacketAttestation {
        PacketAttestation::new(Height::at(101), 1_700_000_000, PacketCommitments::new(packets))
    }

    #[test]
    fn abi_decoding_restores_fields() {
        let att = attestation(vec![
            PacketCompact::new([1u8; 32], [2u8; 32]),
            PacketCompact::absent(b"path"),
        ]);
        let decoded = PacketAttestation::from_abi_bytes(&att.to_abi_bytes()).unwrap();
        assert_eq!(decoded, att);
    }

    #[test]
    fn digest_is_order_sensitive() {
        let a = PacketCompact::new([1u8; 32], [2u8; 32]);
        let b = PacketCompact::new([3u8; 32], [4u8; 32]);

        assert_eq!(
            attestation(vec![a, b]).signing_digest(),
            attestation(vec![a, b]).signing_digest()
        );
        assert_ne!(
            attestation(vec![a, b]).signing_digest(),
            attestation(vec![b, a]).signing_digest()
        );
    }

    #[test]
    fn digest_binds_height_and_timestamp() {
        let facts = vec![PacketCompact::new([1u8; 32], [2u8; 32])];
        let base = attestation(facts.clone());

        let mut other_height = attestation(facts.clone());
        other_height.height = Height::at(102);
        let mut other_revision = attestation(facts.clone());
        other_revision.height = Height::new(1, 101);
        let mut other_timestamp = attestation(facts);
        other_timestamp.timestamp += 1;

        for other in [other_height, other_revision, other_timestamp] {
            assert_ne!(base.signing_digest(), other.signing_digest());
        }
    }

    #[test]
    fn json_uses_hex_fact_encoding() {
        let att = attestation(vec![PacketCompact::new([0xabu8; 32], [0u8; 32])]);
        let json = serde_json::to_value(&att).unwrap();
        let path = json["packets"][0]["path"].as_str().unwrap();
        assert!(path.starts_with("0xabab"));
    }
}
