//! Test utilities for Attestor light client

pub use fixtures::*;

#[allow(missing_docs, clippy::missing_panics_doc)]
mod fixtures {
    use alloy_primitives::{Address, B256};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use attestor_packet_membership::{PacketAttestation, PacketCommitments, PacketCompact};
    use ibc_eureka_types::Height;

    use crate::{header::Header, membership::MembershipProof};

    const SIGNER_SEEDS: [u8; 5] = [0xcd, 0x02, 0x03, 0x10, 0x1f];

    /// Deterministic attestor keys
    #[must_use]
    pub fn signers() -> Vec<PrivateKeySigner> {
        SIGNER_SEEDS
            .iter()
            .map(|seed| PrivateKeySigner::from_slice(&[*seed; 32]).expect("valid key"))
            .collect()
    }

    #[must_use]
    pub fn addresses() -> Vec<Address> {
        signers().iter().map(PrivateKeySigner::address).collect()
    }

    /// 65-byte `r‖s‖v` signature over a prehashed digest
    #[must_use]
    pub fn sign_digest(signer: &PrivateKeySigner, digest: &[u8; 32]) -> Vec<u8> {
        signer
            .sign_hash_sync(&B256::from(*digest))
            .expect("signing should work")
            .as_bytes()
            .to_vec()
    }

    #[must_use]
    pub fn sign_attestation(
        attestation: &PacketAttestation,
        signers: &[PrivateKeySigner],
    ) -> Vec<Vec<u8>> {
        let digest = attestation.signing_digest();
        signers.iter().map(|s| sign_digest(s, &digest)).collect()
    }

    #[must_use]
    pub fn sample_packet_commitments() -> PacketCommitments {
        PacketCommitments::new(vec![
            PacketCompact::new([0x11u8; 32], [0x12u8; 32]),
            PacketCompact::new([0x21u8; 32], [0x22u8; 32]),
            PacketCompact::new([0x31u8; 32], [0x32u8; 32]),
        ])
    }

    /// Header at `height` signed by `signers`
    #[must_use]
    pub fn signed_header(
        height: Height,
        timestamp: u64,
        packets: PacketCommitments,
        signers: &[PrivateKeySigner],
    ) -> Header {
        let attestation = PacketAttestation::new(height, timestamp, packets);
        let signatures = sign_attestation(&attestation, signers);
        Header::new(height, timestamp, attestation.packets, signatures)
    }

    /// JSON encoded membership proof for facts at `height`
    #[must_use]
    pub fn membership_proof_bytes(
        height: Height,
        timestamp: u64,
        packets: PacketCommitments,
        signers: &[PrivateKeySigner],
    ) -> Vec<u8> {
        let attestation = PacketAttestation::new(height, timestamp, packets);
        let signatures = sign_attestation(&attestation, signers);
        let proof = MembershipProof {
            packets: attestation.packets,
            signatures,
        };
        serde_json::to_vec(&proof).expect("proof serializes")
    }
}
