//! Membership proof verification for attestor client

use attestor_packet_membership::{
    verify_packet_membership::{verify_packet_membership, verify_packet_non_membership},
    PacketAttestation, PacketCommitments,
};
use ibc_eureka_types::Height;
use serde::{Deserialize, Serialize};

use crate::{
    client_state::ClientState, consensus_state::ConsensusState, error::IbcAttestorClientError,
    verify_attestation,
};

/// Self-contained re-assertion of facts at a height.
///
/// The signatures are over the attestation of `packets` at the queried height
/// and the timestamp trusted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// Attested facts
    pub packets: PacketCommitments,
    /// 65-byte signatures (r||s||v format)
    pub signatures: Vec<Vec<u8>>,
}

/// Verify membership proof - only works for heights that exist in consensus state
///
/// An empty `proof` checks against the facts stored by the update at `height`.
///
/// Returns the timestamp trusted for `height`.
///
/// # Errors
/// Returns an error if the height does not match the consensus state, the
/// proof lacks a quorum or the value is not attested at the path
pub fn verify_membership(
    consensus_state: &ConsensusState,
    client_state: &ClientState,
    height: Height,
    proof: &[u8],
    path: &[Vec<u8>],
    value: &[u8],
) -> Result<u64, IbcAttestorClientError> {
    let path = single_path(path)?;
    let decoded;
    let facts = if proof.is_empty() {
        check_consensus(consensus_state, client_state, height)?;
        &consensus_state.packets
    } else {
        decoded = verified_facts(consensus_state, client_state, height, proof)?;
        &decoded
    };

    verify_packet_membership(facts, path, value)?;
    Ok(consensus_state.timestamp)
}

/// Verify non-membership proof - only works for heights that exist in consensus state
///
/// Returns the timestamp trusted for `height`.
///
/// # Errors
/// Returns an error if the height does not match the consensus state, the
/// proof lacks a quorum or the path is not attested with a zero commitment
pub fn verify_non_membership(
    consensus_state: &ConsensusState,
    client_state: &ClientState,
    height: Height,
    proof: &[u8],
    path: &[Vec<u8>],
) -> Result<u64, IbcAttestorClientError> {
    let path = single_path(path)?;
    let decoded;
    let facts = if proof.is_empty() {
        check_consensus(consensus_state, client_state, height)?;
        &consensus_state.packets
    } else {
        decoded = verified_facts(consensus_state, client_state, height, proof)?;
        &decoded
    };

    verify_packet_non_membership(facts, path)?;
    Ok(consensus_state.timestamp)
}

fn single_path(path: &[Vec<u8>]) -> Result<&[u8], IbcAttestorClientError> {
    match path {
        [single] => Ok(single.as_slice()),
        _ => Err(IbcAttestorClientError::InvalidProof {
            reason: format!("expected a single path component, got {}", path.len()),
        }),
    }
}

fn check_consensus(
    consensus_state: &ConsensusState,
    client_state: &ClientState,
    height: Height,
) -> Result<(), IbcAttestorClientError> {
    if client_state.is_frozen {
        return Err(IbcAttestorClientError::ClientFrozen);
    }
    if consensus_state.height != height {
        return Err(IbcAttestorClientError::InvalidProof {
            reason: "heights must match".into(),
        });
    }
    Ok(())
}

fn verified_facts(
    consensus_state: &ConsensusState,
    client_state: &ClientState,
    height: Height,
    proof: &[u8],
) -> Result<PacketCommitments, IbcAttestorClientError> {
    check_consensus(consensus_state, client_state, height)?;

    let proof: MembershipProof = serde_json::from_slice(proof)
        .map_err(IbcAttestorClientError::DeserializeMembershipProofFailed)?;
    if let Some(path) = proof.packets.duplicate_path() {
        return Err(IbcAttestorClientError::InvalidProof {
            reason: format!("path {path} is attested more than once"),
        });
    }

    let attestation = PacketAttestation::new(height, consensus_state.timestamp, proof.packets);
    verify_attestation::verify_attestation(
        client_state,
        &attestation.signing_digest(),
        &proof.signatures,
    )?;

    Ok(attestation.packets)
}
