//! Generic functions for verifying the membership of IBC packet
//! commitments in an attested fact set.

use ibc_eureka_types::ics24::path_hash;

use crate::{packet_commitments::PacketCommitments, PacketAttestationError, PacketCompact};

/// Verifies that `value` is attested at `path`.
///
/// The fact must match byte for byte: the path hash selects the entry and the
/// stored commitment must equal `value`.
///
/// # Errors
/// - The path is not attested
/// - The path is attested with a different value
#[allow(clippy::module_name_repetitions)]
pub fn verify_packet_membership(
    proof: &PacketCommitments,
    path: &[u8],
    value: &[u8],
) -> Result<(), PacketAttestationError> {
    if value.is_empty() {
        return Err(PacketAttestationError::VerificationFailed {
            reason: "membership value cannot be empty".into(),
        });
    }

    let fact = find_fact(proof, path)?;
    if fact.commitment.as_slice() == value {
        Ok(())
    } else {
        Err(PacketAttestationError::VerificationFailed {
            reason: "value does not match attested commitment".into(),
        })
    }
}

/// Verifies that `path` is attested as absent (zero commitment).
///
/// # Errors
/// - The path is not attested
/// - The path is attested with a non-zero commitment
#[allow(clippy::module_name_repetitions)]
pub fn verify_packet_non_membership(
    proof: &PacketCommitments,
    path: &[u8],
) -> Result<(), PacketAttestationError> {
    let fact = find_fact(proof, path)?;
    if fact.is_absence() {
        Ok(())
    } else {
        Err(PacketAttestationError::VerificationFailed {
            reason: "expected zero commitment for non-membership".into(),
        })
    }
}

fn find_fact<'a>(
    proof: &'a PacketCommitments,
    path: &[u8],
) -> Result<&'a PacketCompact, PacketAttestationError> {
    proof
        .find_by_path(&path_hash(path).into())
        .ok_or_else(|| PacketAttestationError::VerificationFailed {
            reason: "value does not exist in proof".into(),
        })
}
