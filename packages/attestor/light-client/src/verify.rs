//! Attestor light client verification logic

use crate::{
    client_state::ClientState, consensus_state::ConsensusState, error::IbcAttestorClientError,
    header::Header, verify_attestation,
};

/// Verifies the header of the light client
///
/// Trusted consensus state must be retrieved using the header
/// height.
///
/// Assumes that optional previous and next consensuses have
/// been reliably retrieved using height. Only a timestamp
/// validation takes place
///
/// # Errors
/// Returns an error if:
/// - The client is frozen
/// - The header has a zero height or timestamp
/// - The header attests the same path twice
/// - The header attestation verification fails. see [`verify_attestation::verify_attestation`]
/// - The header does not match the trusted consensus state
/// - The header's timestamp is not monotonically increasing
pub fn verify_header(
    existing_trusted_consensus: Option<&ConsensusState>,
    existing_prev_trusted_consensus: Option<&ConsensusState>,
    existing_next_trusted_consensus: Option<&ConsensusState>,
    client_state: &ClientState,
    header: &Header,
) -> Result<(), IbcAttestorClientError> {
    if client_state.is_frozen {
        return Err(IbcAttestorClientError::ClientFrozen);
    }

    if header.new_height.is_zero() || header.timestamp == 0 {
        return Err(IbcAttestorClientError::InvalidHeader {
            reason: "height and timestamp must be non-zero".into(),
        });
    }

    if let Some(path) = header.packets.duplicate_path() {
        return Err(IbcAttestorClientError::InvalidHeader {
            reason: format!("path {path} is attested more than once"),
        });
    }

    verify_attestation::verify_attestation(
        client_state,
        &header.attestation().signing_digest(),
        &header.signatures,
    )?;

    if let Some(trusted_consensus) = existing_trusted_consensus {
        if !header.matches(trusted_consensus) {
            return Err(IbcAttestorClientError::InvalidHeader {
                reason: "header does not match consensus state".into(),
            });
        }
        return Ok(());
    }

    match (
        existing_prev_trusted_consensus,
        existing_next_trusted_consensus,
    ) {
        (Some(prev), Some(next)) => {
            if !(header.timestamp > prev.timestamp && header.timestamp < next.timestamp) {
                return Err(IbcAttestorClientError::InvalidHeader {
                    reason:
                        "timestamp must increase monotonically between previous and next timestamps"
                            .into(),
                });
            }
        }
        (Some(prev), None) => {
            if header.timestamp < prev.timestamp {
                return Err(IbcAttestorClientError::InvalidHeader {
                    reason: "timestamp must increase monotonically after previous timestamp".into(),
                });
            }
        }

        (None, Some(next)) => {
            if header.timestamp > next.timestamp {
                return Err(IbcAttestorClientError::InvalidHeader {
                    reason: "timestamp must increase monotonically before next timestamp".into(),
                });
            }
        }
        // First in storage
        (None, None) => {}
    }

    Ok(())
}
