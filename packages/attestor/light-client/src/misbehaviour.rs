//! Misbehaviour detection for the attestor client

use serde::{Deserialize, Serialize};

use crate::{
    client_state::ClientState, error::IbcAttestorClientError, header::Header, verify_attestation,
};

/// Two headers claiming different facts for the same height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misbehaviour {
    /// First header
    pub header_1: Header,
    /// Second header
    pub header_2: Header,
}

impl Misbehaviour {
    /// Decode a JSON encoded misbehaviour
    ///
    /// # Errors
    /// Returns an error if `bytes` is not a JSON misbehaviour
    pub fn from_json(bytes: &[u8]) -> Result<Self, IbcAttestorClientError> {
        serde_json::from_slice(bytes)
            .map_err(IbcAttestorClientError::DeserializeClientMessageFailed)
    }
}

/// Verify misbehaviour: both headers are quorum signed, at the same height,
/// and disagree on the timestamp or the facts.
///
/// # Errors
/// - The client is already frozen
/// - The headers are at different heights or are identical
/// - Either header lacks a quorum
pub fn verify_misbehaviour(
    client_state: &ClientState,
    misbehaviour: &Misbehaviour,
) -> Result<(), IbcAttestorClientError> {
    if client_state.is_frozen {
        return Err(IbcAttestorClientError::ClientFrozen);
    }

    let (header_1, header_2) = (&misbehaviour.header_1, &misbehaviour.header_2);
    if header_1.new_height != header_2.new_height {
        return Err(IbcAttestorClientError::InvalidHeader {
            reason: "misbehaviour headers must be at the same height".into(),
        });
    }
    if header_1.timestamp == header_2.timestamp && header_1.packets == header_2.packets {
        return Err(IbcAttestorClientError::InvalidHeader {
            reason: "misbehaviour headers attest the same state".into(),
        });
    }

    for header in [header_1, header_2] {
        verify_attestation::verify_attestation(
            client_state,
            &header.attestation().signing_digest(),
            &header.signatures,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use attestor_packet_membership::PacketCommitments;
    use ibc_eureka_types::Height;

    use super::*;
    use crate::test_utils::{addresses, sample_packet_commitments, signed_header, signers};

    fn client_state() -> ClientState {
        ClientState::new(addresses()[..3].to_vec(), 2, Height::at(100)).unwrap()
    }

    fn header(height: u64, timestamp: u64, signer_count: usize) -> Header {
        signed_header(
            Height::at(height),
            timestamp,
            sample_packet_commitments(),
            &signers()[..signer_count],
        )
    }

    #[test]
    fn conflicting_timestamps_are_misbehaviour() {
        let msg = Misbehaviour {
            header_1: header(105, 1_000, 2),
            header_2: header(105, 1_001, 3),
        };
        assert!(verify_misbehaviour(&client_state(), &msg).is_ok());
    }

    #[test]
    fn conflicting_facts_are_misbehaviour() {
        let header_2 = signed_header(
            Height::at(105),
            1_000,
            PacketCommitments::default(),
            &signers()[..2],
        );
        let msg = Misbehaviour {
            header_1: header(105, 1_000, 2),
            header_2,
        };
        assert!(verify_misbehaviour(&client_state(), &msg).is_ok());
    }

    #[test]
    fn different_heights_are_rejected() {
        let msg = Misbehaviour {
            header_1: header(105, 1_000, 2),
            header_2: header(106, 1_001, 2),
        };
        let res = verify_misbehaviour(&client_state(), &msg);
        assert!(matches!(
            res,
            Err(IbcAttestorClientError::InvalidHeader { reason }) if reason.contains("same height")
        ));
    }

    #[test]
    fn identical_headers_are_rejected() {
        let msg = Misbehaviour {
            header_1: header(105, 1_000, 2),
            header_2: header(105, 1_000, 3),
        };
        let res = verify_misbehaviour(&client_state(), &msg);
        assert!(matches!(
            res,
            Err(IbcAttestorClientError::InvalidHeader { reason }) if reason.contains("same state")
        ));
    }

    #[test]
    fn unsigned_header_is_rejected() {
        let msg = Misbehaviour {
            header_1: header(105, 1_000, 2),
            header_2: header(105, 1_001, 1),
        };
        let res = verify_misbehaviour(&client_state(), &msg);
        assert!(matches!(
            res,
            Err(IbcAttestorClientError::InsufficientSignatures { found: 1, .. })
        ));
    }

    #[test]
    fn json_round_trip_through_from_json() {
        let msg = Misbehaviour {
            header_1: header(105, 1_000, 2),
            header_2: header(105, 1_001, 2),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        assert_eq!(Misbehaviour::from_json(&bytes).unwrap(), msg);
        assert!(matches!(
            Misbehaviour::from_json(b"{}"),
            Err(IbcAttestorClientError::DeserializeClientMessageFailed(_))
        ));
    }
}
