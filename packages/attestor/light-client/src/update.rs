//! Attestor light client update logic

use ibc_eureka_types::Height;
use serde::{Deserialize, Serialize};

use crate::{
    client_state::ClientState, consensus_state::ConsensusState, error::IbcAttestorClientError,
    header::Header, verify, verify_attestation,
};

/// Outcome of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateResult {
    /// A new consensus state was stored
    Update,
    /// The header is already trusted
    NoOp,
    /// The header conflicts with a trusted consensus state; the client is frozen
    Misbehaviour,
}

/// State to persist after processing a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChanges {
    /// Outcome reported to the caller
    pub result: UpdateResult,
    /// Consensus state to store under its height
    pub consensus_state: Option<ConsensusState>,
    /// Client state to replace the current one with
    pub client_state: Option<ClientState>,
}

impl StateChanges {
    const fn no_op() -> Self {
        Self {
            result: UpdateResult::NoOp,
            consensus_state: None,
            client_state: None,
        }
    }
}

/// Updates the consensus state with a new header
/// Returns (`new_height`, `new_consensus_state`, `optional_new_client_state`)
///
/// The client state only changes when the header moves the trusted
/// frontier forward; backfilled heights leave it untouched.
#[must_use]
pub fn update_consensus_state(
    current_client_state: &ClientState,
    header: &Header,
) -> (Height, ConsensusState, Option<ClientState>) {
    let new_consensus_state = ConsensusState {
        height: header.new_height,
        timestamp: header.timestamp,
        packets: header.packets.clone(),
    };

    let height_has_progressed = header.new_height > current_client_state.latest_height;
    let new_client_state = height_has_progressed.then(|| ClientState {
        latest_height: header.new_height,
        ..current_client_state.clone()
    });

    (header.new_height, new_consensus_state, new_client_state)
}

/// Whether `header` conflicts with what is trusted at its height
#[must_use]
pub fn check_for_misbehaviour(existing_trusted: Option<&ConsensusState>, header: &Header) -> bool {
    existing_trusted.is_some_and(|trusted| !header.matches(trusted))
}

/// Processes a header against the stored consensus states around its height.
///
/// `trusted` is the consensus state at the header height, `prev`/`next` the
/// closest ones below and above it.
///
/// - A header identical to the trusted one is a no-op and needs no signatures.
/// - A quorum-signed header conflicting with the trusted one freezes the client.
/// - Otherwise the header is verified and a new consensus state is produced.
///
/// # Errors
/// - The client is frozen
/// - The header lacks a quorum, see [`verify_attestation::verify_attestation`]
/// - The header fails the checks of [`verify::verify_header`]
pub fn process_header(
    client_state: &ClientState,
    trusted: Option<&ConsensusState>,
    prev: Option<&ConsensusState>,
    next: Option<&ConsensusState>,
    header: &Header,
) -> Result<StateChanges, IbcAttestorClientError> {
    if client_state.is_frozen {
        return Err(IbcAttestorClientError::ClientFrozen);
    }

    if let Some(trusted) = trusted {
        if header.matches(trusted) {
            return Ok(StateChanges::no_op());
        }

        verify_attestation::verify_attestation(
            client_state,
            &header.attestation().signing_digest(),
            &header.signatures,
        )?;

        return Ok(StateChanges {
            result: UpdateResult::Misbehaviour,
            consensus_state: None,
            client_state: Some(ClientState {
                is_frozen: true,
                ..client_state.clone()
            }),
        });
    }

    verify::verify_header(None, prev, next, client_state, header)?;

    let (_, consensus_state, client_state) = update_consensus_state(client_state, header);
    Ok(StateChanges {
        result: UpdateResult::Update,
        consensus_state: Some(consensus_state),
        client_state,
    })
}
