//! Attestor-backed [`LightClient`]: the stateful side of the attestor client,
//! keeping the client state and every trusted consensus state by height.

use std::{
    collections::BTreeMap,
    ops::Bound::{Excluded, Unbounded},
};

use attestor_light_client::{
    client_state::ClientState,
    consensus_state::ConsensusState,
    error::IbcAttestorClientError,
    header::Header,
    membership,
    misbehaviour::{verify_misbehaviour, Misbehaviour},
    update::{self, process_header},
};
use attestor_packet_membership::PacketCommitments;
use ibc_eureka_types::Height;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    ClientStatus, LightClient, LightClientError, MembershipMsg, NonMembershipMsg, UpdateResult,
};

/// Client type of attestor clients
pub const ATTESTOR_CLIENT_TYPE: &str = "attestor";

#[derive(Serialize, Deserialize)]
struct Snapshot {
    client_state: ClientState,
    consensus_states: Vec<ConsensusState>,
}

/// Prior values of everything changed since a batch began
#[derive(Debug, Clone, Default)]
struct Undo {
    client_state: Option<ClientState>,
    consensus_states: BTreeMap<Height, Option<ConsensusState>>,
}

/// Attestor light client with its consensus state history
#[derive(Debug, Clone)]
pub struct AttestorClient {
    client_state: ClientState,
    consensus_states: BTreeMap<Height, ConsensusState>,
    undo: Option<Undo>,
}

impl AttestorClient {
    /// Create a client trusting `client_state.latest_height` at `timestamp`
    ///
    /// # Errors
    /// The client state violates its invariants or `timestamp` is zero
    pub fn new(client_state: ClientState, timestamp: u64) -> Result<Self, LightClientError> {
        client_state.validate().map_err(update_error)?;
        if timestamp == 0 {
            return Err(LightClientError::InvalidUpdate {
                reason: "initial timestamp must be non-zero".to_string(),
            });
        }

        let initial = ConsensusState {
            height: client_state.latest_height,
            timestamp,
            packets: PacketCommitments::default(),
        };
        Ok(Self {
            consensus_states: BTreeMap::from([(initial.height, initial)]),
            client_state,
            undo: None,
        })
    }

    /// Rebuild a client from [`LightClient::export_state`] output
    ///
    /// # Errors
    /// The snapshot is malformed, violates the client state invariants or
    /// lacks a consensus state at the latest height
    pub fn from_state(state: &serde_json::Value) -> Result<Self, LightClientError> {
        let snapshot = Snapshot::deserialize(state).map_err(|e| LightClientError::InvalidSnapshot {
            reason: e.to_string(),
        })?;
        snapshot
            .client_state
            .validate()
            .map_err(|e| LightClientError::InvalidSnapshot {
                reason: e.to_string(),
            })?;

        let consensus_states: BTreeMap<Height, ConsensusState> = snapshot
            .consensus_states
            .into_iter()
            .map(|cs| (cs.height, cs))
            .collect();
        if !consensus_states.contains_key(&snapshot.client_state.latest_height) {
            return Err(LightClientError::InvalidSnapshot {
                reason: format!(
                    "no consensus state at latest height {}",
                    snapshot.client_state.latest_height
                ),
            });
        }
        Ok(Self {
            client_state: snapshot.client_state,
            consensus_states,
            undo: None,
        })
    }

    /// Current client state
    #[must_use]
    pub const fn client_state(&self) -> &ClientState {
        &self.client_state
    }

    /// Trusted consensus state at `height`
    #[must_use]
    pub fn consensus_state(&self, height: Height) -> Option<&ConsensusState> {
        self.consensus_states.get(&height)
    }

    fn set_client_state(&mut self, client_state: ClientState) {
        let previous = std::mem::replace(&mut self.client_state, client_state);
        if let Some(undo) = &mut self.undo {
            undo.client_state.get_or_insert(previous);
        }
    }

    fn insert_consensus_state(&mut self, consensus_state: ConsensusState) {
        let height = consensus_state.height;
        let previous = self.consensus_states.insert(height, consensus_state);
        if let Some(undo) = &mut self.undo {
            undo.consensus_states.entry(height).or_insert(previous);
        }
    }

    fn trusted_at(&self, height: Height) -> Result<&ConsensusState, LightClientError> {
        if self.client_state.is_frozen {
            return Err(LightClientError::ClientFrozen);
        }
        self.consensus_states
            .get(&height)
            .ok_or_else(|| LightClientError::VerificationFailed {
                reason: IbcAttestorClientError::HeightNotFound(height).to_string(),
            })
    }
}

impl LightClient for AttestorClient {
    fn client_type(&self) -> &str {
        ATTESTOR_CLIENT_TYPE
    }

    fn update_client(&mut self, client_message: &[u8]) -> Result<UpdateResult, LightClientError> {
        let header = Header::from_json(client_message).map_err(update_error)?;
        let height = header.new_height;

        let changes = process_header(
            &self.client_state,
            self.consensus_states.get(&height),
            self.consensus_states
                .range(..height)
                .next_back()
                .map(|(_, cs)| cs),
            self.consensus_states
                .range((Excluded(height), Unbounded))
                .next()
                .map(|(_, cs)| cs),
            &header,
        )
        .map_err(update_error)?;

        if let Some(consensus_state) = changes.consensus_state {
            self.insert_consensus_state(consensus_state);
        }
        if let Some(client_state) = changes.client_state {
            self.set_client_state(client_state);
        }

        let result = match changes.result {
            update::UpdateResult::Update => UpdateResult::Update,
            update::UpdateResult::NoOp => UpdateResult::NoOp,
            update::UpdateResult::Misbehaviour => UpdateResult::Misbehaviour,
        };
        match result {
            UpdateResult::Misbehaviour => warn!(%height, "conflicting attestation, client frozen"),
            _ => debug!(%height, ?result, "attestor update processed"),
        }
        Ok(result)
    }

    fn submit_misbehaviour(&mut self, misbehaviour: &[u8]) -> Result<(), LightClientError> {
        let misbehaviour = Misbehaviour::from_json(misbehaviour).map_err(update_error)?;
        verify_misbehaviour(&self.client_state, &misbehaviour).map_err(update_error)?;

        self.set_client_state(ClientState {
            is_frozen: true,
            ..self.client_state.clone()
        });
        info!(height = %misbehaviour.header_1.new_height, "misbehaviour verified, client frozen");
        Ok(())
    }

    fn verify_membership(&self, msg: &MembershipMsg) -> Result<u64, LightClientError> {
        let consensus_state = self.trusted_at(msg.height)?;
        membership::verify_membership(
            consensus_state,
            &self.client_state,
            msg.height,
            &msg.proof,
            &msg.path,
            &msg.value,
        )
        .map_err(verification_error)
    }

    fn verify_non_membership(&self, msg: &NonMembershipMsg) -> Result<u64, LightClientError> {
        let consensus_state = self.trusted_at(msg.height)?;
        membership::verify_non_membership(
            consensus_state,
            &self.client_state,
            msg.height,
            &msg.proof,
            &msg.path,
        )
        .map_err(verification_error)
    }

    fn status(&self) -> ClientStatus {
        if self.client_state.is_frozen {
            ClientStatus::Frozen
        } else {
            ClientStatus::Active
        }
    }

    fn latest_height(&self) -> Height {
        self.client_state.latest_height
    }

    fn export_state(&self) -> Result<serde_json::Value, LightClientError> {
        let snapshot = Snapshot {
            client_state: self.client_state.clone(),
            consensus_states: self.consensus_states.values().cloned().collect(),
        };
        serde_json::to_value(snapshot).map_err(|e| LightClientError::InvalidSnapshot {
            reason: e.to_string(),
        })
    }

    fn begin_batch(&mut self) {
        self.undo = Some(Undo::default());
    }

    fn commit_batch(&mut self) {
        self.undo = None;
    }

    fn rollback_batch(&mut self) {
        let Some(undo) = self.undo.take() else {
            return;
        };
        if let Some(client_state) = undo.client_state {
            self.client_state = client_state;
        }
        for (height, previous) in undo.consensus_states {
            match previous {
                Some(consensus_state) => self.consensus_states.insert(height, consensus_state),
                None => self.consensus_states.remove(&height),
            };
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn update_error(err: IbcAttestorClientError) -> LightClientError {
    match err {
        IbcAttestorClientError::ClientFrozen => LightClientError::ClientFrozen,
        IbcAttestorClientError::InsufficientSignatures { required, found } => {
            LightClientError::InsufficientSignatures { required, found }
        }
        other => LightClientError::InvalidUpdate {
            reason: other.to_string(),
        },
    }
}

#[allow(clippy::needless_pass_by_value)]
fn verification_error(err: IbcAttestorClientError) -> LightClientError {
    match err {
        IbcAttestorClientError::ClientFrozen => LightClientError::ClientFrozen,
        IbcAttestorClientError::InsufficientSignatures { required, found } => {
            LightClientError::InsufficientSignatures { required, found }
        }
        other => LightClientError::VerificationFailed {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use attestor_light_client::test_utils::{
        addresses, membership_proof_bytes, sample_packet_commitments, signed_header, signers,
    };
    use attestor_packet_membership::PacketCompact;

    use super::*;

    const PACKET_1: &[u8] = b"packet-1";
    const COMMITMENT: [u8; 32] = [0xab; 32];
    const TS_100: u64 = 1_700_000_000;
    const TS_101: u64 = 1_700_000_012;

    /// Two attestors, both required
    fn client() -> AttestorClient {
        let client_state = ClientState::new(addresses()[..2].to_vec(), 2, Height::at(100)).unwrap();
        AttestorClient::new(client_state, TS_100).unwrap()
    }

    fn packet_1_facts() -> PacketCommitments {
        PacketCommitments::new(vec![PacketCompact::for_path(PACKET_1, COMMITMENT)])
    }

    fn header_bytes(
        height: u64,
        timestamp: u64,
        packets: PacketCommitments,
        signer_count: usize,
    ) -> Vec<u8> {
        let header = signed_header(
            Height::at(height),
            timestamp,
            packets,
            &signers()[..signer_count],
        );
        serde_json::to_vec(&header).unwrap()
    }

    fn membership(height: u64, proof: Vec<u8>) -> MembershipMsg {
        MembershipMsg {
            height: Height::at(height),
            path: vec![PACKET_1.to_vec()],
            value: COMMITMENT.to_vec(),
            proof,
        }
    }

    #[test]
    fn two_attestor_update_then_membership() {
        let mut client = client();
        let res = client.update_client(&header_bytes(101, TS_101, packet_1_facts(), 2));
        assert_eq!(res, Ok(UpdateResult::Update));
        assert_eq!(client.latest_height(), Height::at(101));

        assert_eq!(client.verify_membership(&membership(101, vec![])), Ok(TS_101));

        let proof =
            membership_proof_bytes(Height::at(101), TS_101, packet_1_facts(), &signers()[..2]);
        assert_eq!(client.verify_membership(&membership(101, proof)), Ok(TS_101));
    }

    #[test]
    fn resubmitted_update_is_noop() {
        let mut client = client();
        let msg = header_bytes(101, TS_101, packet_1_facts(), 2);
        assert_eq!(client.update_client(&msg), Ok(UpdateResult::Update));
        assert_eq!(client.update_client(&msg), Ok(UpdateResult::NoOp));
        assert_eq!(client.status(), ClientStatus::Active);
    }

    #[test]
    fn one_signature_short_mutates_nothing() {
        let mut client = client();
        let res = client.update_client(&header_bytes(101, TS_101, packet_1_facts(), 1));
        assert_eq!(
            res,
            Err(LightClientError::InsufficientSignatures {
                required: 2,
                found: 1
            })
        );
        assert_eq!(client.latest_height(), Height::at(100));
        assert!(client.consensus_state(Height::at(101)).is_none());
    }

    #[test]
    fn conflicting_update_freezes_and_locks_out() {
        let mut client = client();
        assert_eq!(
            client.update_client(&header_bytes(101, TS_101, packet_1_facts(), 2)),
            Ok(UpdateResult::Update)
        );

        let conflicting = header_bytes(101, TS_101, sample_packet_commitments(), 2);
        assert_eq!(client.update_client(&conflicting), Ok(UpdateResult::Misbehaviour));
        assert_eq!(client.status(), ClientStatus::Frozen);

        assert_eq!(
            client.update_client(&header_bytes(102, TS_101 + 1, packet_1_facts(), 2)),
            Err(LightClientError::ClientFrozen)
        );
        assert_eq!(
            client.verify_membership(&membership(101, vec![])),
            Err(LightClientError::ClientFrozen)
        );
        // the trusted record is not replaced by the conflicting claim
        assert_eq!(
            client.consensus_state(Height::at(101)).map(|cs| cs.packets.clone()),
            Some(packet_1_facts())
        );
    }

    #[test]
    fn backfill_below_latest_height() {
        let mut client = client();
        client
            .update_client(&header_bytes(110, TS_100 + 100, packet_1_facts(), 2))
            .unwrap();

        assert_eq!(
            client.update_client(&header_bytes(105, TS_100 + 50, packet_1_facts(), 2)),
            Ok(UpdateResult::Update)
        );
        assert_eq!(client.latest_height(), Height::at(110));

        let res = client.update_client(&header_bytes(107, TS_100 + 200, packet_1_facts(), 2));
        assert!(matches!(res, Err(LightClientError::InvalidUpdate { .. })));
    }

    #[test]
    fn membership_at_unknown_height_fails() {
        let client = client();
        let res = client.verify_membership(&membership(150, vec![]));
        assert!(matches!(res, Err(LightClientError::VerificationFailed { .. })));
    }

    #[test]
    fn non_membership_returns_timestamp() {
        let mut client = client();
        let absent = PacketCommitments::new(vec![PacketCompact::absent(PACKET_1)]);
        client.update_client(&header_bytes(101, TS_101, absent, 2)).unwrap();

        let msg = NonMembershipMsg {
            height: Height::at(101),
            path: vec![PACKET_1.to_vec()],
            proof: vec![],
        };
        assert_eq!(client.verify_non_membership(&msg), Ok(TS_101));
    }

    #[test]
    fn submitted_misbehaviour_freezes() {
        let mut client = client();
        let misbehaviour = Misbehaviour {
            header_1: signed_header(Height::at(120), TS_101, packet_1_facts(), &signers()[..2]),
            header_2: signed_header(Height::at(120), TS_101 + 1, packet_1_facts(), &signers()[..2]),
        };
        client
            .submit_misbehaviour(&serde_json::to_vec(&misbehaviour).unwrap())
            .unwrap();
        assert_eq!(client.status(), ClientStatus::Frozen);
    }

    #[test]
    fn malformed_update_is_invalid() {
        let mut client = client();
        assert!(matches!(
            client.update_client(b"not json"),
            Err(LightClientError::InvalidUpdate { .. })
        ));
    }

    #[test]
    fn construction_rejects_zero_timestamp() {
        let client_state = ClientState::new(addresses()[..2].to_vec(), 2, Height::at(100)).unwrap();
        assert!(AttestorClient::new(client_state, 0).is_err());
    }

    #[test]
    fn rolled_back_batch_restores_previous_state() {
        let mut client = client();
        client
            .update_client(&header_bytes(105, TS_100 + 50, packet_1_facts(), 2))
            .unwrap();
        let before = client.export_state().unwrap();

        client.begin_batch();
        client
            .update_client(&header_bytes(110, TS_100 + 100, packet_1_facts(), 2))
            .unwrap();
        client
            .update_client(&header_bytes(102, TS_100 + 20, packet_1_facts(), 2))
            .unwrap();
        let conflicting = header_bytes(105, TS_100 + 50, sample_packet_commitments(), 2);
        assert_eq!(client.update_client(&conflicting), Ok(UpdateResult::Misbehaviour));
        client.rollback_batch();

        assert_eq!(client.export_state().unwrap(), before);
        assert_eq!(client.status(), ClientStatus::Active);
        assert!(client.consensus_state(Height::at(110)).is_none());
    }

    #[test]
    fn committed_batch_keeps_updates() {
        let mut client = client();
        client.begin_batch();
        client
            .update_client(&header_bytes(101, TS_101, packet_1_facts(), 2))
            .unwrap();
        client.commit_batch();
        client.rollback_batch();

        assert_eq!(client.latest_height(), Height::at(101));
        assert_eq!(client.verify_membership(&membership(101, vec![])), Ok(TS_101));
    }

    #[test]
    fn snapshot_restores_history() {
        let mut client = client();
        client
            .update_client(&header_bytes(101, TS_101, packet_1_facts(), 2))
            .unwrap();

        let restored = AttestorClient::from_state(&client.export_state().unwrap()).unwrap();
        assert_eq!(restored.client_state(), client.client_state());
        assert_eq!(restored.verify_membership(&membership(101, vec![])), Ok(TS_101));
        assert!(restored.consensus_state(Height::at(100)).is_some());
    }

    #[test]
    fn snapshot_without_latest_consensus_state_is_rejected() {
        let mut state = client().export_state().unwrap();
        state["consensus_states"] = serde_json::json!([]);
        assert!(matches!(
            AttestorClient::from_state(&state),
            Err(LightClientError::InvalidSnapshot { .. })
        ));
    }
}
