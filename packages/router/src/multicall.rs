//! Atomic batches of relayer messages.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use ibc_eureka_types::{MsgAckPacket, MsgRecvPacket, MsgTimeoutPacket};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    access::{Caller, Role},
    client_registry::{ClientEntry, ClientGuard},
    error::RouterError,
    events::RouterEvent,
    light_client::UpdateResult,
    router::{PacketOutcome, Response, Router},
};

/// A relayer message that can be batched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterMsg {
    /// Update a client
    UpdateClient {
        /// Client to update
        client_id: String,
        /// Light client specific message
        client_message: Vec<u8>,
    },
    /// Receive a packet
    RecvPacket(MsgRecvPacket),
    /// Acknowledge a packet
    AckPacket(MsgAckPacket),
    /// Time out a packet
    TimeoutPacket(MsgTimeoutPacket),
}

impl RouterMsg {
    /// The local client the message operates on
    #[must_use]
    pub fn client_id(&self) -> &str {
        match self {
            Self::UpdateClient { client_id, .. } => client_id,
            Self::RecvPacket(msg) => &msg.packet.dest_client,
            Self::AckPacket(msg) => &msg.packet.source_client,
            Self::TimeoutPacket(msg) => &msg.packet.source_client,
        }
    }
}

/// Result of one batched message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgOutcome {
    /// Result of a client update
    Update(UpdateResult),
    /// Result of a packet message
    Packet(PacketOutcome),
}

impl Router {
    /// Execute `msgs` in order as one atomic unit.
    ///
    /// Every client touched by the batch is locked for its whole duration, in
    /// id order. Their changes are held back until all messages succeed and
    /// dropped otherwise. Application callbacks made before a failure are not
    /// undone.
    ///
    /// # Errors
    /// - Caller is not a relayer
    /// - [`RouterError::MulticallFailed`] with the index of the first failing message
    #[instrument(skip_all, fields(caller = caller.id(), msgs = msgs.len()))]
    pub fn multicall(
        &self,
        caller: &Caller,
        msgs: &[RouterMsg],
    ) -> Result<Response<Vec<MsgOutcome>>, RouterError> {
        caller.require(Role::Relayer)?;

        let failed = |index: usize, e: RouterError| RouterError::MulticallFailed {
            index,
            source: Box::new(e),
        };
        let first_index_of = |client_id: &str| {
            msgs.iter()
                .position(|msg| msg.client_id() == client_id)
                .unwrap_or_default()
        };

        let client_ids: BTreeSet<&str> = msgs.iter().map(RouterMsg::client_id).collect();
        let mut entries = BTreeMap::new();
        for client_id in client_ids {
            let entry = self
                .clients
                .get(client_id)
                .map_err(|e| failed(first_index_of(client_id), e))?;
            entries.insert(client_id, entry);
        }

        let mut guards = BTreeMap::new();
        for (client_id, entry) in &entries {
            let mut guard = entry
                .lock()
                .map_err(|e| failed(first_index_of(client_id), e))?;
            guard.begin_batch();
            guards.insert(*client_id, guard);
        }

        let mut events = Vec::new();
        let result = self.run_batch(caller, msgs, &entries, &mut guards, &mut events);
        for guard in guards.values_mut() {
            if result.is_ok() {
                guard.commit_batch();
            } else {
                guard.rollback_batch();
            }
        }
        drop(guards);

        let outcomes = result.map_err(|(index, e)| failed(index, e))?;
        Ok(Response::publish(outcomes, events))
    }

    fn run_batch(
        &self,
        caller: &Caller,
        msgs: &[RouterMsg],
        entries: &BTreeMap<&str, Arc<ClientEntry>>,
        guards: &mut BTreeMap<&str, ClientGuard<'_>>,
        events: &mut Vec<RouterEvent>,
    ) -> Result<Vec<MsgOutcome>, (usize, RouterError)> {
        let mut outcomes = Vec::with_capacity(msgs.len());
        for (index, msg) in msgs.iter().enumerate() {
            let client_id = msg.client_id();
            let (Some(entry), Some(slot)) = (entries.get(client_id), guards.get_mut(client_id))
            else {
                return Err((index, RouterError::ClientNotFound(client_id.to_string())));
            };
            let registration = &entry.registration;

            let outcome = match msg {
                RouterMsg::UpdateClient { client_message, .. } => {
                    Self::handle_update_client(registration, slot, client_message, events)
                        .map(MsgOutcome::Update)
                }
                RouterMsg::RecvPacket(msg) => self
                    .handle_recv_packet(caller, registration, slot, msg, events)
                    .map(MsgOutcome::Packet),
                RouterMsg::AckPacket(msg) => self
                    .handle_ack_packet(caller, registration, slot, msg, events)
                    .map(MsgOutcome::Packet),
                RouterMsg::TimeoutPacket(msg) => self
                    .handle_timeout_packet(caller, registration, slot, msg, events)
                    .map(MsgOutcome::Packet),
            }
            .map_err(|e| (index, e))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
