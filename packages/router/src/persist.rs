//! Versioned persisted router state.
//!
//! The router is exported as [`PersistedState::V2`]. Older snapshots are
//! upgraded with [`PersistedState::migrate`] before being restored.

use std::{collections::BTreeMap, sync::Arc};

use ibc_eureka_types::{ics24::CommitmentKind, identifier, CounterpartyInfo};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    app_registry::{AppRegistry, IbcApp},
    client_registry::{ClientRegistration, ClientRegistry},
    clock::HostClock,
    config::RouterConfig,
    error::RouterError,
    light_client::{LightClient, LightClientError},
    router::Router,
    store::CommitmentStore,
};

/// Router snapshot, tagged by schema version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum PersistedState {
    /// First schema: hex merkle prefixes, client type implied by the client id
    V1(StateV1),
    /// Current schema
    V2(StateV2),
}

/// Schema V1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateV1 {
    /// Registry-wide client id counter
    pub next_client_seq: u64,
    /// Registered clients
    pub clients: Vec<ClientRecordV1>,
    /// Port id to application address
    pub apps: BTreeMap<String, String>,
}

/// Client record of schema V1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecordV1 {
    /// Client id, `<clientType>-<N>`
    pub client_id: String,
    /// Counterparty client id
    pub counterparty_client_id: String,
    /// Counterparty merkle prefix components, hex encoded
    pub merkle_prefix: Vec<String>,
    /// Verifier snapshot
    pub verifier_state: serde_json::Value,
    /// Next send sequence
    pub next_sequence_send: u64,
    /// Stored commitments
    pub commitments: Vec<CommitmentRecord>,
}

/// Schema V2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateV2 {
    /// Registry-wide client id counter
    pub next_client_seq: u64,
    /// Registered clients
    pub clients: Vec<ClientRecord>,
    /// Port id to application address
    pub apps: BTreeMap<String, String>,
}

/// Client record of schema V2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Registration, including the client type
    pub registration: ClientRegistration,
    /// Verifier snapshot, see [`LightClient::export_state`]
    pub verifier_state: serde_json::Value,
    /// Next send sequence
    pub next_sequence_send: u64,
    /// Stored commitments
    pub commitments: Vec<CommitmentRecord>,
}

/// One commitment store entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    /// [`CommitmentKind`] discriminator
    pub kind: u8,
    /// Packet sequence
    pub sequence: u64,
    /// Hex encoded 32 byte value
    pub value: String,
}

/// Rebuilds the collaborators a snapshot only references.
pub trait StateResolver {
    /// Verifier for a restored client
    ///
    /// # Errors
    /// The snapshot cannot be turned into a verifier
    fn light_client(
        &self,
        registration: &ClientRegistration,
        verifier_state: &serde_json::Value,
    ) -> Result<Box<dyn LightClient>, LightClientError>;

    /// Application bound to `port_id` at `app_address`, if it is still available
    fn app(&self, port_id: &str, app_address: &str) -> Option<Arc<dyn IbcApp>>;
}

fn invalid(reason: impl Into<String>) -> RouterError {
    RouterError::InvalidPersistedState {
        reason: reason.into(),
    }
}

impl PersistedState {
    /// Upgrade to the current schema
    ///
    /// # Errors
    /// A V1 client id does not carry a valid client type, or a merkle prefix
    /// component is not hex
    pub fn migrate(self) -> Result<StateV2, RouterError> {
        match self {
            Self::V2(state) => Ok(state),
            Self::V1(state) => {
                let clients = state
                    .clients
                    .into_iter()
                    .map(migrate_client)
                    .collect::<Result<_, _>>()?;
                Ok(StateV2 {
                    next_client_seq: state.next_client_seq,
                    clients,
                    apps: state.apps,
                })
            }
        }
    }
}

fn migrate_client(record: ClientRecordV1) -> Result<ClientRecord, RouterError> {
    let client_type = record
        .client_id
        .rsplit_once('-')
        .map(|(client_type, _)| client_type.to_string())
        .ok_or_else(|| invalid(format!("client id {} has no client type", record.client_id)))?;
    identifier::validate_client_type(&client_type)?;

    let merkle_prefix = record
        .merkle_prefix
        .iter()
        .map(|component| hex::decode(component.trim_start_matches("0x")))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(format!("merkle prefix of {}: {e}", record.client_id)))?;

    Ok(ClientRecord {
        registration: ClientRegistration {
            client_id: record.client_id,
            client_type,
            counterparty_info: CounterpartyInfo {
                client_id: record.counterparty_client_id,
                merkle_prefix,
            },
        },
        verifier_state: record.verifier_state,
        next_sequence_send: record.next_sequence_send,
        commitments: record.commitments,
    })
}

fn kind_from_discriminator(discriminator: u8) -> Result<CommitmentKind, RouterError> {
    [
        CommitmentKind::PacketCommitment,
        CommitmentKind::PacketReceipt,
        CommitmentKind::AckCommitment,
    ]
    .into_iter()
    .find(|kind| kind.discriminator() == discriminator)
    .ok_or_else(|| invalid(format!("unknown commitment kind {discriminator}")))
}

fn restore_store(record: &ClientRecord) -> Result<CommitmentStore, RouterError> {
    let entries = record
        .commitments
        .iter()
        .map(|entry| {
            let kind = kind_from_discriminator(entry.kind)?;
            let value: [u8; 32] = hex::decode(&entry.value)
                .ok()
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| {
                    invalid(format!("commitment value {} is not 32 bytes", entry.value))
                })?;
            Ok((kind, entry.sequence, value))
        })
        .collect::<Result<Vec<_>, RouterError>>()?;
    Ok(CommitmentStore::from_parts(record.next_sequence_send, entries))
}

impl Router {
    /// Snapshot the router in the current schema.
    ///
    /// Clients are locked one at a time; concurrent calls on other clients
    /// may interleave with the export.
    ///
    /// # Errors
    /// A verifier fails to export its state
    pub fn export_state(&self) -> Result<PersistedState, RouterError> {
        let clients = self
            .clients
            .entries()
            .into_iter()
            .map(|entry| {
                let slot = entry.lock()?;
                let verifier_state = slot
                    .verifier
                    .export_state()
                    .map_err(|e| RouterError::light_client(&entry.registration.client_id, e))?;
                Ok(ClientRecord {
                    registration: entry.registration.clone(),
                    verifier_state,
                    next_sequence_send: slot.store.peek_next_sequence(),
                    commitments: slot
                        .store
                        .entries()
                        .map(|(kind, sequence, value)| CommitmentRecord {
                            kind: kind.discriminator(),
                            sequence,
                            value: hex::encode(value),
                        })
                        .collect(),
                })
            })
            .collect::<Result<_, RouterError>>()?;

        let apps = self
            .apps
            .port_ids()
            .into_iter()
            .map(|port_id| {
                let address = self.apps.app_address(&port_id)?;
                Ok((port_id, address))
            })
            .collect::<Result<_, RouterError>>()?;

        Ok(PersistedState::V2(StateV2 {
            next_client_seq: self.clients.next_client_seq(),
            clients,
            apps,
        }))
    }

    /// Rebuild a router from a snapshot of any schema version
    ///
    /// # Errors
    /// - The configuration is invalid
    /// - The snapshot cannot be migrated or is inconsistent
    /// - The resolver cannot provide a verifier or an application
    #[instrument(skip_all)]
    pub fn restore(
        state: PersistedState,
        config: RouterConfig,
        clock: Arc<dyn HostClock>,
        resolver: &dyn StateResolver,
    ) -> Result<Self, RouterError> {
        let state = state.migrate()?;

        let mut clients = Vec::with_capacity(state.clients.len());
        for record in &state.clients {
            let registration = &record.registration;
            identifier::validate_client_id(&registration.client_id)?;
            let verifier = resolver
                .light_client(registration, &record.verifier_state)
                .map_err(|e| RouterError::light_client(&registration.client_id, e))?;
            if verifier.client_type() != registration.client_type {
                return Err(invalid(format!(
                    "client {} restored as {} but registered as {}",
                    registration.client_id,
                    verifier.client_type(),
                    registration.client_type
                )));
            }
            clients.push((registration.clone(), verifier, restore_store(record)?));
        }

        let apps = AppRegistry::default();
        for (port_id, app_address) in &state.apps {
            let app = resolver
                .app(port_id, app_address)
                .ok_or_else(|| RouterError::PortNotFound(port_id.clone()))?;
            apps.add(port_id, app_address, app)?;
        }

        info!(
            clients = clients.len(),
            apps = state.apps.len(),
            "router state restored"
        );

        let mut router = Self::new(config, clock)?;
        router.clients = ClientRegistry::restore(state.next_client_seq, clients);
        router.apps = apps;
        Ok(router)
    }
}
