//! Client registry: client id to verifier and counterparty metadata.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use ibc_eureka_types::{identifier, CounterpartyInfo};
use serde::{Deserialize, Serialize};

use crate::{error::RouterError, light_client::LightClient, store::CommitmentStore};

/// Registration record of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    /// Assigned client id
    pub client_id: String,
    /// Verifier type
    pub client_type: String,
    /// Counterparty chain information
    pub counterparty_info: CounterpartyInfo,
}

thread_local! {
    /// Clients whose lock the current thread holds
    static HELD_CLIENTS: RefCell<BTreeSet<String>> = const { RefCell::new(BTreeSet::new()) };
}

/// Mutable state of one client, guarded as a unit.
#[derive(Debug)]
pub(crate) struct ClientSlot {
    pub verifier: Box<dyn LightClient>,
    pub store: CommitmentStore,
}

impl ClientSlot {
    /// Hold back changes until [`Self::commit_batch`] or [`Self::rollback_batch`]
    pub fn begin_batch(&mut self) {
        self.verifier.begin_batch();
        self.store.begin_batch();
    }

    pub fn commit_batch(&mut self) {
        self.verifier.commit_batch();
        self.store.commit_batch();
    }

    pub fn rollback_batch(&mut self) {
        self.verifier.rollback_batch();
        self.store.rollback_batch();
    }
}

/// A registered client. The registration never changes; the slot is the
/// client's mutual exclusion domain.
#[derive(Debug)]
pub(crate) struct ClientEntry {
    pub registration: ClientRegistration,
    slot: Mutex<ClientSlot>,
}

impl ClientEntry {
    /// Lock the client for the current thread.
    ///
    /// # Errors
    /// [`RouterError::Reentrancy`] if this thread already holds the client
    pub fn lock(&self) -> Result<ClientGuard<'_>, RouterError> {
        let client_id = self.registration.client_id.as_str();
        if !HELD_CLIENTS.with_borrow_mut(|held| held.insert(client_id.to_string())) {
            return Err(RouterError::Reentrancy {
                client_id: client_id.to_string(),
            });
        }

        let slot = self.slot.lock().unwrap_or_else(|poisoned| {
            // a panic mid-batch leaves staged changes behind
            let mut slot = poisoned.into_inner();
            slot.rollback_batch();
            slot
        });
        Ok(ClientGuard { client_id, slot })
    }
}

/// Exclusive access to a client slot, released on drop
#[derive(Debug)]
pub(crate) struct ClientGuard<'a> {
    client_id: &'a str,
    slot: MutexGuard<'a, ClientSlot>,
}

impl Deref for ClientGuard<'_> {
    type Target = ClientSlot;

    fn deref(&self) -> &ClientSlot {
        &self.slot
    }
}

impl DerefMut for ClientGuard<'_> {
    fn deref_mut(&mut self) -> &mut ClientSlot {
        &mut self.slot
    }
}

impl Drop for ClientGuard<'_> {
    fn drop(&mut self) {
        HELD_CLIENTS.with_borrow_mut(|held| held.remove(self.client_id));
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    clients: BTreeMap<String, Arc<ClientEntry>>,
    next_client_seq: u64,
}

/// Maps client ids to registered clients
#[derive(Debug, Default)]
pub struct ClientRegistry {
    state: RwLock<RegistryState>,
}

impl ClientRegistry {
    /// Register a client and return its registration.
    ///
    /// Without `custom_id` the id is `<clientType>-<N>` where `N` comes from a
    /// registry-wide counter that is never reused. Custom ids may not take the
    /// `<clientType>-<N>` shape of this verifier's type or any registered one.
    pub(crate) fn register(
        &self,
        counterparty_info: CounterpartyInfo,
        verifier: Box<dyn LightClient>,
        custom_id: Option<String>,
    ) -> Result<ClientRegistration, RouterError> {
        let client_type = verifier.client_type().to_string();
        identifier::validate_client_type(&client_type)?;
        validate_counterparty(&counterparty_info)?;
        if let Some(id) = &custom_id {
            identifier::validate_custom_client_id(id)?;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let client_id = if let Some(id) = custom_id {
            if state.clients.contains_key(&id) {
                return Err(RouterError::ClientAlreadyExists(id));
            }
            let registered_types = state
                .clients
                .values()
                .map(|entry| entry.registration.client_type.as_str());
            for registered_type in registered_types.chain([client_type.as_str()]) {
                identifier::ensure_not_assigned_shape(&id, registered_type)?;
            }
            id
        } else {
            // a custom id may predate the first client of its type
            loop {
                let id = format!("{client_type}-{}", state.next_client_seq);
                state.next_client_seq += 1;
                if !state.clients.contains_key(&id) {
                    break id;
                }
            }
        };
        identifier::validate_client_id(&client_id)?;

        let registration = ClientRegistration {
            client_id: client_id.clone(),
            client_type,
            counterparty_info,
        };
        let slot = ClientSlot {
            verifier,
            store: CommitmentStore::default(),
        };
        state.clients.insert(
            client_id,
            Arc::new(ClientEntry {
                registration: registration.clone(),
                slot: Mutex::new(slot),
            }),
        );
        Ok(registration)
    }

    pub(crate) fn get(&self, client_id: &str) -> Result<Arc<ClientEntry>, RouterError> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| RouterError::ClientNotFound(client_id.to_string()))
    }

    /// Registration of a client
    ///
    /// # Errors
    /// [`RouterError::ClientNotFound`] if no client is registered under the id
    pub fn registration(&self, client_id: &str) -> Result<ClientRegistration, RouterError> {
        Ok(self.get(client_id)?.registration.clone())
    }

    /// Ids of all registered clients, sorted
    #[must_use]
    pub fn client_ids(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .keys()
            .cloned()
            .collect()
    }

    pub(crate) fn next_client_seq(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .next_client_seq
    }

    pub(crate) fn entries(&self) -> Vec<Arc<ClientEntry>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn restore(
        next_client_seq: u64,
        clients: impl IntoIterator<
            Item = (ClientRegistration, Box<dyn LightClient>, CommitmentStore),
        >,
    ) -> Self {
        let clients = clients
            .into_iter()
            .map(|(registration, verifier, store)| {
                let entry = ClientEntry {
                    slot: Mutex::new(ClientSlot { verifier, store }),
                    registration,
                };
                (entry.registration.client_id.clone(), Arc::new(entry))
            })
            .collect();
        Self {
            state: RwLock::new(RegistryState {
                clients,
                next_client_seq,
            }),
        }
    }
}

fn validate_counterparty(info: &CounterpartyInfo) -> Result<(), RouterError> {
    if info.merkle_prefix.is_empty() {
        return Err(RouterError::InvalidCounterpartyInfo {
            reason: "merkle prefix cannot be empty".to_string(),
        });
    }
    identifier::validate_client_id(&info.client_id).map_err(|e| {
        RouterError::InvalidCounterpartyInfo {
            reason: e.to_string(),
        }
    })
}
