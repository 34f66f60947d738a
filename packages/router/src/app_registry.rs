//! Application registry: port id to the application owning it.

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use ibc_eureka_types::{identifier, Payload};

use crate::error::RouterError;

/// Callback data for a packet being sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnSendPacketCallback<'a> {
    /// Local client the packet leaves through
    pub source_client: &'a str,
    /// Counterparty client the packet is addressed to
    pub dest_client: &'a str,
    /// Assigned sequence
    pub sequence: u64,
    /// Payload for this application
    pub payload: &'a Payload,
    /// Caller that sent the packet
    pub sender: &'a str,
}

/// Callback data for a received packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnRecvPacketCallback<'a> {
    /// Counterparty client the packet came from
    pub source_client: &'a str,
    /// Local client the packet arrived on
    pub dest_client: &'a str,
    /// Packet sequence
    pub sequence: u64,
    /// Payload for this application
    pub payload: &'a Payload,
    /// Relayer that delivered the packet
    pub relayer: &'a str,
}

/// Callback data for an acknowledged packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnAcknowledgementPacketCallback<'a> {
    /// Local client the packet left through
    pub source_client: &'a str,
    /// Counterparty client the packet went to
    pub dest_client: &'a str,
    /// Packet sequence
    pub sequence: u64,
    /// Payload for this application
    pub payload: &'a Payload,
    /// Raw acknowledgement written by the counterparty
    pub acknowledgement: &'a [u8],
    /// Relayer that delivered the acknowledgement
    pub relayer: &'a str,
}

/// Callback data for a timed out packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnTimeoutPacketCallback<'a> {
    /// Local client the packet left through
    pub source_client: &'a str,
    /// Counterparty client the packet was addressed to
    pub dest_client: &'a str,
    /// Packet sequence
    pub sequence: u64,
    /// Payload for this application
    pub payload: &'a Payload,
    /// Relayer that delivered the timeout
    pub relayer: &'a str,
}

/// Error an application reports from a callback
pub type AppError = Box<dyn std::error::Error + Send + Sync>;

/// An IBC application bound to a port.
///
/// Callbacks run while the router holds the lock of the client involved. A
/// callback that calls into the router for that same client gets
/// [`RouterError::Reentrancy`].
pub trait IbcApp: Send + Sync {
    /// Called before a sent packet is committed; an error aborts the send
    ///
    /// # Errors
    /// The application refuses the packet
    fn on_send_packet(&self, msg: &OnSendPacketCallback<'_>) -> Result<(), AppError>;

    /// Returns the acknowledgement for a received packet.
    ///
    /// Errors, panics and empty acknowledgements are all written as the
    /// universal error acknowledgement.
    ///
    /// # Errors
    /// The application failed to process the packet
    fn on_recv_packet(&self, msg: &OnRecvPacketCallback<'_>) -> Result<Vec<u8>, AppError>;

    /// Called when the counterparty acknowledged a packet
    ///
    /// # Errors
    /// The application failed to process the acknowledgement
    fn on_acknowledgement_packet(
        &self,
        msg: &OnAcknowledgementPacketCallback<'_>,
    ) -> Result<(), AppError>;

    /// Called when a packet timed out
    ///
    /// # Errors
    /// The application failed to process the timeout
    fn on_timeout_packet(&self, msg: &OnTimeoutPacketCallback<'_>) -> Result<(), AppError>;
}

#[derive(Clone)]
pub(crate) struct AppRegistration {
    pub app_address: String,
    pub app: Arc<dyn IbcApp>,
}

/// Maps port ids to applications; each port has exactly one owner
#[derive(Default)]
pub struct AppRegistry {
    apps: RwLock<BTreeMap<String, AppRegistration>>,
}

impl std::fmt::Debug for AppRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRegistry")
            .field("ports", &self.port_ids())
            .finish()
    }
}

impl AppRegistry {
    pub(crate) fn add(
        &self,
        port_id: &str,
        app_address: &str,
        app: Arc<dyn IbcApp>,
    ) -> Result<(), RouterError> {
        identifier::validate_port_id(port_id)?;

        let mut apps = self.apps.write().unwrap_or_else(PoisonError::into_inner);
        if apps.contains_key(port_id) {
            return Err(RouterError::PortAlreadyExists(port_id.to_string()));
        }
        apps.insert(
            port_id.to_string(),
            AppRegistration {
                app_address: app_address.to_string(),
                app,
            },
        );
        Ok(())
    }

    pub(crate) fn get(&self, port_id: &str) -> Result<AppRegistration, RouterError> {
        self.apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(port_id)
            .cloned()
            .ok_or_else(|| RouterError::PortNotFound(port_id.to_string()))
    }

    /// Address of the application owning `port_id`
    ///
    /// # Errors
    /// [`RouterError::PortNotFound`] if the port is not registered
    pub fn app_address(&self, port_id: &str) -> Result<String, RouterError> {
        Ok(self.get(port_id)?.app_address)
    }

    /// Registered ports, sorted
    #[must_use]
    pub fn port_ids(&self) -> Vec<String> {
        self.apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
