//! Router error type

use ibc_eureka_types::{Ics24Error, IdentifierError};
use thiserror::Error;

use crate::{access::Role, config::ConfigError, light_client::LightClientError};

/// Errors returned by router operations.
///
/// Every variant is returned before any router state is mutated.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Caller lacks the role the operation requires
    #[error("caller {caller} lacks role {role:?}")]
    Unauthorized {
        /// Caller identity
        caller: String,
        /// Missing role
        role: Role,
    },

    /// Caller is not the application owning the port
    #[error("caller {caller} does not own port {port_id}")]
    UnauthorizedSender {
        /// Caller identity
        caller: String,
        /// Port the packet is sent from
        port_id: String,
    },

    /// Identifier fails the identifier grammar
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// No client registered under the id
    #[error("client {0} not found")]
    ClientNotFound(String),

    /// Custom client id already in use
    #[error("client {0} already exists")]
    ClientAlreadyExists(String),

    /// Client status is not active
    #[error("client {client_id} is not active")]
    ClientNotActive {
        /// Client id
        client_id: String,
    },

    /// No application registered on the port
    #[error("port {0} not found")]
    PortNotFound(String),

    /// Port already owned by an application
    #[error("port {0} already exists")]
    PortAlreadyExists(String),

    /// Counterparty merkle prefix or client id is unusable
    #[error("invalid counterparty info: {reason}")]
    InvalidCounterpartyInfo {
        /// Reason for error
        reason: String,
    },

    /// Packet client does not match the registered counterparty
    #[error("invalid counterparty client: expected {expected}, got {actual}")]
    InvalidCounterparty {
        /// Registered counterparty client id
        expected: String,
        /// Client id carried by the packet
        actual: String,
    },

    /// Timeout already elapsed (or not in the future when sending)
    #[error("invalid timeout timestamp {timeout_timestamp}: current time is {now}")]
    InvalidTimeoutTimestamp {
        /// Packet timeout
        timeout_timestamp: u64,
        /// Host time
        now: u64,
    },

    /// Timeout too far in the future
    #[error("invalid timeout duration: {duration}s exceeds maximum {max}s")]
    InvalidTimeoutDuration {
        /// Requested duration
        duration: u64,
        /// Configured maximum
        max: u64,
    },

    /// Counterparty time at the proof height has not reached the timeout
    #[error("packet {sequence} has not timed out: counterparty time {counterparty_timestamp} < timeout {timeout_timestamp}")]
    PacketNotTimedOut {
        /// Packet sequence
        sequence: u64,
        /// Counterparty time proven by the light client
        counterparty_timestamp: u64,
        /// Packet timeout
        timeout_timestamp: u64,
    },

    /// Packet carries an unsupported number of payloads
    #[error("invalid payload count {count}: expected {expected}")]
    InvalidPayloadCount {
        /// Payloads in the packet
        count: usize,
        /// Supported payload count
        expected: usize,
    },

    /// Stored commitment differs from the packet presented
    #[error("packet commitment mismatch for {client_id}/{sequence}")]
    PacketCommitmentMismatch {
        /// Source client
        client_id: String,
        /// Packet sequence
        sequence: u64,
    },

    /// A different packet was already received under the same sequence
    #[error("packet receipt mismatch for {client_id}/{sequence}")]
    PacketReceiptMismatch {
        /// Destination client
        client_id: String,
        /// Packet sequence
        sequence: u64,
    },

    /// Application callback failed while sending, acknowledging or timing out
    #[error("application on port {port_id} failed: {reason}")]
    FailedCallback {
        /// Application port
        port_id: String,
        /// Application error
        reason: String,
    },

    /// A callback called back into the router for a client its operation holds
    #[error("re-entrant call on client {client_id}")]
    Reentrancy {
        /// Client already held by the calling thread
        client_id: String,
    },

    /// Light client rejected a proof or update
    #[error("light client {client_id}: {source}")]
    LightClient {
        /// Client id
        client_id: String,
        /// Light client error
        #[source]
        source: LightClientError,
    },

    /// Commitment codec failure
    #[error(transparent)]
    Ics24(#[from] Ics24Error),

    /// Router configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persisted state cannot be restored
    #[error("invalid persisted state: {reason}")]
    InvalidPersistedState {
        /// Reason for error
        reason: String,
    },

    /// Multicall sub-call failed; the whole batch was discarded
    #[error("multicall message {index} failed: {source}")]
    MulticallFailed {
        /// Position of the failing message
        index: usize,
        /// Error of the failing message
        #[source]
        source: Box<RouterError>,
    },
}

impl RouterError {
    pub(crate) fn light_client(client_id: &str, source: LightClientError) -> Self {
        Self::LightClient {
            client_id: client_id.to_string(),
            source,
        }
    }
}
