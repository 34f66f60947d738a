//! Light client capability interface.
//!
//! The router only talks to verifiers through [`LightClient`]; the concrete
//! implementation is selected by client id lookup in the client registry.

use ibc_eureka_types::Height;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod attestor;

pub use attestor::AttestorClient;

/// Light client errors, as seen by the router
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LightClientError {
    /// Client message is malformed or cannot be verified
    #[error("invalid update: {reason}")]
    InvalidUpdate {
        /// Reason for error
        reason: String,
    },

    /// Not enough distinct trusted signers
    #[error("insufficient signatures: required {required}, found {found}")]
    InsufficientSignatures {
        /// Quorum threshold
        required: u32,
        /// Distinct trusted signers found
        found: u32,
    },

    /// Membership or non-membership could not be proven
    #[error("verification failed: {reason}")]
    VerificationFailed {
        /// Reason for error
        reason: String,
    },

    /// Client is frozen
    #[error("client is frozen")]
    ClientFrozen,

    /// Exported client state cannot be produced or restored
    #[error("invalid client snapshot: {reason}")]
    InvalidSnapshot {
        /// Reason for error
        reason: String,
    },
}

/// Outcome of a successful `update_client`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateResult {
    /// Trusted state advanced or was backfilled
    Update,
    /// The update was already applied
    NoOp,
    /// Conflicting claim at a trusted height; the client is now frozen
    Misbehaviour,
}

/// Client status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    /// Client can verify proofs
    Active,
    /// Client detected misbehaviour and is permanently frozen
    Frozen,
    /// Client's trusted state is too old
    Expired,
}

/// Membership query against a counterparty height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipMsg {
    /// Counterparty height the proof is for
    pub height: Height,
    /// Merkle-prefixed path
    pub path: Vec<Vec<u8>>,
    /// Expected value
    pub value: Vec<u8>,
    /// Light client specific proof
    pub proof: Vec<u8>,
}

/// Non-membership query against a counterparty height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonMembershipMsg {
    /// Counterparty height the proof is for
    pub height: Height,
    /// Merkle-prefixed path
    pub path: Vec<Vec<u8>>,
    /// Light client specific proof
    pub proof: Vec<u8>,
}

/// A counterparty verifier.
///
/// Implementations must leave their state untouched when a call fails.
pub trait LightClient: Send + Sync + std::fmt::Debug {
    /// Client type, used as the prefix of generated client ids
    fn client_type(&self) -> &str;

    /// Advance or confirm trusted state
    ///
    /// # Errors
    /// The message is malformed, lacks a quorum or the client is frozen
    fn update_client(&mut self, client_message: &[u8]) -> Result<UpdateResult, LightClientError>;

    /// Freeze the client on proof of misbehaviour
    ///
    /// # Errors
    /// The evidence is malformed or does not prove misbehaviour
    fn submit_misbehaviour(&mut self, misbehaviour: &[u8]) -> Result<(), LightClientError>;

    /// Verify `msg.value` is stored at `msg.path`; returns the counterparty
    /// timestamp at `msg.height`
    ///
    /// # Errors
    /// The proof does not verify
    fn verify_membership(&self, msg: &MembershipMsg) -> Result<u64, LightClientError>;

    /// Verify nothing is stored at `msg.path`; returns the counterparty
    /// timestamp at `msg.height`
    ///
    /// # Errors
    /// The proof does not verify
    fn verify_non_membership(&self, msg: &NonMembershipMsg) -> Result<u64, LightClientError>;

    /// Current status
    fn status(&self) -> ClientStatus;

    /// Highest trusted height
    fn latest_height(&self) -> Height;

    /// Serializable snapshot of the full verifier state
    ///
    /// # Errors
    /// The state cannot be serialized
    fn export_state(&self) -> Result<serde_json::Value, LightClientError>;

    /// Start recording how to undo changes, for batched calls
    fn begin_batch(&mut self);

    /// Keep the changes made since [`LightClient::begin_batch`]
    fn commit_batch(&mut self);

    /// Revert the changes made since [`LightClient::begin_batch`]
    fn rollback_batch(&mut self);
}
