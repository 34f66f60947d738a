//! Error types for attestor light client

use attestor_packet_membership::PacketAttestationError;
use ibc_eureka_types::Height;
use thiserror::Error;

/// Main error type for attestor IBC operations
#[derive(Error, Debug)]
pub enum IbcAttestorClientError {
    /// Signature bytes cannot be parsed or no address can be recovered
    #[error("malformed signature at index {index}")]
    InvalidSignature {
        /// Position of the offending signature
        index: usize,
    },

    /// Fewer distinct trusted attestors signed than the quorum requires
    #[error("insufficient signatures: required {required}, found {found}")]
    InsufficientSignatures {
        /// Quorum threshold
        required: u32,
        /// Distinct trusted signers recovered
        found: u32,
    },

    /// Invalid header format
    #[error("Invalid header format: {reason}")]
    InvalidHeader {
        /// Reason for error
        reason: String,
    },

    /// Bad proof provided
    #[error("Proof invalid: {reason}")]
    InvalidProof {
        /// Reason for error
        reason: String,
    },

    /// Client state violates a construction invariant
    #[error("invalid client state: {reason}")]
    InvalidClientState {
        /// Reason for error
        reason: String,
    },

    /// Packet not found in attested data
    #[error("Membership proof failed: {0}")]
    MembershipProofFailed(#[from] PacketAttestationError),

    /// Proof cannot be deserialized
    #[error("deserializing membership proof failed: {0}")]
    DeserializeMembershipProofFailed(#[source] serde_json::Error),

    /// Header or misbehaviour message cannot be deserialized
    #[error("deserializing client message failed: {0}")]
    DeserializeClientMessageFailed(#[source] serde_json::Error),

    /// Client is frozen
    #[error("Client is frozen")]
    ClientFrozen,

    /// No trusted consensus state at the height
    #[error("Height {0} not found in consensus state")]
    HeightNotFound(Height),
}
