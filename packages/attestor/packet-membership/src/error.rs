use thiserror::Error;

#[derive(Debug, Error)]
/// Collection of errors that can occur when
/// verifying packet membership.
pub enum PacketAttestationError {
    #[error("verification failed: {reason}")]
    /// The attested fact set does not prove the claim
    VerificationFailed {
        /// Reason for the failure
        reason: String,
    },

    #[error("attestation cannot be decoded: {0}")]
    /// Attestation bytes are not a valid ABI encoding
    Decode(#[from] alloy_sol_types::Error),
}
