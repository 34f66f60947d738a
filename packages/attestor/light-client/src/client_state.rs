//! Attestor client state for IBC light client

use std::collections::HashSet;

use alloy_primitives::Address;
use ibc_eureka_types::Height;
use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::IbcAttestorClientError;

/// Attestor client state: the trusted signer set, its quorum and the trusted frontier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// Attestor Ethereum addresses (20-byte addresses recovered from signatures)
    pub attestor_addresses: Vec<Address>,
    /// Minimum required distinct signers
    pub min_required_sigs: u32,
    /// Highest trusted height
    pub latest_height: Height,
    /// Whether the client is frozen due to misbehaviour
    pub is_frozen: bool,
}

impl ClientState {
    /// Construct a validated client state.
    ///
    /// # Errors
    /// - The attestor set is empty or contains duplicates
    /// - `min_required_sigs` is zero or exceeds the set size
    /// - `latest_height` is zero
    pub fn new(
        attestor_addresses: Vec<Address>,
        min_required_sigs: u32,
        latest_height: Height,
    ) -> Result<Self, IbcAttestorClientError> {
        let client_state = Self {
            attestor_addresses,
            min_required_sigs,
            latest_height,
            is_frozen: false,
        };
        client_state.validate()?;
        Ok(client_state)
    }

    /// Construct a client state from a list of secp256k1 public keys,
    /// deriving the Ethereum address of each.
    ///
    /// # Errors
    /// Same as [`ClientState::new`]
    pub fn new_from_pubkeys(
        pub_keys: &[VerifyingKey],
        min_required_sigs: u32,
        latest_height: Height,
    ) -> Result<Self, IbcAttestorClientError> {
        let attestor_addresses = pub_keys.iter().map(address_from_pubkey).collect();
        Self::new(attestor_addresses, min_required_sigs, latest_height)
    }

    /// Checks the construction invariants.
    ///
    /// # Errors
    /// See [`ClientState::new`]
    pub fn validate(&self) -> Result<(), IbcAttestorClientError> {
        let invalid = |reason: &str| IbcAttestorClientError::InvalidClientState {
            reason: reason.to_string(),
        };

        if self.attestor_addresses.is_empty() {
            return Err(invalid("attestor set cannot be empty"));
        }
        let unique: HashSet<&Address> = self.attestor_addresses.iter().collect();
        if unique.len() != self.attestor_addresses.len() {
            return Err(invalid("attestor set contains duplicate addresses"));
        }
        if self.min_required_sigs == 0 {
            return Err(invalid("min_required_sigs must be at least 1"));
        }
        if self.min_required_sigs as usize > self.attestor_addresses.len() {
            return Err(invalid("min_required_sigs exceeds attestor set size"));
        }
        if self.latest_height.is_zero() {
            return Err(invalid("latest height must be non-zero"));
        }
        Ok(())
    }

    /// Whether `address` belongs to the trusted attestor set
    #[must_use]
    pub fn is_attestor(&self, address: &Address) -> bool {
        self.attestor_addresses.contains(address)
    }
}

/// Ethereum address of a secp256k1 public key: the last 20 bytes of
/// `keccak256(uncompressed_pubkey[1..])`.
#[must_use]
pub fn address_from_pubkey(pub_key: &VerifyingKey) -> Address {
    let uncompressed = pub_key.to_encoded_point(false);
    let hash = Keccak256::digest(&uncompressed.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
