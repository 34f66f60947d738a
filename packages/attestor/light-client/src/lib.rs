#![doc = "Attestor light client for IBC"]
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod client_state;
pub mod consensus_state;
pub mod error;
pub mod header;
pub mod membership;
pub mod misbehaviour;
pub mod update;
pub mod verify;
pub mod verify_attestation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
