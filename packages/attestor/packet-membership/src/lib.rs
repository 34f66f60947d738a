#![doc = "Attested packet fact sets and membership checks for the attestor light client"]
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

mod error;

pub mod attestation;
pub mod packet_commitments;
pub mod verify_packet_membership;

pub use attestation::PacketAttestation;
pub use error::PacketAttestationError;
pub use packet_commitments::{PacketCommitments, PacketCompact};
