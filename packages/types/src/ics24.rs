//! ICS24 commitment path and hash utilities

use std::mem::size_of;

use sha2::{Digest, Sha256};
use sha3::Keccak256;
use thiserror::Error;

use crate::packet::{Packet, Payload};

/// Protocol version byte prefixed to packet and acknowledgement commitments
pub const IBC_VERSION: u8 = 0x02;

/// `sha256("UNIVERSAL_ERROR_ACKNOWLEDGEMENT")`
pub const UNIVERSAL_ERROR_ACK: [u8; 32] = [
    0x47, 0x74, 0xd4, 0xa5, 0x75, 0x99, 0x3f, 0x96, 0x3b, 0x1c, 0x06, 0x57, 0x37, 0x36, 0x61, 0x7a,
    0x45, 0x7a, 0xbe, 0xf8, 0x58, 0x91, 0x78, 0xdb, 0x8d, 0x10, 0xc9, 0x4b, 0x4a, 0xb5, 0x11, 0xab,
];

const HASH_OUTPUT_SIZE: usize = 32;

/// Error type for ICS24 operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ics24Error {
    /// No acknowledgements provided
    #[error("no acknowledgements provided")]
    NoAcknowledgements,
    /// Empty merkle prefix
    #[error("empty merkle prefix")]
    EmptyMerklePrefix,
}

/// Kind of an entry in the commitment store, doubling as the ICS24 path discriminator byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CommitmentKind {
    /// Commitment to a sent packet, keyed by the source client
    PacketCommitment = 1,
    /// Receipt of a received packet, keyed by the destination client
    PacketReceipt = 2,
    /// Commitment to a written acknowledgement, keyed by the destination client
    AckCommitment = 3,
}

impl CommitmentKind {
    /// Discriminator byte used in the storage path
    #[must_use]
    pub const fn discriminator(self) -> u8 {
        self as u8
    }
}

/// Computes the storage path of a commitment.
/// Path format: `client_id || kind || sequence (big-endian)`
#[must_use]
pub fn path_for(kind: CommitmentKind, client_id: &str, sequence: u64) -> Vec<u8> {
    let mut path = Vec::with_capacity(client_id.len() + size_of::<u8>() + size_of::<u64>());
    path.extend_from_slice(client_id.as_bytes());
    path.push(kind.discriminator());
    path.extend_from_slice(&sequence.to_be_bytes());
    path
}

/// Computes the commitment path for a packet.
#[must_use]
pub fn packet_commitment_path(client_id: &str, sequence: u64) -> Vec<u8> {
    path_for(CommitmentKind::PacketCommitment, client_id, sequence)
}

/// Computes the commitment path for a packet receipt.
#[must_use]
pub fn packet_receipt_commitment_path(client_id: &str, sequence: u64) -> Vec<u8> {
    path_for(CommitmentKind::PacketReceipt, client_id, sequence)
}

/// Computes the commitment path for an acknowledgement.
#[must_use]
pub fn packet_acknowledgement_commitment_path(client_id: &str, sequence: u64) -> Vec<u8> {
    path_for(CommitmentKind::AckCommitment, client_id, sequence)
}

/// keccak256 of a storage path. Attestors refer to paths by this hash.
#[must_use]
pub fn path_hash(path: &[u8]) -> [u8; 32] {
    Keccak256::digest(path).into()
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Computes the packet commitment hash.
/// Format: `sha256(0x02 || sha256(destClient) || sha256(timeout) || sha256(payloads))`
#[must_use]
pub fn packet_commitment_bytes32(packet: &Packet) -> [u8; 32] {
    let mut app_bytes = Vec::with_capacity(packet.payloads.len() * HASH_OUTPUT_SIZE);
    for payload in &packet.payloads {
        app_bytes.extend_from_slice(&hash_payload(payload));
    }

    let mut hasher = Sha256::new();
    hasher.update([IBC_VERSION]);
    hasher.update(sha256(packet.dest_client.as_bytes()));
    hasher.update(sha256(&packet.timeout_timestamp.to_be_bytes()));
    hasher.update(sha256(&app_bytes));
    hasher.finalize().into()
}

/// Computes the hash of a payload.
fn hash_payload(payload: &Payload) -> [u8; 32] {
    let mut buf = Vec::with_capacity(5 * HASH_OUTPUT_SIZE);
    buf.extend_from_slice(&sha256(payload.source_port.as_bytes()));
    buf.extend_from_slice(&sha256(payload.dest_port.as_bytes()));
    buf.extend_from_slice(&sha256(payload.version.as_bytes()));
    buf.extend_from_slice(&sha256(payload.encoding.as_bytes()));
    buf.extend_from_slice(&sha256(&payload.value));

    sha256(&buf)
}

/// Computes the acknowledgement commitment hash.
/// Format: `sha256(0x02 || sha256(ack1) || sha256(ack2) || ...)`
///
/// # Errors
/// Returns `Ics24Error::NoAcknowledgements` if the acks slice is empty.
pub fn packet_acknowledgement_commitment_bytes32<A: AsRef<[u8]>>(
    acks: &[A],
) -> Result<[u8; 32], Ics24Error> {
    if acks.is_empty() {
        return Err(Ics24Error::NoAcknowledgements);
    }

    let mut hasher = Sha256::new();
    hasher.update([IBC_VERSION]);
    for ack in acks {
        hasher.update(sha256(ack.as_ref()));
    }
    Ok(hasher.finalize().into())
}

/// Computes the packet receipt value: `keccak256(0x02 || packet_commitment)`.
#[must_use]
pub fn packet_receipt_commitment_bytes32(packet: &Packet) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update([IBC_VERSION]);
    hasher.update(packet_commitment_bytes32(packet));
    hasher.finalize().into()
}

/// Appends a path to the last element of a merkle prefix.
///
/// # Errors
/// Returns `Ics24Error::EmptyMerklePrefix` if the merkle prefix is empty.
pub fn prefixed_path(merkle_prefix: &[Vec<u8>], path: &[u8]) -> Result<Vec<Vec<u8>>, Ics24Error> {
    let mut result = merkle_prefix.to_vec();
    let last = result.last_mut().ok_or(Ics24Error::EmptyMerklePrefix)?;
    last.extend_from_slice(path);
    Ok(result)
}
