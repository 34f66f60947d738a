use std::collections::BTreeSet;

use alloy_primitives::FixedBytes as AlloyFixedBytes;
use alloy_sol_types::SolValue;
use ibc_eureka_types::ics24::path_hash;

/// handy alias for 32-byte fixed bytes
pub type B32 = AlloyFixedBytes<32>;

/// Represents a lightweight attested fact as `keccak256(path)` and the value stored there.
/// Including the path hash binds the value to its sequence, which the
/// commitment hash alone does not (there is no merkle proof to do it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PacketCompact {
    /// Hash of the ICS24 storage path
    pub path: B32,

    /// Value committed at that path, all zeroes for an attested absence
    pub commitment: B32,
}

impl PacketCompact {
    /// Create a new packet compact from a path hash and a commitment
    pub fn new<T>(path: T, commitment: T) -> Self
    where
        T: Into<B32>,
    {
        Self {
            path: path.into(),
            commitment: commitment.into(),
        }
    }

    /// Create a packet compact from a raw (unhashed) storage path
    #[must_use]
    pub fn for_path(path: &[u8], commitment: [u8; 32]) -> Self {
        Self::new(path_hash(path), commitment)
    }

    /// Create a packet compact attesting that nothing is stored at `path`
    #[must_use]
    pub fn absent(path: &[u8]) -> Self {
        Self::for_path(path, [0u8; 32])
    }

    /// Whether this entry attests an absence
    #[must_use]
    pub fn is_absence(&self) -> bool {
        self.commitment == B32::ZERO
    }

    /// Convert packet compact to a tuple of path and commitment
    #[inline]
    #[must_use]
    pub const fn as_tuple(&self) -> (B32, B32) {
        (self.path, self.commitment)
    }
}

impl From<(B32, B32)> for PacketCompact {
    fn from((path, commitment): (B32, B32)) -> Self {
        Self { path, commitment }
    }
}

/// Ordered list of attested facts.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PacketCommitments(Vec<PacketCompact>);

impl PacketCommitments {
    /// Create a new instance of [`PacketCommitments`] from a vector of [`PacketCompact`]
    #[must_use]
    pub const fn new(packets: Vec<PacketCompact>) -> Self {
        Self(packets)
    }

    /// Iterate over each individual fact
    pub fn iterate(&self) -> impl Iterator<Item = &PacketCompact> {
        self.0.iter()
    }

    /// Number of facts
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find the fact recorded for a path hash
    #[must_use]
    pub fn find_by_path(&self, path: &B32) -> Option<&PacketCompact> {
        self.0.iter().find(|p| &p.path == path)
    }

    /// First path hash recorded more than once. A set with duplicates is
    /// ambiguous and must not be trusted.
    #[must_use]
    pub fn duplicate_path(&self) -> Option<&B32> {
        let mut seen = BTreeSet::new();
        self.0.iter().map(|p| &p.path).find(|path| !seen.insert(*path))
    }

    /// Tuples in order, as they are ABI encoded
    #[must_use]
    pub fn to_tuples(&self) -> Vec<(B32, B32)> {
        self.iterate().map(PacketCompact::as_tuple).collect()
    }

    /// Encode packet commitments to ABI bytes as (bytes32,bytes32)[]
    #[must_use]
    pub fn to_abi_bytes(&self) -> Vec<u8> {
        self.to_tuples().abi_encode()
    }

    /// Decode packet commitments from ABI bytes encoded as (bytes32,bytes32)[]
    ///
    /// # Errors
    /// Returns an error if `raw` is not a valid encoding
    pub fn from_abi_bytes(raw: &[u8]) -> Result<Self, alloy_sol_types::Error> {
        let tuples = Vec::<(B32, B32)>::abi_decode(raw)?;
        Ok(tuples.into_iter().collect())
    }

    /// Convert to inner vector of [`PacketCompact`]
    #[must_use]
    pub fn into_inner(self) -> Vec<PacketCompact> {
        self.0
    }
}

impl FromIterator<PacketCompact> for PacketCommitments {
    fn from_iter<I: IntoIterator<Item = PacketCompact>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromIterator<(B32, B32)> for PacketCommitments {
    fn from_iter<I: IntoIterator<Item = (B32, B32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(PacketCompact::from).collect())
    }
}
