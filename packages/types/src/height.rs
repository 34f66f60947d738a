//! Revision-aware block height

use core::fmt;

use serde::{Deserialize, Serialize};

/// A height on the counterparty chain.
///
/// Heights are ordered lexicographically on `(revision_number, revision_height)`,
/// which the derived `Ord` gives us through field order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Height {
    /// Revision (fork/epoch) number of the chain
    pub revision_number: u64,
    /// Block height within the revision
    pub revision_height: u64,
}

impl Height {
    /// Create a new [`Height`]
    #[must_use]
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// Height in revision 0, which is what the attestor networks use
    #[must_use]
    pub const fn at(revision_height: u64) -> Self {
        Self::new(0, revision_height)
    }

    /// Whether both components are zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}
