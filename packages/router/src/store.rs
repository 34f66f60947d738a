//! Per-client commitment store and send sequence counter.

use std::collections::BTreeMap;

use ibc_eureka_types::ics24::CommitmentKind;

/// IBC sequences start from 1
pub const FIRST_SEQUENCE: u64 = 1;

type Key = (CommitmentKind, u64);

/// Changes held back while a batch runs; `None` marks a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    writes: BTreeMap<Key, Option<[u8; 32]>>,
    next_sequence_send: u64,
}

/// Commitments kept under one client id, keyed by `(kind, sequence)`.
///
/// An absent entry is meaningful: a deleted packet commitment marks the
/// packet as acknowledged or timed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentStore {
    commitments: BTreeMap<Key, [u8; 32]>,
    next_sequence_send: u64,
    pending: Option<Pending>,
}

impl Default for CommitmentStore {
    fn default() -> Self {
        Self {
            commitments: BTreeMap::new(),
            next_sequence_send: FIRST_SEQUENCE,
            pending: None,
        }
    }
}

impl CommitmentStore {
    /// Value stored under `(kind, sequence)`
    #[must_use]
    pub fn get(&self, kind: CommitmentKind, sequence: u64) -> Option<[u8; 32]> {
        let key = (kind, sequence);
        if let Some(write) = self.pending.as_ref().and_then(|p| p.writes.get(&key)) {
            return *write;
        }
        self.commitments.get(&key).copied()
    }

    /// Store a value, replacing any previous one
    pub fn set(&mut self, kind: CommitmentKind, sequence: u64, value: [u8; 32]) {
        self.write((kind, sequence), Some(value));
    }

    /// Delete a value, returning it
    pub fn delete(&mut self, kind: CommitmentKind, sequence: u64) -> Option<[u8; 32]> {
        let previous = self.get(kind, sequence);
        self.write((kind, sequence), None);
        previous
    }

    /// Reserve the next send sequence
    pub fn next_sequence(&mut self) -> u64 {
        let counter = match &mut self.pending {
            Some(pending) => &mut pending.next_sequence_send,
            None => &mut self.next_sequence_send,
        };
        let sequence = *counter;
        *counter += 1;
        sequence
    }

    /// The sequence the next sent packet will get
    #[must_use]
    pub fn peek_next_sequence(&self) -> u64 {
        self.pending
            .as_ref()
            .map_or(self.next_sequence_send, |p| p.next_sequence_send)
    }

    /// Hold back writes until [`Self::commit_batch`] or [`Self::rollback_batch`].
    /// Reads see the held-back writes.
    pub fn begin_batch(&mut self) {
        self.pending = Some(Pending {
            writes: BTreeMap::new(),
            next_sequence_send: self.next_sequence_send,
        });
    }

    /// Apply the writes held back since [`Self::begin_batch`]
    pub fn commit_batch(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        for (key, write) in pending.writes {
            match write {
                Some(value) => self.commitments.insert(key, value),
                None => self.commitments.remove(&key),
            };
        }
        self.next_sequence_send = pending.next_sequence_send;
    }

    /// Drop the writes held back since [`Self::begin_batch`]
    pub fn rollback_batch(&mut self) {
        self.pending = None;
    }

    fn write(&mut self, key: Key, value: Option<[u8; 32]>) {
        match (&mut self.pending, value) {
            (Some(pending), value) => {
                pending.writes.insert(key, value);
            }
            (None, Some(value)) => {
                self.commitments.insert(key, value);
            }
            (None, None) => {
                self.commitments.remove(&key);
            }
        }
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (CommitmentKind, u64, [u8; 32])> + '_ {
        self.commitments
            .iter()
            .map(|(&(kind, sequence), value)| (kind, sequence, *value))
    }

    pub(crate) fn from_parts(
        next_sequence_send: u64,
        entries: impl IntoIterator<Item = (CommitmentKind, u64, [u8; 32])>,
    ) -> Self {
        Self {
            commitments: entries
                .into_iter()
                .map(|(kind, sequence, value)| ((kind, sequence), value))
                .collect(),
            next_sequence_send,
            pending: None,
        }
    }
}
