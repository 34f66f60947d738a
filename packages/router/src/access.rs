//! Caller capabilities checked at the start of each router operation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RouterError;

/// Roles granted by the access-control collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May relay recv, ack, timeout, client updates and misbehaviour
    Relayer,
    /// May register clients and applications
    Customizer,
    /// May choose a custom client id at registration
    IdCustomizer,
}

/// A verified caller identity with its granted roles.
///
/// Applications are identified by the same `id` they were registered with,
/// which is what `send_packet` checks port ownership against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    id: String,
    roles: BTreeSet<Role>,
}

impl Caller {
    /// Caller without roles
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Grant a role
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// Caller identity
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the caller holds `role`
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Fails with [`RouterError::Unauthorized`] if the caller lacks `role`
    ///
    /// # Errors
    /// See above
    pub fn require(&self, role: Role) -> Result<(), RouterError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(RouterError::Unauthorized {
                caller: self.id.clone(),
                role,
            })
        }
    }
}
