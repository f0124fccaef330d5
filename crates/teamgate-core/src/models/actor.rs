//! The authenticated caller of an operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity supplied by the hosting layer for every call. It is trusted as
/// already authenticated; `is_system_admin` is decided externally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub is_system_admin: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Actor {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            is_system_admin: false,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn system_admin(id: Uuid) -> Self {
        Self {
            is_system_admin: true,
            ..Self::new(id)
        }
    }

    /// Attaches request provenance recorded on audit entries.
    pub fn with_provenance(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}
