use std::collections::BTreeSet;

use serde::Deserialize;

/// Extra-config namespace holding an endpoint's relying-party settings.
pub const NAMESPACE: &str = "github.com/relying-party/roles";

/// Per-endpoint role allow-list.
///
/// `roles` is required: a block without it is treated as malformed rather
/// than as "deny everyone".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointAuthConfig {
    pub roles: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Permit,
    Deny,
}

impl EndpointAuthConfig {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Exact, case-sensitive match. An empty allow-list denies every role.
    pub fn authorize(&self, role: &str) -> Access {
        if self.roles.contains(role) {
            Access::Permit
        } else {
            Access::Deny
        }
    }
}
