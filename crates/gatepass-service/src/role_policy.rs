//! Initial role assignment from the registrant's phone number.

use gatepass_config::RolePolicyConfig;
use gatepass_core::UserRole;
use std::collections::HashSet;

/// Maps a phone number to the role a new user starts with.
///
/// Matching is exact string equality against the configured sets; an admin
/// match overrides a staff match.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    staff_phones: HashSet<String>,
    admin_phones: HashSet<String>,
}

impl RolePolicy {
    /// Builds the policy from configuration.
    #[must_use]
    pub fn new(config: &RolePolicyConfig) -> Self {
        Self {
            staff_phones: config.staff_phones.iter().cloned().collect(),
            admin_phones: config.admin_phones.iter().cloned().collect(),
        }
    }

    /// Returns the initial role for `phone`.
    #[must_use]
    pub fn assign_role(&self, phone: &str) -> UserRole {
        let mut role = UserRole::Member;
        if self.staff_phones.contains(phone) {
            role = UserRole::Staff;
        }
        if self.admin_phones.contains(phone) {
            role = UserRole::Admin;
        }
        role
    }
}
