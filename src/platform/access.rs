//! Ordered access-control lists for groups and containers.

use crate::{RoleId, SubjectId};

/// Who an access entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    /// Every member of the server.
    Everyone,
    /// The assistant's own account.
    Service,
    Subject(SubjectId),
    Role(RoleId),
}

/// Set of container permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub view: bool,
    pub send: bool,
    pub embed_links: bool,
    pub attach_files: bool,
}

impl Permissions {
    pub const NONE: Self = Self {
        view: false,
        send: false,
        embed_links: false,
        attach_files: false,
    };

    pub const VIEW: Self = Self {
        view: true,
        ..Self::NONE
    };

    pub const READ_WRITE: Self = Self {
        view: true,
        send: true,
        ..Self::NONE
    };

    /// Read, write, embed and attach. Granted to the assistant itself so it
    /// can always post the ticket controls.
    pub const ELEVATED: Self = Self {
        view: true,
        send: true,
        embed_links: true,
        attach_files: true,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// One overwrite: permissions explicitly allowed and explicitly denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessEntry {
    pub principal: Principal,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl AccessEntry {
    pub fn allow(principal: Principal, allow: Permissions) -> Self {
        Self {
            principal,
            allow,
            deny: Permissions::NONE,
        }
    }

    pub fn deny(principal: Principal, deny: Permissions) -> Self {
        Self {
            principal,
            allow: Permissions::NONE,
            deny,
        }
    }
}

/// Ordered list of access entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    entries: Vec<AccessEntry>,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entry: AccessEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Private ticket channel: hidden from everyone, readable and writable by
    /// the requester and the support role, elevated for the assistant.
    pub fn ticket(requester: SubjectId, support_role: Option<RoleId>) -> Self {
        let list = Self::new()
            .with(AccessEntry::deny(Principal::Everyone, Permissions::VIEW))
            .with(AccessEntry::allow(
                Principal::Subject(requester),
                Permissions::READ_WRITE,
            ))
            .with(AccessEntry::allow(Principal::Service, Permissions::ELEVATED));
        match support_role {
            Some(role) => list.with(AccessEntry::allow(
                Principal::Role(role),
                Permissions::READ_WRITE,
            )),
            None => list,
        }
    }

    /// Archive group defaults: deny-all except the assistant and the support role.
    pub fn archive(support_role: Option<RoleId>) -> Self {
        let list = Self::new()
            .with(AccessEntry::deny(Principal::Everyone, Permissions::VIEW))
            .with(AccessEntry::allow(Principal::Service, Permissions::VIEW));
        match support_role {
            Some(role) => list.with(AccessEntry::allow(Principal::Role(role), Permissions::VIEW)),
            None => list,
        }
    }

    pub fn entries(&self) -> &[AccessEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry for `principal`, if one exists.
    pub fn entry_for(&self, principal: Principal) -> Option<&AccessEntry> {
        self.entries.iter().find(|entry| entry.principal == principal)
    }

    /// Effective view permission for a subject holding `roles`.
    ///
    /// Subject entries beat role entries, which beat the everyone entry. Within
    /// a level an explicit allow wins over a deny.
    pub fn can_view(&self, subject: SubjectId, roles: &[RoleId]) -> bool {
        if let Some(entry) = self.entry_for(Principal::Subject(subject)) {
            if entry.allow.view {
                return true;
            }
            if entry.deny.view {
                return false;
            }
        }

        let role_entries = self.entries.iter().filter(|entry| {
            matches!(entry.principal, Principal::Role(role) if roles.contains(&role))
        });
        let mut role_denied = false;
        for entry in role_entries {
            if entry.allow.view {
                return true;
            }
            role_denied |= entry.deny.view;
        }
        if role_denied {
            return false;
        }

        self.entry_for(Principal::Everyone)
            .is_none_or(|entry| !entry.deny.view)
    }
}

impl<'a> IntoIterator for &'a AccessList {
    type Item = &'a AccessEntry;
    type IntoIter = std::slice::Iter<'a, AccessEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
