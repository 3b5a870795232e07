use std::collections::HashMap;

use crate::models::Video;
use crate::user_models::{Role, Session};

/// What a role may do. Each axis is independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_upload: bool,
    pub can_download: bool,
    pub can_moderate: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        can_upload: false,
        can_download: false,
        can_moderate: false,
    };

    pub const fn new(can_upload: bool, can_download: bool, can_moderate: bool) -> Self {
        Self {
            can_upload,
            can_download,
            can_moderate,
        }
    }

    pub fn includes(&self, other: &Capabilities) -> bool {
        (self.can_upload || !other.can_upload)
            && (self.can_download || !other.can_download)
            && (self.can_moderate || !other.can_moderate)
    }
}

/// Role to capability mapping. Anything not in the table gets nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    entries: HashMap<Role, Capabilities>,
}

impl Default for RoleTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(Role::CoreMember, Capabilities::new(true, true, true));
        entries.insert(Role::CollaboratingTeacher, Capabilities::new(true, true, false));
        entries.insert(Role::DownloadMember, Capabilities::new(false, true, false));
        Self { entries }
    }
}

impl RoleTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with(mut self, role: Role, capabilities: Capabilities) -> Self {
        self.entries.insert(role, capabilities);
        self
    }

    pub fn resolve(&self, role: Option<&Role>) -> Capabilities {
        role.and_then(|r| self.entries.get(r))
            .copied()
            .unwrap_or(Capabilities::NONE)
    }

    pub fn for_session(&self, session: Option<&Session>) -> Capabilities {
        self.resolve(session.map(|s| &s.user.role))
    }
}

pub fn capabilities_for(role: &Role) -> Capabilities {
    RoleTable::default().resolve(Some(role))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Public,
    Admin,
}

pub fn route_for(capabilities: &Capabilities) -> Route {
    if capabilities.can_moderate {
        Route::Admin
    } else {
        Route::Public
    }
}

/// Whether the session may edit or delete `video`: moderators always may,
/// everyone else only for videos they uploaded.
pub fn can_modify(roles: &RoleTable, session: Option<&Session>, video: &Video) -> bool {
    let Some(session) = session else {
        return false;
    };
    if roles.for_session(Some(session)).can_moderate {
        return true;
    }
    let email = session.user.email.trim();
    !email.is_empty()
        && video
            .uploader_email
            .as_deref()
            .map(str::trim)
            .is_some_and(|owner| owner == email)
}

/// Backup links are only exposed to sessions that may download.
pub fn backup_link_visible<'a>(
    roles: &RoleTable,
    session: Option<&Session>,
    video: &'a Video,
) -> Option<&'a str> {
    if roles.for_session(session).can_download {
        video.content.backup_link.as_deref()
    } else {
        None
    }
}
