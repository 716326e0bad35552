//! Permission engine
//!
//! [`AccessContext`] is computed once per request and is immutable; every
//! predicate is a pure function of the resolved role (and, for the admin
//! interface, the admin-bridge elevation). Nothing here is cached across
//! requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Feature areas of the council application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Departments,
    Documents,
    Reports,
    Elections,
    News,
    Messages,
    Settings,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Departments,
        Resource::Documents,
        Resource::Reports,
        Resource::Elections,
        Resource::News,
        Resource::Messages,
        Resource::Settings,
        Resource::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Departments => "departments",
            Resource::Documents => "documents",
            Resource::Reports => "reports",
            Resource::Elections => "elections",
            Resource::News => "news",
            Resource::Messages => "messages",
            Resource::Settings => "settings",
            Resource::Users => "users",
        }
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Invalid resource: {}", s))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const NONE: &[Action] = &[];
const READ: &[Action] = &[Action::Read];
const CONTRIBUTE: &[Action] = &[Action::Read, Action::Create];
const EDIT: &[Action] = &[Action::Read, Action::Create, Action::Update];
const MANAGE: &[Action] = &[Action::Read, Action::Update];
const ALL: &[Action] = &[Action::Read, Action::Create, Action::Update, Action::Delete];

/// Allowed actions for a (role, resource) pair.
pub fn allowed_actions(role: Role, resource: Resource) -> &'static [Action] {
    use Resource::*;

    match role {
        Role::Guest => NONE,
        Role::Student => match resource {
            Departments | Documents | Elections | News => READ,
            Messages => CONTRIBUTE,
            Reports | Settings | Users => NONE,
        },
        Role::Member => match resource {
            Departments | Elections => READ,
            Documents | Reports => EDIT,
            News | Messages => CONTRIBUTE,
            Users => READ,
            Settings => NONE,
        },
        Role::Finance => match resource {
            Departments | Elections => READ,
            Documents => EDIT,
            Reports => ALL,
            News | Messages => CONTRIBUTE,
            Users | Settings => READ,
        },
        Role::Admin => match resource {
            Departments | Documents | Reports | News | Messages => ALL,
            // Ordinary admins may read elections but not run them.
            Elections => READ,
            Settings => MANAGE,
            Users => EDIT,
        },
        Role::SuperAdmin => ALL,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub enum AccessState {
    Anonymous,
    Authenticated(Role),
    Elevated(Role),
}

/// Access decision inputs resolved for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessContext {
    logged_in: bool,
    role: Role,
    elevated: bool,
}

impl AccessContext {
    pub fn new(logged_in: bool, role: Role, elevated: bool) -> Self {
        // Anonymous visitors are always guests and never elevated.
        if !logged_in {
            return Self::anonymous();
        }
        Self {
            logged_in,
            role,
            elevated,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            logged_in: false,
            role: Role::Guest,
            elevated: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin_tier()
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn is_member(&self) -> bool {
        self.role == Role::Member
    }

    /// Gates admin-only UI and operations; broader than [`Self::is_admin`].
    pub fn should_use_admin_interface(&self) -> bool {
        self.is_admin() || self.elevated
    }

    /// Only super admins mutate elections.
    pub fn can_manage_elections(&self) -> bool {
        self.is_super_admin()
    }

    pub fn has_permission(&self, action: Action, resource: Resource) -> bool {
        allowed_actions(self.role, resource).contains(&action)
    }

    pub fn state(&self) -> AccessState {
        match (self.logged_in, self.elevated) {
            (false, _) => AccessState::Anonymous,
            (true, false) => AccessState::Authenticated(self.role),
            (true, true) => AccessState::Elevated(self.role),
        }
    }
}
