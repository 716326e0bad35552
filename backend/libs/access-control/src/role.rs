//! Roles and the role resolver
//!
//! Roles are not a strict ladder:
//! - admin-tier: `Admin`, `SuperAdmin`
//! - privileged, non-admin: `Member`, `Finance`
//! - baseline: `Student`, `Guest`
//!
//! Stored role strings are validated once, at deserialization. Anything
//! unrecognised becomes `Student`, never an elevated role.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DirectoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum Role {
    Guest,
    Student,
    Member,
    Finance,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Guest,
        Role::Student,
        Role::Member,
        Role::Finance,
        Role::Admin,
        Role::SuperAdmin,
    ];

    /// Parse a stored role string. Total: unknown values coerce to `Student`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Role::Guest,
            "student" => Role::Student,
            "member" => Role::Member,
            "finance" => Role::Finance,
            "admin" => Role::Admin,
            "super_admin" => Role::SuperAdmin,
            other => {
                tracing::warn!(role = %other, "Unrecognized role string, treating as student");
                Role::Student
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Student => "student",
            Role::Member => "member",
            Role::Finance => "finance",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Human-readable label used in denial notices
    pub fn label(&self) -> &'static str {
        match self {
            Role::Guest => "Guest",
            Role::Student => "Student",
            Role::Member => "Member",
            Role::Finance => "Finance",
            Role::Admin => "Administrator",
            Role::SuperAdmin => "Super Administrator",
        }
    }

    pub fn is_admin_tier(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn is_privileged_member(&self) -> bool {
        matches!(self, Role::Member | Role::Finance)
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => UserStatus::Active,
            "suspended" => UserStatus::Suspended,
            _ => UserStatus::Inactive,
        }
    }
}

impl From<String> for UserStatus {
    fn from(s: String) -> Self {
        UserStatus::parse(&s)
    }
}

/// Persisted user record as supplied by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub role: Role,
    pub status: UserStatus,
}

impl UserRecord {
    pub fn new(id: i64, role: Role) -> Self {
        Self {
            id: UserId(id),
            role,
            status: UserStatus::Active,
        }
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }
}

/// Role of the current visitor; anonymous visitors are `Guest`.
pub fn resolve_role(current_user: Option<&UserRecord>) -> Role {
    current_user.map(|user| user.role).unwrap_or(Role::Guest)
}

/// Resolve a role from a directory lookup result, failing closed to `Guest`.
pub fn resolve_role_from_lookup(lookup: Result<Option<UserRecord>, DirectoryError>) -> Role {
    match lookup {
        Ok(user) => resolve_role(user.as_ref()),
        Err(e) => {
            tracing::warn!(error = %e, "User lookup failed, resolving role as guest");
            Role::Guest
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), role);
        }
    }

    #[test]
    fn test_unknown_role_coerces_to_student() {
        assert_eq!(Role::parse("chairperson"), Role::Student);
        assert_eq!(Role::parse(""), Role::Student);
        assert_eq!(Role::parse("superadmin"), Role::Student);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Role::parse(" Admin "), Role::Admin);
        assert_eq!(Role::parse("SUPER_ADMIN"), Role::SuperAdmin);
    }

    #[test]
    fn test_tiers() {
        assert!(Role::Admin.is_admin_tier());
        assert!(Role::SuperAdmin.is_admin_tier());
        assert!(!Role::Finance.is_admin_tier());
        assert!(Role::Finance.is_privileged_member());
        assert!(Role::Member.is_privileged_member());
        assert!(!Role::Student.is_privileged_member());
    }

    #[test]
    fn test_user_record_validated_at_deserialization() {
        let json = r#"{"id": 7, "role": "treasurer", "status": "archived"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();

        assert_eq!(user.id, UserId(7));
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.status, UserStatus::Inactive);
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"super_admin\"");
    }

    #[test]
    fn test_resolve_role() {
        assert_eq!(resolve_role(None), Role::Guest);

        let finance = UserRecord::new(3, Role::Finance);
        assert_eq!(resolve_role(Some(&finance)), Role::Finance);
    }

    #[test]
    fn test_resolve_role_fails_closed() {
        let lookup = Err(DirectoryError::Unavailable("connection refused".into()));
        assert_eq!(resolve_role_from_lookup(lookup), Role::Guest);

        let lookup = Ok(Some(UserRecord::new(1, Role::SuperAdmin)));
        assert_eq!(resolve_role_from_lookup(lookup), Role::SuperAdmin);
    }
}
