//! Access gate: turns a permission predicate into allow/deny
//!
//! Denial is an expected outcome, not an error path. The reason separates
//! "please log in" from "insufficient privilege" because the remediation
//! differs.

use serde::Serialize;
use thiserror::Error;

use crate::permission::{AccessContext, Action, Resource};
use crate::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    #[error("Please log in to continue")]
    NotAuthenticated,

    #[error("Access denied for role {}", .role.label())]
    InsufficientPrivilege { role: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Something the gate can evaluate against an [`AccessContext`]
pub trait AccessPredicate {
    fn evaluate(&self, ctx: &AccessContext) -> bool;
}

impl<F> AccessPredicate for F
where
    F: Fn(&AccessContext) -> bool,
{
    fn evaluate(&self, ctx: &AccessContext) -> bool {
        self(ctx)
    }
}

/// Named predicates used by page handlers and route guards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    LoggedIn,
    Admin,
    SuperAdmin,
    Member,
    AdminInterface,
    /// Content shared by admin-tier and member-tier visitors
    AdminInterfaceOrMember,
    ManageElections,
    Permission(Action, Resource),
}

impl AccessPredicate for Requirement {
    fn evaluate(&self, ctx: &AccessContext) -> bool {
        match self {
            Requirement::LoggedIn => ctx.is_logged_in(),
            Requirement::Admin => ctx.is_admin(),
            Requirement::SuperAdmin => ctx.is_super_admin(),
            Requirement::Member => ctx.is_member(),
            Requirement::AdminInterface => ctx.should_use_admin_interface(),
            Requirement::AdminInterfaceOrMember => {
                ctx.should_use_admin_interface() || ctx.is_member()
            }
            Requirement::ManageElections => ctx.can_manage_elections(),
            Requirement::Permission(action, resource) => ctx.has_permission(*action, *resource),
        }
    }
}

/// Evaluate `predicate`; deny as unauthenticated when the visitor is anonymous.
pub fn authorize<P>(ctx: &AccessContext, predicate: &P) -> Decision
where
    P: AccessPredicate + ?Sized,
{
    if predicate.evaluate(ctx) {
        return Decision::Allow;
    }

    let reason = if ctx.is_logged_in() {
        DenyReason::InsufficientPrivilege { role: ctx.role() }
    } else {
        DenyReason::NotAuthenticated
    };
    tracing::debug!(reason = %reason, "Access denied");
    Decision::Deny(reason)
}

/// User-facing outcome of a denial
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    /// Send the visitor to the login page
    Redirect { location: String },
    /// Static notice naming the visitor's role
    Notice { role: Role, message: String },
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    login_path: String,
}

impl AccessGate {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn authorize<P>(&self, ctx: &AccessContext, predicate: &P) -> Decision
    where
        P: AccessPredicate + ?Sized,
    {
        authorize(ctx, predicate)
    }

    /// Build the response for a denial of `requested_path`.
    pub fn denial(&self, reason: DenyReason, requested_path: &str) -> Denial {
        match reason {
            DenyReason::NotAuthenticated => {
                let separator = if self.login_path.contains('?') { '&' } else { '?' };
                Denial::Redirect {
                    location: format!(
                        "{}{}redirect={}",
                        self.login_path,
                        separator,
                        urlencoding::encode(requested_path)
                    ),
                }
            }
            DenyReason::InsufficientPrivilege { role } => Denial::Notice {
                role,
                message: format!(
                    "Access denied: your role ({}) does not permit this page. \
                     Contact an administrator if you need access.",
                    role.label()
                ),
            },
        }
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new("/login")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow() {
        let ctx = AccessContext::new(true, Role::Admin, false);
        assert_eq!(authorize(&ctx, &Requirement::Admin), Decision::Allow);
    }

    #[test]
    fn test_anonymous_denied_as_not_authenticated() {
        let ctx = AccessContext::anonymous();
        assert_eq!(
            authorize(&ctx, &Requirement::AdminInterface),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
    }

    #[test]
    fn test_authenticated_denied_with_role() {
        let ctx = AccessContext::new(true, Role::Student, false);
        assert_eq!(
            authorize(&ctx, &Requirement::ManageElections),
            Decision::Deny(DenyReason::InsufficientPrivilege {
                role: Role::Student
            })
        );
    }

    #[test]
    fn test_closure_predicate() {
        let ctx = AccessContext::new(true, Role::Member, false);
        let shared = |c: &AccessContext| c.should_use_admin_interface() || c.is_member();
        assert!(authorize(&ctx, &shared).is_allowed());
    }

    #[test]
    fn test_admin_interface_or_member() {
        let member = AccessContext::new(true, Role::Member, false);
        let finance = AccessContext::new(true, Role::Finance, false);
        let elevated = AccessContext::new(true, Role::Finance, true);

        assert!(Requirement::AdminInterfaceOrMember.evaluate(&member));
        assert!(!Requirement::AdminInterfaceOrMember.evaluate(&finance));
        assert!(Requirement::AdminInterfaceOrMember.evaluate(&elevated));
    }

    #[test]
    fn test_denial_redirect_encodes_path() {
        let gate = AccessGate::new("/login");
        let denial = gate.denial(DenyReason::NotAuthenticated, "/reports?page=2");
        assert_eq!(
            denial,
            Denial::Redirect {
                location: "/login?redirect=%2Freports%3Fpage%3D2".to_string()
            }
        );
    }

    #[test]
    fn test_denial_notice_names_role() {
        let gate = AccessGate::default();
        match gate.denial(
            DenyReason::InsufficientPrivilege { role: Role::Finance },
            "/elections",
        ) {
            Denial::Notice { role, message } => {
                assert_eq!(role, Role::Finance);
                assert!(message.contains("Finance"));
                assert!(message.contains("Contact an administrator"));
            }
            other => panic!("expected notice, got {:?}", other),
        }
    }

    #[test]
    fn test_decision_into_result() {
        assert!(Decision::Allow.into_result().is_ok());
        assert_eq!(
            Decision::Deny(DenyReason::NotAuthenticated).into_result(),
            Err(DenyReason::NotAuthenticated)
        );
    }
}
