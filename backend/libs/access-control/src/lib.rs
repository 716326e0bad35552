//! Access Control Library for the student-council admin
//!
//! Decides which interface tier a request gets (admin vs member/student) and
//! whether a privileged action is allowed. Carries the admin-elevation flag
//! across pages through the session and `admin=1` links.
//!
//! # Request flow
//!
//! ```text
//! request
//!   → SessionStore::open        (session adapter, load)
//!   → UserDirectory::find_user  (collaborator, fail closed)
//!   → resolve_role              (role resolver)
//!   → AdminBridge               (UrlFlag → SessionCache → RoleCheck)
//!   → AccessContext             (permission engine predicates)
//!   → authorize                 (access gate: Allow | Deny(reason))
//!   → SessionStore::flush       (persist changed keys only)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use access_control::{
//!     authorize, AccessPipeline, AdminBridge, Decision, InMemoryUserDirectory,
//!     MemorySessionStore, Requirement, SessionStore,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemorySessionStore::new(Duration::from_secs(1800));
//!     let pipeline = AccessPipeline::new(
//!         AdminBridge::sticky(),
//!         Arc::new(InMemoryUserDirectory::new()),
//!     );
//!
//!     let mut session = store.open(None).await;
//!     let ctx = pipeline.evaluate(&mut session, Some("admin=1")).await;
//!
//!     if let Decision::Deny(reason) = authorize(&ctx, &Requirement::AdminInterface) {
//!         println!("denied: {}", reason);
//!     }
//!
//!     store.flush(&mut session).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod elevation;
pub mod error;
pub mod gate;
pub mod permission;
pub mod pipeline;
pub mod role;
pub mod session;

pub use config::{AccessConfig, SessionBackendKind, SessionConfig};
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use elevation::{
    url_flag, url_with_elevation, AdminBridge, AdminCheck, ElevationPolicy, RoleAdminCheck,
    SignalSource,
};
pub use error::{ConfigError, DirectoryError, SessionError};
pub use gate::{authorize, AccessGate, AccessPredicate, Decision, Denial, DenyReason, Requirement};
pub use permission::{allowed_actions, AccessContext, AccessState, Action, Resource};
pub use pipeline::AccessPipeline;
pub use role::{resolve_role, resolve_role_from_lookup, Role, UserId, UserRecord, UserStatus};
pub use session::{
    keys, MemorySessionStore, RedisSessionStore, Session, SessionChanges, SessionId, SessionStore,
};
