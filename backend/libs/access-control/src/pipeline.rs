use std::sync::Arc;

use crate::directory::UserDirectory;
use crate::elevation::{url_flag, AdminBridge};
use crate::permission::AccessContext;
use crate::role::{resolve_role_from_lookup, UserStatus};
use crate::session::{keys, Session};

/// Resolves the [`AccessContext`] of one request from its session.
#[derive(Clone)]
pub struct AccessPipeline {
    bridge: AdminBridge,
    directory: Arc<dyn UserDirectory>,
}

impl AccessPipeline {
    pub fn new(bridge: AdminBridge, directory: Arc<dyn UserDirectory>) -> Self {
        Self { bridge, directory }
    }

    pub fn bridge(&self) -> &AdminBridge {
        &self.bridge
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Resolve role and elevation for this request.
    ///
    /// A user id that no longer exists in the directory, or whose account is
    /// no longer active, drops the login from the session. A directory that
    /// cannot answer resolves the role as guest but keeps the login, so a
    /// cached elevation still applies.
    pub async fn evaluate(&self, session: &mut Session, query: Option<&str>) -> AccessContext {
        session.start();
        let requested = query.map(url_flag).unwrap_or(false);

        let Some(user_id) = session.user_id().filter(|_| session.is_logged_in()) else {
            return AccessContext::anonymous();
        };

        let lookup = self.directory.find_user(user_id).await;
        if let Ok(None) = lookup {
            tracing::info!(user_id = %user_id, "Session user no longer exists, dropping login");
            session.drop_login();
            return AccessContext::anonymous();
        }
        if let Ok(Some(user)) = &lookup {
            if user.status != UserStatus::Active {
                tracing::info!(
                    user_id = %user_id,
                    status = ?user.status,
                    "Session user is no longer active, dropping login"
                );
                session.drop_login();
                return AccessContext::anonymous();
            }
        }

        let found = lookup.as_ref().ok().cloned().flatten();
        let role = resolve_role_from_lookup(lookup);

        if let Some(user) = found {
            if session.cached_role() != Some(user.role) {
                session.set(keys::ROLE, user.role.as_str());
            }
        }

        let elevated = self.bridge.resolve_elevation(requested, session, role);
        AccessContext::new(true, role, elevated)
    }

    /// `base_url` carrying the elevation already resolved for this request.
    pub fn link(&self, base_url: &str, ctx: &AccessContext) -> String {
        crate::elevation::url_with_elevation(base_url, ctx.is_elevated())
    }
}
