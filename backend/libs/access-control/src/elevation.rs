//! Admin-bridge: reconciles the elevation signals of a request
//!
//! Signal sources are evaluated in order; the first one that yields
//! `Some(_)` decides. Nothing yields → not elevated.
//!
//! | Order | Source         | Yields                                           | Writes session |
//! |-------|----------------|--------------------------------------------------|----------------|
//! | 1     | `UrlFlag`      | `Some(true)` when the request carries `admin=1`  | yes            |
//! | 2     | `SessionCache` | `Some(true)` when `url_admin_status` is set      | no             |
//! | 3     | `RoleCheck`    | `Some(true)` for admin-tier roles the check confirms | yes        |
//!
//! Elevation is only evaluated for logged-in visitors, and the bridge never
//! revokes it: `url_admin_status` is cleared only when the session ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::role::Role;
use crate::session::{keys, Session};

/// Query parameter carrying an elevation request
pub const ADMIN_PARAM: &str = "admin";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationPolicy {
    /// URL flag and session cache are grants; once elevated, a session stays elevated.
    #[default]
    Sticky,
    /// Only the role check grants elevation; URL flag and session cache are ignored.
    Strict,
}

impl ElevationPolicy {
    pub fn sources(&self) -> Vec<SignalSource> {
        match self {
            ElevationPolicy::Sticky => vec![
                SignalSource::UrlFlag,
                SignalSource::SessionCache,
                SignalSource::RoleCheck,
            ],
            ElevationPolicy::Strict => vec![SignalSource::RoleCheck],
        }
    }
}

/// Role-based confirmation used by [`SignalSource::RoleCheck`]
pub trait AdminCheck: Send + Sync {
    fn confirms_admin(&self, role: Role, session: &Session) -> bool;
}

/// Confirms admin-tier roles of logged-in visitors.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAdminCheck;

impl AdminCheck for RoleAdminCheck {
    fn confirms_admin(&self, role: Role, session: &Session) -> bool {
        role.is_admin_tier() && session.is_logged_in()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    UrlFlag,
    SessionCache,
    RoleCheck,
}

impl SignalSource {
    pub fn name(&self) -> &'static str {
        match self {
            SignalSource::UrlFlag => "url_flag",
            SignalSource::SessionCache => "session_cache",
            SignalSource::RoleCheck => "role_check",
        }
    }

    /// Whether a grant from this source is written back to the session.
    fn persists(&self) -> bool {
        !matches!(self, SignalSource::SessionCache)
    }

    fn signal(
        &self,
        url_flag: bool,
        session: &Session,
        role: Role,
        check: Option<&dyn AdminCheck>,
    ) -> Option<bool> {
        match self {
            SignalSource::UrlFlag => url_flag.then_some(true),
            SignalSource::SessionCache => session
                .get_bool(keys::URL_ADMIN_STATUS)
                .filter(|cached| *cached),
            SignalSource::RoleCheck => {
                if !role.is_admin_tier() {
                    return None;
                }
                // Absent check: the capability is unknown, not granted.
                let check = check?;
                check.confirms_admin(role, session).then_some(true)
            }
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone)]
pub struct AdminBridge {
    sources: Vec<SignalSource>,
    check: Option<Arc<dyn AdminCheck>>,
}

impl AdminBridge {
    pub fn new(policy: ElevationPolicy, check: Option<Arc<dyn AdminCheck>>) -> Self {
        Self {
            sources: policy.sources(),
            check,
        }
    }

    /// Default bridge: sticky policy with the role-based admin check.
    pub fn sticky() -> Self {
        Self::new(ElevationPolicy::Sticky, Some(Arc::new(RoleAdminCheck)))
    }

    pub fn with_sources(sources: Vec<SignalSource>, check: Option<Arc<dyn AdminCheck>>) -> Self {
        Self { sources, check }
    }

    pub fn sources(&self) -> &[SignalSource] {
        &self.sources
    }

    /// Reconcile the elevation signals for this request.
    pub fn resolve_elevation(&self, url_flag: bool, session: &mut Session, role: Role) -> bool {
        if !session.is_logged_in() {
            if url_flag {
                tracing::debug!("Ignoring elevation request from anonymous visitor");
            }
            return false;
        }

        for source in &self.sources {
            let Some(elevated) = source.signal(url_flag, session, role, self.check.as_deref())
            else {
                continue;
            };

            if elevated
                && source.persists()
                && session.get_bool(keys::URL_ADMIN_STATUS) != Some(true)
            {
                session.set(keys::URL_ADMIN_STATUS, true);
            }

            tracing::debug!(
                source = %source,
                role = %role,
                elevated,
                "Elevation resolved"
            );
            return elevated;
        }

        false
    }

    /// `base_url` carrying the elevation of this request; computed when
    /// `elevated` is not supplied.
    pub fn link(
        &self,
        base_url: &str,
        elevated: Option<bool>,
        session: &mut Session,
        role: Role,
    ) -> String {
        let elevated = elevated.unwrap_or_else(|| self.resolve_elevation(false, session, role));
        url_with_elevation(base_url, elevated)
    }
}

impl Default for AdminBridge {
    fn default() -> Self {
        Self::sticky()
    }
}

impl fmt::Debug for AdminBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBridge")
            .field("sources", &self.sources)
            .field("check", &self.check.is_some())
            .finish()
    }
}

/// Append `admin=1` when elevated, picking `?` or `&` as separator. The flag
/// goes before any `#fragment` so the browser still sends it.
pub fn url_with_elevation(base_url: &str, elevated: bool) -> String {
    if !elevated {
        return base_url.to_string();
    }

    let (target, fragment) = match base_url.split_once('#') {
        Some((target, fragment)) => (target, Some(fragment)),
        None => (base_url, None),
    };

    let mut url = match target.split_once('?') {
        None => format!("{}?{}=1", target, ADMIN_PARAM),
        Some((_, query)) => {
            if url_flag(query) {
                target.to_string()
            } else if query.is_empty() || query.ends_with('&') {
                format!("{}{}=1", target, ADMIN_PARAM)
            } else {
                format!("{}&{}=1", target, ADMIN_PARAM)
            }
        }
    };

    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Whether a raw query string requests elevation (`admin=1`).
pub fn url_flag(query: &str) -> bool {
    query.split('&').any(|pair| {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let matches_name = urlencoding::decode(name)
            .map(|n| n == ADMIN_PARAM)
            .unwrap_or(false);
        matches_name
            && urlencoding::decode(value)
                .map(|v| v == "1")
                .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::UserId;
    use crate::session::SessionId;

    fn logged_in(role: Role) -> Session {
        let mut session = Session::new(SessionId::generate());
        session.establish_login(UserId(1), role);
        session
    }

    #[test]
    fn test_url_flag_elevates_and_persists() {
        let bridge = AdminBridge::sticky();
        let mut session = logged_in(Role::Student);

        assert!(bridge.resolve_elevation(true, &mut session, Role::Student));
        assert_eq!(session.get_bool(keys::URL_ADMIN_STATUS), Some(true));
    }

    #[test]
    fn test_session_cache_elevates_without_write() {
        let bridge = AdminBridge::sticky();
        let mut session = logged_in(Role::Member);
        session.set(keys::URL_ADMIN_STATUS, true);
        session.take_changes();

        assert!(bridge.resolve_elevation(false, &mut session, Role::Member));
        assert!(session.changes().is_empty());
    }

    #[test]
    fn test_role_check_elevates_admin_tier() {
        let bridge = AdminBridge::sticky();

        let mut session = logged_in(Role::Admin);
        assert!(bridge.resolve_elevation(false, &mut session, Role::Admin));
        assert_eq!(session.get_bool(keys::URL_ADMIN_STATUS), Some(true));

        let mut session = logged_in(Role::Finance);
        assert!(!bridge.resolve_elevation(false, &mut session, Role::Finance));
        assert!(session.get(keys::URL_ADMIN_STATUS).is_none());
    }

    #[test]
    fn test_missing_admin_check_is_not_a_grant() {
        let bridge = AdminBridge::new(ElevationPolicy::Sticky, None);
        let mut session = logged_in(Role::SuperAdmin);

        assert!(!bridge.resolve_elevation(false, &mut session, Role::SuperAdmin));
    }

    #[test]
    fn test_false_cache_falls_through() {
        let bridge = AdminBridge::sticky();
        let mut session = logged_in(Role::Admin);
        session.set(keys::URL_ADMIN_STATUS, false);

        assert!(bridge.resolve_elevation(false, &mut session, Role::Admin));
    }

    #[test]
    fn test_anonymous_never_elevated() {
        let bridge = AdminBridge::sticky();
        let mut session = Session::new(SessionId::generate());
        session.start();

        assert!(!bridge.resolve_elevation(true, &mut session, Role::Guest));
        assert!(session.changes().is_empty());
    }

    #[test]
    fn test_strict_policy_ignores_url_and_cache() {
        let bridge = AdminBridge::new(ElevationPolicy::Strict, Some(Arc::new(RoleAdminCheck)));
        let mut session = logged_in(Role::Student);
        session.set(keys::URL_ADMIN_STATUS, true);

        assert!(!bridge.resolve_elevation(true, &mut session, Role::Student));
        assert!(bridge.resolve_elevation(false, &mut session, Role::Admin));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let bridge = AdminBridge::sticky();
        let mut session = logged_in(Role::Student);

        let first = bridge.resolve_elevation(true, &mut session, Role::Student);
        let second = bridge.resolve_elevation(true, &mut session, Role::Student);
        assert_eq!(first, second);
    }

    #[test]
    fn test_url_with_elevation() {
        assert_eq!(url_with_elevation("/reports", true), "/reports?admin=1");
        assert_eq!(
            url_with_elevation("/reports?page=2", true),
            "/reports?page=2&admin=1"
        );
        assert_eq!(url_with_elevation("/reports?", true), "/reports?admin=1");
        assert_eq!(url_with_elevation("/reports?page=2", false), "/reports?page=2");
        assert_eq!(url_with_elevation("/news?admin=1", true), "/news?admin=1");
    }

    #[test]
    fn test_url_with_elevation_keeps_fragment_last() {
        assert_eq!(url_with_elevation("/reports#top", true), "/reports?admin=1#top");
        assert_eq!(
            url_with_elevation("/reports?y=1#top", true),
            "/reports?y=1&admin=1#top"
        );
        assert_eq!(url_with_elevation("/news?admin=1#a", true), "/news?admin=1#a");
        assert_eq!(url_with_elevation("/reports#top", false), "/reports#top");
    }

    #[test]
    fn test_link_computes_missing_elevation() {
        let bridge = AdminBridge::sticky();

        let mut session = logged_in(Role::Admin);
        assert_eq!(
            bridge.link("/elections", None, &mut session, Role::Admin),
            "/elections?admin=1"
        );

        let mut session = logged_in(Role::Student);
        assert_eq!(
            bridge.link("/elections", None, &mut session, Role::Student),
            "/elections"
        );
        assert_eq!(
            bridge.link("/elections", Some(true), &mut session, Role::Student),
            "/elections?admin=1"
        );
    }

    #[test]
    fn test_url_flag_parsing() {
        assert!(url_flag("admin=1"));
        assert!(url_flag("page=2&admin=1"));
        assert!(url_flag("%61dmin=1"));
        assert!(!url_flag("admin=0"));
        assert!(!url_flag("admin=true"));
        assert!(!url_flag("admin"));
        assert!(!url_flag("superadmin=1"));
        assert!(!url_flag(""));
    }
}
