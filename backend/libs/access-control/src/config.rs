use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::elevation::{AdminBridge, ElevationPolicy, RoleAdminCheck};
use crate::error::ConfigError;
use crate::gate::AccessGate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub elevation_policy: ElevationPolicy,
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            elevation_policy: ElevationPolicy::default(),
            login_path: default_login_path(),
        }
    }
}

impl AccessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::InvalidLoginPath(self.login_path.clone()));
        }
        Ok(())
    }

    pub fn bridge(&self) -> AdminBridge {
        AdminBridge::new(self.elevation_policy, Some(Arc::new(RoleAdminCheck)))
    }

    pub fn gate(&self) -> AccessGate {
        AccessGate::new(self.login_path.clone())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackendKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackendKind,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackendKind::default(),
            cookie_name: default_cookie_name(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_name = !self.cookie_name.is_empty()
            && self
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(ConfigError::InvalidCookieName(self.cookie_name.clone()));
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_cookie_name() -> String {
    "council_session".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AccessConfig::default().validate().is_ok());
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AccessConfig =
            serde_json::from_str(r#"{"elevation_policy": "strict"}"#).unwrap();
        assert_eq!(config.elevation_policy, ElevationPolicy::Strict);
        assert_eq!(config.login_path, "/login");

        let session: SessionConfig = serde_json::from_str(r#"{"backend": "redis"}"#).unwrap();
        assert_eq!(session.backend, SessionBackendKind::Redis);
        assert_eq!(session.idle_timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn test_invalid_values() {
        let config = AccessConfig {
            login_path: "login".to_string(),
            ..AccessConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLoginPath("login".to_string()))
        );

        let session = SessionConfig {
            cookie_name: "bad name;".to_string(),
            ..SessionConfig::default()
        };
        assert!(matches!(
            session.validate(),
            Err(ConfigError::InvalidCookieName(_))
        ));

        let session = SessionConfig {
            idle_timeout_secs: 0,
            ..SessionConfig::default()
        };
        assert_eq!(session.validate(), Err(ConfigError::ZeroIdleTimeout));
    }

    #[test]
    fn test_strict_bridge_sources() {
        let config = AccessConfig {
            elevation_policy: ElevationPolicy::Strict,
            ..AccessConfig::default()
        };
        assert_eq!(config.bridge().sources().len(), 1);
    }
}
