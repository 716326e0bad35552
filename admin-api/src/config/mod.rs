use access_control::{AccessConfig, SessionConfig};
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub access: AccessConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Shared secret presented by the login page when it hands over a
/// verified user id.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub upstream_secret: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/student_council".to_string(),
                max_connections: default_max_connections(),
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
            },
            session: SessionConfig::default(),
            access: AccessConfig::default(),
            auth: AuthConfig {
                upstream_secret: "development-secret-change-in-production".to_string(),
            },
        }
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "postgres://localhost/student_council")?
        .set_default("database.max_connections", 10)?
        .set_default("redis.url", "redis://localhost:6379")?
        .set_default("session.backend", "memory")?
        .set_default("session.cookie_name", "council_session")?
        .set_default("session.idle_timeout_secs", 1800)?
        .set_default("access.elevation_policy", "sticky")?
        .set_default("access.login_path", "/login")
}

impl Config {
    /// Load from the environment. `auth.upstream_secret` has no default, so
    /// startup fails when `AUTH__UPSTREAM_SECRET` is not set.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::Environment::default().separator("__"));
        let config: Config = with_defaults(builder)?.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.session.validate()?;
        self.access.validate()?;
        if self.auth.upstream_secret.is_empty() {
            anyhow::bail!("auth.upstream_secret must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_empty_upstream_secret_rejected() {
        let mut config = Config::default();
        config.auth.upstream_secret.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upstream_secret_has_no_default() {
        let missing = with_defaults(config::Config::builder())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Config>();
        assert!(missing.is_err());

        let provided: Config = with_defaults(config::Config::builder())
            .unwrap()
            .set_override("auth.upstream_secret", "from-deployment")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(provided.auth.upstream_secret, "from-deployment");
        assert_eq!(provided.session.cookie_name, "council_session");
        assert!(provided.validate().is_ok());
    }
}
