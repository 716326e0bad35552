use thiserror::Error;

/// Errors raised by session store backends
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the user-record lookup collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("User directory unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed user record: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid login path: {0}")]
    InvalidLoginPath(String),

    #[error("Invalid session cookie name: {0}")]
    InvalidCookieName(String),

    #[error("Session idle timeout must be greater than zero")]
    ZeroIdleTimeout,
}
