//! Error types above the domain layer.

use thiserror::Error;

use crate::domain::DomainError;

/// Why the remote store refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// 401, or no token to send
    #[error("unauthorized")]
    Unauthorized,
    /// 403
    #[error("forbidden")]
    Forbidden,
}

/// Failures while saving or loading a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// The token is missing or rejected; refresh and retry
    #[error("authentication required: {0}")]
    AuthRequired(AuthFailure),

    /// Any other non-success HTTP status
    #[error("{status} {text}")]
    Http { status: u16, text: String },

    /// Request never got an answer
    #[error("network error: {0}")]
    Network(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local durable storage failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl PersistError {
    /// Transport-level failure (HTTP status or network)
    pub fn is_transport(&self) -> bool {
        matches!(self, PersistError::Http { .. } | PersistError::Network(_))
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        PersistError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PersistError {
    fn from(err: std::io::Error) -> Self {
        PersistError::Storage(err.to_string())
    }
}

/// Failures of the authentication endpoints
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Credentials rejected at login
    #[error("login failed")]
    LoginFailed,

    /// Refresh rejected; the user has to log in again
    #[error("session expired")]
    Expired,

    #[error("{status} {text}")]
    Http { status: u16, text: String },

    #[error("network error: {0}")]
    Network(String),

    /// Success status without a usable token
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Umbrella error returned by `AppContext` flows
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type AppResult<T> = Result<T, AppError>;
