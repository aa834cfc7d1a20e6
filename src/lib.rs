//! Listkeeper
//!
//! Core of a list-management app: named lists of checkable items, both
//! kept in a user-defined order that drag and drop can change. The state
//! is persisted as one snapshot, either to a remote API behind bearer
//! authentication or to local storage.
//!
//! Rendering is left to the host; it drives an [`AppContext`] and reads
//! back its session and store.

pub mod auth;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod session;
pub mod store;

pub use auth::{AuthApi, AuthSession, HttpAuthApi};
pub use config::{ApiConfig, AppConfig, LogConfig, StorageConfig};
pub use context::{AppContext, SaveStatus};
pub use domain::{DomainError, DomainResult, Item, List};
pub use error::{AppError, AppResult, AuthError, AuthFailure, ConfigError, PersistError};
pub use persistence::{PersistTarget, PersistenceGateway, SaveReceipt};
pub use session::{SessionPatch, SessionState, View};
pub use store::{EntityStore, PositionChange};

/// Route `tracing` output into the rolling log file under `config.dir`
pub fn init_logging(config: &LogConfig) -> std::io::Result<rolling_logger::RollingLogger> {
    rolling_logger::init_logger(&config.dir, &config.logger_config())
}
