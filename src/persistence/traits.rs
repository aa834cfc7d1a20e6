//! Persistence - Core Traits
//!
//! Abstract backends for the two persistence targets.
//! Implementations can use HTTP, files, in-memory maps, etc.

use async_trait::async_trait;

use crate::domain::List;
use crate::error::PersistError;

/// Remote store holding the whole list snapshot of one user
#[async_trait]
pub trait RemoteLists: Send + Sync {
    /// Fetch the stored snapshot; `Ok(None)` when nothing is stored yet
    async fn fetch_lists(&self, token: &str) -> Result<Option<Vec<List>>, PersistError>;

    /// Replace the stored snapshot
    async fn push_lists(&self, token: &str, lists: &[List]) -> Result<(), PersistError>;
}

/// String slots addressed by fixed keys (local durable storage)
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` if the slot was never written
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;

    /// Overwrite the slot
    fn set(&self, key: &str, value: &str) -> Result<(), PersistError>;
}
