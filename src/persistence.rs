//! Persistence Gateway
//!
//! Saves and loads the whole list snapshot, either through the remote API
//! or through local durable storage. Every save replaces the previous
//! snapshot; nothing is merged.

mod local;
mod remote;
mod traits;

pub use local::{FileStore, MemoryStore};
pub use remote::{http_client, HttpListsApi};
pub use traits::{KeyValueStore, RemoteLists};

use chrono::{DateTime, Utc};

use crate::domain::List;
use crate::error::{AuthFailure, PersistError};
use crate::session::SessionState;

/// Local slot holding the serialized lists
pub const LISTS_KEY: &str = "fwlLists";
/// Local slot holding the color theme name
pub const COLOR_THEME_KEY: &str = "fwlColorTheme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Remote,
    Local,
}

/// Where a save or load goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistTarget<'a> {
    Remote { token: Option<&'a str> },
    Local,
}

impl<'a> PersistTarget<'a> {
    /// Target selected by the session's `persist_to_remote` flag
    pub fn from_session(session: &'a SessionState) -> Self {
        if session.persist_to_remote {
            PersistTarget::Remote {
                token: session.auth_token.as_deref(),
            }
        } else {
            PersistTarget::Local
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            PersistTarget::Remote { .. } => TargetKind::Remote,
            PersistTarget::Local => TargetKind::Local,
        }
    }
}

/// Acknowledgement of one completed save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Monotonic per gateway, one per save attempt
    pub revision: u64,
    pub target: TargetKind,
    pub saved_at: DateTime<Utc>,
}

pub struct PersistenceGateway {
    remote: Box<dyn RemoteLists>,
    local: Box<dyn KeyValueStore>,
    revision: u64,
}

impl PersistenceGateway {
    pub fn new(remote: Box<dyn RemoteLists>, local: Box<dyn KeyValueStore>) -> Self {
        Self {
            remote,
            local,
            revision: 0,
        }
    }

    /// Revision of the latest save attempt (0 before the first)
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the stored snapshot with `lists`.
    ///
    /// A remote target without a token fails with `AuthRequired` before any
    /// request is made.
    pub async fn save(
        &mut self,
        lists: &[List],
        target: PersistTarget<'_>,
    ) -> Result<SaveReceipt, PersistError> {
        self.revision += 1;
        let revision = self.revision;

        match target {
            PersistTarget::Remote { token } => {
                let token = token.ok_or(PersistError::AuthRequired(AuthFailure::Unauthorized))?;
                self.remote.push_lists(token, lists).await?;
            }
            PersistTarget::Local => {
                let json = serde_json::to_string(lists)?;
                self.local.set(LISTS_KEY, &json)?;
            }
        }

        tracing::debug!(revision, target = ?target.kind(), lists = lists.len(), "snapshot saved");
        Ok(SaveReceipt {
            revision,
            target: target.kind(),
            saved_at: Utc::now(),
        })
    }

    /// Read the stored snapshot; `Ok(None)` when nothing is stored yet
    pub async fn load(&self, target: PersistTarget<'_>) -> Result<Option<Vec<List>>, PersistError> {
        match target {
            PersistTarget::Remote { token } => {
                let token = token.ok_or(PersistError::AuthRequired(AuthFailure::Unauthorized))?;
                self.remote.fetch_lists(token).await
            }
            PersistTarget::Local => self.load_local(),
        }
    }

    /// Read the local snapshot regardless of the session target
    pub fn load_local(&self) -> Result<Option<Vec<List>>, PersistError> {
        match self.local.get(LISTS_KEY)? {
            None => Ok(None),
            Some(json) => Ok(serde_json::from_str::<Option<Vec<List>>>(&json)?),
        }
    }

    /// Whether a local snapshot exists (an empty one counts)
    pub fn has_local_lists(&self) -> Result<bool, PersistError> {
        Ok(self.load_local()?.is_some())
    }

    pub fn save_color_theme(&self, theme: &str) -> Result<(), PersistError> {
        self.local.set(COLOR_THEME_KEY, &serde_json::to_string(theme)?)
    }

    /// Stored theme name. A bare, unquoted value is accepted as the name.
    pub fn load_color_theme(&self) -> Result<Option<String>, PersistError> {
        let raw = match self.local.get(COLOR_THEME_KEY)? {
            None => return Ok(None),
            Some(raw) => raw,
        };
        match serde_json::from_str::<Option<String>>(&raw) {
            Ok(theme) => Ok(theme.filter(|t| !t.is_empty())),
            Err(_) => {
                let trimmed = raw.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
        }
    }
}
