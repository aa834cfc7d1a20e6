//! Remote List Store
//!
//! HTTP client for `{root}/json/lists`. Reads return the snapshot wrapped
//! as `{ data: { lists } }`; writes send `{ lists }`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::traits::RemoteLists;
use crate::config::ApiConfig;
use crate::domain::List;
use crate::error::{AuthFailure, ConfigError, PersistError};

/// Build the HTTP client shared by the list store and auth endpoints.
///
/// The cookie store carries the refresh cookie set at login.
pub fn http_client(api: &ApiConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(api.request_timeout_secs))
        .build()
        .map_err(|e| ConfigError::Client(e.to_string()))
}

#[derive(Deserialize)]
struct ListsEnvelope {
    data: ListsData,
}

#[derive(Deserialize)]
struct ListsData {
    #[serde(default)]
    lists: Option<Vec<List>>,
}

#[derive(Serialize)]
struct ListsBody<'a> {
    lists: &'a [List],
}

/// reqwest implementation of [`RemoteLists`]
#[derive(Debug, Clone)]
pub struct HttpListsApi {
    client: reqwest::Client,
    lists_url: String,
}

impl HttpListsApi {
    pub fn new(client: reqwest::Client, api: &ApiConfig) -> Self {
        Self {
            client,
            lists_url: api.lists_url(),
        }
    }
}

#[async_trait]
impl RemoteLists for HttpListsApi {
    async fn fetch_lists(&self, token: &str) -> Result<Option<Vec<List>>, PersistError> {
        tracing::debug!("Fetching lists from {}", self.lists_url);

        let response = self
            .client
            .get(&self.lists_url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| PersistError::Network(e.to_string()))?;

        let status = response.status();
        check_status(status)?;
        if status == StatusCode::NO_CONTENT {
            tracing::info!("Remote store has no lists yet");
            return Ok(None);
        }

        let envelope: ListsEnvelope = response
            .json()
            .await
            .map_err(|e| PersistError::Serialization(e.to_string()))?;
        Ok(Some(envelope.data.lists.unwrap_or_default()))
    }

    async fn push_lists(&self, token: &str, lists: &[List]) -> Result<(), PersistError> {
        tracing::debug!("Pushing {} lists to {}", lists.len(), self.lists_url);

        let response = self
            .client
            .post(&self.lists_url)
            .bearer_auth(token)
            .json(&ListsBody { lists })
            .send()
            .await
            .map_err(|e| PersistError::Network(e.to_string()))?;

        check_status(response.status())
    }
}

/// Map a response status onto the persistence error taxonomy
pub(crate) fn check_status(status: StatusCode) -> Result<(), PersistError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(PersistError::AuthRequired(AuthFailure::Unauthorized)),
        StatusCode::FORBIDDEN => Err(PersistError::AuthRequired(AuthFailure::Forbidden)),
        s if s.is_success() => Ok(()),
        s => Err(PersistError::Http {
            status: s.as_u16(),
            text: s.canonical_reason().unwrap_or("").to_string(),
        }),
    }
}
