//! Authentication
//!
//! Login, token refresh and logout against the auth endpoints. The token
//! is opaque here; it is stored in the session and attached as a bearer
//! credential by the remote list store.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::AuthError;

/// Auth endpoints
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for an access token
    async fn login(&self, user: &str, password: &str) -> Result<String, AuthError>;

    /// New access token from the session cookie
    async fn refresh(&self) -> Result<String, AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;
}

#[derive(Serialize)]
struct Credentials<'a> {
    user: &'a str,
    pwd: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

/// reqwest implementation of [`AuthApi`]
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    auth_url: String,
    refresh_url: String,
    logout_url: String,
}

impl HttpAuthApi {
    /// `client` should have a cookie store so refresh sees the login cookie
    pub fn new(client: reqwest::Client, api: &ApiConfig) -> Self {
        Self {
            client,
            auth_url: api.auth_url.clone(),
            refresh_url: api.refresh_url.clone(),
            logout_url: api.logout_url.clone(),
        }
    }

    async fn read_token(response: reqwest::Response) -> Result<String, AuthError> {
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        token_from(body)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, user: &str, password: &str) -> Result<String, AuthError> {
        tracing::debug!("Logging in {} at {}", user, self.auth_url);

        let response = self
            .client
            .post(&self.auth_url)
            .json(&Credentials { user, pwd: password })
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        check_status(response.status(), AuthError::LoginFailed)?;
        Self::read_token(response).await
    }

    async fn refresh(&self) -> Result<String, AuthError> {
        tracing::debug!("Refreshing token at {}", self.refresh_url);

        let response = self
            .client
            .get(&self.refresh_url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        check_status(response.status(), AuthError::Expired)?;
        Self::read_token(response).await
    }

    async fn logout(&self) -> Result<(), AuthError> {
        // The response carries nothing we need
        self.client
            .get(&self.logout_url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        Ok(())
    }
}

/// 401/403 become `rejected`; other failures keep their status
fn check_status(status: StatusCode, rejected: AuthError) -> Result<(), AuthError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(rejected),
        s if s.is_success() => Ok(()),
        s => Err(AuthError::Http {
            status: s.as_u16(),
            text: s.canonical_reason().unwrap_or("").to_string(),
        }),
    }
}

fn token_from(body: TokenResponse) -> Result<String, AuthError> {
    body.access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidResponse("missing accessToken".to_string()))
}

/// Token lifecycle on top of an [`AuthApi`]
pub struct AuthSession {
    api: Box<dyn AuthApi>,
    refreshes: u64,
}

impl AuthSession {
    pub fn new(api: Box<dyn AuthApi>) -> Self {
        Self { api, refreshes: 0 }
    }

    pub async fn login(&self, user: &str, password: &str) -> Result<String, AuthError> {
        if user.is_empty() || password.is_empty() {
            return Err(AuthError::LoginFailed);
        }
        let token = self.api.login(user, password).await?;
        tracing::info!("Logged in as {}", user);
        Ok(token)
    }

    pub async fn refresh(&mut self) -> Result<String, AuthError> {
        self.refreshes += 1;
        match self.api.refresh().await {
            Ok(token) => {
                tracing::info!("Access token refreshed");
                Ok(token)
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                Err(e)
            }
        }
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.api.logout().await
    }

    /// Refresh attempts made through this session
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }
}
