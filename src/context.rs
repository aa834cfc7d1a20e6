//! Application Context
//!
//! Owns the session, the entity store, the persistence gateway and the
//! auth session, and implements the user flows on top of them. One
//! context per running app; every flow takes `&mut self`, so mutations
//! never interleave.
//!
//! Each successful mutation is followed by exactly one save of the whole
//! snapshot. A failed save never rolls back the in-memory change; the
//! failure is logged and kept in [`AppContext::save_status`].

use crate::auth::{AuthApi, AuthSession, HttpAuthApi};
use crate::config::AppConfig;
use crate::domain::{DomainError, DomainResult, Item, List};
use crate::error::{AppResult, AuthError, PersistError};
use crate::persistence::{
    http_client, FileStore, HttpListsApi, KeyValueStore, PersistTarget, PersistenceGateway,
    RemoteLists, SaveReceipt,
};
use crate::session::{toggled_theme, SessionPatch, SessionState, View};
use crate::store::{EntityStore, PositionChange};

#[cfg(test)]
mod tests;

/// Outcome of the latest save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing saved since start or logout
    Idle,
    Saved(SaveReceipt),
    /// Save failed; the in-memory state is ahead of the stored snapshot
    Failed(PersistError),
    /// Token refresh failed during the save; the session is on the login view
    AbandonedForLogin,
}

pub struct AppContext {
    session: SessionState,
    store: EntityStore,
    gateway: PersistenceGateway,
    auth: AuthSession,
    save_status: SaveStatus,
}

impl AppContext {
    pub fn new(gateway: PersistenceGateway, auth: AuthSession) -> Self {
        Self {
            session: SessionState::default(),
            store: EntityStore::new(),
            gateway,
            auth,
            save_status: SaveStatus::Idle,
        }
    }

    /// Build a context talking HTTP to `config.api` and keeping local
    /// slots under `config.storage.data_dir`
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = http_client(&config.api)?;
        let remote: Box<dyn RemoteLists> = Box::new(HttpListsApi::new(client.clone(), &config.api));
        let local: Box<dyn KeyValueStore> = Box::new(FileStore::new(&config.storage.data_dir));
        let auth: Box<dyn AuthApi> = Box::new(HttpAuthApi::new(client, &config.api));

        Ok(Self::new(
            PersistenceGateway::new(remote, local),
            AuthSession::new(auth),
        ))
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// All lists in storage order
    pub fn get_lists(&self) -> &[List] {
        self.store.get_lists()
    }

    pub fn get_list(&self, id: &str) -> Option<&List> {
        self.store.get_list(id)
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    /// Token refreshes attempted so far
    pub fn refresh_count(&self) -> u64 {
        self.auth.refresh_count()
    }

    pub fn update_session(&mut self, patch: SessionPatch) {
        self.session.update(patch);
    }

    // ========================
    // Startup & Login
    // ========================

    /// Restore the color theme and look for lists left in local storage.
    /// Ends on the login view with an empty store.
    pub fn start(&mut self) {
        match self.gateway.load_color_theme() {
            Ok(Some(theme)) => self.session.update(SessionPatch::new().color_theme(theme)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not restore color theme: {}", e),
        }

        let has_local_data = match self.gateway.has_local_lists() {
            Ok(has) => has,
            Err(e) => {
                // Unreadable data still counts, so it is not overwritten unasked
                tracing::warn!("Local lists unreadable: {}", e);
                true
            }
        };

        self.store.clear();
        self.session.update(
            SessionPatch::new()
                .view(View::Login)
                .has_local_data(has_local_data),
        );
        tracing::info!("Started, local data present: {}", has_local_data);
    }

    /// Authenticate and load the user's lists from the remote store.
    ///
    /// A rejected login while a token is still held falls back to one
    /// refresh. On failure the session returns to the login view.
    pub async fn login(&mut self, user: &str, password: &str) -> AppResult<()> {
        self.session.update(
            SessionPatch::new()
                .view(View::Overview)
                .persist_to_remote(true)
                .user(Some(user.to_string()))
                .password(Some(password.to_string())),
        );

        let token = match self.auth.login(user, password).await {
            Err(AuthError::LoginFailed) if self.session.auth_token.is_some() => {
                self.auth.refresh().await
            }
            other => other,
        };

        match token {
            Ok(token) => {
                self.session.update(
                    SessionPatch::new()
                        .auth_token(Some(token))
                        .password(None),
                );
                self.load_lists().await
            }
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                self.session.update(
                    SessionPatch::new()
                        .view(View::Login)
                        .persist_to_remote(false)
                        .auth_token(None)
                        .password(None),
                );
                Err(e.into())
            }
        }
    }

    /// Start from scratch with local persistence. If local data exists it
    /// is overwritten only when `overwrite_confirmed`; returns whether the
    /// switch happened.
    pub fn try_out(&mut self, overwrite_confirmed: bool) -> bool {
        if self.session.has_local_data && !overwrite_confirmed {
            return false;
        }
        self.store.clear();
        self.session.update(
            SessionPatch::new()
                .view(View::Overview)
                .persist_to_remote(false)
                .input_open(true),
        );
        true
    }

    /// Continue with the lists kept in local storage
    pub fn use_local_data(&mut self) -> AppResult<()> {
        let lists = self.gateway.load_local()?.unwrap_or_default();
        self.store.replace_all(lists);
        self.session.update(
            SessionPatch::new()
                .view(View::Overview)
                .persist_to_remote(false),
        );
        Ok(())
    }

    /// Replace the store with the persisted snapshot of the current target.
    ///
    /// An empty store (nothing saved yet) is not an error. A rejected token
    /// is refreshed once and the read retried once.
    pub async fn load_lists(&mut self) -> AppResult<()> {
        let first = self
            .gateway
            .load(PersistTarget::from_session(&self.session))
            .await;

        let loaded = match first {
            Err(PersistError::AuthRequired(reason)) => {
                tracing::warn!("Load rejected ({}), refreshing token", reason);
                if !self.recover_auth().await {
                    return Err(PersistError::AuthRequired(reason).into());
                }
                let retried = self
                    .gateway
                    .load(PersistTarget::from_session(&self.session))
                    .await;
                if let Err(PersistError::AuthRequired(_)) = &retried {
                    self.fall_back_to_login();
                }
                retried
            }
            other => other,
        };

        match loaded {
            Ok(Some(lists)) => {
                tracing::info!("Loaded {} lists", lists.len());
                self.store.replace_all(lists);
                Ok(())
            }
            Ok(None) => {
                tracing::info!("No lists stored yet");
                self.store.clear();
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Loading lists failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Drop the session and the in-memory lists. Nothing is persisted.
    pub async fn logout(&mut self) {
        if self.session.persist_to_remote {
            if let Err(e) = self.auth.logout().await {
                tracing::warn!("Logout request failed: {}", e);
            }
        }
        self.store.clear();
        self.save_status = SaveStatus::Idle;
        self.session.update(
            SessionPatch::new()
                .view(View::Login)
                .persist_to_remote(false)
                .auth_token(None)
                .user(None)
                .password(None)
                .selected_item(None)
                .drag_source(None)
                .drag_target(None),
        );
    }

    // ========================
    // Views
    // ========================

    pub fn open_list(&mut self, id: &str) -> AppResult<()> {
        if self.store.get_list(id).is_none() {
            return Err(DomainError::NotFound(format!("List {} not found", id)).into());
        }
        self.session.update(
            SessionPatch::new()
                .view(View::List)
                .selected_list(Some(id.to_string())),
        );
        Ok(())
    }

    pub fn show_overview(&mut self) {
        self.session.update(
            SessionPatch::new()
                .view(View::Overview)
                .selected_list(None)
                .selected_item(None),
        );
    }

    pub fn toggle_menu(&mut self) {
        let open = !self.session.menu_open;
        self.session.update(SessionPatch::new().menu_open(open));
    }

    pub fn toggle_input(&mut self) {
        let open = !self.session.input_open;
        self.session.update(SessionPatch::new().input_open(open));
    }

    pub fn set_color_theme(&mut self, theme: &str) -> AppResult<()> {
        self.session.update(SessionPatch::new().color_theme(theme));
        self.gateway.save_color_theme(theme)?;
        Ok(())
    }

    /// Switch between dark and light; returns the new theme
    pub fn toggle_color_theme(&mut self) -> AppResult<String> {
        let next = toggled_theme(&self.session.color_theme).to_string();
        self.set_color_theme(&next)?;
        Ok(next)
    }

    // ========================
    // Mutations
    // ========================

    pub async fn add_list(&mut self, name: &str) -> AppResult<List> {
        let list = self.store.add_list(name)?;
        self.persist().await;
        Ok(list)
    }

    pub async fn remove_list(&mut self, id: &str) -> AppResult<List> {
        let removed = self.store.remove_list(id)?;
        self.persist().await;
        Ok(removed)
    }

    pub async fn add_item(&mut self, list_id: &str, name: &str) -> AppResult<Item> {
        let item = self.store.add_item(list_id, name)?;
        self.persist().await;
        Ok(item)
    }

    pub async fn remove_item(&mut self, list_id: &str, item_id: &str) -> AppResult<Item> {
        let removed = self.store.remove_item(list_id, item_id)?;
        self.persist().await;
        Ok(removed)
    }

    /// Set the completion flag. Always saved, even if unchanged.
    pub async fn set_item_done(&mut self, list_id: &str, item_id: &str, done: bool) -> AppResult<Item> {
        let item = self.store.set_item_done(list_id, item_id, done)?;
        self.session
            .update(SessionPatch::new().selected_item(Some(item_id.to_string())));
        self.persist().await;
        Ok(item)
    }

    pub async fn toggle_item_done(&mut self, list_id: &str, item_id: &str) -> AppResult<Item> {
        let done = self
            .store
            .get_list(list_id)
            .and_then(|list| list.item(item_id))
            .map(|item| item.done)
            .ok_or_else(|| {
                DomainError::NotFound(format!("Item {} not found in list {}", item_id, list_id))
            })?;
        self.set_item_done(list_id, item_id, !done).await
    }

    /// Reorder inside the root lists (`scope == None`) or one list's items,
    /// then save once for the whole batch
    pub async fn apply_reposition(
        &mut self,
        scope: Option<&str>,
        moved_id: &str,
        source: u32,
        target: u32,
    ) -> AppResult<Vec<PositionChange>> {
        let changes = self.store.apply_reposition(scope, moved_id, source, target)?;
        tracing::debug!("Reposition {} {} -> {}: {} ranks changed", moved_id, source, target, changes.len());
        self.persist().await;
        Ok(changes)
    }

    // ========================
    // Drag & Drop
    // ========================

    /// Record where a drag starts. Ranks come from the store, never from
    /// the rendered elements.
    pub fn drag_start(&mut self, id: &str) -> AppResult<u32> {
        let position = self.position_in_scope(id)?;
        self.session.update(
            SessionPatch::new()
                .drag_source(Some(position))
                .drag_target(None),
        );
        Ok(position)
    }

    /// Record the entity currently under the pointer
    pub fn drag_enter(&mut self, id: &str) -> AppResult<u32> {
        let position = self.position_in_scope(id)?;
        self.session
            .update(SessionPatch::new().drag_target(Some(position)));
        Ok(position)
    }

    /// Abandon a drag without dropping
    pub fn drag_end(&mut self) {
        self.session
            .update(SessionPatch::new().drag_source(None).drag_target(None));
    }

    /// Drop `moved_id` onto `dropped_on_id` in the current view's scope.
    /// Dropping onto itself changes and saves nothing.
    pub async fn drop(&mut self, moved_id: &str, dropped_on_id: &str) -> AppResult<Vec<PositionChange>> {
        if moved_id == dropped_on_id {
            self.drag_end();
            return Ok(Vec::new());
        }

        let resolved = self.drag_scope().and_then(|scope| {
            let source = self.position_in_scope(moved_id)?;
            let target = self.position_in_scope(dropped_on_id)?;
            Ok((scope, source, target))
        });
        self.drag_end();

        let (scope, source, target) = resolved?;
        self.apply_reposition(scope.as_deref(), moved_id, source, target)
            .await
    }

    /// Sibling collection dragged in the current view
    fn drag_scope(&self) -> DomainResult<Option<String>> {
        match self.session.current_view {
            View::Overview => Ok(None),
            View::List => self
                .session
                .selected_list_id
                .clone()
                .map(Some)
                .ok_or_else(|| DomainError::InvalidInput("No list open".to_string())),
            View::Login => Err(DomainError::InvalidInput(
                "Nothing to reorder on the login view".to_string(),
            )),
        }
    }

    fn position_in_scope(&self, id: &str) -> DomainResult<u32> {
        match self.drag_scope()? {
            None => self
                .store
                .get_list(id)
                .map(|list| list.position)
                .ok_or_else(|| DomainError::NotFound(format!("List {} not found", id))),
            Some(list_id) => self
                .store
                .get_list(&list_id)
                .and_then(|list| list.item(id))
                .map(|item| item.position)
                .ok_or_else(|| {
                    DomainError::NotFound(format!("Item {} not found in list {}", id, list_id))
                }),
        }
    }

    // ========================
    // Persistence
    // ========================

    /// Save the whole snapshot once, refreshing the token at most once
    async fn persist(&mut self) {
        let first = self
            .gateway
            .save(
                self.store.get_lists(),
                PersistTarget::from_session(&self.session),
            )
            .await;

        let result = match first {
            Err(PersistError::AuthRequired(reason)) => {
                tracing::warn!("Save rejected ({}), refreshing token", reason);
                if !self.recover_auth().await {
                    self.save_status = SaveStatus::AbandonedForLogin;
                    return;
                }
                self.gateway
                    .save(
                        self.store.get_lists(),
                        PersistTarget::from_session(&self.session),
                    )
                    .await
            }
            other => other,
        };

        self.save_status = match result {
            Ok(receipt) => SaveStatus::Saved(receipt),
            Err(e) => {
                tracing::warn!("Saving lists failed: {}", e);
                if let PersistError::AuthRequired(_) = e {
                    self.fall_back_to_login();
                }
                SaveStatus::Failed(e)
            }
        };
    }

    /// One token refresh. On failure the session falls back to login.
    async fn recover_auth(&mut self) -> bool {
        match self.auth.refresh().await {
            Ok(token) => {
                self.session
                    .update(SessionPatch::new().auth_token(Some(token)));
                true
            }
            Err(_) => {
                // AuthSession already logged the failure
                self.fall_back_to_login();
                false
            }
        }
    }

    fn fall_back_to_login(&mut self) {
        tracing::info!("Authentication lost, showing login");
        self.session.update(
            SessionPatch::new()
                .view(View::Login)
                .auth_token(None),
        );
    }
}
