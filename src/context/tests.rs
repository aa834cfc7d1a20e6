use super::*;
use crate::error::{AppError, AuthFailure};
use crate::persistence::{MemoryStore, LISTS_KEY, COLOR_THEME_KEY, TargetKind};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ========================
// Fakes
// ========================

/// Remote answering from queued responses; unqueued fetches return the
/// last pushed snapshot, unqueued pushes succeed
#[derive(Clone, Default)]
struct ScriptedRemote {
    state: Arc<Mutex<RemoteState>>,
}

#[derive(Default)]
struct RemoteState {
    fetches: VecDeque<Result<Option<Vec<List>>, PersistError>>,
    pushes: VecDeque<Result<(), PersistError>>,
    stored: Option<Vec<List>>,
    fetch_tokens: Vec<String>,
    push_tokens: Vec<String>,
}

impl ScriptedRemote {
    fn on_fetch(self, response: Result<Option<Vec<List>>, PersistError>) -> Self {
        self.state.lock().unwrap().fetches.push_back(response);
        self
    }

    fn on_push(self, response: Result<(), PersistError>) -> Self {
        self.state.lock().unwrap().pushes.push_back(response);
        self
    }

    fn fetch_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().fetch_tokens.clone()
    }

    fn push_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().push_tokens.clone()
    }

    fn stored(&self) -> Option<Vec<List>> {
        self.state.lock().unwrap().stored.clone()
    }
}

#[async_trait]
impl RemoteLists for ScriptedRemote {
    async fn fetch_lists(&self, token: &str) -> Result<Option<Vec<List>>, PersistError> {
        let mut state = self.state.lock().unwrap();
        state.fetch_tokens.push(token.to_string());
        match state.fetches.pop_front() {
            Some(response) => response,
            None => Ok(state.stored.clone()),
        }
    }

    async fn push_lists(&self, token: &str, lists: &[List]) -> Result<(), PersistError> {
        let mut state = self.state.lock().unwrap();
        state.push_tokens.push(token.to_string());
        let response = state.pushes.pop_front().unwrap_or(Ok(()));
        if response.is_ok() {
            state.stored = Some(lists.to_vec());
        }
        response
    }
}

#[derive(Clone, Default)]
struct ScriptedAuth {
    state: Arc<Mutex<AuthState>>,
}

#[derive(Default)]
struct AuthState {
    logins: VecDeque<Result<String, AuthError>>,
    refreshes: VecDeque<Result<String, AuthError>>,
    calls: Vec<String>,
}

impl ScriptedAuth {
    fn on_login(self, response: Result<String, AuthError>) -> Self {
        self.state.lock().unwrap().logins.push_back(response);
        self
    }

    fn on_refresh(self, response: Result<String, AuthError>) -> Self {
        self.state.lock().unwrap().refreshes.push_back(response);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl AuthApi for ScriptedAuth {
    async fn login(&self, user: &str, _password: &str) -> Result<String, AuthError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("login {}", user));
        state.logins.pop_front().unwrap_or(Err(AuthError::LoginFailed))
    }

    async fn refresh(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("refresh".to_string());
        state.refreshes.pop_front().unwrap_or(Err(AuthError::Expired))
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.state.lock().unwrap().calls.push("logout".to_string());
        Ok(())
    }
}

// ========================
// Helpers
// ========================

fn context_with(remote: ScriptedRemote, auth: ScriptedAuth, local: MemoryStore) -> AppContext {
    AppContext::new(
        PersistenceGateway::new(Box::new(remote), Box::new(local)),
        AuthSession::new(Box::new(auth)),
    )
}

/// Context persisting locally into a shared `MemoryStore`
fn local_context() -> (AppContext, MemoryStore) {
    let local = MemoryStore::new();
    let ctx = context_with(ScriptedRemote::default(), ScriptedAuth::default(), local.clone());
    (ctx, local)
}

/// Context persisting remotely with `token` already held
fn remote_context(remote: ScriptedRemote, auth: ScriptedAuth, token: &str) -> AppContext {
    let mut ctx = context_with(remote, auth, MemoryStore::new());
    ctx.update_session(
        SessionPatch::new()
            .persist_to_remote(true)
            .auth_token(Some(token.to_string())),
    );
    ctx
}

fn snapshot(names: &[&str]) -> Vec<List> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| List::new(format!("l{}", i), name.to_string(), i as u32))
        .collect()
}

/// List ids ordered by rank
fn order(ctx: &AppContext) -> Vec<String> {
    ctx.store()
        .lists_by_position()
        .into_iter()
        .map(|list| list.name.clone())
        .collect()
}

fn stored_local(local: &MemoryStore) -> Vec<List> {
    let json = local.get(LISTS_KEY).unwrap().unwrap();
    serde_json::from_str(&json).unwrap()
}

// ========================
// Mutations
// ========================

#[tokio::test]
async fn test_add_list_saves_once_locally() {
    let (mut ctx, local) = local_context();

    let list = ctx.add_list("Groceries").await.unwrap();

    assert_eq!(list.position, 0);
    assert_eq!(local.writes(LISTS_KEY), 1);
    assert_eq!(stored_local(&local), ctx.get_lists().to_vec());
    match ctx.save_status() {
        SaveStatus::Saved(receipt) => assert_eq!(receipt.target, TargetKind::Local),
        other => panic!("unexpected status {:?}", other),
    }
}

#[tokio::test]
async fn test_add_then_remove_restores_lists() {
    let (mut ctx, local) = local_context();
    ctx.add_list("A").await.unwrap();
    ctx.add_list("B").await.unwrap();
    let before = ctx.get_lists().to_vec();
    let writes = local.writes(LISTS_KEY);

    let added = ctx.add_list("C").await.unwrap();
    ctx.remove_list(&added.id).await.unwrap();

    assert_eq!(ctx.get_lists(), &before[..]);
    assert_eq!(local.writes(LISTS_KEY), writes + 2);
}

#[tokio::test]
async fn test_set_done_twice_saves_twice() {
    let (mut ctx, local) = local_context();
    let list = ctx.add_list("Chores").await.unwrap();
    let item = ctx.add_item(&list.id, "Dishes").await.unwrap();
    let writes = local.writes(LISTS_KEY);

    ctx.set_item_done(&list.id, &item.id, true).await.unwrap();
    ctx.set_item_done(&list.id, &item.id, true).await.unwrap();

    let stored = ctx.get_list(&list.id).unwrap().item(&item.id).unwrap().clone();
    assert!(stored.done);
    assert_eq!(local.writes(LISTS_KEY), writes + 2);
    assert_eq!(ctx.session().selected_item_id.as_deref(), Some(item.id.as_str()));
}

#[tokio::test]
async fn test_toggle_item_done() {
    let (mut ctx, _) = local_context();
    let list = ctx.add_list("Chores").await.unwrap();
    let item = ctx.add_item(&list.id, "Dishes").await.unwrap();

    assert!(ctx.toggle_item_done(&list.id, &item.id).await.unwrap().done);
    assert!(!ctx.toggle_item_done(&list.id, &item.id).await.unwrap().done);
}

#[tokio::test]
async fn test_missing_entity_is_not_saved() {
    let (mut ctx, local) = local_context();
    let list = ctx.add_list("A").await.unwrap();
    let writes = local.writes(LISTS_KEY);

    let err = ctx.remove_list("nope").await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::NotFound(_))));

    let err = ctx.toggle_item_done(&list.id, "nope").await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::NotFound(_))));

    assert_eq!(local.writes(LISTS_KEY), writes);
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let (mut ctx, local) = local_context();
    let err = ctx.add_list("").await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::InvalidInput(_))));
    assert_eq!(local.writes(LISTS_KEY), 0);
}

// ========================
// Drag & Drop
// ========================

#[tokio::test]
async fn test_drag_list_down() {
    let (mut ctx, local) = local_context();
    for name in ["A", "B", "C", "D"] {
        ctx.add_list(name).await.unwrap();
    }
    let ids: Vec<String> = ctx.get_lists().iter().map(|l| l.id.clone()).collect();
    let writes = local.writes(LISTS_KEY);

    assert_eq!(ctx.drag_start(&ids[0]).unwrap(), 0);
    assert_eq!(ctx.drag_enter(&ids[3]).unwrap(), 3);
    assert_eq!(ctx.session().drag_source_position, Some(0));
    assert_eq!(ctx.session().drag_target_position, Some(3));

    ctx.drop(&ids[0], &ids[3]).await.unwrap();

    assert_eq!(order(&ctx), vec!["B", "C", "D", "A"]);
    assert_eq!(local.writes(LISTS_KEY), writes + 1);
    assert_eq!(ctx.session().drag_source_position, None);
    assert_eq!(ctx.session().drag_target_position, None);
}

#[tokio::test]
async fn test_drag_list_up() {
    let (mut ctx, _) = local_context();
    for name in ["A", "B", "C", "D"] {
        ctx.add_list(name).await.unwrap();
    }
    let ids: Vec<String> = ctx.get_lists().iter().map(|l| l.id.clone()).collect();

    ctx.drag_start(&ids[3]).unwrap();
    ctx.drag_enter(&ids[1]).unwrap();
    let changes = ctx.drop(&ids[3], &ids[1]).await.unwrap();

    assert_eq!(order(&ctx), vec!["A", "D", "B", "C"]);
    assert_eq!(changes.len(), 3);
}

#[tokio::test]
async fn test_drop_on_itself_changes_nothing() {
    let (mut ctx, local) = local_context();
    ctx.add_list("A").await.unwrap();
    ctx.add_list("B").await.unwrap();
    let id = ctx.get_lists()[0].id.clone();
    let before = ctx.get_lists().to_vec();
    let writes = local.writes(LISTS_KEY);

    ctx.drag_start(&id).unwrap();
    let changes = ctx.drop(&id, &id).await.unwrap();

    assert!(changes.is_empty());
    assert_eq!(ctx.get_lists(), &before[..]);
    assert_eq!(local.writes(LISTS_KEY), writes);
    assert_eq!(ctx.session().drag_source_position, None);
}

#[tokio::test]
async fn test_drag_items_in_open_list() {
    let (mut ctx, _) = local_context();
    let list = ctx.add_list("Chores").await.unwrap();
    let mut ids = Vec::new();
    for name in ["x", "y", "z"] {
        ids.push(ctx.add_item(&list.id, name).await.unwrap().id);
    }
    ctx.open_list(&list.id).unwrap();

    ctx.drag_start(&ids[2]).unwrap();
    ctx.drop(&ids[2], &ids[0]).await.unwrap();

    let names: Vec<&str> = ctx
        .get_list(&list.id)
        .unwrap()
        .items_by_position()
        .into_iter()
        .map(|item| item.name.as_str())
        .collect();
    assert_eq!(names, vec!["z", "x", "y"]);
}

#[tokio::test]
async fn test_drag_on_login_view_is_rejected() {
    let (mut ctx, _) = local_context();
    ctx.add_list("A").await.unwrap();
    let id = ctx.get_lists()[0].id.clone();
    ctx.update_session(SessionPatch::new().view(View::Login));

    assert!(matches!(
        ctx.drag_start(&id),
        Err(AppError::Domain(DomainError::InvalidInput(_)))
    ));
}

#[tokio::test]
async fn test_stale_reposition_is_rejected() {
    let (mut ctx, local) = local_context();
    ctx.add_list("A").await.unwrap();
    ctx.add_list("B").await.unwrap();
    let id = ctx.get_lists()[0].id.clone();
    let writes = local.writes(LISTS_KEY);

    let err = ctx.apply_reposition(None, &id, 1, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::InvalidInput(_))));
    assert_eq!(local.writes(LISTS_KEY), writes);
}

// ========================
// Loading & Auth Recovery
// ========================

#[tokio::test]
async fn test_empty_remote_store_is_not_an_error() {
    let remote = ScriptedRemote::default().on_fetch(Ok(None));
    let mut ctx = remote_context(remote, ScriptedAuth::default(), "tok");

    ctx.load_lists().await.unwrap();

    assert!(ctx.store().is_empty());
    assert_eq!(ctx.session().current_view, View::Overview);
    assert_eq!(ctx.save_status(), &SaveStatus::Idle);
}

#[tokio::test]
async fn test_load_normalizes_ranks() {
    let mut lists = snapshot(&["a", "b", "c"]);
    lists[0].position = 7;
    lists[1].position = 7;
    lists[2].position = 0;
    let remote = ScriptedRemote::default().on_fetch(Ok(Some(lists)));
    let mut ctx = remote_context(remote, ScriptedAuth::default(), "tok");

    ctx.load_lists().await.unwrap();

    assert_eq!(order(&ctx), vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_rejected_load_refreshes_once_and_retries() {
    let remote = ScriptedRemote::default()
        .on_fetch(Err(PersistError::AuthRequired(AuthFailure::Unauthorized)))
        .on_fetch(Ok(Some(snapshot(&["a"]))));
    let auth = ScriptedAuth::default().on_refresh(Ok("fresh".to_string()));
    let mut ctx = remote_context(remote.clone(), auth.clone(), "stale");

    ctx.load_lists().await.unwrap();

    assert_eq!(ctx.get_lists().len(), 1);
    assert_eq!(ctx.refresh_count(), 1);
    assert_eq!(remote.fetch_tokens(), vec!["stale", "fresh"]);
    assert_eq!(ctx.session().auth_token.as_deref(), Some("fresh"));
    assert_eq!(auth.calls(), vec!["refresh"]);
}

#[tokio::test]
async fn test_failed_refresh_falls_back_to_login() {
    let remote = ScriptedRemote::default()
        .on_fetch(Err(PersistError::AuthRequired(AuthFailure::Forbidden)));
    let mut ctx = remote_context(remote.clone(), ScriptedAuth::default(), "stale");

    let err = ctx.load_lists().await.unwrap_err();

    assert!(matches!(err, AppError::Persist(PersistError::AuthRequired(_))));
    assert_eq!(ctx.refresh_count(), 1);
    assert_eq!(ctx.session().current_view, View::Login);
    assert_eq!(ctx.session().auth_token, None);
    assert_eq!(remote.fetch_tokens().len(), 1);
}

#[tokio::test]
async fn test_rejected_save_refreshes_once_and_retries() {
    let remote = ScriptedRemote::default()
        .on_push(Err(PersistError::AuthRequired(AuthFailure::Unauthorized)));
    let auth = ScriptedAuth::default().on_refresh(Ok("fresh".to_string()));
    let mut ctx = remote_context(remote.clone(), auth, "stale");

    ctx.add_list("A").await.unwrap();

    assert_eq!(remote.push_tokens(), vec!["stale", "fresh"]);
    assert_eq!(remote.stored(), Some(ctx.get_lists().to_vec()));
    assert_eq!(ctx.refresh_count(), 1);
    assert!(matches!(ctx.save_status(), SaveStatus::Saved(r) if r.target == TargetKind::Remote));
}

#[tokio::test]
async fn test_save_abandoned_when_refresh_fails() {
    let remote = ScriptedRemote::default()
        .on_push(Err(PersistError::AuthRequired(AuthFailure::Unauthorized)));
    let mut ctx = remote_context(remote.clone(), ScriptedAuth::default(), "stale");

    let list = ctx.add_list("A").await.unwrap();

    assert_eq!(ctx.save_status(), &SaveStatus::AbandonedForLogin);
    assert_eq!(ctx.session().current_view, View::Login);
    assert_eq!(remote.push_tokens().len(), 1);
    // The mutation itself stands
    assert!(ctx.get_list(&list.id).is_some());
}

#[tokio::test]
async fn test_transport_failure_is_surfaced() {
    let failure = PersistError::Http {
        status: 500,
        text: "Internal Server Error".to_string(),
    };
    let remote = ScriptedRemote::default().on_push(Err(failure.clone()));
    let mut ctx = remote_context(remote, ScriptedAuth::default(), "tok");

    let list = ctx.add_list("A").await.unwrap();

    assert_eq!(ctx.save_status(), &SaveStatus::Failed(failure));
    assert_eq!(ctx.refresh_count(), 0);
    assert!(ctx.get_list(&list.id).is_some());
    assert_eq!(ctx.session().current_view, View::Overview);
}

// ========================
// Session Flows
// ========================

#[tokio::test]
async fn test_login_loads_remote_lists() {
    let remote = ScriptedRemote::default().on_fetch(Ok(Some(snapshot(&["a", "b"]))));
    let auth = ScriptedAuth::default().on_login(Ok("tok".to_string()));
    let mut ctx = context_with(remote.clone(), auth, MemoryStore::new());
    ctx.start();

    ctx.login("ana", "secret").await.unwrap();

    let session = ctx.session();
    assert_eq!(session.current_view, View::Overview);
    assert!(session.persist_to_remote);
    assert_eq!(session.auth_token.as_deref(), Some("tok"));
    assert_eq!(session.password, None);
    assert_eq!(session.user.as_deref(), Some("ana"));
    assert_eq!(order(&ctx), vec!["a", "b"]);
    assert_eq!(remote.fetch_tokens(), vec!["tok"]);
}

#[tokio::test]
async fn test_failed_login_returns_to_login_view() {
    let remote = ScriptedRemote::default();
    let mut ctx = context_with(remote.clone(), ScriptedAuth::default(), MemoryStore::new());
    ctx.start();

    let err = ctx.login("ana", "wrong").await.unwrap_err();

    assert!(matches!(err, AppError::Auth(AuthError::LoginFailed)));
    assert_eq!(ctx.session().current_view, View::Login);
    assert_eq!(ctx.session().auth_token, None);
    assert!(!ctx.session().persist_to_remote);
    assert!(remote.fetch_tokens().is_empty());
}

#[tokio::test]
async fn test_rejected_login_with_held_token_refreshes() {
    let auth = ScriptedAuth::default()
        .on_login(Err(AuthError::LoginFailed))
        .on_refresh(Ok("fresh".to_string()));
    let mut ctx = remote_context(ScriptedRemote::default(), auth.clone(), "old");

    ctx.login("ana", "secret").await.unwrap();

    assert_eq!(auth.calls(), vec!["login ana", "refresh"]);
    assert_eq!(ctx.session().auth_token.as_deref(), Some("fresh"));
}

#[test]
fn test_start_detects_local_data_and_theme() {
    let local = MemoryStore::new();
    local.set(LISTS_KEY, "[]").unwrap();
    local.set(COLOR_THEME_KEY, "\"light\"").unwrap();
    let mut ctx = context_with(ScriptedRemote::default(), ScriptedAuth::default(), local);

    ctx.start();

    assert_eq!(ctx.session().current_view, View::Login);
    assert!(ctx.session().has_local_data);
    assert_eq!(ctx.session().color_theme, "light");
    assert!(ctx.store().is_empty());
}

#[test]
fn test_try_out_needs_confirmation_over_local_data() {
    let local = MemoryStore::new();
    local.set(LISTS_KEY, &serde_json::to_string(&snapshot(&["a"])).unwrap()).unwrap();
    let mut ctx = context_with(ScriptedRemote::default(), ScriptedAuth::default(), local);
    ctx.start();

    assert!(!ctx.try_out(false));
    assert_eq!(ctx.session().current_view, View::Login);

    assert!(ctx.try_out(true));
    assert_eq!(ctx.session().current_view, View::Overview);
    assert!(!ctx.session().persist_to_remote);
    assert!(ctx.store().is_empty());
}

#[test]
fn test_use_local_data() {
    let local = MemoryStore::new();
    local.set(LISTS_KEY, &serde_json::to_string(&snapshot(&["a", "b"])).unwrap()).unwrap();
    let mut ctx = context_with(ScriptedRemote::default(), ScriptedAuth::default(), local);
    ctx.start();

    ctx.use_local_data().unwrap();

    assert_eq!(ctx.session().current_view, View::Overview);
    assert_eq!(order(&ctx), vec!["a", "b"]);
}

#[tokio::test]
async fn test_open_list_and_back() {
    let (mut ctx, _) = local_context();
    let list = ctx.add_list("A").await.unwrap();

    assert!(matches!(
        ctx.open_list("nope"),
        Err(AppError::Domain(DomainError::NotFound(_)))
    ));

    ctx.open_list(&list.id).unwrap();
    assert_eq!(ctx.session().current_view, View::List);
    assert_eq!(ctx.session().selected_list_id.as_deref(), Some(list.id.as_str()));

    ctx.show_overview();
    assert_eq!(ctx.session().current_view, View::Overview);
    assert_eq!(ctx.session().selected_list_id, None);
}

#[test]
fn test_toggles_and_theme() {
    let (mut ctx, local) = local_context();

    ctx.toggle_menu();
    ctx.toggle_input();
    assert!(ctx.session().menu_open);
    assert!(ctx.session().input_open);

    assert_eq!(ctx.toggle_color_theme().unwrap(), "light");
    assert_eq!(local.get(COLOR_THEME_KEY).unwrap().as_deref(), Some("\"light\""));
    assert_eq!(ctx.toggle_color_theme().unwrap(), "dark");
}

#[tokio::test]
async fn test_logout_clears_without_saving() {
    let remote = ScriptedRemote::default();
    let auth = ScriptedAuth::default();
    let mut ctx = remote_context(remote.clone(), auth.clone(), "tok");
    ctx.add_list("A").await.unwrap();
    let pushes = remote.push_tokens().len();

    ctx.logout().await;

    assert!(ctx.store().is_empty());
    assert_eq!(remote.push_tokens().len(), pushes);
    assert_eq!(ctx.session().current_view, View::Login);
    assert_eq!(ctx.session().auth_token, None);
    assert_eq!(ctx.save_status(), &SaveStatus::Idle);
    assert_eq!(auth.calls(), vec!["logout"]);
}
