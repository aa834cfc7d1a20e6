//! Session State
//!
//! One record per running app: current view, selection, drag tracking,
//! credentials and the persistence target. Changes go through
//! [`SessionPatch`]; fields a patch leaves out keep their value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Theme used until one is restored or chosen
pub const DEFAULT_COLOR_THEME: &str = "dark";

/// Which screen the UI shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Overview,
    List,
    Login,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SessionState {
    pub current_view: View,
    /// Open list; only set while `current_view` is `View::List`
    pub selected_list_id: Option<String>,
    pub selected_item_id: Option<String>,
    pub user: Option<String>,
    /// Held only between login form submit and authentication
    pub password: Option<String>,
    /// Bearer token; only set while `persist_to_remote` is true
    pub auth_token: Option<String>,
    pub persist_to_remote: bool,
    /// Local storage held lists when the app started
    pub has_local_data: bool,
    pub drag_source_position: Option<u32>,
    pub drag_target_position: Option<u32>,
    pub color_theme: String,
    pub menu_open: bool,
    pub input_open: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_view: View::default(),
            selected_list_id: None,
            selected_item_id: None,
            user: None,
            password: None,
            auth_token: None,
            persist_to_remote: false,
            has_local_data: false,
            drag_source_position: None,
            drag_target_position: None,
            color_theme: DEFAULT_COLOR_THEME.to_string(),
            menu_open: false,
            input_open: false,
        }
    }
}

// Credentials stay out of logs
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("current_view", &self.current_view)
            .field("selected_list_id", &self.selected_list_id)
            .field("selected_item_id", &self.selected_item_id)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("persist_to_remote", &self.persist_to_remote)
            .field("has_local_data", &self.has_local_data)
            .field("drag_source_position", &self.drag_source_position)
            .field("drag_target_position", &self.drag_target_position)
            .field("color_theme", &self.color_theme)
            .field("menu_open", &self.menu_open)
            .field("input_open", &self.input_open)
            .finish()
    }
}

impl SessionState {
    /// New state with `patch` applied. `self` is left untouched.
    ///
    /// The result always satisfies: no selected list outside the list
    /// view, and no token unless persisting remotely.
    pub fn merged(&self, patch: SessionPatch) -> SessionState {
        let mut next = SessionState {
            current_view: patch.current_view.unwrap_or(self.current_view),
            selected_list_id: patch
                .selected_list_id
                .unwrap_or_else(|| self.selected_list_id.clone()),
            selected_item_id: patch
                .selected_item_id
                .unwrap_or_else(|| self.selected_item_id.clone()),
            user: patch.user.unwrap_or_else(|| self.user.clone()),
            password: patch.password.unwrap_or_else(|| self.password.clone()),
            auth_token: patch.auth_token.unwrap_or_else(|| self.auth_token.clone()),
            persist_to_remote: patch.persist_to_remote.unwrap_or(self.persist_to_remote),
            has_local_data: patch.has_local_data.unwrap_or(self.has_local_data),
            drag_source_position: patch
                .drag_source_position
                .unwrap_or(self.drag_source_position),
            drag_target_position: patch
                .drag_target_position
                .unwrap_or(self.drag_target_position),
            color_theme: patch.color_theme.unwrap_or_else(|| self.color_theme.clone()),
            menu_open: patch.menu_open.unwrap_or(self.menu_open),
            input_open: patch.input_open.unwrap_or(self.input_open),
        };

        if next.current_view != View::List {
            next.selected_list_id = None;
        }
        if !next.persist_to_remote {
            next.auth_token = None;
        }
        next
    }

    /// Apply `patch` in place
    pub fn update(&mut self, patch: SessionPatch) {
        *self = self.merged(patch);
        tracing::debug!(state = ?self, "session updated");
    }
}

/// Partial update of [`SessionState`].
///
/// `None` leaves a field alone. For optional fields, `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub current_view: Option<View>,
    pub selected_list_id: Option<Option<String>>,
    pub selected_item_id: Option<Option<String>>,
    pub user: Option<Option<String>>,
    pub password: Option<Option<String>>,
    pub auth_token: Option<Option<String>>,
    pub persist_to_remote: Option<bool>,
    pub has_local_data: Option<bool>,
    pub drag_source_position: Option<Option<u32>>,
    pub drag_target_position: Option<Option<u32>>,
    pub color_theme: Option<String>,
    pub menu_open: Option<bool>,
    pub input_open: Option<bool>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: View) -> Self {
        self.current_view = Some(view);
        self
    }

    pub fn selected_list(mut self, id: Option<String>) -> Self {
        self.selected_list_id = Some(id);
        self
    }

    pub fn selected_item(mut self, id: Option<String>) -> Self {
        self.selected_item_id = Some(id);
        self
    }

    pub fn user(mut self, user: Option<String>) -> Self {
        self.user = Some(user);
        self
    }

    pub fn password(mut self, password: Option<String>) -> Self {
        self.password = Some(password);
        self
    }

    pub fn auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = Some(token);
        self
    }

    pub fn persist_to_remote(mut self, remote: bool) -> Self {
        self.persist_to_remote = Some(remote);
        self
    }

    pub fn has_local_data(mut self, has: bool) -> Self {
        self.has_local_data = Some(has);
        self
    }

    pub fn drag_source(mut self, position: Option<u32>) -> Self {
        self.drag_source_position = Some(position);
        self
    }

    pub fn drag_target(mut self, position: Option<u32>) -> Self {
        self.drag_target_position = Some(position);
        self
    }

    pub fn color_theme(mut self, theme: impl Into<String>) -> Self {
        self.color_theme = Some(theme.into());
        self
    }

    pub fn menu_open(mut self, open: bool) -> Self {
        self.menu_open = Some(open);
        self
    }

    pub fn input_open(mut self, open: bool) -> Self {
        self.input_open = Some(open);
        self
    }
}

/// The other of the two built-in themes
pub fn toggled_theme(current: &str) -> &'static str {
    if current == "dark" {
        "light"
    } else {
        "dark"
    }
}
