//! Mock, client-side authentication on top of the [`Store`].
//!
//! There is no real credential check: logging in stores a demo token with
//! the `admin` role. Guards only look at what the store currently holds.

use std::sync::Arc;

use crate::store::{Computed, Mergeable, StorageBackend, Store, StoreOptions};

pub const ADMIN_ROLE: &str = "admin";
const DEMO_TOKEN: &str = "demo";

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppState {
    pub auth_token: Option<String>,
    pub user_role: Option<String>,
}

/// `None` leaves a field alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct AppStatePatch {
    pub auth_token: Option<Option<String>>,
    pub user_role: Option<Option<String>>,
}

impl Mergeable for AppState {
    type Partial = AppStatePatch;

    fn merge(&mut self, partial: AppStatePatch) {
        if let Some(token) = partial.auth_token {
            self.auth_token = token;
        }
        if let Some(role) = partial.user_role {
            self.user_role = role;
        }
    }
}

pub type AppStore = Store<AppState>;

pub fn app_store(storage: Option<Arc<dyn StorageBackend>>, key: impl Into<String>) -> AppStore {
    Store::new(
        AppState::default(),
        StoreOptions {
            storage,
            key: key.into(),
        },
    )
}

pub fn set_auth(store: &AppStore, token: Option<String>, role: Option<String>) {
    store.set_state(AppStatePatch {
        auth_token: Some(token),
        user_role: Some(role),
    });
}

pub fn login_demo(store: &AppStore) {
    set_auth(store, Some(DEMO_TOKEN.to_string()), Some(ADMIN_ROLE.to_string()));
}

pub fn logout(store: &AppStore) {
    store.reset();
}

pub fn is_authenticated(store: &AppStore) -> Computed<AppState, bool> {
    store.computed(|state| state.auth_token.as_deref().is_some_and(|t| !t.is_empty()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    AccessDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirect(Route),
}

pub fn auth_guard(state: &AppState) -> Access {
    if state.auth_token.as_deref().is_some_and(|t| !t.is_empty()) {
        Access::Granted
    } else {
        log::warn!("Authentication required. Redirecting to login.");
        Access::Redirect(Route::Login)
    }
}

pub fn role_guard(required: &str, state: &AppState) -> Access {
    if state.user_role.as_deref() == Some(required) {
        Access::Granted
    } else {
        log::warn!("Access denied. Role {required} required.");
        Access::Redirect(Route::AccessDenied)
    }
}
