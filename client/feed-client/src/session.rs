//! Current-user view and logout
//!
//! The view is gated on the token store: without a token it goes straight to
//! "login required" and never calls `/users/me/`. With a token it fetches the
//! current user once per mount or session invalidation.

use tracing::info;

use crate::error::Result;
use crate::models::User;
use crate::resource::{LoadState, ResourceKey};
use crate::store::{FeedStore, Refetch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No token stored; nothing was fetched
    LoginRequired,
    Loading,
    Loaded(User),
    Failed(String),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Loaded(user) => Some(user),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SessionView {
    store: FeedStore,
}

impl SessionView {
    pub fn new(store: FeedStore) -> Self {
        Self { store }
    }

    /// Fetch the current user if a token is stored
    pub fn mount(&self) -> Refetch {
        self.store.refresh(ResourceKey::Session)
    }

    pub fn state(&self) -> SessionState {
        if !self.store.has_token() {
            return SessionState::LoginRequired;
        }
        match self.store.session().snapshot().state {
            LoadState::Idle | LoadState::Loading => SessionState::Loading,
            LoadState::Loaded(user) => SessionState::Loaded(user),
            LoadState::Failed(message) => SessionState::Failed(message),
        }
    }

    pub fn render(&self) -> String {
        match self.state() {
            SessionState::LoginRequired => "login required".to_string(),
            SessionState::Loading => "loading user...".to_string(),
            SessionState::Loaded(user) => format!(
                "user #{} {} ({})",
                user.id,
                user.username,
                if user.is_active { "active" } else { "inactive" }
            ),
            SessionState::Failed(message) => format!("failed to load user: {message}"),
        }
    }
}

/// Forget the stored token and everything derived from it
pub fn logout(store: &FeedStore) -> Result<()> {
    store.tokens().clear()?;
    store.beliefs().clear();
    store.reset(ResourceKey::Session);
    info!("Logged out");
    Ok(())
}
