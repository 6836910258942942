//! Session management.
//!
//! [`SessionManager`] owns the signed-in identity. The current state is kept in
//! a watch channel for cheap reads, and every sign-in/sign-out is also
//! broadcast as a [`SessionEvent`] so the sync coordinator never misses a
//! transition, including whether a logout was requested by the user.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::backend::AuthBackend;
use crate::storage::DurableStore;

/// Authenticated identity and its bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub token: String,
}

impl Session {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: format!("user_{}", Utc::now().timestamp_millis()),
            username: username.into(),
            token: token.into(),
        }
    }
}

/// Current authentication state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    SignedIn(Session),
    /// `manual` is true when the user asked to log out, false when the
    /// session ended because the credential was rejected.
    SignedOut { manual: bool },
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) => Some(session),
            Self::SignedOut { .. } => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session().is_some()
    }
}

/// A sign-in or sign-out transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(Session),
    LoggedOut { manual: bool },
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn DurableStore>,
    auth: Option<Arc<dyn AuthBackend>>,
    state: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Creates a signed-out manager. `auth` is only needed for
    /// [`login`](Self::login) and [`register`](Self::register).
    pub fn new(store: Arc<dyn DurableStore>, auth: Option<Arc<dyn AuthBackend>>) -> Self {
        let (state, _) = watch::channel(SessionState::SignedOut { manual: false });
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            auth,
            state: Arc::new(state),
            events,
        }
    }

    /// Signs back in with the session persisted by a previous run, if any.
    pub async fn restore(&self) -> Result<Option<Session>> {
        let stored = self.store.load_session().await?;
        if let Some(session) = &stored {
            info!("🔑 Restored session for {}", session.username);
            self.activate(session.clone());
        }
        Ok(stored)
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Authenticates against the remote service and signs in.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let auth = self.auth()?;
        let token = auth
            .login(username, password)
            .await
            .with_context(|| format!("Login failed for {username}"))?;
        self.sign_in(Session::new(username, token)).await
    }

    /// Creates an account. The returned session is not activated; call
    /// [`sign_in`](Self::sign_in) or [`login`](Self::login) afterwards.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Session> {
        let auth = self.auth()?;
        let token = auth
            .register(username, email, password)
            .await
            .with_context(|| format!("Registration failed for {username}"))?;
        Ok(Session::new(username, token))
    }

    /// Persists and activates an already-issued session.
    pub async fn sign_in(&self, session: Session) -> Result<Session> {
        self.store.save_session(&session).await?;
        info!("🔑 Signed in as {}", session.username);
        self.activate(session.clone());
        Ok(session)
    }

    /// Ends the session. A manual logout also wipes every durable record;
    /// an automatic one keeps tasks and the pending queue for the next login.
    pub async fn logout(&self, manual: bool) -> Result<()> {
        if manual {
            self.store.clear_all().await?;
        } else {
            self.store.clear_session().await?;
        }
        info!("🔒 Signed out ({})", if manual { "manual" } else { "automatic" });
        self.state.send_replace(SessionState::SignedOut { manual });
        let _ = self.events.send(SessionEvent::LoggedOut { manual });
        Ok(())
    }

    /// Called when the remote service rejects the credential.
    pub async fn handle_unauthorized(&self) -> Result<()> {
        if self.current().is_some() {
            warn!("⚠️  Session expired, signing out without clearing local data");
            self.logout(false).await?;
        }
        Ok(())
    }

    fn activate(&self, session: Session) {
        self.state.send_replace(SessionState::SignedIn(session.clone()));
        let _ = self.events.send(SessionEvent::LoggedIn(session));
    }

    fn auth(&self) -> Result<&Arc<dyn AuthBackend>> {
        self.auth.as_ref().ok_or_else(|| anyhow!("No authentication backend configured"))
    }
}
