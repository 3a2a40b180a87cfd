use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::store::TokenStore;

/// Access/refresh token pair for the signed-in user.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl Credentials {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token: Some(refresh_token),
            issued_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.issued_at
    }
}

// Tokens stay out of debug output and logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// The refresh token was rejected; the user must log in again.
    RefreshFailed,
    /// A restored session could not be validated at startup.
    RestoreFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    LoggedOut(LogoutReason),
}

/// The single owner of the session credential.
///
/// Shared by reference between the auth service and the API client. Every
/// change is written through to the token store; a store failure is logged
/// and does not roll back the in-memory state.
///
/// Each login, update or clear bumps a generation counter. Work that started
/// against one generation (a token refresh) commits only if nothing replaced
/// or cleared the session in the meantime.
pub struct Session {
    store: Arc<dyn TokenStore>,
    data: RwLock<Option<Credentials>>,
    generation: AtomicU64,
    status: watch::Sender<SessionStatus>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Anonymous);
        Self {
            store,
            data: RwLock::new(None),
            generation: AtomicU64::new(0),
            status,
        }
    }

    /// Hydrate from the token store. Returns true when tokens were found.
    pub fn load(&self) -> Result<bool> {
        let loaded = self.store.load()?;
        let found = loaded.is_some();
        {
            let mut data = self.write();
            *data = loaded;
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        if found {
            self.status.send_replace(SessionStatus::Authenticated);
        }
        debug!(found, "Session loaded from store");
        Ok(found)
    }

    /// Current generation, to pass back to `update_if_current` or
    /// `clear_if_current`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replace the credential and persist it.
    pub fn update(&self, credentials: Credentials) {
        let mut data = self.write();
        self.commit(&mut data, credentials);
    }

    /// Replace the credential only if the session is still at `generation`.
    /// Returns false, leaving everything untouched, when it moved on.
    pub fn update_if_current(&self, generation: u64, credentials: Credentials) -> bool {
        let mut data = self.write();
        if self.generation() != generation {
            return false;
        }
        self.commit(&mut data, credentials);
        true
    }

    /// Drop the credential and its persisted copy. Safe to call repeatedly.
    pub fn clear(&self, reason: LogoutReason) {
        let mut data = self.write();
        self.remove(&mut data, reason);
    }

    /// Clear only if the session is still at `generation`.
    pub fn clear_if_current(&self, generation: u64, reason: LogoutReason) -> bool {
        let mut data = self.write();
        if self.generation() != generation {
            return false;
        }
        self.remove(&mut data, reason);
        true
    }

    /// Bearer token for the next request, if any.
    pub fn access_token(&self) -> Option<String> {
        self.read()
            .as_ref()
            .map(|c| c.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().as_ref().and_then(|c| c.refresh_token.clone())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Watch status changes, e.g. to route to the login screen on forced logout.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    // Both run under the write lock so the generation check and the change
    // are one step.
    fn commit(&self, data: &mut Option<Credentials>, credentials: Credentials) {
        if let Err(err) = self.store.save(&credentials) {
            warn!(error = %format!("{err:#}"), "Failed to persist session tokens");
        }
        *data = Some(credentials);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.status.send_replace(SessionStatus::Authenticated);
    }

    fn remove(&self, data: &mut Option<Credentials>, reason: LogoutReason) {
        let had_session = data.take().is_some();
        if let Err(err) = self.store.clear() {
            warn!(error = %format!("{err:#}"), "Failed to remove stored session tokens");
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        if had_session {
            info!(?reason, "Session cleared");
        }
        self.status.send_replace(SessionStatus::LoggedOut(reason));
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Credentials>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Credentials>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}
