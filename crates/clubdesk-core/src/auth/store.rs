//! Persistent storage for the access/refresh token pair.
//!
//! Tokens are kept under two fixed keys, `access_token` and `refresh_token`,
//! so a session survives restarts. `clear` must be idempotent: clearing a
//! store that holds nothing is not an error.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Credentials;

/// Key under which the access token is stored
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key under which the refresh token is stored
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Keyring service name
const SERVICE_NAME: &str = "clubdesk";

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<Credentials>>;
    fn save(&self, credentials: &Credentials) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// OS keychain
// ============================================================================

/// Tokens in the OS keychain, one entry per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to load {key} from keychain")),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err).with_context(|| format!("Failed to delete {key} from keychain")),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringStore {
    fn load(&self) -> Result<Option<Credentials>> {
        let access = self.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.get(REFRESH_TOKEN_KEY)?;
        Ok(Credentials::from_parts(access, refresh))
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        self.entry(ACCESS_TOKEN_KEY)?
            .set_password(&credentials.access_token)
            .context("Failed to store access token in keychain")?;
        match credentials.refresh_token {
            Some(ref refresh) => self
                .entry(REFRESH_TOKEN_KEY)?
                .set_password(refresh)
                .context("Failed to store refresh token in keychain")?,
            None => self.delete(REFRESH_TOKEN_KEY)?,
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        // Attempt both so a failure on one key still removes the other.
        let access = self.delete(ACCESS_TOKEN_KEY);
        let refresh = self.delete(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}

// ============================================================================
// JSON file
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Tokens in `session.json` under a directory (normally the cache dir).
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl TokenStore for FileStore {
    fn load(&self) -> Result<Option<Credentials>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let stored: StoredTokens = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring unreadable session file");
                return Ok(None);
            }
        };
        Ok(Credentials::from_parts(stored.access_token, stored.refresh_token))
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        let stored = StoredTokens {
            access_token: Some(credentials.access_token.clone()),
            refresh_token: credentials.refresh_token.clone(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(self.session_path(), contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("Failed to remove session file"),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, mostly for tests.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let store = Self::new();
        {
            let mut entries = store.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(access) = access {
                entries.insert(ACCESS_TOKEN_KEY.to_string(), access.to_string());
            }
            if let Some(refresh) = refresh {
                entries.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
            }
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

impl TokenStore for MemoryStore {
    fn load(&self) -> Result<Option<Credentials>> {
        Ok(Credentials::from_parts(
            self.get(ACCESS_TOKEN_KEY),
            self.get(REFRESH_TOKEN_KEY),
        ))
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(ACCESS_TOKEN_KEY.to_string(), credentials.access_token.clone());
        match credentials.refresh_token {
            Some(ref refresh) => {
                entries.insert(REFRESH_TOKEN_KEY.to_string(), refresh.clone());
            }
            None => {
                entries.remove(REFRESH_TOKEN_KEY);
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(ACCESS_TOKEN_KEY);
        entries.remove(REFRESH_TOKEN_KEY);
        Ok(())
    }
}

impl Credentials {
    /// Rebuild credentials from stored parts. A stored refresh token without an
    /// access token still restores a session: the first request goes out
    /// unauthenticated and the 401 it gets triggers a refresh.
    fn from_parts(access: Option<String>, refresh: Option<String>) -> Option<Self> {
        match (access, refresh) {
            (None, None) => None,
            (access, refresh) => {
                debug!(
                    has_access = access.is_some(),
                    has_refresh = refresh.is_some(),
                    "Loaded stored tokens"
                );
                Some(Credentials {
                    access_token: access.unwrap_or_default(),
                    refresh_token: refresh,
                    issued_at: Utc::now(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(access: &str, refresh: &str) -> Credentials {
        Credentials::new(access.to_string(), refresh.to_string())
    }

    #[test]
    fn test_memory_store_round_trip_and_clear() {
        let store = MemoryStore::new();
        assert!(store.load().expect("load").is_none());

        store.save(&creds("A1", "R1")).expect("save");
        let loaded = store.load().expect("load").expect("credentials");
        assert_eq!(loaded.access_token, "A1");
        assert_eq!(loaded.refresh_token.as_deref(), Some("R1"));

        store.clear().expect("clear");
        store.clear().expect("second clear");
        assert!(store.is_empty());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_refresh_token_alone_restores_session() {
        let store = MemoryStore::with_tokens(None, Some("R1"));
        let loaded = store.load().expect("load").expect("credentials");
        assert!(loaded.access_token.is_empty());
        assert_eq!(loaded.refresh_token.as_deref(), Some("R1"));
    }

    #[test]
    fn test_file_store_overwrites_and_clears_idempotently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("clubdesk"));

        store.save(&creds("A1", "R1")).expect("save");
        store.save(&creds("A2", "R2")).expect("overwrite");
        let loaded = store.load().expect("load").expect("credentials");
        assert_eq!(loaded.access_token, "A2");
        assert_eq!(loaded.refresh_token.as_deref(), Some("R2"));

        store.clear().expect("clear");
        store.clear().expect("second clear");
        assert!(!dir.path().join("clubdesk").join(SESSION_FILE).exists());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(SESSION_FILE), "not json").expect("write");
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(store.load().expect("load").is_none());
    }
}
