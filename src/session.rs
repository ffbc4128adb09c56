//! Session ownership: the auth token and the two profile blobs.
//!
//! `AuthSession` is the only place the token is read or written. The API
//! client receives it explicitly and asks it for the `Authorization` header;
//! a 401 from any call routes back here to clear the token and record the
//! redirect to the login page.
//!
//! Key properties:
//! - Token bytes are zeroed when replaced, cleared, or dropped
//! - Every mutation is written through to the backing `SessionStore`
//! - Persisted layout keeps the three keys the web client used:
//!   `authToken`, `userData`, `staffProfile`

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroize;

use crate::config;
use crate::error::ApiError;

pub const TOKEN_KEY: &str = "authToken";
pub const USER_DATA_KEY: &str = "userData";
pub const STAFF_PROFILE_KEY: &str = "staffProfile";

// ═══════════════════════════════════════════════════════════
// Persistence
// ═══════════════════════════════════════════════════════════

/// On-disk shape of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(rename = "userData", default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,
    #[serde(rename = "staffProfile", default, skip_serializing_if = "Option::is_none")]
    pub staff_profile: Option<Value>,
}

/// Backing storage for a session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<StoredSession, ApiError>;
    fn save(&self, session: &StoredSession) -> Result<(), ApiError>;
}

/// JSON file store. A missing file is an empty session.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the application data directory.
    pub fn default_location() -> Self {
        Self::new(config::session_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<StoredSession, ApiError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredSession::default())
            }
            Err(e) => return Err(ApiError::Session(e.to_string())),
        };

        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(session),
            Err(e) => {
                // A corrupt file is treated like a logged-out browser.
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Ok(StoredSession::default())
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::Session(e.to_string()))?;
        }
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| ApiError::Session(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| ApiError::Session(e.to_string()))
    }
}

/// Process-local store, used by tests and short-lived tools.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<StoredSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<StoredSession, ApiError> {
        self.inner
            .lock()
            .map(|s| s.clone())
            .map_err(|_| ApiError::Session("lock poisoned".into()))
    }

    fn save(&self, session: &StoredSession) -> Result<(), ApiError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ApiError::Session("lock poisoned".into()))?;
        *guard = session.clone();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// AuthSession
// ═══════════════════════════════════════════════════════════

/// Token string, zeroed on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
struct SessionToken(String);

#[derive(Default)]
struct SessionState {
    token: Option<SessionToken>,
    user_data: Option<Value>,
    staff_profile: Option<Value>,
    login_redirect: Option<&'static str>,
}

impl SessionState {
    fn snapshot(&self) -> StoredSession {
        StoredSession {
            auth_token: self.token.as_ref().map(|t| t.0.clone()),
            user_data: self.user_data.clone(),
            staff_profile: self.staff_profile.clone(),
        }
    }
}

/// Owner of the token lifecycle (set / read / clear).
pub struct AuthSession {
    state: RwLock<SessionState>,
    store: Box<dyn SessionStore>,
}

impl AuthSession {
    /// Restore a session from `store`.
    pub fn load(store: Box<dyn SessionStore>) -> Result<Self, ApiError> {
        let stored = store.load()?;
        let state = SessionState {
            token: stored
                .auth_token
                .filter(|t| !t.is_empty())
                .map(SessionToken),
            user_data: stored.user_data,
            staff_profile: stored.staff_profile,
            login_redirect: None,
        };
        Ok(Self {
            state: RwLock::new(state),
            store,
        })
    }

    /// Empty session backed by memory.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            store: Box::new(MemorySessionStore::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, state: &SessionState) -> Result<(), ApiError> {
        self.store.save(&state.snapshot())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.as_ref().map(|t| t.0.clone())
    }

    /// Value for the `Authorization` header, if logged in.
    pub fn authorization_header(&self) -> Option<String> {
        self.read().token.as_ref().map(|t| format!("Token {}", t.0))
    }

    pub fn user_data(&self) -> Option<Value> {
        self.read().user_data.clone()
    }

    pub fn staff_profile(&self) -> Option<Value> {
        self.read().staff_profile.clone()
    }

    /// Record a successful login.
    pub fn establish(
        &self,
        token: &str,
        user_data: Option<Value>,
        staff_profile: Option<Value>,
    ) -> Result<(), ApiError> {
        let mut state = self.write();
        state.token = Some(SessionToken(token.to_string()));
        if user_data.is_some() {
            state.user_data = user_data;
        }
        if staff_profile.is_some() {
            state.staff_profile = staff_profile;
        }
        state.login_redirect = None;
        self.persist(&state)
    }

    /// Explicit logout: forget the token and both profile blobs.
    pub fn clear(&self) -> Result<(), ApiError> {
        let mut state = self.write();
        state.token = None;
        state.user_data = None;
        state.staff_profile = None;
        self.persist(&state)
    }

    /// A call came back 401: drop the token and request the login page.
    ///
    /// Only the token is removed; the profile blobs stay until the next
    /// login overwrites them.
    pub fn handle_unauthorized(&self) {
        let mut state = self.write();
        state.token = None;
        state.login_redirect = Some(config::LOGIN_PATH);
        if let Err(e) = self.persist(&state) {
            tracing::error!(error = %e, "Failed to persist cleared session");
        }
        tracing::warn!("Session rejected by backend, redirecting to {}", config::LOGIN_PATH);
    }

    /// Pending hard navigation, if a 401 was seen. Consumed on read.
    pub fn take_login_redirect(&self) -> Option<&'static str> {
        self.write().login_redirect.take()
    }

    pub fn pending_login_redirect(&self) -> Option<&'static str> {
        self.read().login_redirect
    }
}
