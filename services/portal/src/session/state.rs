//! services/portal/src/session/state.rs
//!
//! Defines the session service, its injected ports, and the snapshot it
//! publishes to every reader.

use std::sync::Arc;
use std::time::Duration;

use mentorship_core::ports::{AuthProvider, ClientStorage, DatabaseService, Navigator, RoleDirectory};
use mentorship_core::{KeyRegistry, Profile, Role, RoleFlags, StorageArea, StorageKey, User};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::AuthError;

//=========================================================================================
// Ports and Settings
//=========================================================================================

/// The collaborators a session service is built from, created once at startup.
#[derive(Clone)]
pub struct SessionPorts {
    pub auth: Arc<dyn AuthProvider>,
    pub db: Arc<dyn DatabaseService>,
    pub roles: Arc<dyn RoleDirectory>,
    pub storage: Arc<dyn ClientStorage>,
    pub navigator: Arc<dyn Navigator>,
    pub keys: KeyRegistry,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Liveness budget for the initial session resolution.
    pub bootstrap_timeout: Duration,
    /// Total backend sign-out attempts, including the first.
    pub sign_out_attempts: u32,
    pub sign_out_backoff: Duration,
    /// Where the OAuth provider sends the browser back to.
    pub oauth_redirect: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            bootstrap_timeout: Duration::from_secs(10),
            sign_out_attempts: 3,
            sign_out_backoff: Duration::from_millis(500),
            oauth_redirect: "http://localhost:3000/auth/callback".to_string(),
        }
    }
}

//=========================================================================================
// Snapshot
//=========================================================================================

/// Everything a view or guard may read about the current principal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub roles: RoleFlags,
    pub has_accepted_terms: bool,
    pub is_profile_complete: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionSnapshot {
    /// The state before bootstrap has run.
    pub fn initial() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.roles.role()
    }

    /// Drops the principal and everything derived from it.
    pub(crate) fn clear_principal(&mut self) {
        self.user = None;
        self.profile = None;
        self.roles = RoleFlags::none();
        self.has_accepted_terms = false;
        self.is_profile_complete = false;
    }
}

//=========================================================================================
// SessionService
//=========================================================================================

/// Holds the current principal and orchestrates the auth lifecycle.
///
/// Construct one per client and share it behind an `Arc`.
pub struct SessionService {
    ports: SessionPorts,
    settings: SessionSettings,
    state: watch::Sender<SessionSnapshot>,
    /// Cancelled on teardown; results arriving afterwards are discarded.
    alive: CancellationToken,
}

impl SessionService {
    pub fn new(ports: SessionPorts, settings: SessionSettings) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot::initial());
        Arc::new(Self {
            ports,
            settings,
            state,
            alive: CancellationToken::new(),
        })
    }

    pub fn ports(&self) -> &SessionPorts {
        &self.ports
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Returns a receiver that observes every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Stops applying results. Listeners derived from this service end too.
    pub fn teardown(&self) {
        self.alive.cancel();
    }

    pub fn is_alive(&self) -> bool {
        !self.alive.is_cancelled()
    }

    pub(crate) fn alive_token(&self) -> &CancellationToken {
        &self.alive
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut SessionSnapshot)) {
        if self.is_alive() {
            self.state.send_modify(apply);
        }
    }

    pub fn current_user(&self) -> Result<User, AuthError> {
        self.state.borrow().user.clone().ok_or(AuthError::NotSignedIn)
    }

    /// Succeeds when the current principal holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(User, Role), AuthError> {
        let snapshot = self.state.borrow();
        let user = snapshot.user.clone().ok_or(AuthError::NotSignedIn)?;
        match snapshot.role() {
            Some(role) if allowed.contains(&role) => Ok((user, role)),
            _ => Err(AuthError::Forbidden),
        }
    }

    /// Writes one of the owned flags into persistent client storage.
    pub(crate) fn set_flag(&self, key: StorageKey, value: &str) {
        let name = self.ports.keys.name(key);
        if let Err(e) = self.ports.storage.set(StorageArea::Persistent, &name, value) {
            warn!("Failed to persist {}: {}", name, e);
        }
    }

    pub(crate) fn flag(&self, key: StorageKey) -> Option<String> {
        self.ports
            .storage
            .get(StorageArea::Persistent, &self.ports.keys.name(key))
    }

    pub(crate) fn remove_flag(&self, key: StorageKey) {
        let name = self.ports.keys.name(key);
        if let Err(e) = self.ports.storage.remove(StorageArea::Persistent, &name) {
            warn!("Failed to remove {}: {}", name, e);
        }
    }
}
