//! services/portal/src/adapters/local_store.rs
//!
//! The client-storage adapter: a persistent key/value area and cookie jar
//! saved to a JSON file, plus a volatile area that lives only in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use mentorship_core::ports::{ClientStorage, PortError, PortResult, StorageArea};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PortalError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CookieRecord {
    value: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl CookieRecord {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// What survives a restart.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    persistent: BTreeMap<String, String>,
    #[serde(default)]
    cookies: BTreeMap<String, CookieRecord>,
}

#[derive(Debug, Default)]
struct StoreState {
    saved: PersistedState,
    volatile: BTreeMap<String, String>,
}

impl StoreState {
    fn area(&self, area: StorageArea) -> &BTreeMap<String, String> {
        match area {
            StorageArea::Persistent => &self.saved.persistent,
            StorageArea::Volatile => &self.volatile,
        }
    }

    fn area_mut(&mut self, area: StorageArea) -> &mut BTreeMap<String, String> {
        match area {
            StorageArea::Persistent => &mut self.saved.persistent,
            StorageArea::Volatile => &mut self.volatile,
        }
    }
}

/// A `ClientStorage` implementation for a command-line client.
#[derive(Debug, Default)]
pub struct LocalStore {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the store saved at `path`, or starts empty when there is none.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PortalError> {
        let path = path.as_ref().to_path_buf();
        let saved = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            PersistedState::default()
        };
        debug!("Client state loaded from {}", path.display());
        Ok(Self {
            state: Mutex::new(StoreState {
                saved,
                volatile: BTreeMap::new(),
            }),
            path: Some(path),
        })
    }

    /// Stores a cookie with no expiry.
    pub fn set_cookie(&self, name: &str, value: &str) -> PortResult<()> {
        let mut state = self.lock()?;
        state.saved.cookies.insert(
            name.to_string(),
            CookieRecord {
                value: value.to_string(),
                expires_at: None,
            },
        );
        self.save(&state)
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        let state = self.lock().ok()?;
        state
            .saved
            .cookies
            .get(name)
            .filter(|c| c.is_live(Utc::now()))
            .map(|c| c.value.clone())
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| PortError::Unexpected("client storage lock poisoned".into()))
    }

    fn save(&self, state: &StoreState) -> PortResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(&state.saved)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        std::fs::write(path, raw).map_err(|e| {
            PortError::Unexpected(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}

impl ClientStorage for LocalStore {
    fn get(&self, area: StorageArea, key: &str) -> Option<String> {
        self.lock().ok()?.area(area).get(key).cloned()
    }

    fn set(&self, area: StorageArea, key: &str, value: &str) -> PortResult<()> {
        let mut state = self.lock()?;
        state
            .area_mut(area)
            .insert(key.to_string(), value.to_string());
        if area == StorageArea::Persistent {
            self.save(&state)?;
        }
        Ok(())
    }

    fn remove(&self, area: StorageArea, key: &str) -> PortResult<()> {
        let mut state = self.lock()?;
        if state.area_mut(area).remove(key).is_some() && area == StorageArea::Persistent {
            self.save(&state)?;
        }
        Ok(())
    }

    fn keys(&self, area: StorageArea) -> Vec<String> {
        self.lock()
            .map(|state| state.area(area).keys().cloned().collect())
            .unwrap_or_default()
    }

    fn clear(&self, area: StorageArea) -> PortResult<()> {
        let mut state = self.lock()?;
        state.area_mut(area).clear();
        if area == StorageArea::Persistent {
            self.save(&state)?;
        }
        Ok(())
    }

    fn cookie_names(&self) -> Vec<String> {
        let now = Utc::now();
        self.lock()
            .map(|state| {
                state
                    .saved
                    .cookies
                    .iter()
                    .filter(|(_, c)| c.is_live(now))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn expire_cookie(&self, name: &str) -> PortResult<()> {
        let mut state = self.lock()?;
        if let Some(cookie) = state.saved.cookies.get_mut(name) {
            cookie.value.clear();
            cookie.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
            self.save(&state)?;
        }
        Ok(())
    }
}
