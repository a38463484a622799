//! services/portal/src/session/sign_out.rs
//!
//! Sign-out: leaves no authentication material behind, even when the
//! backend cannot be reached.

use mentorship_core::ports::{ClientStorage, PortResult, SignOutScope};
use mentorship_core::{looks_like_auth_key, StorageArea};
use tracing::{error, info, warn};

use crate::session::guards::Route;
use crate::session::state::SessionService;

/// What a sign-out did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOutReport {
    /// Backend sign-out calls made.
    pub attempts: u32,
    pub backend_signed_out: bool,
    /// Registry keys removed from persistent storage.
    pub removed_keys: Vec<String>,
    /// Auth-looking keys found and removed by the verification scan.
    pub stray_keys: Vec<String>,
    /// Auth-looking keys still present after the emergency scrub.
    pub remaining_keys: Vec<String>,
    pub cookies_expired: usize,
    /// The regular cleanup failed and the emergency scrub ran.
    pub emergency: bool,
}

impl SessionService {
    /// Signs out everywhere and scrubs client storage, then reloads home.
    pub async fn sign_out(&self) -> SignOutReport {
        // 1. Hide privileged state before anything slow happens.
        self.update(|s| {
            s.clear_principal();
            s.loading = false;
            s.error = None;
        });

        // 2. Backend global sign-out with a fixed retry budget.
        let mut report = self.backend_sign_out().await;
        if !report.backend_signed_out {
            // Drop the in-memory token even though the server may still honor it.
            if let Err(e) = self.ports().auth.sign_out(SignOutScope::Local).await {
                error!("Local sign-out failed: {}", e);
            }
        }

        // 3. and 4. Registry cleanup, then the verification scan.
        if let Err(e) = self.scrub_client_storage(&mut report) {
            error!("Client storage cleanup failed, running emergency scrub: {}", e);
            report.emergency = true;
            self.emergency_scrub(&mut report);
        }

        // 5. Reload to discard whatever is still in memory.
        info!(
            "Signed out (backend: {}, attempts: {})",
            report.backend_signed_out, report.attempts
        );
        self.ports().navigator.hard_navigate(Route::Home.path());
        report
    }

    async fn backend_sign_out(&self) -> SignOutReport {
        let settings = self.settings();
        let attempts = settings.sign_out_attempts.max(1);
        let mut report = SignOutReport::default();

        for attempt in 1..=attempts {
            report.attempts = attempt;
            match self.ports().auth.sign_out(SignOutScope::Global).await {
                Ok(()) => {
                    report.backend_signed_out = true;
                    break;
                }
                Err(e) => {
                    warn!("Sign-out attempt {}/{} failed: {}", attempt, attempts, e);
                    if attempt < attempts {
                        tokio::time::sleep(settings.sign_out_backoff).await;
                    }
                }
            }
        }
        report
    }

    fn scrub_client_storage(&self, report: &mut SignOutReport) -> PortResult<()> {
        let storage = self.ports().storage.as_ref();

        for name in self.ports().keys.sign_out_names() {
            if storage.get(StorageArea::Persistent, &name).is_some() {
                storage.remove(StorageArea::Persistent, &name)?;
                report.removed_keys.push(name);
            }
        }
        storage.clear(StorageArea::Volatile)?;
        for cookie in storage.cookie_names() {
            storage.expire_cookie(&cookie)?;
            report.cookies_expired += 1;
        }

        for area in [StorageArea::Persistent, StorageArea::Volatile] {
            for key in stray_auth_keys(storage, area) {
                warn!("Removing leftover auth key {}", key);
                storage.remove(area, &key)?;
                report.stray_keys.push(key);
            }
        }
        Ok(())
    }

    /// Best-effort repeat of the cleanup that keeps going past failures.
    fn emergency_scrub(&self, report: &mut SignOutReport) {
        let storage = self.ports().storage.as_ref();
        let mut targets = self.ports().keys.sign_out_names();
        targets.extend(stray_auth_keys(storage, StorageArea::Persistent));

        for name in targets {
            if let Err(e) = storage.remove(StorageArea::Persistent, &name) {
                error!("Emergency removal of {} failed: {}", name, e);
            }
        }
        if let Err(e) = storage.clear(StorageArea::Volatile) {
            error!("Emergency clear of volatile storage failed: {}", e);
            for key in storage.keys(StorageArea::Volatile) {
                if let Err(e) = storage.remove(StorageArea::Volatile, &key) {
                    error!("Emergency removal of volatile {} failed: {}", key, e);
                }
            }
        }
        for cookie in storage.cookie_names() {
            if storage.expire_cookie(&cookie).is_ok() {
                report.cookies_expired += 1;
            }
        }
        report.remaining_keys = [StorageArea::Persistent, StorageArea::Volatile]
            .into_iter()
            .flat_map(|area| stray_auth_keys(storage, area))
            .collect();
        if !report.remaining_keys.is_empty() {
            error!("Auth keys survived the emergency scrub: {:?}", report.remaining_keys);
        }
    }
}

fn stray_auth_keys(storage: &dyn ClientStorage, area: StorageArea) -> Vec<String> {
    storage
        .keys(area)
        .into_iter()
        .filter(|k| looks_like_auth_key(k))
        .collect()
}
