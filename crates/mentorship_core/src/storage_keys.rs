//! crates/mentorship_core/src/storage_keys.rs
//!
//! The registry of client-storage keys this application owns.

/// Substrings that mark a key as authentication material.
pub const AUTH_KEY_MARKERS: &[&str] = &["sb-", "supabase", "auth"];

/// Every client-storage key the portal writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Set after a successful sign-up, consumed by the first dashboard visit.
    NewSignup,
    HasSeenProfileTutorial,
    /// Local mirror of `profiles.terms_accepted`.
    TermsAccepted,
    /// JSON array of announcement ids the user closed.
    DismissedNotifications,
    /// The auth provider's cached session.
    AuthToken,
    /// PKCE verifier kept while an OAuth redirect is in flight.
    AuthCodeVerifier,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        StorageKey::NewSignup,
        StorageKey::HasSeenProfileTutorial,
        StorageKey::TermsAccepted,
        StorageKey::DismissedNotifications,
        StorageKey::AuthToken,
        StorageKey::AuthCodeVerifier,
    ];

    /// Keys describing the signed-in principal, dropped on sign-out.
    pub fn is_user_scoped(&self) -> bool {
        !matches!(
            self,
            StorageKey::HasSeenProfileTutorial | StorageKey::DismissedNotifications
        )
    }
}

/// Resolves [`StorageKey`]s to concrete names for one backend project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRegistry {
    project_ref: String,
}

impl KeyRegistry {
    pub fn new(project_ref: impl Into<String>) -> Self {
        Self {
            project_ref: project_ref.into(),
        }
    }

    pub fn project_ref(&self) -> &str {
        &self.project_ref
    }

    pub fn name(&self, key: StorageKey) -> String {
        match key {
            StorageKey::NewSignup => "newSignup".to_string(),
            StorageKey::HasSeenProfileTutorial => "hasSeenProfileTutorial".to_string(),
            StorageKey::TermsAccepted => "termsAccepted".to_string(),
            StorageKey::DismissedNotifications => "dismissedNotifications".to_string(),
            StorageKey::AuthToken => format!("sb-{}-auth-token", self.project_ref),
            StorageKey::AuthCodeVerifier => {
                format!("sb-{}-auth-token-code-verifier", self.project_ref)
            }
        }
    }

    /// Names removed from persistent storage when the user signs out.
    pub fn sign_out_names(&self) -> Vec<String> {
        StorageKey::ALL
            .iter()
            .filter(|k| k.is_user_scoped())
            .map(|k| self.name(*k))
            .collect()
    }
}

/// True when `key` looks like authentication material by name.
pub fn looks_like_auth_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    AUTH_KEY_MARKERS.iter().any(|m| lower.contains(m))
}
