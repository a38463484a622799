//! services/portal/src/session/resolver.rs
//!
//! Profile and role resolution for an authenticated user.

use mentorship_core::ports::{DatabaseService, PortError, RoleDirectory};
use mentorship_core::{is_profile_complete, NewProfile, Profile, Role, User};
use tracing::{debug, error, info, warn};

use crate::error::AuthError;
use crate::session::state::SessionService;

/// The derived state for one resolved principal.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub profile: Option<Profile>,
    pub role: Role,
    pub has_accepted_terms: bool,
    pub is_profile_complete: bool,
}

/// Fetches the profile, derives the role, and creates the default profile
/// row on first login.
pub async fn resolve(db: &dyn DatabaseService, roles: &dyn RoleDirectory, user: &User) -> Resolution {
    // 1. Profile by user id; a missing row is expected on first login.
    let mut profile = fetch_profile(db, user).await;

    // 2. Terms acceptance mirrors the profile.
    let mut has_accepted_terms = profile.as_ref().is_some_and(|p| p.terms_accepted);

    // 3. and 4. Admin first; mentor only when not admin.
    let role = resolve_role(roles, user).await;

    // 5. First login: insert the default row, then read it back.
    if profile.is_none() {
        let row = NewProfile {
            id: user.id,
            email: user.email.clone(),
            first_name: user.metadata.first_name.clone(),
            last_name: user.metadata.last_name.clone(),
            is_admin: role == Role::Admin,
        };
        match db.insert_profile(&row).await {
            Ok(()) => info!("Created default profile for user {}", user.id),
            Err(PortError::Conflict(_)) => debug!("Profile for {} already created", user.id),
            Err(e) => error!("Failed to create profile for {}: {}", user.id, e),
        }
        profile = fetch_profile(db, user).await;
        has_accepted_terms = profile.as_ref().is_some_and(|p| p.terms_accepted);
    }

    // 6. Completeness depends on the resolved role.
    let is_profile_complete = profile
        .as_ref()
        .is_some_and(|p| is_profile_complete(p, role));

    Resolution {
        profile,
        role,
        has_accepted_terms,
        is_profile_complete,
    }
}

async fn fetch_profile(db: &dyn DatabaseService, user: &User) -> Option<Profile> {
    match db.get_profile(user.id).await {
        Ok(profile) => Some(profile),
        Err(e) if e.is_not_found() => {
            debug!("No profile yet for user {}", user.id);
            None
        }
        Err(e) => {
            error!("Failed to fetch profile for {}: {}", user.id, e);
            None
        }
    }
}

async fn resolve_role(roles: &dyn RoleDirectory, user: &User) -> Role {
    let Some(email) = user.email.as_deref() else {
        return Role::Student;
    };
    let is_admin = roles.is_admin(email).await.unwrap_or_else(|e| {
        warn!("Admin lookup failed for {}: {}", email, e);
        false
    });
    let is_mentor = if is_admin {
        false
    } else {
        roles.is_approved_mentor(email).await.unwrap_or_else(|e| {
            warn!("Mentor lookup failed for {}: {}", email, e);
            false
        })
    };
    Role::derive(is_admin, is_mentor)
}

impl SessionService {
    /// Sets the user and publishes its resolved profile and role.
    pub(crate) async fn resolve_principal(&self, user: &User) {
        self.update(|s| s.user = Some(user.clone()));
        let ports = self.ports();
        let resolution = resolve(ports.db.as_ref(), ports.roles.as_ref(), user).await;
        self.update(|s| {
            s.user = Some(user.clone());
            s.profile = resolution.profile;
            s.roles = resolution.role.flags();
            s.has_accepted_terms = resolution.has_accepted_terms;
            s.is_profile_complete = resolution.is_profile_complete;
        });
    }

    /// Re-reads the profile of the current user, e.g. after an edit.
    pub async fn refresh_profile(&self) -> Result<(), AuthError> {
        let user = self.current_user()?;
        self.resolve_principal(&user).await;
        Ok(())
    }
}
