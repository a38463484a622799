//! services/portal/src/session/guards.rs
//!
//! Route guards and the terms checker. Each reads the session snapshot and
//! decides exactly one outcome.

use std::time::Duration;

use mentorship_core::RoleFlags;
use tokio::sync::watch;
use tracing::warn;

use crate::session::state::SessionSnapshot;

const MIN_GUARD_WAIT: Duration = Duration::from_secs(10);
const MAX_GUARD_WAIT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Dashboard,
    Admin,
    Mentor,
    Onboarding,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
            Route::Mentor => "/mentor",
            Route::Onboarding => "/onboarding",
        }
    }

    /// The landing area for an authenticated principal.
    pub fn home_for(roles: &RoleFlags) -> Route {
        if roles.is_admin {
            Route::Admin
        } else if roles.is_mentor {
            Route::Mentor
        } else {
            Route::Dashboard
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Any signed-in principal.
    Protected,
    AdminOnly,
    MentorOnly,
    /// Login and sign-up pages; signed-in principals are sent home.
    PublicOnly,
    /// Blocks content behind the terms modal until accepted.
    TermsChecker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    TimedOut,
    Failed(String),
    Redirect(Route),
    Render,
    RequireTerms,
}

/// Decides from a settled or in-flight snapshot.
pub fn decide(kind: GuardKind, snapshot: &SessionSnapshot) -> GuardDecision {
    if snapshot.loading {
        return GuardDecision::Loading;
    }

    if snapshot.user.is_none() {
        return match (kind, &snapshot.error) {
            (GuardKind::PublicOnly, _) => GuardDecision::Render,
            (GuardKind::TermsChecker, _) => GuardDecision::Render,
            (_, Some(error)) => GuardDecision::Failed(error.clone()),
            (_, None) => GuardDecision::Redirect(Route::Login),
        };
    }

    let roles = &snapshot.roles;
    match kind {
        GuardKind::Protected => GuardDecision::Render,
        GuardKind::AdminOnly if roles.is_admin => GuardDecision::Render,
        GuardKind::MentorOnly if roles.is_mentor => GuardDecision::Render,
        GuardKind::AdminOnly | GuardKind::MentorOnly | GuardKind::PublicOnly => {
            GuardDecision::Redirect(Route::home_for(roles))
        }
        GuardKind::TermsChecker if !snapshot.has_accepted_terms => GuardDecision::RequireTerms,
        GuardKind::TermsChecker => GuardDecision::Render,
    }
}

/// A guard with its own wait budget, independent of the bootstrap timeout.
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    kind: GuardKind,
    wait: Duration,
}

impl Guard {
    /// The wait is clamped to 10–25 seconds.
    pub fn new(kind: GuardKind, wait: Duration) -> Self {
        Self {
            kind,
            wait: wait.clamp(MIN_GUARD_WAIT, MAX_GUARD_WAIT),
        }
    }

    pub fn kind(&self) -> GuardKind {
        self.kind
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Waits for loading to settle, then decides. Gives up after the budget.
    pub async fn resolve(&self, mut rx: watch::Receiver<SessionSnapshot>) -> GuardDecision {
        let settled = match tokio::time::timeout(self.wait, rx.wait_for(|s| !s.loading)).await {
            Ok(Ok(snapshot)) => Some(decide(self.kind, &snapshot)),
            // the session service is gone; decide from what it last published
            Ok(Err(_)) => None,
            Err(_) => {
                warn!("{:?} guard gave up after {:?}", self.kind, self.wait);
                return GuardDecision::TimedOut;
            }
        };
        settled.unwrap_or_else(|| decide(self.kind, &rx.borrow()))
    }
}
