//! services/portal/src/session/bootstrap.rs
//!
//! Initial session retrieval and propagation of auth events.

use std::sync::Arc;

use futures::StreamExt;
use mentorship_core::AuthEvent;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::session::state::SessionService;

/// A live subscription to the provider's auth events.
///
/// The listener task stops when this handle is dropped or unsubscribed.
pub struct AuthSubscription {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AuthSubscription {
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the listener and waits for it to finish.
    pub async fn unsubscribe(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Auth listener ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl SessionService {
    /// Subscribes to auth events, then resolves the current session once.
    ///
    /// If resolution takes longer than the bootstrap budget, `loading` is
    /// forced to false and resolution is abandoned. Never fails.
    pub async fn bootstrap(self: &Arc<Self>) -> AuthSubscription {
        let subscription = self.listen();
        let budget = self.settings().bootstrap_timeout;

        if tokio::time::timeout(budget, self.load_initial_session())
            .await
            .is_err()
        {
            warn!(
                "Session bootstrap did not finish within {:?}; giving up",
                budget
            );
            self.update(|s| s.loading = false);
        }
        subscription
    }

    async fn load_initial_session(&self) {
        self.update(|s| s.loading = true);
        match self.ports().auth.get_session().await {
            Ok(Some(session)) => {
                debug!("Restored session for user {}", session.user.id);
                self.resolve_principal(&session.user).await;
            }
            Ok(None) => {
                debug!("No stored session");
                self.update(|s| s.clear_principal());
            }
            Err(e) => {
                error!("Failed to retrieve session: {}", e);
                self.update(|s| {
                    s.clear_principal();
                    s.error = Some(e.to_string());
                });
            }
        }
        self.update(|s| s.loading = false);
    }

    /// Starts the listener task that applies provider events to the snapshot.
    pub fn listen(self: &Arc<Self>) -> AuthSubscription {
        let token = self.alive_token().child_token();
        let mut events = self.ports().auth.events();
        let service = Arc::clone(self);
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    next = events.next() => match next {
                        Some(event) => service.apply_event(event).await,
                        None => break,
                    },
                }
            }
            debug!("Auth listener stopped");
        });

        AuthSubscription {
            token,
            handle: Some(handle),
        }
    }

    /// Transitions the snapshot for one auth event.
    pub async fn apply_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                info!("Signed in as {}", session.user.id);
                self.update(|s| s.error = None);
                self.resolve_principal(&session.user).await;
            }
            AuthEvent::SignedOut => {
                info!("Signed out");
                self.update(|s| s.clear_principal());
            }
            AuthEvent::TokenRefreshed(_) => {
                debug!("Access token refreshed");
                self.update(|s| s.error = None);
            }
        }
    }
}
