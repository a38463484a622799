//! services/portal/src/adapters/auth.rs
//!
//! This module contains the auth adapter, the concrete implementation of the
//! `AuthProvider` port against the hosted auth service. It caches the session
//! in client storage and broadcasts session changes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mentorship_core::ports::{
    AuthEventStream, AuthProvider, ClientStorage, PortError, PortResult, SignOutScope, StorageArea,
};
use mentorship_core::{
    AuthEvent, KeyRegistry, OAuthProvider, Session, SignUpResult, SignupMetadata, StorageKey, User,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::adapters::supabase::SupabaseClient;

const EVENT_BUFFER: usize = 16;
/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN: i64 = 3600;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthProvider` port over the auth REST API.
#[derive(Clone)]
pub struct SupabaseAuthAdapter {
    client: SupabaseClient,
    storage: Arc<dyn ClientStorage>,
    keys: KeyRegistry,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuthAdapter {
    /// Creates a new `SupabaseAuthAdapter`.
    pub fn new(client: SupabaseClient, storage: Arc<dyn ClientStorage>, keys: KeyRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            client,
            storage,
            keys,
            events,
        }
    }

    fn emit(&self, event: AuthEvent) {
        // Having no subscribers is fine.
        let _ = self.events.send(event);
    }

    fn token_key(&self) -> String {
        self.keys.name(StorageKey::AuthToken)
    }

    fn stored_session(&self) -> Option<SessionRecord> {
        let raw = self.storage.get(StorageArea::Persistent, &self.token_key())?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Discarding unreadable stored session: {}", e);
                self.forget_session();
                None
            }
        }
    }

    fn store_session(&self, record: &SessionRecord) -> PortResult<()> {
        let raw =
            serde_json::to_string(record).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.storage
            .set(StorageArea::Persistent, &self.token_key(), &raw)?;
        self.client
            .set_access_token(Some(record.access_token.clone()));
        Ok(())
    }

    fn forget_session(&self) {
        if let Err(e) = self
            .storage
            .remove(StorageArea::Persistent, &self.token_key())
        {
            warn!("Failed to remove stored session: {}", e);
        }
        self.client.set_access_token(None);
    }

    /// Token endpoints are called with the project key, never a stale user token.
    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> PortResult<SessionRecord> {
        let url = self.client.endpoint(&["auth", "v1", "token"])?;
        let request = self
            .client
            .request_as(Method::POST, url, self.client.anon_key())
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let record: SessionRecord = self.client.send_json(request).await?;
        Ok(record.stamped())
    }

    async fn fetch_user(&self, access_token: &str) -> PortResult<UserRecord> {
        let url = self.client.endpoint(&["auth", "v1", "user"])?;
        let request = self.client.request_as(Method::GET, url, access_token);
        self.client.send_json(request).await
    }

    /// Stores a fresh session and announces it.
    fn adopt(&self, record: SessionRecord, event: fn(Session) -> AuthEvent) -> PortResult<Session> {
        self.store_session(&record)?;
        let session = record.to_domain();
        self.emit(event(session.clone()));
        Ok(session)
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: MetadataRecord,
}

impl UserRecord {
    fn to_domain(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            metadata: SignupMetadata {
                first_name: self.user_metadata.first_name.clone(),
                last_name: self.user_metadata.last_name.clone(),
            },
        }
    }
}

/// The token response, also the shape persisted in client storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserRecord,
}

impl SessionRecord {
    /// Fills `expires_at` from `expires_in` when the provider left it out.
    fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            let lifetime = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
            self.expires_at = Some(Utc::now().timestamp() + lifetime);
        }
        self
    }

    fn to_domain(&self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);
        Session {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at,
            user: self.user.to_domain(),
        }
    }
}

/// Reads the token parameters from the redirect fragment, or the query.
fn callback_params(callback_url: &str) -> PortResult<HashMap<String, String>> {
    let url = Url::parse(callback_url)
        .map_err(|e| PortError::Unexpected(format!("Invalid callback URL: {}", e)))?;
    let from_fragment: HashMap<String, String> = url
        .fragment()
        .map(|f| url::form_urlencoded::parse(f.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    if !from_fragment.is_empty() {
        return Ok(from_fragment);
    }
    Ok(url.query_pairs().into_owned().collect())
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for SupabaseAuthAdapter {
    async fn get_session(&self) -> PortResult<Option<Session>> {
        let Some(record) = self.stored_session() else {
            return Ok(None);
        };
        let session = record.to_domain();
        if !session.is_expired_at(Utc::now()) {
            self.client.set_access_token(Some(record.access_token));
            return Ok(Some(session));
        }

        debug!("Stored session expired, refreshing");
        let refreshed = self
            .token_grant(
                "refresh_token",
                json!({ "refresh_token": record.refresh_token }),
            )
            .await;
        match refreshed {
            Ok(record) => self.adopt(record, AuthEvent::TokenRefreshed).map(Some),
            Err(PortError::Unauthorized) | Err(PortError::NotFound(_)) => {
                info!("Refresh token rejected; session ended");
                self.forget_session();
                self.emit(AuthEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<Session> {
        let record = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        self.adopt(record, AuthEvent::SignedIn)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignupMetadata,
    ) -> PortResult<SignUpResult> {
        let url = self.client.endpoint(&["auth", "v1", "signup"])?;
        let data = MetadataRecord {
            first_name: metadata.first_name.clone(),
            last_name: metadata.last_name.clone(),
        };
        let request = self
            .client
            .request_as(Method::POST, url, self.client.anon_key())
            .json(&json!({ "email": email, "password": password, "data": data }));
        let body: serde_json::Value = self.client.send_json(request).await?;
        let malformed = |e: serde_json::Error| PortError::Unexpected(format!("Malformed sign-up response: {}", e));

        // With email confirmation enabled the provider returns only the user.
        if body.get("access_token").is_some() {
            let record: SessionRecord = serde_json::from_value(body).map_err(malformed)?;
            let user = record.user.to_domain();
            let session = self.adopt(record.stamped(), AuthEvent::SignedIn)?;
            return Ok(SignUpResult {
                user,
                session: Some(session),
            });
        }
        let user_value = body.get("user").cloned().unwrap_or(body);
        let user: UserRecord = serde_json::from_value(user_value).map_err(malformed)?;
        Ok(SignUpResult {
            user: user.to_domain(),
            session: None,
        })
    }

    fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> PortResult<String> {
        let mut url = self.client.endpoint(&["auth", "v1", "authorize"])?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        Ok(url.into())
    }

    async fn complete_oauth(&self, callback_url: &str) -> PortResult<Session> {
        let params = callback_params(callback_url)?;
        if let Some(reason) = params.get("error_description").or_else(|| params.get("error")) {
            return Err(PortError::Unexpected(format!("OAuth sign-in failed: {}", reason)));
        }
        let access_token = params
            .get("access_token")
            .ok_or_else(|| PortError::Unexpected("Callback carries no access token".into()))?;
        let refresh_token = params.get("refresh_token").cloned().unwrap_or_default();
        let expires_in = params.get("expires_in").and_then(|v| v.parse::<i64>().ok());

        let user = self.fetch_user(access_token).await?;
        let record = SessionRecord {
            access_token: access_token.clone(),
            refresh_token,
            expires_in,
            expires_at: params.get("expires_at").and_then(|v| v.parse::<i64>().ok()),
            user,
        }
        .stamped();
        self.adopt(record, AuthEvent::SignedIn)
    }

    async fn sign_out(&self, scope: SignOutScope) -> PortResult<()> {
        let token = self
            .stored_session()
            .map(|r| r.access_token)
            .or_else(|| self.client.access_token());

        if let (SignOutScope::Global, Some(token)) = (scope, token) {
            let url = self.client.endpoint(&["auth", "v1", "logout"])?;
            let request = self
                .client
                .request_as(Method::POST, url, &token)
                .query(&[("scope", "global")]);
            match self.client.send(request).await {
                Ok(_) => {}
                // The token is already dead server-side.
                Err(PortError::Unauthorized) | Err(PortError::NotFound(_)) => {
                    debug!("Session already revoked")
                }
                Err(e) => return Err(e),
            }
        }

        self.forget_session();
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn events(&self) -> AuthEventStream {
        let mut rx = self.events.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Auth listener lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
