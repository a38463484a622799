//! services/portal/src/session/credentials.rs
//!
//! Sign-up, sign-in, OAuth and terms acceptance.

use std::future::Future;

use chrono::{NaiveDate, Utc};
use mentorship_core::validation::{self, ValidationError};
use mentorship_core::{OAuthProvider, ProfileUpdate, Session, SignUpResult, SignupMetadata, StorageKey};
use tracing::{error, info};

use crate::error::AuthError;
use crate::session::state::SessionService;

/// Everything the sign-up form collects.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
}

impl SessionService {
    /// Runs one credential operation with the shared `loading`/`error` fields.
    async fn tracked<T, F>(&self, operation: &str, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        self.update(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = fut.await;
        self.update(|s| {
            s.loading = false;
            if let Err(e) = &result {
                s.error = Some(e.to_string());
            }
        });
        if let Err(e) = &result {
            error!("{} failed: {}", operation, e);
        }
        result
    }

    /// Validates the request client-side, then registers with the provider.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResult, AuthError> {
        self.tracked("Sign up", async {
            let email = validation::validate_signup_email(&request.email)?;
            validation::require("First name", Some(&request.first_name))?;
            validation::require("Last name", Some(&request.last_name))?;
            if let Some(dob) = request.date_of_birth {
                validation::validate_age(dob, Utc::now().date_naive())?;
            }
            if request.password.is_empty() {
                return Err(ValidationError::MissingField("Password").into());
            }

            let metadata = SignupMetadata {
                first_name: Some(request.first_name.trim().to_string()),
                last_name: Some(request.last_name.trim().to_string()),
            };
            let result = self
                .ports()
                .auth
                .sign_up(&email, &request.password, &metadata)
                .await?;
            self.set_flag(StorageKey::NewSignup, "true");
            info!("Registered user {}", result.user.id);
            Ok(result)
        })
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.tracked("Sign in", async {
            let session = self
                .ports()
                .auth
                .sign_in_with_password(email.trim(), password)
                .await?;
            Ok(session)
        })
        .await
    }

    /// Sends the client to the provider's consent page. Returns the URL.
    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        self.tracked("OAuth sign in", async {
            let url = self
                .ports()
                .auth
                .oauth_authorize_url(provider, &self.settings().oauth_redirect)?;
            self.ports().navigator.hard_navigate(&url);
            Ok(url)
        })
        .await
    }

    /// Finishes the redirect flow from the URL the provider sent back.
    pub async fn complete_oauth(&self, callback_url: &str) -> Result<Session, AuthError> {
        self.tracked("OAuth completion", async {
            Ok(self.ports().auth.complete_oauth(callback_url).await?)
        })
        .await
    }

    /// Records terms acceptance. The local mirror is updated before the
    /// backend write and is reconciled on the next profile fetch.
    pub async fn update_terms(&self, accepted: bool) -> Result<(), AuthError> {
        self.tracked("Terms update", async {
            let user = self.current_user()?;
            self.update(|s| {
                s.has_accepted_terms = accepted;
                if let Some(profile) = s.profile.as_mut() {
                    profile.terms_accepted = accepted;
                }
            });
            self.set_flag(StorageKey::TermsAccepted, if accepted { "true" } else { "false" });
            self.ports()
                .db
                .update_profile(user.id, &ProfileUpdate::terms(accepted))
                .await?;
            Ok(())
        })
        .await
    }
}
