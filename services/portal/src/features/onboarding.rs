//! services/portal/src/features/onboarding.rs
//!
//! The onboarding survey, profile edits, and the one-shot client flags that
//! steer a new user through their first visits.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use mentorship_core::validation::{self, ValidationError};
use mentorship_core::{Profile, ProfileUpdate, Role, StorageKey};
use tracing::info;

use crate::error::AuthError;
use crate::session::SessionService;

/// The answers collected by the onboarding form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingSurvey {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub education_level: Option<String>,
    pub english_level: Option<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
}

impl OnboardingSurvey {
    fn validate(&self, role: Role, today: NaiveDate) -> Result<(), ValidationError> {
        validation::require("First name", Some(&self.first_name))?;
        validation::require("Last name", Some(&self.last_name))?;
        if let Some(dob) = self.date_of_birth {
            validation::validate_age(dob, today)?;
        }
        if role == Role::Student {
            validation::require("Education level", self.education_level.as_deref())?;
            validation::require("English level", self.english_level.as_deref())?;
            if !self.interests.iter().any(|i| !i.trim().is_empty()) {
                return Err(ValidationError::MissingField("Interests"));
            }
        }
        Ok(())
    }

    fn to_update(&self) -> ProfileUpdate {
        let trimmed = |v: &Option<String>| v.as_ref().map(|s| s.trim().to_string());
        ProfileUpdate {
            first_name: Some(self.first_name.trim().to_string()),
            last_name: Some(self.last_name.trim().to_string()),
            date_of_birth: self.date_of_birth,
            education_level: trimmed(&self.education_level),
            english_level: trimmed(&self.english_level),
            interests: Some(
                self.interests
                    .iter()
                    .map(|i| i.trim().to_string())
                    .filter(|i| !i.is_empty())
                    .collect(),
            ),
            bio: trimmed(&self.bio),
            ..Default::default()
        }
    }
}

pub struct OnboardingService {
    session: Arc<SessionService>,
}

impl OnboardingService {
    pub fn new(session: Arc<SessionService>) -> Self {
        Self { session }
    }

    /// Saves the survey and republishes the session with the new profile.
    pub async fn submit_survey(&self, survey: &OnboardingSurvey) -> Result<Profile, AuthError> {
        let user = self.session.current_user()?;
        let role = self.session.snapshot().role().unwrap_or(Role::Student);
        survey.validate(role, Utc::now().date_naive())?;

        let profile = self
            .session
            .ports()
            .db
            .update_profile(user.id, &survey.to_update())
            .await?;
        info!("Onboarding survey saved for {}", user.id);
        self.session.refresh_profile().await?;
        Ok(profile)
    }

    /// Writes the non-empty fields of `update`. An empty update only reads.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, AuthError> {
        let user = self.session.current_user()?;
        let db = &self.session.ports().db;
        if update.is_empty() {
            return Ok(db.get_profile(user.id).await?);
        }
        if let Some(dob) = update.date_of_birth {
            validation::validate_age(dob, Utc::now().date_naive())?;
        }
        let profile = db.update_profile(user.id, update).await?;
        self.session.refresh_profile().await?;
        Ok(profile)
    }

    pub fn has_seen_tutorial(&self) -> bool {
        self.session.flag(StorageKey::HasSeenProfileTutorial).as_deref() == Some("true")
    }

    pub fn mark_tutorial_seen(&self) {
        self.session.set_flag(StorageKey::HasSeenProfileTutorial, "true");
    }

    /// True once after a sign-up on this client.
    pub fn take_new_signup(&self) -> bool {
        let fresh = self.session.flag(StorageKey::NewSignup).is_some();
        if fresh {
            self.session.remove_flag(StorageKey::NewSignup);
        }
        fresh
    }
}
