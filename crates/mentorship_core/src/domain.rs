//! crates/mentorship_core/src/domain.rs
//!
//! Defines the pure, core data structures for the portal.
//! These structs are independent of the backend wire format; the adapters
//! own the serialized record shapes and convert into these.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

//=========================================================================================
// Identity and Session
//=========================================================================================

/// Names supplied at sign-up and carried by the auth provider as user metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupMetadata {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// The identity record issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub metadata: SignupMetadata,
}

/// An access/refresh token pair owned by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Session-change notifications emitted by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A principal signed in (password, sign-up, OAuth completion).
    SignedIn(Session),
    /// The session was destroyed, locally or remotely.
    SignedOut,
    /// The access token was rotated; the principal is unchanged.
    TokenRefreshed(Session),
}

/// Third-party identity providers reachable through the redirect flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
    LinkedIn,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
            OAuthProvider::LinkedIn => "linkedin_oidc",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            "linkedin" | "linkedin_oidc" => Ok(OAuthProvider::LinkedIn),
            other => Err(format!("unsupported OAuth provider '{other}'")),
        }
    }
}

/// What a sign-up call produced. Providers that require email confirmation
/// return the user without a session.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: User,
    pub session: Option<Session>,
}

//=========================================================================================
// Profile
//=========================================================================================

/// The application record extending the auth identity with portal fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub terms_accepted: bool,
    pub date_of_birth: Option<NaiveDate>,
    pub education_level: Option<String>,
    pub english_level: Option<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// The default row inserted the first time a user resolves without a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
}

/// A partial profile write. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub terms_accepted: Option<bool>,
    pub date_of_birth: Option<NaiveDate>,
    pub education_level: Option<String>,
    pub english_level: Option<String>,
    pub interests: Option<Vec<String>>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn terms(accepted: bool) -> Self {
        Self {
            terms_accepted: Some(accepted),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the write to an in-memory profile, mirroring the backend update.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(v) = &self.first_name {
            profile.first_name = Some(v.clone());
        }
        if let Some(v) = &self.last_name {
            profile.last_name = Some(v.clone());
        }
        if let Some(v) = self.terms_accepted {
            profile.terms_accepted = v;
        }
        if let Some(v) = self.date_of_birth {
            profile.date_of_birth = Some(v);
        }
        if let Some(v) = &self.education_level {
            profile.education_level = Some(v.clone());
        }
        if let Some(v) = &self.english_level {
            profile.english_level = Some(v.clone());
        }
        if let Some(v) = &self.interests {
            profile.interests = v.clone();
        }
        if let Some(v) = &self.bio {
            profile.bio = Some(v.clone());
        }
        if let Some(v) = &self.avatar_url {
            profile.avatar_url = Some(v.clone());
        }
    }
}

//=========================================================================================
// Mentorship
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// A row of `mentorapplications`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorApplication {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// A row of `mentors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mentor {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub expertise: Vec<String>,
}

/// A row of `mentor_student`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MentorStudentLink {
    pub mentor_id: Uuid,
    pub student_id: Uuid,
}

/// A row of `mentor_notes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorNote {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMentorNote {
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub content: String,
}

//=========================================================================================
// Content
//=========================================================================================

/// A row of `announcements`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnouncement {
    pub title: String,
    pub body: String,
}

/// A row of `blogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub author_id: Option<Uuid>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields an editor writes when creating or updating a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogDraft {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub published: bool,
}

/// A row of `student_resumes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentResume {
    pub id: Uuid,
    pub student_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub public_url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudentResume {
    pub student_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub public_url: String,
}
