//! crates/mentorship_core/src/ports.rs
//!
//! Defines the service contracts (traits) the portal core depends on.
//! These traits form the boundary of the hexagonal architecture: the hosted
//! backend (auth, rows, objects) and the client environment (storage,
//! navigation) are reached only through them.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use uuid::Uuid;

use crate::domain::{
    Announcement, ApplicationStatus, AuthEvent, BlogDraft, BlogPost, Mentor, MentorApplication,
    MentorNote, MentorStudentLink, NewAnnouncement, NewMentorNote, NewProfile, NewStudentResume,
    OAuthProvider, Profile, ProfileUpdate, Session, SignUpResult, SignupMetadata, StudentResume,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (HTTP, storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// `NotFound` is an expected, empty result rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The stream of session-change notifications a provider emits.
pub type AuthEventStream = Pin<Box<dyn Stream<Item = AuthEvent> + Send>>;

//=========================================================================================
// Backend Ports
//=========================================================================================

/// How far a sign-out reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutScope {
    /// Revoke every refresh token of the user.
    Global,
    /// Forget only the session held by this client.
    Local,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the cached session, refreshing it when expired.
    async fn get_session(&self) -> PortResult<Option<Session>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<Session>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignupMetadata,
    ) -> PortResult<SignUpResult>;

    /// Builds the provider authorize URL the client must navigate to.
    fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> PortResult<String>;

    /// Turns the redirect the provider sent back into a session.
    async fn complete_oauth(&self, callback_url: &str) -> PortResult<Session>;

    async fn sign_out(&self, scope: SignOutScope) -> PortResult<()>;

    /// Subscribes to session changes. Dropping the stream releases the subscription.
    fn events(&self) -> AuthEventStream;
}

/// Answers role-membership questions for a principal.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn is_admin(&self, email: &str) -> PortResult<bool>;

    async fn is_approved_mentor(&self, email: &str) -> PortResult<bool>;
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Profiles ---
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    async fn insert_profile(&self, profile: &NewProfile) -> PortResult<()>;

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<Profile>;

    // --- Mentorship ---
    async fn list_mentor_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> PortResult<Vec<MentorApplication>>;

    async fn set_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> PortResult<MentorApplication>;

    async fn list_mentors(&self) -> PortResult<Vec<Mentor>>;

    async fn list_students_for_mentor(&self, mentor_id: Uuid) -> PortResult<Vec<Profile>>;

    async fn assign_mentor(&self, link: MentorStudentLink) -> PortResult<()>;

    async fn list_notes(&self, mentor_id: Uuid, student_id: Uuid) -> PortResult<Vec<MentorNote>>;

    async fn create_note(&self, note: &NewMentorNote) -> PortResult<MentorNote>;

    async fn update_note(&self, note_id: Uuid, content: &str) -> PortResult<MentorNote>;

    async fn delete_note(&self, note_id: Uuid) -> PortResult<()>;

    // --- Announcements ---
    async fn list_announcements(&self) -> PortResult<Vec<Announcement>>;

    async fn create_announcement(&self, announcement: &NewAnnouncement) -> PortResult<Announcement>;

    async fn delete_announcement(&self, announcement_id: Uuid) -> PortResult<()>;

    // --- Blogs ---
    async fn list_blogs(&self, published_only: bool) -> PortResult<Vec<BlogPost>>;

    async fn get_blog_by_slug(&self, slug: &str) -> PortResult<BlogPost>;

    async fn create_blog(&self, author_id: Uuid, draft: &BlogDraft) -> PortResult<BlogPost>;

    async fn update_blog(&self, blog_id: Uuid, draft: &BlogDraft) -> PortResult<BlogPost>;

    async fn delete_blog(&self, blog_id: Uuid) -> PortResult<()>;

    // --- Resumes ---
    async fn list_resumes(&self, student_id: Uuid) -> PortResult<Vec<StudentResume>>;

    async fn get_resume(&self, resume_id: Uuid) -> PortResult<StudentResume>;

    async fn create_resume(&self, resume: &NewStudentResume) -> PortResult<StudentResume>;

    async fn delete_resume(&self, resume_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> PortResult<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn remove(&self, bucket: &str, paths: &[String]) -> PortResult<()>;
}

//=========================================================================================
// Client Environment Ports
//=========================================================================================

/// The two key/value areas a client keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Survives restarts (browser `localStorage`).
    Persistent,
    /// Scoped to the running session (browser `sessionStorage`).
    Volatile,
}

/// Client-side key/value storage plus the cookie jar.
pub trait ClientStorage: Send + Sync {
    fn get(&self, area: StorageArea, key: &str) -> Option<String>;

    fn set(&self, area: StorageArea, key: &str, value: &str) -> PortResult<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, area: StorageArea, key: &str) -> PortResult<()>;

    fn keys(&self, area: StorageArea) -> Vec<String>;

    fn clear(&self, area: StorageArea) -> PortResult<()>;

    fn cookie_names(&self) -> Vec<String>;

    /// Rewrites the cookie's expiry into the past.
    fn expire_cookie(&self, name: &str) -> PortResult<()>;
}

/// Moves the client to another location, discarding in-memory state.
pub trait Navigator: Send + Sync {
    fn hard_navigate(&self, location: &str);
}
