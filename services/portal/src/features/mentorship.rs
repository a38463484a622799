//! services/portal/src/features/mentorship.rs
//!
//! Mentor and student relationships, and the notes a mentor keeps on each
//! student.

use std::sync::Arc;

use mentorship_core::validation;
use mentorship_core::{Mentor, MentorNote, MentorStudentLink, NewMentorNote, Profile, Role};
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::SessionService;

pub struct MentorshipService {
    session: Arc<SessionService>,
}

impl MentorshipService {
    pub fn new(session: Arc<SessionService>) -> Self {
        Self { session }
    }

    pub async fn mentors(&self) -> Result<Vec<Mentor>, AuthError> {
        self.session.current_user()?;
        Ok(self.session.ports().db.list_mentors().await?)
    }

    /// The students assigned to the signed-in mentor.
    pub async fn my_students(&self) -> Result<Vec<Profile>, AuthError> {
        let (mentor, _) = self.session.require_role(&[Role::Mentor])?;
        Ok(self
            .session
            .ports()
            .db
            .list_students_for_mentor(mentor.id)
            .await?)
    }

    pub async fn students_of(&self, mentor_id: Uuid) -> Result<Vec<Profile>, AuthError> {
        self.session.require_role(&[Role::Admin])?;
        Ok(self
            .session
            .ports()
            .db
            .list_students_for_mentor(mentor_id)
            .await?)
    }

    pub async fn assign(&self, mentor_id: Uuid, student_id: Uuid) -> Result<(), AuthError> {
        self.session.require_role(&[Role::Admin])?;
        self.session
            .ports()
            .db
            .assign_mentor(MentorStudentLink {
                mentor_id,
                student_id,
            })
            .await?;
        info!("Assigned mentor {} to student {}", mentor_id, student_id);
        Ok(())
    }

    //=====================================================================================
    // Notes
    //=====================================================================================

    pub async fn notes(&self, student_id: Uuid) -> Result<Vec<MentorNote>, AuthError> {
        let (mentor, _) = self.session.require_role(&[Role::Mentor])?;
        Ok(self
            .session
            .ports()
            .db
            .list_notes(mentor.id, student_id)
            .await?)
    }

    pub async fn add_note(&self, student_id: Uuid, content: &str) -> Result<MentorNote, AuthError> {
        let (mentor, _) = self.session.require_role(&[Role::Mentor])?;
        validation::require("Note", Some(content))?;
        let note = NewMentorNote {
            mentor_id: mentor.id,
            student_id,
            content: content.trim().to_string(),
        };
        Ok(self.session.ports().db.create_note(&note).await?)
    }

    pub async fn edit_note(&self, note_id: Uuid, content: &str) -> Result<MentorNote, AuthError> {
        self.session.require_role(&[Role::Mentor])?;
        validation::require("Note", Some(content))?;
        Ok(self
            .session
            .ports()
            .db
            .update_note(note_id, content.trim())
            .await?)
    }

    pub async fn delete_note(&self, note_id: Uuid) -> Result<(), AuthError> {
        self.session.require_role(&[Role::Mentor])?;
        Ok(self.session.ports().db.delete_note(note_id).await?)
    }
}
