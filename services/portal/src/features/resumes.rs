//! services/portal/src/features/resumes.rs
//!
//! Student resume uploads: the file goes to the object store and a row
//! records where it lives.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use mentorship_core::ports::ObjectStorage;
use mentorship_core::validation;
use mentorship_core::{NewStudentResume, Role, StudentResume};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::SessionService;

pub const RESUME_BUCKET: &str = "student-resumes";

pub struct ResumeService {
    session: Arc<SessionService>,
    objects: Arc<dyn ObjectStorage>,
}

impl ResumeService {
    pub fn new(session: Arc<SessionService>, objects: Arc<dyn ObjectStorage>) -> Self {
        Self { session, objects }
    }

    pub async fn upload(&self, file_name: &str, body: Bytes) -> Result<StudentResume, AuthError> {
        let (student, _) = self.session.require_role(&[Role::Student])?;
        let content_type = validation::validate_resume_file(file_name, body.len())?;
        let path = format!(
            "{}/{}-{}",
            student.id,
            Utc::now().timestamp_millis(),
            file_name
        );

        self.objects
            .upload(RESUME_BUCKET, &path, content_type, body)
            .await?;
        let row = NewStudentResume {
            student_id: student.id,
            file_name: file_name.to_string(),
            public_url: self.objects.public_url(RESUME_BUCKET, &path),
            file_path: path,
        };
        match self.session.ports().db.create_resume(&row).await {
            Ok(resume) => {
                info!("Stored resume {} for {}", resume.id, student.id);
                Ok(resume)
            }
            Err(e) => {
                // Without a row the object is unreachable; take it back out.
                if let Err(cleanup) = self
                    .objects
                    .remove(RESUME_BUCKET, &[row.file_path.clone()])
                    .await
                {
                    error!("Failed to remove orphaned {}: {}", row.file_path, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// The signed-in student's resumes.
    pub async fn mine(&self) -> Result<Vec<StudentResume>, AuthError> {
        let (student, _) = self.session.require_role(&[Role::Student])?;
        Ok(self.session.ports().db.list_resumes(student.id).await?)
    }

    pub async fn of_student(&self, student_id: Uuid) -> Result<Vec<StudentResume>, AuthError> {
        self.session.require_role(&[Role::Admin, Role::Mentor])?;
        Ok(self.session.ports().db.list_resumes(student_id).await?)
    }

    /// Removes the object first, then the row.
    pub async fn delete(&self, resume_id: Uuid) -> Result<(), AuthError> {
        let (user, role) = self
            .session
            .require_role(&[Role::Student, Role::Admin])?;
        let db = &self.session.ports().db;
        let resume = db.get_resume(resume_id).await?;
        if role == Role::Student && resume.student_id != user.id {
            return Err(AuthError::Forbidden);
        }
        self.objects
            .remove(RESUME_BUCKET, &[resume.file_path.clone()])
            .await?;
        db.delete_resume(resume_id).await?;
        info!("Deleted resume {}", resume_id);
        Ok(())
    }
}
