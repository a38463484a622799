//! services/portal/src/features/admin.rs
//!
//! Mentor application review.

use std::sync::Arc;

use mentorship_core::{ApplicationStatus, MentorApplication, Role};
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::SessionService;

pub struct AdminService {
    session: Arc<SessionService>,
}

impl AdminService {
    pub fn new(session: Arc<SessionService>) -> Self {
        Self { session }
    }

    pub async fn applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<MentorApplication>, AuthError> {
        self.session.require_role(&[Role::Admin])?;
        Ok(self
            .session
            .ports()
            .db
            .list_mentor_applications(status)
            .await?)
    }

    pub async fn approve(&self, application_id: Uuid) -> Result<MentorApplication, AuthError> {
        self.review(application_id, ApplicationStatus::Approved).await
    }

    pub async fn reject(&self, application_id: Uuid) -> Result<MentorApplication, AuthError> {
        self.review(application_id, ApplicationStatus::Rejected).await
    }

    async fn review(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<MentorApplication, AuthError> {
        let (admin, _) = self.session.require_role(&[Role::Admin])?;
        let application = self
            .session
            .ports()
            .db
            .set_application_status(application_id, status)
            .await?;
        info!(
            "Application {} marked {} by {}",
            application_id,
            status.as_str(),
            admin.id
        );
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin_user, Harness};

    #[tokio::test]
    async fn admins_review_applications() {
        let harness = Harness::new();
        let first = harness.db.add_application("one@example.org");
        let second = harness.db.add_application("two@example.org");
        harness.sign_in_as(admin_user()).await;
        let admin = AdminService::new(harness.service.clone());

        assert_eq!(admin.applications(None).await.unwrap().len(), 2);
        assert_eq!(
            admin.approve(first).await.unwrap().status,
            ApplicationStatus::Approved
        );
        admin.reject(second).await.unwrap();

        let pending = admin
            .applications(Some(ApplicationStatus::Pending))
            .await
            .unwrap();
        assert!(pending.is_empty());
        let approved = admin
            .applications(Some(ApplicationStatus::Approved))
            .await
            .unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].email, "one@example.org");
    }

    #[tokio::test]
    async fn everyone_else_is_forbidden() {
        let harness = Harness::new();
        let id = harness.db.add_application("one@example.org");
        let admin = AdminService::new(harness.service.clone());
        assert_eq!(admin.approve(id).await.unwrap_err(), AuthError::NotSignedIn);

        harness.sign_in_as_student().await;
        assert_eq!(admin.applications(None).await.unwrap_err(), AuthError::Forbidden);
        assert_eq!(admin.reject(id).await.unwrap_err(), AuthError::Forbidden);
    }

    #[tokio::test]
    async fn unknown_applications_are_not_found() {
        let harness = Harness::new();
        harness.sign_in_as(admin_user()).await;
        let admin = AdminService::new(harness.service.clone());
        assert!(matches!(
            admin.approve(Uuid::new_v4()).await,
            Err(AuthError::Port(e)) if e.is_not_found()
        ));
    }
}
