//! services/portal/src/features/announcements.rs
//!
//! Site-wide announcements. Dismissals are remembered on this client only.

use std::sync::Arc;

use mentorship_core::validation;
use mentorship_core::{Announcement, NewAnnouncement, Role, StorageKey};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::SessionService;

pub struct AnnouncementService {
    session: Arc<SessionService>,
}

impl AnnouncementService {
    pub fn new(session: Arc<SessionService>) -> Self {
        Self { session }
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<Announcement>, AuthError> {
        self.session.current_user()?;
        Ok(self.session.ports().db.list_announcements().await?)
    }

    /// The announcements this client has not closed yet.
    pub async fn undismissed(&self) -> Result<Vec<Announcement>, AuthError> {
        let dismissed = self.dismissed();
        let mut all = self.list().await?;
        all.retain(|a| !dismissed.contains(&a.id));
        Ok(all)
    }

    pub async fn create(&self, title: &str, body: &str) -> Result<Announcement, AuthError> {
        self.session.require_role(&[Role::Admin])?;
        validation::require("Title", Some(title))?;
        validation::require("Body", Some(body))?;
        let created = self
            .session
            .ports()
            .db
            .create_announcement(&NewAnnouncement {
                title: title.trim().to_string(),
                body: body.trim().to_string(),
            })
            .await?;
        info!("Published announcement {}", created.id);
        Ok(created)
    }

    pub async fn delete(&self, announcement_id: Uuid) -> Result<(), AuthError> {
        self.session.require_role(&[Role::Admin])?;
        Ok(self
            .session
            .ports()
            .db
            .delete_announcement(announcement_id)
            .await?)
    }

    pub fn dismiss(&self, announcement_id: Uuid) {
        let mut dismissed = self.dismissed();
        if dismissed.contains(&announcement_id) {
            return;
        }
        dismissed.push(announcement_id);
        match serde_json::to_string(&dismissed) {
            Ok(raw) => self.session.set_flag(StorageKey::DismissedNotifications, &raw),
            Err(e) => warn!("Failed to encode dismissed announcements: {}", e),
        }
    }

    pub fn dismissed(&self) -> Vec<Uuid> {
        let Some(raw) = self.session.flag(StorageKey::DismissedNotifications) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring unreadable dismissed announcements: {}", e);
            Vec::new()
        })
    }
}
