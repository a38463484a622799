//! services/portal/src/adapters/db.rs
//!
//! This module contains the row-store adapter, the concrete implementation of
//! the `DatabaseService` and `RoleDirectory` ports. It handles all table
//! access through the hosted REST interface.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mentorship_core::domain::{
    Announcement, ApplicationStatus, BlogDraft, BlogPost, Mentor, MentorApplication, MentorNote,
    MentorStudentLink, NewAnnouncement, NewMentorNote, NewProfile, NewStudentResume, Profile,
    ProfileUpdate, StudentResume,
};
use mentorship_core::ports::{DatabaseService, PortResult, RoleDirectory};
use mentorship_core::validation::slugify;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::adapters::supabase::{eq, in_list, SupabaseClient};

const PROFILES: &str = "profiles";
const ADMIN: &str = "admin";
const MENTOR_APPLICATIONS: &str = "mentorapplications";
const MENTOR_STUDENT: &str = "mentor_student";
const MENTORS: &str = "mentors";
const MENTOR_NOTES: &str = "mentor_notes";
const ANNOUNCEMENTS: &str = "announcements";
const BLOGS: &str = "blogs";
const STUDENT_RESUMES: &str = "student_resumes";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A row-store adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct SupabaseDbAdapter {
    client: SupabaseClient,
}

impl SupabaseDbAdapter {
    /// Creates a new `SupabaseDbAdapter`.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    is_admin: Option<bool>,
    #[serde(default)]
    terms_accepted: Option<bool>,
    #[serde(default)]
    date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    education_level: Option<String>,
    #[serde(default)]
    english_level: Option<String>,
    #[serde(default)]
    interests: Option<Vec<String>>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            is_admin: self.is_admin.unwrap_or(false),
            terms_accepted: self.terms_accepted.unwrap_or(false),
            date_of_birth: self.date_of_birth,
            education_level: self.education_level,
            english_level: self.english_level,
            interests: self.interests.unwrap_or_default(),
            bio: self.bio,
            avatar_url: self.avatar_url,
        }
    }
}

/// Only the columns being written are serialized.
#[derive(Debug, Serialize)]
struct ProfilePatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    terms_accepted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    education_level: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    english_level: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interests: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
}

impl<'a> From<&'a ProfileUpdate> for ProfilePatch<'a> {
    fn from(update: &'a ProfileUpdate) -> Self {
        ProfilePatch {
            first_name: update.first_name.as_deref(),
            last_name: update.last_name.as_deref(),
            terms_accepted: update.terms_accepted,
            date_of_birth: update.date_of_birth,
            education_level: update.education_level.as_deref(),
            english_level: update.english_level.as_deref(),
            interests: update.interests.as_deref(),
            bio: update.bio.as_deref(),
            avatar_url: update.avatar_url.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApplicationRecord {
    id: Uuid,
    email: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    fn to_domain(self) -> MentorApplication {
        MentorApplication {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            status: self
                .status
                .as_deref()
                .and_then(ApplicationStatus::parse)
                .unwrap_or(ApplicationStatus::Pending),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MentorRecord {
    id: Uuid,
    email: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    expertise: Option<Vec<String>>,
}

impl MentorRecord {
    fn to_domain(self) -> Mentor {
        Mentor {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            expertise: self.expertise.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkRecord {
    mentor_id: Uuid,
    student_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct NoteRecord {
    id: Uuid,
    mentor_id: Uuid,
    student_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

impl NoteRecord {
    fn to_domain(self) -> MentorNote {
        MentorNote {
            id: self.id,
            mentor_id: self.mentor_id,
            student_id: self.student_id,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnouncementRecord {
    id: Uuid,
    title: String,
    #[serde(default)]
    body: Option<String>,
    created_at: DateTime<Utc>,
}

impl AnnouncementRecord {
    fn to_domain(self) -> Announcement {
        Announcement {
            id: self.id,
            title: self.title,
            body: self.body.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlogRecord {
    id: Uuid,
    title: String,
    slug: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    cover_image_url: Option<String>,
    #[serde(default)]
    author_id: Option<Uuid>,
    #[serde(default)]
    published: Option<bool>,
    created_at: DateTime<Utc>,
}

impl BlogRecord {
    fn to_domain(self) -> BlogPost {
        BlogPost {
            id: self.id,
            title: self.title,
            slug: self.slug,
            content: self.content.unwrap_or_default(),
            cover_image_url: self.cover_image_url,
            author_id: self.author_id,
            published: self.published.unwrap_or(false),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct BlogWrite<'a> {
    title: &'a str,
    slug: String,
    content: &'a str,
    cover_image_url: Option<&'a str>,
    published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_id: Option<Uuid>,
}

impl<'a> BlogWrite<'a> {
    fn from_draft(draft: &'a BlogDraft, author_id: Option<Uuid>) -> Self {
        BlogWrite {
            title: &draft.title,
            slug: draft
                .slug
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| slugify(&draft.title)),
            content: &draft.content,
            cover_image_url: draft.cover_image_url.as_deref(),
            published: draft.published,
            author_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResumeRecord {
    id: Uuid,
    student_id: Uuid,
    file_name: String,
    file_path: String,
    public_url: String,
    uploaded_at: DateTime<Utc>,
}

impl ResumeRecord {
    fn to_domain(self) -> StudentResume {
        StudentResume {
            id: self.id,
            student_id: self.student_id,
            file_name: self.file_name,
            file_path: self.file_path,
            public_url: self.public_url,
            uploaded_at: self.uploaded_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for SupabaseDbAdapter {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record: ProfileRecord = self
            .client
            .select_single(PROFILES, &[eq("id", user_id)])
            .await?;
        Ok(record.to_domain())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> PortResult<()> {
        let body = json!({
            "id": profile.id,
            "email": profile.email,
            "first_name": profile.first_name,
            "last_name": profile.last_name,
            "is_admin": profile.is_admin,
        });
        self.client.insert_minimal(PROFILES, &body).await
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<Profile> {
        if update.is_empty() {
            return self.get_profile(user_id).await;
        }
        let record: ProfileRecord = self
            .client
            .update(PROFILES, &[eq("id", user_id)], &ProfilePatch::from(update))
            .await?;
        Ok(record.to_domain())
    }

    async fn list_mentor_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> PortResult<Vec<MentorApplication>> {
        let filters: Vec<_> = status.map(|s| eq("status", s.as_str())).into_iter().collect();
        let records: Vec<ApplicationRecord> = self
            .client
            .select(MENTOR_APPLICATIONS, &filters, Some("created_at.desc"))
            .await?;
        Ok(records.into_iter().map(ApplicationRecord::to_domain).collect())
    }

    async fn set_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> PortResult<MentorApplication> {
        let record: ApplicationRecord = self
            .client
            .update(
                MENTOR_APPLICATIONS,
                &[eq("id", application_id)],
                &json!({ "status": status.as_str() }),
            )
            .await?;
        Ok(record.to_domain())
    }

    async fn list_mentors(&self) -> PortResult<Vec<Mentor>> {
        let records: Vec<MentorRecord> = self
            .client
            .select(MENTORS, &[], Some("last_name.asc"))
            .await?;
        Ok(records.into_iter().map(MentorRecord::to_domain).collect())
    }

    async fn list_students_for_mentor(&self, mentor_id: Uuid) -> PortResult<Vec<Profile>> {
        let links: Vec<LinkRecord> = self
            .client
            .select(MENTOR_STUDENT, &[eq("mentor_id", mentor_id)], None)
            .await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = links.iter().map(|l| l.student_id).collect();
        let records: Vec<ProfileRecord> = self
            .client
            .select(PROFILES, &[in_list("id", &ids)], Some("last_name.asc"))
            .await?;
        Ok(records.into_iter().map(ProfileRecord::to_domain).collect())
    }

    async fn assign_mentor(&self, link: MentorStudentLink) -> PortResult<()> {
        let body = LinkRecord {
            mentor_id: link.mentor_id,
            student_id: link.student_id,
        };
        self.client.insert_minimal(MENTOR_STUDENT, &body).await
    }

    async fn list_notes(&self, mentor_id: Uuid, student_id: Uuid) -> PortResult<Vec<MentorNote>> {
        let records: Vec<NoteRecord> = self
            .client
            .select(
                MENTOR_NOTES,
                &[eq("mentor_id", mentor_id), eq("student_id", student_id)],
                Some("created_at.desc"),
            )
            .await?;
        Ok(records.into_iter().map(NoteRecord::to_domain).collect())
    }

    async fn create_note(&self, note: &NewMentorNote) -> PortResult<MentorNote> {
        let body = json!({
            "mentor_id": note.mentor_id,
            "student_id": note.student_id,
            "content": note.content,
        });
        let record: NoteRecord = self.client.insert(MENTOR_NOTES, &body).await?;
        Ok(record.to_domain())
    }

    async fn update_note(&self, note_id: Uuid, content: &str) -> PortResult<MentorNote> {
        let record: NoteRecord = self
            .client
            .update(MENTOR_NOTES, &[eq("id", note_id)], &json!({ "content": content }))
            .await?;
        Ok(record.to_domain())
    }

    async fn delete_note(&self, note_id: Uuid) -> PortResult<()> {
        self.client.delete(MENTOR_NOTES, &[eq("id", note_id)]).await
    }

    async fn list_announcements(&self) -> PortResult<Vec<Announcement>> {
        let records: Vec<AnnouncementRecord> = self
            .client
            .select(ANNOUNCEMENTS, &[], Some("created_at.desc"))
            .await?;
        Ok(records
            .into_iter()
            .map(AnnouncementRecord::to_domain)
            .collect())
    }

    async fn create_announcement(&self, announcement: &NewAnnouncement) -> PortResult<Announcement> {
        let body = json!({ "title": announcement.title, "body": announcement.body });
        let record: AnnouncementRecord = self.client.insert(ANNOUNCEMENTS, &body).await?;
        Ok(record.to_domain())
    }

    async fn delete_announcement(&self, announcement_id: Uuid) -> PortResult<()> {
        self.client
            .delete(ANNOUNCEMENTS, &[eq("id", announcement_id)])
            .await
    }

    async fn list_blogs(&self, published_only: bool) -> PortResult<Vec<BlogPost>> {
        let filters: Vec<_> = if published_only {
            vec![eq("published", true)]
        } else {
            Vec::new()
        };
        let records: Vec<BlogRecord> = self
            .client
            .select(BLOGS, &filters, Some("created_at.desc"))
            .await?;
        Ok(records.into_iter().map(BlogRecord::to_domain).collect())
    }

    async fn get_blog_by_slug(&self, slug: &str) -> PortResult<BlogPost> {
        let record: BlogRecord = self.client.select_single(BLOGS, &[eq("slug", slug)]).await?;
        Ok(record.to_domain())
    }

    async fn create_blog(&self, author_id: Uuid, draft: &BlogDraft) -> PortResult<BlogPost> {
        let record: BlogRecord = self
            .client
            .insert(BLOGS, &BlogWrite::from_draft(draft, Some(author_id)))
            .await?;
        Ok(record.to_domain())
    }

    async fn update_blog(&self, blog_id: Uuid, draft: &BlogDraft) -> PortResult<BlogPost> {
        let record: BlogRecord = self
            .client
            .update(BLOGS, &[eq("id", blog_id)], &BlogWrite::from_draft(draft, None))
            .await?;
        Ok(record.to_domain())
    }

    async fn delete_blog(&self, blog_id: Uuid) -> PortResult<()> {
        self.client.delete(BLOGS, &[eq("id", blog_id)]).await
    }

    async fn list_resumes(&self, student_id: Uuid) -> PortResult<Vec<StudentResume>> {
        let records: Vec<ResumeRecord> = self
            .client
            .select(
                STUDENT_RESUMES,
                &[eq("student_id", student_id)],
                Some("uploaded_at.desc"),
            )
            .await?;
        Ok(records.into_iter().map(ResumeRecord::to_domain).collect())
    }

    async fn get_resume(&self, resume_id: Uuid) -> PortResult<StudentResume> {
        let record: ResumeRecord = self
            .client
            .select_single(STUDENT_RESUMES, &[eq("id", resume_id)])
            .await?;
        Ok(record.to_domain())
    }

    async fn create_resume(&self, resume: &NewStudentResume) -> PortResult<StudentResume> {
        let body = json!({
            "student_id": resume.student_id,
            "file_name": resume.file_name,
            "file_path": resume.file_path,
            "public_url": resume.public_url,
        });
        let record: ResumeRecord = self.client.insert(STUDENT_RESUMES, &body).await?;
        Ok(record.to_domain())
    }

    async fn delete_resume(&self, resume_id: Uuid) -> PortResult<()> {
        self.client
            .delete(STUDENT_RESUMES, &[eq("id", resume_id)])
            .await
    }
}

//=========================================================================================
// `RoleDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl RoleDirectory for SupabaseDbAdapter {
    async fn is_admin(&self, email: &str) -> PortResult<bool> {
        self.client.exists(ADMIN, &[eq("email", email)]).await
    }

    async fn is_approved_mentor(&self, email: &str) -> PortResult<bool> {
        self.client
            .exists(
                MENTOR_APPLICATIONS,
                &[
                    eq("email", email),
                    eq("status", ApplicationStatus::Approved.as_str()),
                ],
            )
            .await
    }
}
