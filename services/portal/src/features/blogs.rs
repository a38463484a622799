//! services/portal/src/features/blogs.rs
//!
//! The public blog and its admin editor, including cover image uploads.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use mentorship_core::ports::ObjectStorage;
use mentorship_core::validation::{self, ValidationError};
use mentorship_core::{BlogDraft, BlogPost, Role};
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::SessionService;

pub const BLOG_IMAGES_BUCKET: &str = "blog-images";

pub struct BlogService {
    session: Arc<SessionService>,
    objects: Arc<dyn ObjectStorage>,
}

impl BlogService {
    pub fn new(session: Arc<SessionService>, objects: Arc<dyn ObjectStorage>) -> Self {
        Self { session, objects }
    }

    /// Published posts; readable without signing in.
    pub async fn published(&self) -> Result<Vec<BlogPost>, AuthError> {
        Ok(self.session.ports().db.list_blogs(true).await?)
    }

    /// Drafts included.
    pub async fn all(&self) -> Result<Vec<BlogPost>, AuthError> {
        self.session.require_role(&[Role::Admin])?;
        Ok(self.session.ports().db.list_blogs(false).await?)
    }

    /// Drafts are only visible to admins.
    pub async fn by_slug(&self, slug: &str) -> Result<BlogPost, AuthError> {
        let post = self.session.ports().db.get_blog_by_slug(slug).await?;
        if !post.published && self.session.require_role(&[Role::Admin]).is_err() {
            return Err(AuthError::Forbidden);
        }
        Ok(post)
    }

    pub async fn create(&self, draft: &BlogDraft) -> Result<BlogPost, AuthError> {
        let (author, _) = self.session.require_role(&[Role::Admin])?;
        let draft = normalize(draft)?;
        let post = self.session.ports().db.create_blog(author.id, &draft).await?;
        info!("Created blog post '{}'", post.slug);
        Ok(post)
    }

    pub async fn update(&self, blog_id: Uuid, draft: &BlogDraft) -> Result<BlogPost, AuthError> {
        self.session.require_role(&[Role::Admin])?;
        let draft = normalize(draft)?;
        Ok(self.session.ports().db.update_blog(blog_id, &draft).await?)
    }

    pub async fn delete(&self, blog_id: Uuid) -> Result<(), AuthError> {
        self.session.require_role(&[Role::Admin])?;
        Ok(self.session.ports().db.delete_blog(blog_id).await?)
    }

    /// Stores a cover image and returns the URL to put in the draft.
    pub async fn upload_cover(&self, file_name: &str, body: Bytes) -> Result<String, AuthError> {
        self.session.require_role(&[Role::Admin])?;
        let content_type = validation::validate_image_file(file_name)?;
        let path = format!("covers/{}-{}", Utc::now().timestamp_millis(), file_name);
        self.objects
            .upload(BLOG_IMAGES_BUCKET, &path, content_type, body)
            .await?;
        Ok(self.objects.public_url(BLOG_IMAGES_BUCKET, &path))
    }
}

/// Trims the title and fills the slug from it when absent.
fn normalize(draft: &BlogDraft) -> Result<BlogDraft, ValidationError> {
    validation::require("Title", Some(&draft.title))?;
    let title = draft.title.trim().to_string();
    let slug = match draft.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => validation::slugify(slug),
        _ => validation::slugify(&title),
    };
    if slug.is_empty() {
        return Err(ValidationError::MissingField("Slug"));
    }
    Ok(BlogDraft {
        title,
        slug: Some(slug),
        ..draft.clone()
    })
}
