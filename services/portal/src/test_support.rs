//! services/portal/src/test_support.rs
//!
//! In-memory fakes for every port plus a harness that wires them into a
//! `SessionService`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use mentorship_core::ports::{
    AuthEventStream, AuthProvider, ClientStorage, DatabaseService, ObjectStorage, PortError,
    PortResult, RoleDirectory, SignOutScope, StorageArea,
};
use mentorship_core::validation::slugify;
use mentorship_core::{
    Announcement, ApplicationStatus, AuthEvent, BlogDraft, BlogPost, KeyRegistry, Mentor,
    MentorApplication, MentorNote, MentorStudentLink, NewAnnouncement, NewMentorNote, NewProfile,
    NewStudentResume, OAuthProvider, Profile, ProfileUpdate, Session, SignUpResult,
    SignupMetadata, StudentResume, User,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::adapters::{LocalStore, TracingNavigator};
use crate::session::{SessionPorts, SessionService, SessionSettings};

pub const ADMIN_EMAIL: &str = "admin@example.org";
pub const MENTOR_EMAIL: &str = "mentor@example.org";

//=========================================================================================
// Principals
//=========================================================================================

fn user(id: u128, email: &str, first: &str, last: &str) -> User {
    User {
        id: Uuid::from_u128(id),
        email: Some(email.to_string()),
        metadata: SignupMetadata {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
        },
    }
}

pub fn student_user() -> User {
    user(0x5701, "student@example.org", "Ada", "Lovelace")
}

pub fn mentor_user() -> User {
    user(0x3e01, MENTOR_EMAIL, "Grace", "Hopper")
}

pub fn admin_user() -> User {
    user(0xad01, ADMIN_EMAIL, "Barbara", "Liskov")
}

pub fn session_for(user: User) -> Session {
    Session {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        expires_at: Utc::now() + ChronoDuration::hours(1),
        user,
    }
}

pub fn student_session() -> Session {
    session_for(student_user())
}

//=========================================================================================
// FakeAuth
//=========================================================================================

#[derive(Default)]
struct AuthState {
    session: Option<Session>,
    hang_get_session: bool,
    get_session_error: Option<PortError>,
    sign_in_error: Option<PortError>,
    sign_out_failures: u32,
    sign_out_error: Option<PortError>,
    sign_up_calls: usize,
    sign_out_calls: usize,
    local_sign_outs: usize,
}

pub struct FakeAuth {
    state: Mutex<AuthState>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for FakeAuth {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(AuthState::default()),
            events,
        }
    }
}

impl FakeAuth {
    fn with_state<T>(&self, f: impl FnOnce(&mut AuthState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.with_state(|s| s.session = session);
    }

    pub fn hang_get_session(&self) {
        self.with_state(|s| s.hang_get_session = true);
    }

    pub fn fail_get_session(&self, error: PortError) {
        self.with_state(|s| s.get_session_error = Some(error));
    }

    pub fn fail_sign_in(&self, error: PortError) {
        self.with_state(|s| s.sign_in_error = Some(error));
    }

    pub fn fail_sign_out_times(&self, times: u32, error: PortError) {
        self.with_state(|s| {
            s.sign_out_failures = times;
            s.sign_out_error = Some(error);
        });
    }

    pub fn sign_up_calls(&self) -> usize {
        self.with_state(|s| s.sign_up_calls)
    }

    /// Global sign-out calls.
    pub fn sign_out_calls(&self) -> usize {
        self.with_state(|s| s.sign_out_calls)
    }

    pub fn local_sign_outs(&self) -> usize {
        self.with_state(|s| s.local_sign_outs)
    }

    fn start_session(&self, user: User) -> Session {
        let session = session_for(user);
        self.set_session(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));
        session
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn get_session(&self) -> PortResult<Option<Session>> {
        let (hang, result) = self.with_state(|s| {
            let result = match &s.get_session_error {
                Some(e) => Err(e.clone()),
                None => Ok(s.session.clone()),
            };
            (s.hang_get_session, result)
        });
        if hang {
            futures::future::pending::<()>().await;
        }
        result
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> PortResult<Session> {
        if let Some(e) = self.with_state(|s| s.sign_in_error.clone()) {
            return Err(e);
        }
        let mut user = student_user();
        user.email = Some(email.to_string());
        Ok(self.start_session(user))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: &SignupMetadata,
    ) -> PortResult<SignUpResult> {
        self.with_state(|s| s.sign_up_calls += 1);
        Ok(SignUpResult {
            user: User {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
                metadata: metadata.clone(),
            },
            session: None,
        })
    }

    fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> PortResult<String> {
        Ok(format!(
            "https://auth.test/authorize?provider={}&redirect_to={}",
            provider.as_str(),
            redirect_to
        ))
    }

    async fn complete_oauth(&self, _callback_url: &str) -> PortResult<Session> {
        Ok(self.start_session(student_user()))
    }

    async fn sign_out(&self, scope: SignOutScope) -> PortResult<()> {
        let failure = self.with_state(|s| {
            if scope == SignOutScope::Local {
                s.local_sign_outs += 1;
                s.session = None;
                return None;
            }
            s.sign_out_calls += 1;
            if s.sign_out_failures > 0 {
                s.sign_out_failures -= 1;
                s.sign_out_error.clone()
            } else {
                s.session = None;
                None
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn events(&self) -> AuthEventStream {
        let mut rx = self.events.subscribe();
        Box::pin(async_stream::stream! {
            while let Ok(event) = rx.recv().await {
                yield event;
            }
        })
    }
}

//=========================================================================================
// FakeRoles
//=========================================================================================

#[derive(Default)]
pub struct FakeRoles {
    admins: Vec<String>,
    mentors: Vec<String>,
    failing: bool,
    mentor_lookups: AtomicUsize,
}

impl FakeRoles {
    pub fn with_admin(mut self, email: &str) -> Self {
        self.admins.push(email.to_string());
        self
    }

    pub fn with_mentor(mut self, email: &str) -> Self {
        self.mentors.push(email.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn mentor_lookups(&self) -> usize {
        self.mentor_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleDirectory for FakeRoles {
    async fn is_admin(&self, email: &str) -> PortResult<bool> {
        if self.failing {
            return Err(PortError::Unexpected("role lookup offline".into()));
        }
        Ok(self.admins.iter().any(|a| a == email))
    }

    async fn is_approved_mentor(&self, email: &str) -> PortResult<bool> {
        self.mentor_lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(PortError::Unexpected("role lookup offline".into()));
        }
        Ok(self.mentors.iter().any(|m| m == email))
    }
}

//=========================================================================================
// FakeDb
//=========================================================================================

#[derive(Default)]
struct DbState {
    profiles: HashMap<Uuid, Profile>,
    applications: Vec<MentorApplication>,
    mentors: Vec<Mentor>,
    links: Vec<MentorStudentLink>,
    notes: Vec<MentorNote>,
    /// Newest first.
    announcements: Vec<Announcement>,
    blogs: Vec<BlogPost>,
    resumes: Vec<StudentResume>,
}

#[derive(Default)]
pub struct FakeDb {
    state: Mutex<DbState>,
}

impl FakeDb {
    fn with_state<T>(&self, f: impl FnOnce(&mut DbState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.with_state(|s| s.profiles.get(&id).cloned())
    }

    pub fn add_profile(&self, profile: Profile) {
        self.with_state(|s| s.profiles.insert(profile.id, profile));
    }

    pub fn add_application(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.with_state(|s| {
            s.applications.push(MentorApplication {
                id,
                email: email.to_string(),
                first_name: None,
                last_name: None,
                status: ApplicationStatus::Pending,
                created_at: Some(Utc::now()),
            })
        });
        id
    }

    pub fn add_mentor(&self, user: &User) {
        self.with_state(|s| {
            s.mentors.push(Mentor {
                id: user.id,
                email: user.email.clone().unwrap_or_default(),
                first_name: user.metadata.first_name.clone(),
                last_name: user.metadata.last_name.clone(),
                expertise: vec![],
            })
        });
    }

    pub fn resume_count(&self) -> usize {
        self.with_state(|s| s.resumes.len())
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{} {}", what, id))
}

#[async_trait]
impl DatabaseService for FakeDb {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        self.profile(user_id).ok_or_else(|| not_found("profile", user_id))
    }

    async fn insert_profile(&self, row: &NewProfile) -> PortResult<()> {
        self.with_state(|s| {
            if s.profiles.contains_key(&row.id) {
                return Err(PortError::Conflict(format!("profile {}", row.id)));
            }
            s.profiles.insert(
                row.id,
                Profile {
                    id: row.id,
                    email: row.email.clone(),
                    first_name: row.first_name.clone(),
                    last_name: row.last_name.clone(),
                    is_admin: row.is_admin,
                    ..Default::default()
                },
            );
            Ok(())
        })
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<Profile> {
        self.with_state(|s| {
            let profile = s
                .profiles
                .get_mut(&user_id)
                .ok_or_else(|| not_found("profile", user_id))?;
            update.apply_to(profile);
            Ok(profile.clone())
        })
    }

    async fn list_mentor_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> PortResult<Vec<MentorApplication>> {
        Ok(self.with_state(|s| {
            s.applications
                .iter()
                .filter(|a| status.map_or(true, |st| a.status == st))
                .cloned()
                .collect()
        }))
    }

    async fn set_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> PortResult<MentorApplication> {
        self.with_state(|s| {
            let application = s
                .applications
                .iter_mut()
                .find(|a| a.id == application_id)
                .ok_or_else(|| not_found("application", application_id))?;
            application.status = status;
            Ok(application.clone())
        })
    }

    async fn list_mentors(&self) -> PortResult<Vec<Mentor>> {
        Ok(self.with_state(|s| s.mentors.clone()))
    }

    async fn list_students_for_mentor(&self, mentor_id: Uuid) -> PortResult<Vec<Profile>> {
        Ok(self.with_state(|s| {
            s.links
                .iter()
                .filter(|l| l.mentor_id == mentor_id)
                .filter_map(|l| s.profiles.get(&l.student_id).cloned())
                .collect()
        }))
    }

    async fn assign_mentor(&self, link: MentorStudentLink) -> PortResult<()> {
        self.with_state(|s| {
            if s.links.contains(&link) {
                return Err(PortError::Conflict("link exists".into()));
            }
            s.links.push(link);
            Ok(())
        })
    }

    async fn list_notes(&self, mentor_id: Uuid, student_id: Uuid) -> PortResult<Vec<MentorNote>> {
        Ok(self.with_state(|s| {
            s.notes
                .iter()
                .filter(|n| n.mentor_id == mentor_id && n.student_id == student_id)
                .cloned()
                .collect()
        }))
    }

    async fn create_note(&self, note: &NewMentorNote) -> PortResult<MentorNote> {
        let created = MentorNote {
            id: Uuid::new_v4(),
            mentor_id: note.mentor_id,
            student_id: note.student_id,
            content: note.content.clone(),
            created_at: Utc::now(),
        };
        self.with_state(|s| s.notes.push(created.clone()));
        Ok(created)
    }

    async fn update_note(&self, note_id: Uuid, content: &str) -> PortResult<MentorNote> {
        self.with_state(|s| {
            let note = s
                .notes
                .iter_mut()
                .find(|n| n.id == note_id)
                .ok_or_else(|| not_found("note", note_id))?;
            note.content = content.to_string();
            Ok(note.clone())
        })
    }

    async fn delete_note(&self, note_id: Uuid) -> PortResult<()> {
        self.with_state(|s| s.notes.retain(|n| n.id != note_id));
        Ok(())
    }

    async fn list_announcements(&self) -> PortResult<Vec<Announcement>> {
        Ok(self.with_state(|s| s.announcements.clone()))
    }

    async fn create_announcement(&self, announcement: &NewAnnouncement) -> PortResult<Announcement> {
        let created = Announcement {
            id: Uuid::new_v4(),
            title: announcement.title.clone(),
            body: announcement.body.clone(),
            created_at: Utc::now(),
        };
        self.with_state(|s| s.announcements.insert(0, created.clone()));
        Ok(created)
    }

    async fn delete_announcement(&self, announcement_id: Uuid) -> PortResult<()> {
        self.with_state(|s| s.announcements.retain(|a| a.id != announcement_id));
        Ok(())
    }

    async fn list_blogs(&self, published_only: bool) -> PortResult<Vec<BlogPost>> {
        Ok(self.with_state(|s| {
            s.blogs
                .iter()
                .filter(|b| !published_only || b.published)
                .cloned()
                .collect()
        }))
    }

    async fn get_blog_by_slug(&self, slug: &str) -> PortResult<BlogPost> {
        self.with_state(|s| s.blogs.iter().find(|b| b.slug == slug).cloned())
            .ok_or_else(|| not_found("blog", slug))
    }

    async fn create_blog(&self, author_id: Uuid, draft: &BlogDraft) -> PortResult<BlogPost> {
        let slug = draft.slug.clone().unwrap_or_else(|| slugify(&draft.title));
        self.with_state(|s| {
            if s.blogs.iter().any(|b| b.slug == slug) {
                return Err(PortError::Conflict(format!("slug {}", slug)));
            }
            let post = BlogPost {
                id: Uuid::new_v4(),
                title: draft.title.clone(),
                slug,
                content: draft.content.clone(),
                cover_image_url: draft.cover_image_url.clone(),
                author_id: Some(author_id),
                published: draft.published,
                created_at: Utc::now(),
            };
            s.blogs.push(post.clone());
            Ok(post)
        })
    }

    async fn update_blog(&self, blog_id: Uuid, draft: &BlogDraft) -> PortResult<BlogPost> {
        self.with_state(|s| {
            let post = s
                .blogs
                .iter_mut()
                .find(|b| b.id == blog_id)
                .ok_or_else(|| not_found("blog", blog_id))?;
            post.title = draft.title.clone();
            post.slug = draft.slug.clone().unwrap_or_else(|| slugify(&draft.title));
            post.content = draft.content.clone();
            post.cover_image_url = draft.cover_image_url.clone();
            post.published = draft.published;
            Ok(post.clone())
        })
    }

    async fn delete_blog(&self, blog_id: Uuid) -> PortResult<()> {
        self.with_state(|s| s.blogs.retain(|b| b.id != blog_id));
        Ok(())
    }

    async fn list_resumes(&self, student_id: Uuid) -> PortResult<Vec<StudentResume>> {
        Ok(self.with_state(|s| {
            s.resumes
                .iter()
                .filter(|r| r.student_id == student_id)
                .cloned()
                .collect()
        }))
    }

    async fn get_resume(&self, resume_id: Uuid) -> PortResult<StudentResume> {
        self.with_state(|s| s.resumes.iter().find(|r| r.id == resume_id).cloned())
            .ok_or_else(|| not_found("resume", resume_id))
    }

    async fn create_resume(&self, resume: &NewStudentResume) -> PortResult<StudentResume> {
        let created = StudentResume {
            id: Uuid::new_v4(),
            student_id: resume.student_id,
            file_name: resume.file_name.clone(),
            file_path: resume.file_path.clone(),
            public_url: resume.public_url.clone(),
            uploaded_at: Utc::now(),
        };
        self.with_state(|s| s.resumes.push(created.clone()));
        Ok(created)
    }

    async fn delete_resume(&self, resume_id: Uuid) -> PortResult<()> {
        self.with_state(|s| s.resumes.retain(|r| r.id != resume_id));
        Ok(())
    }
}

//=========================================================================================
// FakeObjects
//=========================================================================================

#[derive(Default)]
pub struct FakeObjects {
    objects: Mutex<HashMap<(String, String), (String, Bytes)>>,
}

impl FakeObjects {
    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), path.to_string()))
    }

    pub fn paths(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), path.to_string()))
            .map(|(ct, _)| ct.clone())
    }
}

#[async_trait]
impl ObjectStorage for FakeObjects {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> PortResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let key = (bucket.to_string(), path.to_string());
        if objects.contains_key(&key) {
            return Err(PortError::Conflict(format!("{}/{}", bucket, path)));
        }
        objects.insert(key, (content_type.to_string(), body));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://objects.test/public/{}/{}", bucket, path)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> PortResult<()> {
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }
}

//=========================================================================================
// FakeStorage
//=========================================================================================

/// A `LocalStore` whose next volatile clear can be made to fail.
#[derive(Default)]
pub struct FakeStorage {
    inner: LocalStore,
    fail_next_clear: AtomicBool,
}

impl FakeStorage {
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.inner.set_cookie(name, value).unwrap();
    }

    pub fn fail_next_clear(&self) {
        self.fail_next_clear.store(true, Ordering::SeqCst);
    }
}

impl ClientStorage for FakeStorage {
    fn get(&self, area: StorageArea, key: &str) -> Option<String> {
        self.inner.get(area, key)
    }

    fn set(&self, area: StorageArea, key: &str, value: &str) -> PortResult<()> {
        self.inner.set(area, key, value)
    }

    fn remove(&self, area: StorageArea, key: &str) -> PortResult<()> {
        self.inner.remove(area, key)
    }

    fn keys(&self, area: StorageArea) -> Vec<String> {
        self.inner.keys(area)
    }

    fn clear(&self, area: StorageArea) -> PortResult<()> {
        if self.fail_next_clear.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unexpected("storage quota exceeded".into()));
        }
        self.inner.clear(area)
    }

    fn cookie_names(&self) -> Vec<String> {
        self.inner.cookie_names()
    }

    fn expire_cookie(&self, name: &str) -> PortResult<()> {
        self.inner.expire_cookie(name)
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub service: Arc<SessionService>,
    pub auth: Arc<FakeAuth>,
    pub db: Arc<FakeDb>,
    pub roles: Arc<FakeRoles>,
    pub storage: Arc<FakeStorage>,
    pub navigator: Arc<TracingNavigator>,
    pub objects: Arc<FakeObjects>,
}

impl Harness {
    /// Knows `ADMIN_EMAIL` as admin and `MENTOR_EMAIL` as an approved mentor.
    pub fn new() -> Self {
        let auth = Arc::new(FakeAuth::default());
        let db = Arc::new(FakeDb::default());
        let roles = Arc::new(
            FakeRoles::default()
                .with_admin(ADMIN_EMAIL)
                .with_mentor(MENTOR_EMAIL),
        );
        let storage = Arc::new(FakeStorage::default());
        let navigator = Arc::new(TracingNavigator::new());
        let objects = Arc::new(FakeObjects::default());

        let ports = SessionPorts {
            auth: auth.clone(),
            db: db.clone(),
            roles: roles.clone(),
            storage: storage.clone(),
            navigator: navigator.clone(),
            keys: KeyRegistry::new("test"),
        };
        let service = SessionService::new(ports, SessionSettings::default());

        Self {
            service,
            auth,
            db,
            roles,
            storage,
            navigator,
            objects,
        }
    }

    pub async fn sign_in_as(&self, user: User) {
        self.service
            .apply_event(AuthEvent::SignedIn(session_for(user)))
            .await;
    }

    pub async fn sign_in_as_student(&self) {
        self.sign_in_as(student_user()).await;
    }
}

//=========================================================================================
// StubServer
//=========================================================================================

/// One request as seen on the wire by [`StubServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    /// Lowercased names.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Decoded query parameter.
    pub fn param(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// A loopback HTTP/1.1 server answering queued responses in order and
/// recording every request. Unqueued requests get `200 []`.
pub struct StubServer {
    base: url::Url,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<std::collections::VecDeque<(u16, String)>>>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(std::collections::VecDeque::new()));

        let (recorded, queued) = (requests.clone(), responses.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (recorded, queued) = (recorded.clone(), queued.clone());
                tokio::spawn(async move {
                    let _ = serve_one(stream, recorded, queued).await;
                });
            }
        });

        Self {
            base: format!("http://{}", addr).parse().unwrap(),
            requests,
            responses,
        }
    }

    pub fn url(&self) -> url::Url {
        self.base.clone()
    }

    pub fn respond(&self, status: u16, body: serde_json::Value) {
        self.respond_raw(status, &body.to_string());
    }

    pub fn respond_raw(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back((status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().unwrap()
    }
}

async fn serve_one(
    mut stream: tokio::net::TcpStream,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    queued: Arc<Mutex<std::collections::VecDeque<(u16, String)>>>,
) -> std::io::Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default();
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    recorded.lock().unwrap().push(RecordedRequest {
        method,
        path: path.to_string(),
        query: query.to_string(),
        headers,
        body,
    });

    let (status, payload) = queued
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, "[]".to_string()));
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
