//! Feature services built on top of the session. Each checks the current
//! principal's role before touching the backend.

pub mod admin;
pub mod announcements;
pub mod blogs;
pub mod mentorship;
pub mod onboarding;
pub mod resumes;

pub use admin::AdminService;
pub use announcements::AnnouncementService;
pub use blogs::{BlogService, BLOG_IMAGES_BUCKET};
pub use mentorship::MentorshipService;
pub use onboarding::{OnboardingService, OnboardingSurvey};
pub use resumes::{ResumeService, RESUME_BUCKET};
