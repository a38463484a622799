pub mod domain;
pub mod ports;
pub mod roles;
pub mod storage_keys;
pub mod validation;

pub use domain::{
    Announcement, ApplicationStatus, AuthEvent, BlogDraft, BlogPost, Mentor, MentorApplication,
    MentorNote, MentorStudentLink, NewAnnouncement, NewMentorNote, NewProfile, NewStudentResume,
    OAuthProvider, Profile, ProfileUpdate, Session, SignUpResult, SignupMetadata, StudentResume,
    User,
};
pub use ports::{
    AuthEventStream, AuthProvider, ClientStorage, DatabaseService, Navigator, ObjectStorage,
    PortError, PortResult, RoleDirectory, SignOutScope, StorageArea,
};
pub use roles::{is_profile_complete, Role, RoleFlags};
pub use storage_keys::{looks_like_auth_key, KeyRegistry, StorageKey};
pub use validation::ValidationError;
