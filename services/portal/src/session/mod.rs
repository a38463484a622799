pub mod bootstrap;
pub mod credentials;
pub mod guards;
pub mod resolver;
pub mod sign_out;
pub mod state;

// Re-export the session service and its snapshot for the binary and the
// feature services.
pub use bootstrap::AuthSubscription;
pub use credentials::SignUpRequest;
pub use guards::{decide, Guard, GuardDecision, GuardKind, Route};
pub use sign_out::SignOutReport;
pub use state::{SessionPorts, SessionService, SessionSettings, SessionSnapshot};
