pub mod auth;
pub mod db;
pub mod local_store;
pub mod navigator;
pub mod storage;
pub mod supabase;

pub use auth::SupabaseAuthAdapter;
pub use db::SupabaseDbAdapter;
pub use local_store::LocalStore;
pub use navigator::TracingNavigator;
pub use storage::SupabaseStorageAdapter;
pub use supabase::SupabaseClient;
