/// Infrastructure layer modules
///
/// This layer provides concrete implementations for external system interactions:
/// - SCM providers (GitHub, GitLab) behind one capability trait
/// - Enrollment stores (in-memory, YAML file)
/// - Configuration files
pub mod filesystem;
pub mod scm;
pub mod store;

// Re-export commonly used types
pub use filesystem::config_store::{AppConfig, ConfigStore};
pub use scm::{ScmContext, ScmError, ScmFactory, ScmProvider};
pub use store::{EnrollmentStore, FileStore, MemoryStore, StoreError};
