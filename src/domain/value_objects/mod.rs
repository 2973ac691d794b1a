pub mod enrollment_status;
pub mod repo_name;
pub mod scm_type;

pub use enrollment_status::{EnrollmentStatus, EnrollmentStatusError};
pub use repo_name::{RepoNameError, StudentRepoName};
pub use scm_type::ScmType;
