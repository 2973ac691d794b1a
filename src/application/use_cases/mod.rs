/// Use cases driven by the CLI
pub mod course_management;
pub mod update_enrollment;

pub use course_management::{CourseError, CourseService};
pub use update_enrollment::{EnrollmentSynchronizer, SyncError};
