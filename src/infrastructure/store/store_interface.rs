use crate::common::error::ErrorKind;
use crate::domain::entities::{Course, Enrollment, Repository, RepositoryQuery, User};
use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use async_trait::async_trait;
use thiserror::Error;

/// Durable record of enrollments, courses, users and repositories
///
/// Status filters given as an empty slice match every status.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Record a new PENDING enrollment; Conflict if the pair already exists
    async fn create_enrollment(&self, user_id: u64, course_id: u64)
        -> Result<Enrollment, StoreError>;

    async fn get_enrollment(&self, user_id: u64, course_id: u64)
        -> Result<Enrollment, StoreError>;

    async fn get_enrollments_by_course(
        &self,
        course_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Enrollment>, StoreError>;

    async fn set_pending(&self, user_id: u64, course_id: u64) -> Result<(), StoreError>;

    async fn reject_enrollment(&self, user_id: u64, course_id: u64) -> Result<(), StoreError>;

    async fn enroll_student(&self, user_id: u64, course_id: u64) -> Result<(), StoreError>;

    async fn enroll_teacher(&self, user_id: u64, course_id: u64) -> Result<(), StoreError>;

    async fn get_repositories(&self, query: &RepositoryQuery)
        -> Result<Vec<Repository>, StoreError>;

    /// Conflict if a USER repository already exists for the same (organization, user)
    async fn create_repository(&self, repository: &Repository) -> Result<(), StoreError>;

    async fn get_course(&self, course_id: u64) -> Result<Course, StoreError>;

    async fn get_courses(&self) -> Result<Vec<Course>, StoreError>;

    /// Courses in which the user holds one of `statuses`
    async fn get_courses_by_user(
        &self,
        user_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Course>, StoreError>;

    async fn update_course(&self, course: &Course) -> Result<(), StoreError>;

    async fn get_user(&self, user_id: u64) -> Result<User, StoreError>;
}

/// Errors that can occur in store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("{entity} already exists")]
    Conflict { entity: String },

    #[error("Persistence failure: {message}")]
    Persistence { message: String },
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        Self::Conflict {
            entity: entity.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Persistence { .. } => ErrorKind::Internal,
        }
    }
}

/// Turn a missing lookup result into [`StoreError::NotFound`]
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: impl FnOnce() -> String) -> Result<T, StoreError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: impl FnOnce() -> String) -> Result<T, StoreError> {
        self.ok_or_else(|| StoreError::not_found(entity()))
    }
}

pub(crate) fn enrollment_entity(user_id: u64, course_id: u64) -> String {
    format!("enrollment (user {}, course {})", user_id, course_id)
}
