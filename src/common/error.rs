use std::fmt;
use thiserror::Error;

use crate::application::use_cases::course_management::CourseError;
use crate::application::use_cases::update_enrollment::SyncError;
use crate::infrastructure::filesystem::config_store::ConfigStoreError;
use crate::infrastructure::scm::ScmError;
use crate::infrastructure::store::StoreError;

/// Provider-independent classification shared by every error in the crate.
///
/// Callers branch on the kind, never on a provider's native error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Organization, team, course, user, repository or enrollment does not exist
    NotFound,
    /// Attempted duplicate creation
    Conflict,
    /// Network failure, timeout or rate limit; the whole call may be retried
    Transient,
    /// Unrecognized or unsupported target status
    InvalidTransition,
    /// The caller cancelled the operation
    Cancelled,
    /// Credentials were rejected by the provider
    Unauthorized,
    /// The provider cannot perform the requested operation
    Unsupported,
    /// Anything else: malformed responses, local I/O, bad configuration
    Internal,
}

impl ErrorKind {
    /// Whether retrying the same call may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transient => "transient",
            ErrorKind::InvalidTransition => "invalid transition",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

/// Top-level error for library consumers that do not care which layer failed
#[derive(Error, Debug)]
pub enum EnrollSyncError {
    #[error(transparent)]
    Scm(#[from] ScmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Course(#[from] CourseError),

    #[error(transparent)]
    Config(#[from] ConfigStoreError),
}

impl EnrollSyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Scm(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Sync(e) => e.kind(),
            Self::Course(e) => e.kind(),
            Self::Config(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
