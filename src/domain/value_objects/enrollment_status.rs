use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status of a user's enrollment in a course
///
/// The numeric values match the wire encoding used by the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// No enrollment; never a valid transition target
    None,
    Rejected,
    Pending,
    Student,
    Teacher,
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        Self::None
    }
}

impl EnrollmentStatus {
    /// All statuses a transition may target
    pub const TARGETS: [EnrollmentStatus; 4] = [
        EnrollmentStatus::Pending,
        EnrollmentStatus::Rejected,
        EnrollmentStatus::Student,
        EnrollmentStatus::Teacher,
    ];

    pub fn code(&self) -> i32 {
        match self {
            EnrollmentStatus::None => 0,
            EnrollmentStatus::Rejected => 1,
            EnrollmentStatus::Pending => 2,
            EnrollmentStatus::Student => 3,
            EnrollmentStatus::Teacher => 4,
        }
    }

    /// Whether the enrollment grants course access (student or teacher)
    pub fn is_enrolled(&self) -> bool {
        matches!(self, EnrollmentStatus::Student | EnrollmentStatus::Teacher)
    }
}

impl TryFrom<i32> for EnrollmentStatus {
    type Error = EnrollmentStatusError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EnrollmentStatus::None),
            1 => Ok(EnrollmentStatus::Rejected),
            2 => Ok(EnrollmentStatus::Pending),
            3 => Ok(EnrollmentStatus::Student),
            4 => Ok(EnrollmentStatus::Teacher),
            other => Err(EnrollmentStatusError::UnknownCode(other)),
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrollmentStatus::None => "none",
            EnrollmentStatus::Rejected => "rejected",
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Student => "student",
            EnrollmentStatus::Teacher => "teacher",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for EnrollmentStatus {
    type Err = EnrollmentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(EnrollmentStatus::None),
            "rejected" => Ok(EnrollmentStatus::Rejected),
            "pending" => Ok(EnrollmentStatus::Pending),
            "student" => Ok(EnrollmentStatus::Student),
            "teacher" => Ok(EnrollmentStatus::Teacher),
            _ => Err(EnrollmentStatusError::UnknownName(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentStatusError {
    #[error("Unknown enrollment status code: {0}")]
    UnknownCode(i32),

    #[error("Unknown enrollment status: '{0}'")]
    UnknownName(String),
}
