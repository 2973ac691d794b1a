use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Suffix appended to a login to name the student's personal repository
pub const DEFAULT_STUDENT_REPO_SUFFIX: &str = "-labs";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoNameError {
    #[error("Login cannot be empty")]
    EmptyLogin,

    #[error("Invalid login '{0}': only letters, digits, '-', '_' and '.' are allowed")]
    InvalidLogin(String),

    #[error("Invalid repository suffix '{0}'")]
    InvalidSuffix(String),
}

fn login_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("valid login regex")
    })
}

/// Deterministic name of a student's personal repository
///
/// Derived from the login alone, so repeated provisioning of the same user
/// always targets the same repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StudentRepoName {
    login: String,
    name: String,
}

impl StudentRepoName {
    pub fn new(login: &str) -> Result<Self, RepoNameError> {
        Self::with_suffix(login, DEFAULT_STUDENT_REPO_SUFFIX)
    }

    pub fn with_suffix(login: &str, suffix: &str) -> Result<Self, RepoNameError> {
        let login = login.trim();
        if login.is_empty() {
            return Err(RepoNameError::EmptyLogin);
        }
        if !login_pattern().is_match(login) {
            return Err(RepoNameError::InvalidLogin(login.to_string()));
        }
        if suffix.chars().any(|c| !(c.is_ascii_alphanumeric() || "-_.".contains(c))) {
            return Err(RepoNameError::InvalidSuffix(suffix.to_string()));
        }

        Ok(Self {
            login: login.to_string(),
            name: format!("{}{}", login, suffix),
        })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Slug of the personal team granting the student access to the repository
    pub fn team_slug(&self) -> String {
        self.login.to_lowercase().replace(['.', '_'], "-")
    }
}

impl fmt::Display for StudentRepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
