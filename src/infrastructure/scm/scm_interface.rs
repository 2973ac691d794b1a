use super::context::ScmContext;
use crate::common::error::ErrorKind;
use crate::domain::value_objects::scm_type::ScmType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability contract every hosted SCM provider must satisfy
///
/// Implementations translate their native responses into [`ScmError`] so
/// callers never see provider-specific error types.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScmProvider: Send + Sync {
    /// Provider this implementation talks to
    fn scm_type(&self) -> ScmType;

    /// Resolve an organization (GitHub org, GitLab group) by numeric id
    async fn get_organization(&self, ctx: &ScmContext, org_id: u64)
        -> Result<Organization, ScmError>;

    /// Add a user to a team. Succeeds if the user is already a member.
    async fn add_team_member(
        &self,
        ctx: &ScmContext,
        opts: &TeamMembershipOptions,
    ) -> Result<(), ScmError>;

    /// Remove a user from a team. Succeeds if the user is already absent.
    async fn remove_team_member(
        &self,
        ctx: &ScmContext,
        opts: &TeamMembershipOptions,
    ) -> Result<(), ScmError>;

    /// Set the user's organization-level role
    async fn update_org_membership(
        &self,
        ctx: &ScmContext,
        opts: &OrgMembership,
    ) -> Result<(), ScmError>;

    async fn create_repository(
        &self,
        ctx: &ScmContext,
        opts: &CreateRepositoryOptions,
    ) -> Result<ScmRepository, ScmError>;

    async fn get_repository(
        &self,
        ctx: &ScmContext,
        org: &Organization,
        name: &str,
    ) -> Result<ScmRepository, ScmError>;

    /// Create a team with the given members and repository access
    async fn create_team(&self, ctx: &ScmContext, opts: &CreateTeamOptions)
        -> Result<Team, ScmError>;

    async fn get_team(&self, ctx: &ScmContext, org: &Organization, slug: &str)
        -> Result<Team, ScmError>;

    /// Give a team write access to a repository. Succeeds if it already has it.
    async fn grant_team_repository(
        &self,
        ctx: &ScmContext,
        org: &Organization,
        team: &Team,
        repo: &str,
    ) -> Result<(), ScmError>;

    /// Directories visible to the authenticated account
    async fn list_directories(&self, ctx: &ScmContext) -> Result<Vec<Directory>, ScmError>;

    async fn create_directory(
        &self,
        ctx: &ScmContext,
        opts: &CreateDirectoryOptions,
    ) -> Result<Directory, ScmError>;

    async fn get_directory(&self, ctx: &ScmContext, id: u64) -> Result<Directory, ScmError>;
}

/// Organization as seen by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: u64,
    /// URL path of the organization (GitHub login, GitLab full path)
    pub path: String,
    pub name: String,
}

/// Grouping entity scoping a course's repositories and teams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub id: u64,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmRepository {
    pub id: u64,
    pub name: String,
    /// Path of the owning organization
    pub owner: String,
    pub html_url: String,
    #[serde(default)]
    pub clone_url: String,
}

/// Role inside a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TeamRole {
    #[default]
    Member,
    Maintainer,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Member => "member",
            TeamRole::Maintainer => "maintainer",
        }
    }
}

/// Role inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrgRole {
    #[default]
    Member,
    Admin,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Member => "member",
            OrgRole::Admin => "admin",
        }
    }
}

/// Options for team membership mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMembershipOptions {
    pub organization: Organization,
    pub team_slug: String,
    pub username: String,
    pub role: TeamRole,
}

impl TeamMembershipOptions {
    pub fn new(
        organization: Organization,
        team_slug: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            organization,
            team_slug: team_slug.into(),
            username: username.into(),
            role: TeamRole::Member,
        }
    }

    pub fn with_role(mut self, role: TeamRole) -> Self {
        self.role = role;
        self
    }
}

/// Options for organization role mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgMembership {
    pub organization: Organization,
    pub username: String,
    pub role: OrgRole,
}

/// Options for creating a repository inside an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRepositoryOptions {
    pub organization: Organization,
    pub name: String,
    pub private: bool,
    pub description: Option<String>,
}

/// Options for creating a team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTeamOptions {
    pub organization: Organization,
    pub name: String,
    /// Logins added as plain members
    pub users: Vec<String>,
    /// Repository names the team gets write access to
    pub repositories: Vec<String>,
}

/// Options for creating a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDirectoryOptions {
    pub name: String,
    pub path: String,
    pub public: bool,
}

/// Errors that can occur during SCM operations
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} already exists: {message}")]
    Conflict { resource: String, message: String },

    #[error("Transient provider failure: {message}")]
    Transient { message: String },

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Authentication failed for {scm_type}: {message}")]
    Unauthorized { scm_type: ScmType, message: String },

    #[error("Unsupported operation for {scm_type}: {operation}")]
    UnsupportedOperation { scm_type: ScmType, operation: String },

    #[error("Unexpected response ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ScmError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn unauthorized(scm_type: ScmType, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            scm_type,
            message: message.into(),
        }
    }

    pub fn unsupported_operation(scm_type: ScmType, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            scm_type,
            operation: operation.into(),
        }
    }

    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Shared taxonomy classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Transient { .. } | Self::DeadlineExceeded => ErrorKind::Transient,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::UnsupportedOperation { .. } => ErrorKind::Unsupported,
            Self::Provider { .. } | Self::InvalidResponse { .. } | Self::InvalidRequest { .. } => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ScmError::not_found("team students").kind(), ErrorKind::NotFound);
        assert_eq!(ScmError::conflict("repo", "exists").kind(), ErrorKind::Conflict);
        assert_eq!(ScmError::transient("503").kind(), ErrorKind::Transient);
        assert_eq!(ScmError::DeadlineExceeded.kind(), ErrorKind::Transient);
        assert_eq!(ScmError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            ScmError::unsupported_operation(ScmType::Github, "create_directory").kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(ScmError::provider(418, "teapot").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ScmError::not_found("organization 100").to_string(),
            "organization 100 not found"
        );
        assert_eq!(
            ScmError::unauthorized(ScmType::Gitlab, "bad token").to_string(),
            "Authentication failed for gitlab: bad token"
        );
    }

    #[test]
    fn test_membership_builder() {
        let org = Organization {
            id: 100,
            path: "dat320".to_string(),
            name: "DAT320".to_string(),
        };
        let opts = TeamMembershipOptions::new(org, "teachers", "alice")
            .with_role(TeamRole::Maintainer);
        assert_eq!(opts.role.as_str(), "maintainer");
        assert_eq!(OrgRole::Admin.as_str(), "admin");
    }
}
