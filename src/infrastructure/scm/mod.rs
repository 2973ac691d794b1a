/// Hosted SCM providers
///
/// This module provides a unified capability contract over the GitHub and
/// GitLab REST APIs, plus the cancellation/deadline context every call runs under.

pub mod context;
pub mod github_scm;
pub mod gitlab_scm;
pub(crate) mod http;
pub mod scm_factory;
pub mod scm_interface;

pub use context::ScmContext;
pub use scm_factory::ScmFactory;
pub use scm_interface::{
    CreateDirectoryOptions, CreateRepositoryOptions, CreateTeamOptions, Directory, OrgMembership,
    OrgRole, Organization, ScmError, ScmProvider, ScmRepository, Team, TeamMembershipOptions,
    TeamRole,
};
