use crate::domain::value_objects::repo_name::{StudentRepoName, DEFAULT_STUDENT_REPO_SUFFIX};
use crate::infrastructure::filesystem::config_store::RepositorySettings;
use crate::infrastructure::scm::{
    CreateRepositoryOptions, CreateTeamOptions, Organization, ScmContext, ScmError, ScmProvider,
    ScmRepository, Team, TeamMembershipOptions,
};
use tracing::{debug, warn};

/// Result of provisioning a student
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub repository: ScmRepository,
    pub team: Team,
}

/// Creates a student's personal repository and the single-member team that owns it
///
/// Callers are expected to have checked that no repository is recorded for
/// the student yet. Either both resources are returned or an error is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioner {
    suffix: String,
    private: bool,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_STUDENT_REPO_SUFFIX.to_string(),
            private: true,
        }
    }
}

impl From<&RepositorySettings> for Provisioner {
    fn from(settings: &RepositorySettings) -> Self {
        Self {
            suffix: settings.suffix.clone(),
            private: settings.private,
        }
    }
}

impl Provisioner {
    pub fn new(suffix: impl Into<String>, private: bool) -> Self {
        Self {
            suffix: suffix.into(),
            private,
        }
    }

    /// Repository name for `login`
    pub fn repo_name(&self, login: &str) -> Result<StudentRepoName, ScmError> {
        StudentRepoName::with_suffix(login, &self.suffix)
            .map_err(|e| ScmError::invalid_request(e.to_string()))
    }

    pub async fn provision(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        org: &Organization,
        login: &str,
    ) -> Result<Provisioned, ScmError> {
        let name = self.repo_name(login)?;
        let repository = self.ensure_repository(ctx, scm, org, &name).await?;
        let team = self.ensure_team(ctx, scm, org, &name).await?;

        debug!(
            org = %org.path,
            repository = %repository.name,
            team = %team.slug,
            "student provisioned"
        );
        Ok(Provisioned { repository, team })
    }

    async fn ensure_repository(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        org: &Organization,
        name: &StudentRepoName,
    ) -> Result<ScmRepository, ScmError> {
        let opts = CreateRepositoryOptions {
            organization: org.clone(),
            name: name.to_string(),
            private: self.private,
            description: Some(format!("Lab assignments for {}", name.login())),
        };

        match scm.create_repository(ctx, &opts).await {
            Ok(repository) => Ok(repository),
            Err(e) if e.is_conflict() => {
                warn!(org = %org.path, repository = %name, "repository already exists, reusing it");
                scm.get_repository(ctx, org, name.as_str()).await
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_team(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        org: &Organization,
        name: &StudentRepoName,
    ) -> Result<Team, ScmError> {
        let slug = name.team_slug();
        let opts = CreateTeamOptions {
            organization: org.clone(),
            name: slug.clone(),
            users: vec![name.login().to_string()],
            repositories: vec![name.to_string()],
        };

        match scm.create_team(ctx, &opts).await {
            Ok(team) => Ok(team),
            Err(e) if e.is_conflict() => {
                warn!(org = %org.path, team = %slug, "team already exists, reusing it");
                let team = scm.get_team(ctx, org, &slug).await?;
                // A previous attempt may have failed between creating the team and linking it
                scm.grant_team_repository(ctx, org, &team, name.as_str())
                    .await?;
                let membership =
                    TeamMembershipOptions::new(org.clone(), team.slug.clone(), name.login());
                scm.add_team_member(ctx, &membership).await?;
                Ok(team)
            }
            Err(e) => Err(e),
        }
    }
}
