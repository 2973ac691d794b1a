use super::context::ScmContext;
use super::http::{build_client, check_status, endpoint, parse_base_url, read_json, transport_error};
use super::scm_interface::{
    CreateDirectoryOptions, CreateRepositoryOptions, CreateTeamOptions, Directory, OrgMembership,
    Organization, ScmError, ScmProvider, ScmRepository, Team, TeamMembershipOptions, TeamRole,
};
use crate::domain::value_objects::scm_type::ScmType;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct GhOrganization {
    id: u64,
    login: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhTeam {
    id: u64,
    slug: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhRepository {
    id: u64,
    name: String,
    owner: GhOwner,
    html_url: String,
    #[serde(default)]
    clone_url: String,
}

impl From<GhOrganization> for Organization {
    fn from(org: GhOrganization) -> Self {
        Self {
            id: org.id,
            name: org.name.unwrap_or_else(|| org.login.clone()),
            path: org.login,
        }
    }
}

impl From<GhOrganization> for Directory {
    fn from(org: GhOrganization) -> Self {
        Self {
            id: org.id,
            name: org.name.unwrap_or_else(|| org.login.clone()),
            path: org.login,
        }
    }
}

impl From<GhTeam> for Team {
    fn from(team: GhTeam) -> Self {
        Self {
            id: team.id,
            slug: team.slug,
            name: team.name,
        }
    }
}

impl From<GhRepository> for ScmRepository {
    fn from(repo: GhRepository) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            owner: repo.owner.login,
            html_url: repo.html_url,
            clone_url: repo.clone_url,
        }
    }
}

/// GitHub implementation of the SCM capability contract
///
/// Directories are organizations; teams are organization teams.
pub struct GithubScm {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl GithubScm {
    /// Create a client for a GitHub Enterprise instance (or a test server)
    pub fn with_base_url(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ScmError> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: parse_base_url(base_url)?,
            token: token.into(),
        })
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ScmError> {
        let url = endpoint(&self.base_url, segments)?;
        debug!(%method, %url, "github request");
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION))
    }

    /// Send under the context and translate non-2xx responses
    async fn send(
        &self,
        ctx: &ScmContext,
        resource: &str,
        request: RequestBuilder,
    ) -> Result<Response, ScmError> {
        ctx.run(async {
            let resp = request.send().await.map_err(transport_error)?;
            check_status(ScmType::Github, resource, resp).await
        })
        .await
    }
}

#[async_trait]
impl ScmProvider for GithubScm {
    fn scm_type(&self) -> ScmType {
        ScmType::Github
    }

    async fn get_organization(
        &self,
        ctx: &ScmContext,
        org_id: u64,
    ) -> Result<Organization, ScmError> {
        let id = org_id.to_string();
        let request = self.request(Method::GET, &["organizations", &id])?;
        let resp = self
            .send(ctx, &format!("organization {}", org_id), request)
            .await?;
        Ok(read_json::<GhOrganization>(resp).await?.into())
    }

    async fn add_team_member(
        &self,
        ctx: &ScmContext,
        opts: &TeamMembershipOptions,
    ) -> Result<(), ScmError> {
        // PUT on a membership is idempotent on GitHub
        let request = self
            .request(
                Method::PUT,
                &[
                    "orgs",
                    &opts.organization.path,
                    "teams",
                    &opts.team_slug,
                    "memberships",
                    &opts.username,
                ],
            )?
            .json(&json!({ "role": opts.role.as_str() }));
        self.send(ctx, &format!("team {}", opts.team_slug), request)
            .await?;
        Ok(())
    }

    async fn remove_team_member(
        &self,
        ctx: &ScmContext,
        opts: &TeamMembershipOptions,
    ) -> Result<(), ScmError> {
        let request = self.request(
            Method::DELETE,
            &[
                "orgs",
                &opts.organization.path,
                "teams",
                &opts.team_slug,
                "memberships",
                &opts.username,
            ],
        )?;
        match self
            .send(ctx, &format!("membership of {} in {}", opts.username, opts.team_slug), request)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn update_org_membership(
        &self,
        ctx: &ScmContext,
        opts: &OrgMembership,
    ) -> Result<(), ScmError> {
        let request = self
            .request(
                Method::PUT,
                &["orgs", &opts.organization.path, "memberships", &opts.username],
            )?
            .json(&json!({ "role": opts.role.as_str() }));
        self.send(ctx, &format!("user {}", opts.username), request)
            .await?;
        Ok(())
    }

    async fn create_repository(
        &self,
        ctx: &ScmContext,
        opts: &CreateRepositoryOptions,
    ) -> Result<ScmRepository, ScmError> {
        let request = self
            .request(Method::POST, &["orgs", &opts.organization.path, "repos"])?
            .json(&json!({
                "name": opts.name,
                "private": opts.private,
                "description": opts.description,
                "auto_init": true,
            }));
        let resp = self
            .send(ctx, &format!("repository {}", opts.name), request)
            .await?;
        Ok(read_json::<GhRepository>(resp).await?.into())
    }

    async fn get_repository(
        &self,
        ctx: &ScmContext,
        org: &Organization,
        name: &str,
    ) -> Result<ScmRepository, ScmError> {
        let request = self.request(Method::GET, &["repos", &org.path, name])?;
        let resp = self
            .send(ctx, &format!("repository {}/{}", org.path, name), request)
            .await?;
        Ok(read_json::<GhRepository>(resp).await?.into())
    }

    async fn create_team(
        &self,
        ctx: &ScmContext,
        opts: &CreateTeamOptions,
    ) -> Result<Team, ScmError> {
        let org = &opts.organization;
        let request = self
            .request(Method::POST, &["orgs", &org.path, "teams"])?
            .json(&json!({ "name": opts.name, "privacy": "closed" }));
        let resp = self
            .send(ctx, &format!("team {}", opts.name), request)
            .await?;
        let team: Team = read_json::<GhTeam>(resp).await?.into();

        for repo in &opts.repositories {
            self.grant_team_repository(ctx, org, &team, repo).await?;
        }
        for user in &opts.users {
            let membership = TeamMembershipOptions::new(org.clone(), team.slug.clone(), user.clone())
                .with_role(TeamRole::Member);
            self.add_team_member(ctx, &membership).await?;
        }

        Ok(team)
    }

    async fn get_team(
        &self,
        ctx: &ScmContext,
        org: &Organization,
        slug: &str,
    ) -> Result<Team, ScmError> {
        let request = self.request(Method::GET, &["orgs", &org.path, "teams", slug])?;
        let resp = self.send(ctx, &format!("team {}", slug), request).await?;
        Ok(read_json::<GhTeam>(resp).await?.into())
    }

    async fn grant_team_repository(
        &self,
        ctx: &ScmContext,
        org: &Organization,
        team: &Team,
        repo: &str,
    ) -> Result<(), ScmError> {
        // PUT replaces the permission, so repeating it is harmless
        let request = self
            .request(
                Method::PUT,
                &["orgs", &org.path, "teams", &team.slug, "repos", &org.path, repo],
            )?
            .json(&json!({ "permission": "push" }));
        self.send(ctx, &format!("repository {}/{}", org.path, repo), request)
            .await?;
        Ok(())
    }

    async fn list_directories(&self, ctx: &ScmContext) -> Result<Vec<Directory>, ScmError> {
        let request = self.request(Method::GET, &["user", "orgs"])?;
        let resp = self.send(ctx, "organizations", request).await?;
        let orgs = read_json::<Vec<GhOrganization>>(resp).await?;
        Ok(orgs.into_iter().map(Directory::from).collect())
    }

    async fn create_directory(
        &self,
        _ctx: &ScmContext,
        _opts: &CreateDirectoryOptions,
    ) -> Result<Directory, ScmError> {
        Err(ScmError::unsupported_operation(
            ScmType::Github,
            "create_directory",
        ))
    }

    async fn get_directory(&self, ctx: &ScmContext, id: u64) -> Result<Directory, ScmError> {
        let org_id = id.to_string();
        let request = self.request(Method::GET, &["organizations", &org_id])?;
        let resp = self
            .send(ctx, &format!("organization {}", id), request)
            .await?;
        Ok(read_json::<GhOrganization>(resp).await?.into())
    }
}
