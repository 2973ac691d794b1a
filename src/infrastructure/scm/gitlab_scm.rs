use super::context::ScmContext;
use super::http::{build_client, check_status, endpoint, parse_base_url, read_json, transport_error};
use super::scm_interface::{
    CreateDirectoryOptions, CreateRepositoryOptions, CreateTeamOptions, Directory, OrgMembership,
    OrgRole, Organization, ScmError, ScmProvider, ScmRepository, Team, TeamMembershipOptions,
    TeamRole,
};
use crate::domain::value_objects::scm_type::ScmType;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// GitLab access levels
const DEVELOPER_ACCESS: u32 = 30;
const MAINTAINER_ACCESS: u32 = 40;
const OWNER_ACCESS: u32 = 50;

#[derive(Debug, Deserialize)]
struct GlGroup {
    id: u64,
    name: String,
    #[serde(default)]
    path: String,
    full_path: String,
}

#[derive(Debug, Deserialize)]
struct GlUser {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GlNamespace {
    full_path: String,
}

#[derive(Debug, Deserialize)]
struct GlProject {
    id: u64,
    path: String,
    namespace: GlNamespace,
    web_url: String,
    #[serde(default)]
    http_url_to_repo: String,
}

impl From<GlGroup> for Organization {
    fn from(group: GlGroup) -> Self {
        Self {
            id: group.id,
            path: group.full_path,
            name: group.name,
        }
    }
}

impl From<GlGroup> for Directory {
    fn from(group: GlGroup) -> Self {
        Self {
            id: group.id,
            path: group.full_path,
            name: group.name,
        }
    }
}

impl From<GlGroup> for Team {
    fn from(group: GlGroup) -> Self {
        Self {
            id: group.id,
            slug: group.path,
            name: group.name,
        }
    }
}

impl From<GlProject> for ScmRepository {
    fn from(project: GlProject) -> Self {
        Self {
            id: project.id,
            name: project.path,
            owner: project.namespace.full_path,
            html_url: project.web_url,
            clone_url: project.http_url_to_repo,
        }
    }
}

fn team_access_level(role: TeamRole) -> u32 {
    match role {
        TeamRole::Member => DEVELOPER_ACCESS,
        TeamRole::Maintainer => MAINTAINER_ACCESS,
    }
}

fn org_access_level(role: OrgRole) -> u32 {
    match role {
        OrgRole::Member => DEVELOPER_ACCESS,
        OrgRole::Admin => OWNER_ACCESS,
    }
}

/// GitLab's "already taken" validation errors come back as 400
fn taken_as_conflict(resource: &str, err: ScmError) -> ScmError {
    match err {
        ScmError::Provider { status, message }
            if status == StatusCode::BAD_REQUEST.as_u16()
                && message.contains("has already been taken") =>
        {
            ScmError::conflict(resource, message)
        }
        other => other,
    }
}

/// GitLab implementation of the SCM capability contract
///
/// Organizations and directories are groups, teams are subgroups of the
/// course group and repositories are projects.
pub struct GitlabScm {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl GitlabScm {
    /// Create a client for a self-hosted instance; `base_url` must include `/api/v4/`
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
        debug!(%method, %url, "gitlab request");
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    async fn send(
        &self,
        ctx: &ScmContext,
        resource: &str,
        request: RequestBuilder,
    ) -> Result<Response, ScmError> {
        ctx.run(async {
            let resp = request.send().await.map_err(transport_error)?;
            check_status(ScmType::Gitlab, resource, resp).await
        })
        .await
    }

    async fn user_id(&self, ctx: &ScmContext, username: &str) -> Result<u64, ScmError> {
        let request = self
            .request(Method::GET, &["users"])?
            .query(&[("username", username)]);
        let resp = self
            .send(ctx, &format!("user {}", username), request)
            .await?;
        read_json::<Vec<GlUser>>(resp)
            .await?
            .first()
            .map(|u| u.id)
            .ok_or_else(|| ScmError::not_found(format!("user {}", username)))
    }

    async fn get_group(&self, ctx: &ScmContext, id_or_path: &str) -> Result<GlGroup, ScmError> {
        let request = self.request(Method::GET, &["groups", id_or_path])?;
        let resp = self
            .send(ctx, &format!("group {}", id_or_path), request)
            .await?;
        read_json(resp).await
    }
}

#[async_trait]
impl ScmProvider for GitlabScm {
    fn scm_type(&self) -> ScmType {
        ScmType::Gitlab
    }

    async fn get_organization(
        &self,
        ctx: &ScmContext,
        org_id: u64,
    ) -> Result<Organization, ScmError> {
        let group = self.get_group(ctx, &org_id.to_string()).await?;
        Ok(group.into())
    }

    async fn add_team_member(
        &self,
        ctx: &ScmContext,
        opts: &TeamMembershipOptions,
    ) -> Result<(), ScmError> {
        let user_id = self.user_id(ctx, &opts.username).await?;
        let team_path = format!("{}/{}", opts.organization.path, opts.team_slug);
        let request = self
            .request(Method::POST, &["groups", &team_path, "members"])?
            .json(&json!({
                "user_id": user_id,
                "access_level": team_access_level(opts.role),
            }));
        match self
            .send(ctx, &format!("group {}", team_path), request)
            .await
        {
            Ok(_) => Ok(()),
            // 409 means "Member already exists"
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn remove_team_member(
        &self,
        ctx: &ScmContext,
        opts: &TeamMembershipOptions,
    ) -> Result<(), ScmError> {
        let user_id = match self.user_id(ctx, &opts.username).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        let team_path = format!("{}/{}", opts.organization.path, opts.team_slug);
        let uid = user_id.to_string();
        let request = self.request(Method::DELETE, &["groups", &team_path, "members", &uid])?;
        match self
            .send(ctx, &format!("membership of {} in {}", opts.username, team_path), request)
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
        let user_id = self.user_id(ctx, &opts.username).await?;
        let group_id = opts.organization.id.to_string();
        let uid = user_id.to_string();
        let access_level = org_access_level(opts.role);
        let resource = format!("membership of {} in {}", opts.username, opts.organization.path);

        let update = self
            .request(Method::PUT, &["groups", &group_id, "members", &uid])?
            .json(&json!({ "access_level": access_level }));
        match self.send(ctx, &resource, update).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                // Not yet a direct member of the group
                let add = self
                    .request(Method::POST, &["groups", &group_id, "members"])?
                    .json(&json!({ "user_id": user_id, "access_level": access_level }));
                self.send(ctx, &resource, add).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_repository(
        &self,
        ctx: &ScmContext,
        opts: &CreateRepositoryOptions,
    ) -> Result<ScmRepository, ScmError> {
        let visibility = if opts.private { "private" } else { "public" };
        let resource = format!("project {}/{}", opts.organization.path, opts.name);
        let request = self.request(Method::POST, &["projects"])?.json(&json!({
            "name": opts.name,
            "path": opts.name,
            "namespace_id": opts.organization.id,
            "visibility": visibility,
            "description": opts.description,
        }));
        let resp = self
            .send(ctx, &resource, request)
            .await
            .map_err(|e| taken_as_conflict(&resource, e))?;
        Ok(read_json::<GlProject>(resp).await?.into())
    }

    async fn get_repository(
        &self,
        ctx: &ScmContext,
        org: &Organization,
        name: &str,
    ) -> Result<ScmRepository, ScmError> {
        let project_path = format!("{}/{}", org.path, name);
        let request = self.request(Method::GET, &["projects", &project_path])?;
        let resp = self
            .send(ctx, &format!("project {}", project_path), request)
            .await?;
        Ok(read_json::<GlProject>(resp).await?.into())
    }

    async fn create_team(
        &self,
        ctx: &ScmContext,
        opts: &CreateTeamOptions,
    ) -> Result<Team, ScmError> {
        let org = &opts.organization;
        let slug = opts.name.to_lowercase();
        let resource = format!("group {}/{}", org.path, slug);
        let request = self.request(Method::POST, &["groups"])?.json(&json!({
            "name": opts.name,
            "path": slug,
            "parent_id": org.id,
            "visibility": "private",
        }));
        let resp = self
            .send(ctx, &resource, request)
            .await
            .map_err(|e| taken_as_conflict(&resource, e))?;
        let team: Team = read_json::<GlGroup>(resp).await?.into();

        for repo in &opts.repositories {
            self.grant_team_repository(ctx, org, &team, repo).await?;
        }
        for user in &opts.users {
            let membership = TeamMembershipOptions::new(org.clone(), team.slug.clone(), user.clone());
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
        let group = self
            .get_group(ctx, &format!("{}/{}", org.path, slug))
            .await?;
        Ok(group.into())
    }

    /// Shares the project with the team's subgroup
    async fn grant_team_repository(
        &self,
        ctx: &ScmContext,
        org: &Organization,
        team: &Team,
        repo: &str,
    ) -> Result<(), ScmError> {
        let project_path = format!("{}/{}", org.path, repo);
        let request = self
            .request(Method::POST, &["projects", &project_path, "share"])?
            .json(&json!({ "group_id": team.id, "group_access": DEVELOPER_ACCESS }));
        match self
            .send(ctx, &format!("project {}", project_path), request)
            .await
        {
            Ok(_) => Ok(()),
            // 409 means the project is already shared with the group
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list_directories(&self, ctx: &ScmContext) -> Result<Vec<Directory>, ScmError> {
        let request = self
            .request(Method::GET, &["groups"])?
            .query(&[("min_access_level", OWNER_ACCESS.to_string())]);
        let resp = self.send(ctx, "groups", request).await?;
        let groups = read_json::<Vec<GlGroup>>(resp).await?;
        Ok(groups.into_iter().map(Directory::from).collect())
    }

    async fn create_directory(
        &self,
        ctx: &ScmContext,
        opts: &CreateDirectoryOptions,
    ) -> Result<Directory, ScmError> {
        let visibility = if opts.public { "public" } else { "private" };
        let resource = format!("group {}", opts.path);
        let request = self.request(Method::POST, &["groups"])?.json(&json!({
            "name": opts.name,
            "path": opts.path,
            "visibility": visibility,
        }));
        let resp = self
            .send(ctx, &resource, request)
            .await
            .map_err(|e| taken_as_conflict(&resource, e))?;
        Ok(read_json::<GlGroup>(resp).await?.into())
    }

    async fn get_directory(&self, ctx: &ScmContext, id: u64) -> Result<Directory, ScmError> {
        let group = self.get_group(ctx, &id.to_string()).await?;
        Ok(group.into())
    }
}
