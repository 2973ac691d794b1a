//! Mock services for testing
//!
//! A recording SCM provider and a store wrapper that counts calls, so tests
//! can assert exactly which side effects a transition produced.

use async_trait::async_trait;
use enrollsync::domain::entities::{Course, Enrollment, Repository, RepositoryQuery, User};
use enrollsync::domain::value_objects::{EnrollmentStatus, ScmType};
use enrollsync::infrastructure::scm::{
    CreateDirectoryOptions, CreateRepositoryOptions, CreateTeamOptions, Directory, OrgMembership,
    OrgRole, Organization, ScmContext, ScmError, ScmProvider, ScmRepository, Team,
    TeamMembershipOptions, TeamRole,
};
use enrollsync::infrastructure::store::{EnrollmentStore, MemoryStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// One call observed by [`RecordingScm`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScmCall {
    GetOrganization(u64),
    AddTeamMember {
        org: u64,
        team: String,
        user: String,
        role: TeamRole,
    },
    RemoveTeamMember {
        org: u64,
        team: String,
        user: String,
    },
    UpdateOrgMembership {
        org: u64,
        user: String,
        role: OrgRole,
    },
    CreateRepository {
        org: u64,
        name: String,
    },
    GetRepository {
        org: u64,
        name: String,
    },
    CreateTeam {
        org: u64,
        name: String,
    },
    GetTeam {
        org: u64,
        slug: String,
    },
    GrantTeamRepository {
        org: u64,
        team: String,
        repo: String,
    },
    ListDirectories,
    CreateDirectory(String),
    GetDirectory(u64),
}

impl ScmCall {
    /// Name of the trait method that produced this call
    pub fn op(&self) -> &'static str {
        match self {
            ScmCall::GetOrganization(_) => "get_organization",
            ScmCall::AddTeamMember { .. } => "add_team_member",
            ScmCall::RemoveTeamMember { .. } => "remove_team_member",
            ScmCall::UpdateOrgMembership { .. } => "update_org_membership",
            ScmCall::CreateRepository { .. } => "create_repository",
            ScmCall::GetRepository { .. } => "get_repository",
            ScmCall::CreateTeam { .. } => "create_team",
            ScmCall::GetTeam { .. } => "get_team",
            ScmCall::GrantTeamRepository { .. } => "grant_team_repository",
            ScmCall::ListDirectories => "list_directories",
            ScmCall::CreateDirectory(_) => "create_directory",
            ScmCall::GetDirectory(_) => "get_directory",
        }
    }
}

/// In-memory SCM provider that records every call
///
/// Created repositories and teams are remembered, so creating one twice
/// reports a Conflict like a real provider would.
pub struct RecordingScm {
    organizations: HashMap<u64, Organization>,
    calls: Mutex<Vec<ScmCall>>,
    failures: Mutex<HashMap<&'static str, fn() -> ScmError>>,
    repositories: Mutex<HashMap<(u64, String), ScmRepository>>,
    teams: Mutex<HashMap<(u64, String), Team>>,
}

impl RecordingScm {
    pub fn new() -> Self {
        let mut organizations = HashMap::new();
        organizations.insert(
            100,
            Organization {
                id: 100,
                path: "dat320".to_string(),
                name: "DAT320 Operating Systems".to_string(),
            },
        );
        Self {
            organizations,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            repositories: Mutex::new(HashMap::new()),
            teams: Mutex::new(HashMap::new()),
        }
    }

    /// Make every subsequent call to `op` fail with `error()`
    pub fn fail_on(&self, op: &'static str, error: fn() -> ScmError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<ScmCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.op() == op)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: ScmCall) -> Result<(), ScmError> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(op) {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }
}

impl Default for RecordingScm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScmProvider for RecordingScm {
    fn scm_type(&self) -> ScmType {
        ScmType::Github
    }

    async fn get_organization(&self, _ctx: &ScmContext, org_id: u64) -> Result<Organization, ScmError> {
        self.record(ScmCall::GetOrganization(org_id))?;
        self.organizations
            .get(&org_id)
            .cloned()
            .ok_or_else(|| ScmError::not_found(format!("organization {}", org_id)))
    }

    async fn add_team_member(&self, _ctx: &ScmContext, opts: &TeamMembershipOptions) -> Result<(), ScmError> {
        self.record(ScmCall::AddTeamMember {
            org: opts.organization.id,
            team: opts.team_slug.clone(),
            user: opts.username.clone(),
            role: opts.role,
        })
    }

    async fn remove_team_member(&self, _ctx: &ScmContext, opts: &TeamMembershipOptions) -> Result<(), ScmError> {
        self.record(ScmCall::RemoveTeamMember {
            org: opts.organization.id,
            team: opts.team_slug.clone(),
            user: opts.username.clone(),
        })
    }

    async fn update_org_membership(&self, _ctx: &ScmContext, opts: &OrgMembership) -> Result<(), ScmError> {
        self.record(ScmCall::UpdateOrgMembership {
            org: opts.organization.id,
            user: opts.username.clone(),
            role: opts.role,
        })
    }

    async fn create_repository(
        &self,
        _ctx: &ScmContext,
        opts: &CreateRepositoryOptions,
    ) -> Result<ScmRepository, ScmError> {
        self.record(ScmCall::CreateRepository {
            org: opts.organization.id,
            name: opts.name.clone(),
        })?;

        let mut repositories = self.repositories.lock().unwrap();
        let key = (opts.organization.id, opts.name.clone());
        if repositories.contains_key(&key) {
            return Err(ScmError::conflict(opts.name.clone(), "name already exists on this account"));
        }
        let repository = ScmRepository {
            id: 9000 + repositories.len() as u64 + 1,
            name: opts.name.clone(),
            owner: opts.organization.path.clone(),
            html_url: format!("https://github.com/{}/{}", opts.organization.path, opts.name),
            clone_url: format!("https://github.com/{}/{}.git", opts.organization.path, opts.name),
        };
        repositories.insert(key, repository.clone());
        Ok(repository)
    }

    async fn get_repository(
        &self,
        _ctx: &ScmContext,
        org: &Organization,
        name: &str,
    ) -> Result<ScmRepository, ScmError> {
        self.record(ScmCall::GetRepository {
            org: org.id,
            name: name.to_string(),
        })?;
        self.repositories
            .lock()
            .unwrap()
            .get(&(org.id, name.to_string()))
            .cloned()
            .ok_or_else(|| ScmError::not_found(format!("repository {}", name)))
    }

    async fn create_team(&self, _ctx: &ScmContext, opts: &CreateTeamOptions) -> Result<Team, ScmError> {
        self.record(ScmCall::CreateTeam {
            org: opts.organization.id,
            name: opts.name.clone(),
        })?;

        let mut teams = self.teams.lock().unwrap();
        let key = (opts.organization.id, opts.name.clone());
        if teams.contains_key(&key) {
            return Err(ScmError::conflict(opts.name.clone(), "team already exists"));
        }
        let team = Team {
            id: 500 + teams.len() as u64 + 1,
            slug: opts.name.clone(),
            name: opts.name.clone(),
        };
        teams.insert(key, team.clone());
        Ok(team)
    }

    async fn get_team(&self, _ctx: &ScmContext, org: &Organization, slug: &str) -> Result<Team, ScmError> {
        self.record(ScmCall::GetTeam {
            org: org.id,
            slug: slug.to_string(),
        })?;
        self.teams
            .lock()
            .unwrap()
            .get(&(org.id, slug.to_string()))
            .cloned()
            .ok_or_else(|| ScmError::not_found(format!("team {}", slug)))
    }

    async fn grant_team_repository(
        &self,
        _ctx: &ScmContext,
        org: &Organization,
        team: &Team,
        repo: &str,
    ) -> Result<(), ScmError> {
        self.record(ScmCall::GrantTeamRepository {
            org: org.id,
            team: team.slug.clone(),
            repo: repo.to_string(),
        })
    }

    async fn list_directories(&self, _ctx: &ScmContext) -> Result<Vec<Directory>, ScmError> {
        self.record(ScmCall::ListDirectories)?;
        Ok(self
            .organizations
            .values()
            .map(|o| Directory {
                id: o.id,
                name: o.name.clone(),
                path: o.path.clone(),
            })
            .collect())
    }

    async fn create_directory(
        &self,
        _ctx: &ScmContext,
        opts: &CreateDirectoryOptions,
    ) -> Result<Directory, ScmError> {
        self.record(ScmCall::CreateDirectory(opts.path.clone()))?;
        Err(ScmError::unsupported_operation(ScmType::Github, "create_directory"))
    }

    async fn get_directory(&self, _ctx: &ScmContext, id: u64) -> Result<Directory, ScmError> {
        self.record(ScmCall::GetDirectory(id))?;
        self.organizations
            .get(&id)
            .map(|o| Directory {
                id: o.id,
                name: o.name.clone(),
                path: o.path.clone(),
            })
            .ok_or_else(|| ScmError::not_found(format!("organization {}", id)))
    }
}

/// Store wrapper counting calls per method
pub struct CountingStore {
    inner: MemoryStore,
    calls: Mutex<HashMap<&'static str, usize>>,
}

const WRITE_OPS: [&str; 7] = [
    "create_enrollment",
    "set_pending",
    "reject_enrollment",
    "enroll_student",
    "enroll_teacher",
    "create_repository",
    "update_course",
];

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Uncounted access for seeding and inspection
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Number of mutating calls
    pub fn writes(&self) -> usize {
        WRITE_OPS.iter().map(|op| self.count(op)).sum()
    }

    pub fn reset_counts(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn hit(&self, op: &'static str) {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
    }
}

#[async_trait]
impl EnrollmentStore for CountingStore {
    async fn create_enrollment(&self, user_id: u64, course_id: u64) -> Result<Enrollment, StoreError> {
        self.hit("create_enrollment");
        self.inner.create_enrollment(user_id, course_id).await
    }

    async fn get_enrollment(&self, user_id: u64, course_id: u64) -> Result<Enrollment, StoreError> {
        self.hit("get_enrollment");
        self.inner.get_enrollment(user_id, course_id).await
    }

    async fn get_enrollments_by_course(
        &self,
        course_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Enrollment>, StoreError> {
        self.hit("get_enrollments_by_course");
        self.inner.get_enrollments_by_course(course_id, statuses).await
    }

    async fn set_pending(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.hit("set_pending");
        self.inner.set_pending(user_id, course_id).await
    }

    async fn reject_enrollment(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.hit("reject_enrollment");
        self.inner.reject_enrollment(user_id, course_id).await
    }

    async fn enroll_student(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.hit("enroll_student");
        self.inner.enroll_student(user_id, course_id).await
    }

    async fn enroll_teacher(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.hit("enroll_teacher");
        self.inner.enroll_teacher(user_id, course_id).await
    }

    async fn get_repositories(&self, query: &RepositoryQuery) -> Result<Vec<Repository>, StoreError> {
        self.hit("get_repositories");
        self.inner.get_repositories(query).await
    }

    async fn create_repository(&self, repository: &Repository) -> Result<(), StoreError> {
        self.hit("create_repository");
        self.inner.create_repository(repository).await
    }

    async fn get_course(&self, course_id: u64) -> Result<Course, StoreError> {
        self.hit("get_course");
        self.inner.get_course(course_id).await
    }

    async fn get_courses(&self) -> Result<Vec<Course>, StoreError> {
        self.hit("get_courses");
        self.inner.get_courses().await
    }

    async fn get_courses_by_user(
        &self,
        user_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Course>, StoreError> {
        self.hit("get_courses_by_user");
        self.inner.get_courses_by_user(user_id, statuses).await
    }

    async fn update_course(&self, course: &Course) -> Result<(), StoreError> {
        self.hit("update_course");
        self.inner.update_course(course).await
    }

    async fn get_user(&self, user_id: u64) -> Result<User, StoreError> {
        self.hit("get_user");
        self.inner.get_user(user_id).await
    }
}
