use crate::application::services::provisioner::{Provisioned, Provisioner};
use crate::application::services::transition_plan::{SyncStep, TeamNames, TransitionPlan};
use crate::common::error::ErrorKind;
use crate::domain::entities::{Course, Enrollment, Repository, RepositoryQuery};
use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use crate::domain::value_objects::scm_type::ScmType;
use crate::infrastructure::scm::{
    OrgMembership, Organization, ScmContext, ScmError, ScmProvider, TeamMembershipOptions,
};
use crate::infrastructure::store::{EnrollmentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// 受講登録の状態遷移で発生するエラー
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid transition target: {target}")]
    InvalidTransition { target: EnrollmentStatus },

    #[error("SCM step '{step}' failed: {source}")]
    Scm {
        step: SyncStep,
        #[source]
        source: ScmError,
    },

    #[error("Store step '{step}' failed: {source}")]
    Store {
        step: SyncStep,
        #[source]
        source: StoreError,
    },

    #[error("Failed to load {what}: {source}")]
    Load {
        what: String,
        #[source]
        source: StoreError,
    },

    #[error("Transition interrupted before it started: {source}")]
    Interrupted {
        #[source]
        source: ScmError,
    },

    #[error("Course {course_id} is hosted on {expected}, but the provider is {actual}")]
    ProviderMismatch {
        course_id: u64,
        expected: ScmType,
        actual: ScmType,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Scm { source, .. } => source.kind(),
            Self::Interrupted { source } => source.kind(),
            Self::Store { source, .. } | Self::Load { source, .. } => source.kind(),
            Self::ProviderMismatch { .. } => ErrorKind::Unsupported,
        }
    }

    /// 失敗したステップ（ロード失敗などステップ外の場合はNone）
    pub fn step(&self) -> Option<&SyncStep> {
        match self {
            Self::Scm { step, .. } | Self::Store { step, .. } => Some(step),
            _ => None,
        }
    }

    /// 元のSCMエラー
    pub fn scm_error(&self) -> Option<&ScmError> {
        match self {
            Self::Scm { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// 実行中の遷移が保持する一時状態
#[derive(Default)]
struct Progress {
    login: Option<String>,
    organization: Option<Organization>,
    provisioned: Option<Provisioned>,
}

/// 受講登録の状態遷移をSCMとストアに反映する
///
/// SCM側の操作がすべて成功した後にのみストアを更新する。失敗時は補償処理を
/// 行わず、失敗したステップ付きでエラーを返す。
pub struct EnrollmentSynchronizer {
    store: Arc<dyn EnrollmentStore>,
    teams: TeamNames,
    provisioner: Provisioner,
}

impl EnrollmentSynchronizer {
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self {
            store,
            teams: TeamNames::default(),
            provisioner: Provisioner::default(),
        }
    }

    pub fn with_teams(mut self, teams: TeamNames) -> Self {
        self.teams = teams;
        self
    }

    pub fn with_provisioner(mut self, provisioner: Provisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    /// ストアから登録とコースを読み込んでから遷移を実行する
    pub async fn update_enrollment(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        user_id: u64,
        course_id: u64,
        target: EnrollmentStatus,
    ) -> Result<Enrollment, SyncError> {
        let enrollment = self
            .store
            .get_enrollment(user_id, course_id)
            .await
            .map_err(|source| SyncError::Load {
                what: format!("enrollment (user {}, course {})", user_id, course_id),
                source,
            })?;
        let course = self
            .store
            .get_course(course_id)
            .await
            .map_err(|source| SyncError::Load {
                what: format!("course {}", course_id),
                source,
            })?;

        self.transition(ctx, scm, &course, &enrollment, target).await
    }

    /// 既存の受講登録を `target` に遷移させる
    #[instrument(
        skip_all,
        fields(user_id = enrollment.user_id, course_id = course.id, target = %target)
    )]
    pub async fn transition(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        course: &Course,
        enrollment: &Enrollment,
        target: EnrollmentStatus,
    ) -> Result<Enrollment, SyncError> {
        let plan = TransitionPlan::for_transition(Some(enrollment.status), target, &self.teams)?;

        // Nothing is started once the caller has given up, store-only steps included
        ctx.check()
            .map_err(|source| SyncError::Interrupted { source })?;

        debug!(current = ?plan.current(), steps = plan.steps().len(), "executing transition plan");

        let mut progress = Progress::default();
        let mut skip_to_commit = false;
        let mut provider_checked = false;

        for step in plan.steps() {
            if skip_to_commit && !matches!(step, SyncStep::Commit(_)) {
                continue;
            }

            if step.is_scm() {
                if !provider_checked {
                    check_provider(course, scm)?;
                    provider_checked = true;
                }
                if progress.login.is_none() && *step != SyncStep::ResolveOrganization {
                    let user = self.store.get_user(enrollment.user_id).await.map_err(|source| {
                        SyncError::Load {
                            what: format!("user {}", enrollment.user_id),
                            source,
                        }
                    })?;
                    progress.login = Some(user.login);
                }

                debug!(%step, "scm step");
                let result = match ctx.check() {
                    Ok(()) => self.run_scm_step(ctx, scm, course, step, &mut progress).await,
                    Err(e) => Err(e),
                };
                if let Err(source) = result {
                    warn!(
                        %step,
                        kind = %source.kind(),
                        error = %source,
                        "scm step failed, enrollment left unchanged"
                    );
                    return Err(SyncError::Scm {
                        step: step.clone(),
                        source,
                    });
                }
                continue;
            }

            match step {
                SyncStep::CheckExistingRepository => {
                    let query = RepositoryQuery::user_repo(course.organization_id, enrollment.user_id);
                    let existing = self
                        .store
                        .get_repositories(&query)
                        .await
                        .map_err(|source| store_error(step, source))?;
                    if !existing.is_empty() {
                        debug!(
                            repository_id = existing[0].repository_id,
                            "user repository already recorded, skipping provisioning"
                        );
                        skip_to_commit = true;
                    }
                }
                SyncStep::RecordRepository => {
                    self.record_repository(course, enrollment, step, &progress)
                        .await?;
                }
                SyncStep::Commit(status) => {
                    self.commit(enrollment, *status)
                        .await
                        .map_err(|source| store_error(step, source))?;
                    info!(status = %status, "enrollment updated");
                }
                _ => {}
            }
        }

        Ok(enrollment.clone().with_status(target))
    }

    async fn run_scm_step(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        course: &Course,
        step: &SyncStep,
        progress: &mut Progress,
    ) -> Result<(), ScmError> {
        if let SyncStep::ResolveOrganization = step {
            let org = scm.get_organization(ctx, course.organization_id).await?;
            debug!(org = %org.path, "organization resolved");
            progress.organization = Some(org);
            return Ok(());
        }

        let login = progress
            .login
            .clone()
            .ok_or_else(|| ScmError::invalid_request("user login not resolved"))?;
        let org = progress
            .organization
            .clone()
            .ok_or_else(|| ScmError::invalid_request("organization not resolved"))?;

        match step {
            SyncStep::PromoteOrgRole(role) => {
                let opts = OrgMembership {
                    organization: org,
                    username: login,
                    role: *role,
                };
                scm.update_org_membership(ctx, &opts).await
            }
            SyncStep::RemoveFromTeam(team) => {
                let opts = TeamMembershipOptions::new(org, team.clone(), login);
                scm.remove_team_member(ctx, &opts).await
            }
            SyncStep::AddToTeam { team, role } => {
                let opts = TeamMembershipOptions::new(org, team.clone(), login).with_role(*role);
                scm.add_team_member(ctx, &opts).await
            }
            SyncStep::ProvisionRepository => {
                let provisioned = self.provisioner.provision(ctx, scm, &org, &login).await?;
                progress.provisioned = Some(provisioned);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn record_repository(
        &self,
        course: &Course,
        enrollment: &Enrollment,
        step: &SyncStep,
        progress: &Progress,
    ) -> Result<(), SyncError> {
        let Some(provisioned) = &progress.provisioned else {
            return Ok(());
        };
        let repository = Repository::user_repo(
            course.organization_id,
            enrollment.user_id,
            provisioned.repository.id,
            provisioned.repository.html_url.clone(),
        );

        match self.store.create_repository(&repository).await {
            Ok(()) => Ok(()),
            // Recorded by a concurrent or earlier attempt
            Err(e) if e.kind() == ErrorKind::Conflict => {
                warn!(repository_id = repository.repository_id, "user repository already recorded");
                Ok(())
            }
            Err(source) => Err(store_error(step, source)),
        }
    }

    async fn commit(&self, enrollment: &Enrollment, status: EnrollmentStatus) -> Result<(), StoreError> {
        let (user_id, course_id) = (enrollment.user_id, enrollment.course_id);
        match status {
            EnrollmentStatus::Pending => self.store.set_pending(user_id, course_id).await,
            EnrollmentStatus::Rejected => self.store.reject_enrollment(user_id, course_id).await,
            EnrollmentStatus::Student => self.store.enroll_student(user_id, course_id).await,
            EnrollmentStatus::Teacher => self.store.enroll_teacher(user_id, course_id).await,
            EnrollmentStatus::None => Ok(()),
        }
    }
}

/// Checked lazily so that store-only paths work with any provider
fn check_provider(course: &Course, scm: &dyn ScmProvider) -> Result<(), SyncError> {
    let actual = scm.scm_type();
    if actual != course.provider {
        return Err(SyncError::ProviderMismatch {
            course_id: course.id,
            expected: course.provider,
            actual,
        });
    }
    Ok(())
}

fn store_error(step: &SyncStep, source: StoreError) -> SyncError {
    SyncError::Store {
        step: step.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::User;
    use crate::infrastructure::scm::scm_interface::MockScmProvider;
    use crate::infrastructure::scm::{OrgRole, ScmRepository, Team, TeamRole};
    use crate::infrastructure::store::MemoryStore;
    use mockall::Sequence;

    fn org() -> Organization {
        Organization {
            id: 100,
            path: "dat320".to_string(),
            name: "DAT320".to_string(),
        }
    }

    async fn setup(status: EnrollmentStatus) -> (Arc<MemoryStore>, Course, Enrollment) {
        let store = Arc::new(MemoryStore::new());
        store.put_user(User::new(42, "alice")).await;
        let course = Course::new(7, 100, "Operating Systems");
        store.put_course(course.clone()).await;
        store.create_enrollment(42, 7).await.unwrap();
        match status {
            EnrollmentStatus::Student => store.enroll_student(42, 7).await.unwrap(),
            EnrollmentStatus::Rejected => store.reject_enrollment(42, 7).await.unwrap(),
            _ => {}
        }
        let enrollment = store.get_enrollment(42, 7).await.unwrap();
        (store, course, enrollment)
    }

    fn github_mock() -> MockScmProvider {
        let mut scm = MockScmProvider::new();
        scm.expect_scm_type().return_const(ScmType::Github);
        scm
    }

    #[tokio::test]
    async fn test_teacher_promotion_order() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Student).await;
        let mut scm = github_mock();
        let mut seq = Sequence::new();

        scm.expect_get_organization()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(org()));
        scm.expect_update_org_membership()
            .withf(|_, opts| opts.role == OrgRole::Admin && opts.username == "alice")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        scm.expect_remove_team_member()
            .withf(|_, opts| opts.team_slug == "students")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        scm.expect_add_team_member()
            .withf(|_, opts| opts.team_slug == "teachers" && opts.role == TeamRole::Maintainer)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let sync = EnrollmentSynchronizer::new(store.clone());
        let updated = sync
            .transition(&ScmContext::new(), &scm, &course, &enrollment, EnrollmentStatus::Teacher)
            .await
            .unwrap();

        assert_eq!(updated.status, EnrollmentStatus::Teacher);
        assert_eq!(
            store.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Teacher
        );
    }

    #[tokio::test]
    async fn test_partial_teacher_promotion_is_not_committed() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Student).await;
        let mut scm = github_mock();
        scm.expect_get_organization().returning(|_, _| Ok(org()));
        scm.expect_update_org_membership().returning(|_, _| Ok(()));
        scm.expect_remove_team_member()
            .returning(|_, _| Err(ScmError::transient("connection reset")));
        scm.expect_add_team_member().never();

        let sync = EnrollmentSynchronizer::new(store.clone());
        let err = sync
            .transition(&ScmContext::new(), &scm, &course, &enrollment, EnrollmentStatus::Teacher)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.step(), Some(&SyncStep::RemoveFromTeam("students".to_string())));
        assert!(matches!(err.scm_error(), Some(ScmError::Transient { .. })));
        assert_eq!(
            store.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Student
        );
    }

    #[tokio::test]
    async fn test_student_acceptance_provisions_and_records() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Pending).await;
        let mut scm = github_mock();
        let mut seq = Sequence::new();
        scm.expect_get_organization()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(org()));
        scm.expect_add_team_member()
            .withf(|_, opts| opts.team_slug == "students" && opts.username == "alice")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        scm.expect_create_repository()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, opts| {
                Ok(ScmRepository {
                    id: 9001,
                    name: opts.name.clone(),
                    owner: "dat320".to_string(),
                    html_url: "https://github.com/dat320/alice-labs".to_string(),
                    clone_url: String::new(),
                })
            });
        scm.expect_create_team()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(Team {
                    id: 77,
                    slug: "alice".to_string(),
                    name: "alice".to_string(),
                })
            });

        let sync = EnrollmentSynchronizer::new(store.clone());
        sync.transition(&ScmContext::new(), &scm, &course, &enrollment, EnrollmentStatus::Student)
            .await
            .unwrap();

        let repos = store
            .get_repositories(&RepositoryQuery::user_repo(100, 42))
            .await
            .unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].repository_id, 9001);
        assert_eq!(
            store.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Student
        );
    }

    #[tokio::test]
    async fn test_reject_makes_no_scm_calls() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Student).await;
        let scm = MockScmProvider::new();

        let sync = EnrollmentSynchronizer::new(store.clone());
        let updated = sync
            .transition(&ScmContext::new(), &scm, &course, &enrollment, EnrollmentStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(updated.status, EnrollmentStatus::Rejected);
    }

    #[tokio::test]
    async fn test_none_target_is_invalid() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Pending).await;
        let scm = MockScmProvider::new();

        let sync = EnrollmentSynchronizer::new(store.clone());
        let err = sync
            .transition(&ScmContext::new(), &scm, &course, &enrollment, EnrollmentStatus::None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(
            store.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_before_any_work() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Pending).await;
        let scm = MockScmProvider::new();
        let ctx = ScmContext::new();
        ctx.cancel();

        let sync = EnrollmentSynchronizer::new(store.clone());
        let err = sync
            .transition(&ctx, &scm, &course, &enrollment, EnrollmentStatus::Rejected)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(matches!(err, SyncError::Interrupted { .. }));
        assert_eq!(err.step(), None);
        assert_eq!(
            store.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_expired_deadline_is_interrupted_and_retryable() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Pending).await;
        let scm = MockScmProvider::new();
        let ctx = ScmContext::with_timeout(std::time::Duration::ZERO);

        let sync = EnrollmentSynchronizer::new(store.clone());
        let err = sync
            .transition(&ctx, &scm, &course, &enrollment, EnrollmentStatus::Student)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Interrupted {
                source: ScmError::DeadlineExceeded
            }
        ));
        assert!(err.kind().is_retryable());
    }

    #[tokio::test]
    async fn test_provider_mismatch() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Pending).await;
        let mut scm = MockScmProvider::new();
        scm.expect_scm_type().return_const(ScmType::Gitlab);

        let sync = EnrollmentSynchronizer::new(store);
        let err = sync
            .transition(&ScmContext::new(), &scm, &course, &enrollment, EnrollmentStatus::Student)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_recorded_repository_needs_no_matching_provider() {
        let (store, course, enrollment) = setup(EnrollmentStatus::Rejected).await;
        store
            .create_repository(&Repository::user_repo(
                100,
                42,
                9001,
                "https://github.com/dat320/alice-labs",
            ))
            .await
            .unwrap();
        // No expectations: any SCM call, scm_type included, fails the test
        let scm = MockScmProvider::new();

        let sync = EnrollmentSynchronizer::new(store.clone());
        let updated = sync
            .transition(&ScmContext::new(), &scm, &course, &enrollment, EnrollmentStatus::Student)
            .await
            .unwrap();
        assert_eq!(updated.status, EnrollmentStatus::Student);
        assert_eq!(
            store.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Student
        );
    }

    #[tokio::test]
    async fn test_update_enrollment_requires_existing_enrollment() {
        let (store, _, _) = setup(EnrollmentStatus::Pending).await;
        let scm = MockScmProvider::new();

        let sync = EnrollmentSynchronizer::new(store);
        let err = sync
            .update_enrollment(&ScmContext::new(), &scm, 99, 7, EnrollmentStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Load { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
