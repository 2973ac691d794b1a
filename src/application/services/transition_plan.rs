use crate::application::use_cases::update_enrollment::SyncError;
use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use crate::infrastructure::filesystem::config_store::TeamSettings;
use crate::infrastructure::scm::{OrgRole, TeamRole};
use std::fmt;

/// コース全体で共有するチーム名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamNames {
    /// 学生チーム
    pub students: String,

    /// 教員チーム
    pub teachers: String,
}

impl Default for TeamNames {
    fn default() -> Self {
        Self {
            students: "students".to_string(),
            teachers: "teachers".to_string(),
        }
    }
}

impl From<&TeamSettings> for TeamNames {
    fn from(settings: &TeamSettings) -> Self {
        Self {
            students: settings.students.clone(),
            teachers: settings.teachers.clone(),
        }
    }
}

/// 状態遷移を構成する1ステップ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStep {
    /// (organization, user) のUSERリポジトリが既に記録されているか確認する
    CheckExistingRepository,

    /// SCM側のorganizationを解決する
    ResolveOrganization,

    /// organizationでのロールを変更する
    PromoteOrgRole(OrgRole),

    /// チームから外す
    RemoveFromTeam(String),

    /// チームに追加する
    AddToTeam { team: String, role: TeamRole },

    /// 個人リポジトリと個人チームを作成する
    ProvisionRepository,

    /// 作成したリポジトリをストアに記録する
    RecordRepository,

    /// 新しい状態をストアに確定する
    Commit(EnrollmentStatus),
}

impl SyncStep {
    /// SCMへの呼び出しを伴うステップか
    pub fn is_scm(&self) -> bool {
        matches!(
            self,
            SyncStep::ResolveOrganization
                | SyncStep::PromoteOrgRole(_)
                | SyncStep::RemoveFromTeam(_)
                | SyncStep::AddToTeam { .. }
                | SyncStep::ProvisionRepository
        )
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStep::CheckExistingRepository => write!(f, "check existing repository"),
            SyncStep::ResolveOrganization => write!(f, "resolve organization"),
            SyncStep::PromoteOrgRole(role) => write!(f, "set organization role {}", role.as_str()),
            SyncStep::RemoveFromTeam(team) => write!(f, "remove from team {}", team),
            SyncStep::AddToTeam { team, role } => {
                write!(f, "add to team {} as {}", team, role.as_str())
            }
            SyncStep::ProvisionRepository => write!(f, "provision repository"),
            SyncStep::RecordRepository => write!(f, "record repository"),
            SyncStep::Commit(status) => write!(f, "commit {}", status),
        }
    }
}

/// 目標状態ごとの実行手順
///
/// SCMステップは常に `Commit` より前に並ぶため、SCMが失敗した場合に
/// ストアが先行して更新されることはない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    current: Option<EnrollmentStatus>,
    target: EnrollmentStatus,
    steps: Vec<SyncStep>,
}

impl TransitionPlan {
    /// 遷移表から手順を組み立てる
    ///
    /// `current` は記録用で、手順は目標状態のみで決まる。
    pub fn for_transition(
        current: Option<EnrollmentStatus>,
        target: EnrollmentStatus,
        teams: &TeamNames,
    ) -> Result<Self, SyncError> {
        let steps = match target {
            EnrollmentStatus::Rejected | EnrollmentStatus::Pending => vec![SyncStep::Commit(target)],
            EnrollmentStatus::Student => vec![
                SyncStep::CheckExistingRepository,
                SyncStep::ResolveOrganization,
                SyncStep::AddToTeam {
                    team: teams.students.clone(),
                    role: TeamRole::Member,
                },
                SyncStep::ProvisionRepository,
                SyncStep::RecordRepository,
                SyncStep::Commit(target),
            ],
            EnrollmentStatus::Teacher => vec![
                SyncStep::ResolveOrganization,
                SyncStep::PromoteOrgRole(OrgRole::Admin),
                SyncStep::RemoveFromTeam(teams.students.clone()),
                SyncStep::AddToTeam {
                    team: teams.teachers.clone(),
                    role: TeamRole::Maintainer,
                },
                SyncStep::Commit(target),
            ],
            EnrollmentStatus::None => return Err(SyncError::InvalidTransition { target }),
        };

        Ok(Self {
            current,
            target,
            steps,
        })
    }

    pub fn current(&self) -> Option<EnrollmentStatus> {
        self.current
    }

    pub fn target(&self) -> EnrollmentStatus {
        self.target
    }

    pub fn steps(&self) -> &[SyncStep] {
        &self.steps
    }

    /// SCM呼び出しを含むか
    pub fn requires_scm(&self) -> bool {
        self.steps.iter().any(SyncStep::is_scm)
    }
}
