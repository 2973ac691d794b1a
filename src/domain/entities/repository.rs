use serde::{Deserialize, Serialize};
use std::fmt;

/// リポジトリの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    /// 学生個人のリポジトリ
    User,
    /// 学習グループのリポジトリ
    Group,
    /// コース情報リポジトリ
    CourseInfo,
    /// 課題リポジトリ
    Assignments,
    /// テストリポジトリ
    Tests,
    /// 解答リポジトリ
    Solutions,
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepoType::User => "user",
            RepoType::Group => "group",
            RepoType::CourseInfo => "courseinfo",
            RepoType::Assignments => "assignments",
            RepoType::Tests => "tests",
            RepoType::Solutions => "solutions",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for RepoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(RepoType::User),
            "group" => Ok(RepoType::Group),
            "courseinfo" | "course-info" => Ok(RepoType::CourseInfo),
            "assignments" => Ok(RepoType::Assignments),
            "tests" => Ok(RepoType::Tests),
            "solutions" => Ok(RepoType::Solutions),
            _ => Err(format!("Unknown repository type: '{}'", s)),
        }
    }
}

/// ローカルに記録されたリポジトリ
///
/// USER種別は (organization_id, user_id) ごとに一意。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// SCM側のディレクトリID
    pub organization_id: u64,

    /// 所有ユーザーID（USER種別以外では0）
    #[serde(default)]
    pub user_id: u64,

    /// 所有グループID（GROUP種別のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,

    /// リポジトリ種別
    pub repo_type: RepoType,

    /// SCM側のリポジトリID
    pub repository_id: u64,

    /// ブラウザ用URL
    pub html_url: String,
}

impl Repository {
    /// 学生個人のリポジトリレコードを作成
    pub fn user_repo(
        organization_id: u64,
        user_id: u64,
        repository_id: u64,
        html_url: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            user_id,
            group_id: None,
            repo_type: RepoType::User,
            repository_id,
            html_url: html_url.into(),
        }
    }
}

/// リポジトリ検索条件（Noneのフィールドは条件にしない）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryQuery {
    pub organization_id: Option<u64>,
    pub user_id: Option<u64>,
    pub repo_type: Option<RepoType>,
}

impl RepositoryQuery {
    /// 指定ユーザーのUSERリポジトリを検索する条件
    pub fn user_repo(organization_id: u64, user_id: u64) -> Self {
        Self {
            organization_id: Some(organization_id),
            user_id: Some(user_id),
            repo_type: Some(RepoType::User),
        }
    }

    /// ディレクトリ内の指定種別を検索する条件
    pub fn of_type(organization_id: u64, repo_type: RepoType) -> Self {
        Self {
            organization_id: Some(organization_id),
            user_id: None,
            repo_type: Some(repo_type),
        }
    }

    /// ユーザーで絞り込む
    pub fn for_user(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// 条件に一致するか
    pub fn matches(&self, repo: &Repository) -> bool {
        self.organization_id.map_or(true, |id| id == repo.organization_id)
            && self.user_id.map_or(true, |id| id == repo.user_id)
            && self.repo_type.map_or(true, |t| t == repo.repo_type)
    }
}
