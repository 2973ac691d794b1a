use crate::common::error::ErrorKind;
use crate::domain::entities::{Course, Enrollment, RepoType, RepositoryQuery, User};
use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use crate::infrastructure::scm::{CreateDirectoryOptions, Directory, ScmContext, ScmError, ScmProvider};
use crate::infrastructure::store::{EnrollmentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// コース操作のエラー
#[derive(Debug, Error)]
pub enum CourseError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scm(#[from] ScmError),

    #[error("Expected exactly one {repo_type} repository for course {course_id}, found {found}")]
    AmbiguousRepository {
        course_id: u64,
        repo_type: RepoType,
        found: usize,
    },
}

impl CourseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::Scm(e) => e.kind(),
            Self::AmbiguousRepository { found: 0, .. } => ErrorKind::NotFound,
            Self::AmbiguousRepository { .. } => ErrorKind::Internal,
        }
    }
}

/// コースと受講登録の参照・管理
pub struct CourseService {
    store: Arc<dyn EnrollmentStore>,
}

impl CourseService {
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self { store }
    }

    /// PENDING状態の受講登録を作成する
    pub async fn create_enrollment(&self, user_id: u64, course_id: u64) -> Result<Enrollment, CourseError> {
        self.store.get_course(course_id).await?;
        self.store.get_user(user_id).await?;
        let enrollment = self.store.create_enrollment(user_id, course_id).await?;
        info!(user_id, course_id, "enrollment requested");
        Ok(enrollment)
    }

    /// コースを更新する
    ///
    /// 保存前にSCM側のorganizationがまだ存在することを確認する。
    pub async fn update_course(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        course: &Course,
    ) -> Result<(), CourseError> {
        self.store.get_course(course.id).await?;
        let org = scm.get_organization(ctx, course.organization_id).await?;
        debug!(course_id = course.id, org = %org.path, "organization still resolves");
        self.store.update_course(course).await?;
        Ok(())
    }

    pub async fn get_course(&self, course_id: u64) -> Result<Course, CourseError> {
        Ok(self.store.get_course(course_id).await?)
    }

    pub async fn get_courses(&self) -> Result<Vec<Course>, CourseError> {
        Ok(self.store.get_courses().await?)
    }

    /// ユーザーが指定状態で登録しているコース（空なら全状態）
    pub async fn get_courses_by_user(
        &self,
        user_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Course>, CourseError> {
        Ok(self.store.get_courses_by_user(user_id, statuses).await?)
    }

    pub async fn get_enrollment(&self, user_id: u64, course_id: u64) -> Result<Enrollment, CourseError> {
        Ok(self.store.get_enrollment(user_id, course_id).await?)
    }

    /// コースの受講登録一覧
    ///
    /// `filter_out_group_members` が真の場合、グループ所属者を除外する。
    pub async fn get_enrollments_by_course(
        &self,
        course_id: u64,
        statuses: &[EnrollmentStatus],
        filter_out_group_members: bool,
    ) -> Result<Vec<Enrollment>, CourseError> {
        let enrollments = self
            .store
            .get_enrollments_by_course(course_id, statuses)
            .await?;
        Ok(enrollments
            .into_iter()
            .filter(|e| !(filter_out_group_members && e.has_group()))
            .collect())
    }

    /// リポジトリのURLを返す
    ///
    /// USERリポジトリは `current_user` のものに限定する。
    pub async fn get_repository_url(
        &self,
        current_user: &User,
        course_id: u64,
        repo_type: RepoType,
    ) -> Result<String, CourseError> {
        let course = self.store.get_course(course_id).await?;
        let mut query = RepositoryQuery::of_type(course.organization_id, repo_type);
        if repo_type == RepoType::User {
            query = query.for_user(current_user.id);
        }

        let mut repos = self.store.get_repositories(&query).await?;
        if repos.len() != 1 {
            return Err(CourseError::AmbiguousRepository {
                course_id,
                repo_type,
                found: repos.len(),
            });
        }
        Ok(repos.remove(0).html_url)
    }

    pub async fn list_directories(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
    ) -> Result<Vec<Directory>, CourseError> {
        Ok(scm.list_directories(ctx).await?)
    }

    /// コース用ディレクトリを作成する（公開グループ）
    pub async fn create_directory(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        name: &str,
        path: &str,
    ) -> Result<Directory, CourseError> {
        let scm_type = scm.scm_type();
        if !scm_type.supports_directory_creation() {
            return Err(ScmError::unsupported_operation(scm_type, "create_directory").into());
        }
        let opts = CreateDirectoryOptions {
            name: name.to_string(),
            path: path.to_string(),
            public: true,
        };
        let directory = scm.create_directory(ctx, &opts).await?;
        info!(directory_id = directory.id, path = %directory.path, "directory created");
        Ok(directory)
    }

    pub async fn get_directory(
        &self,
        ctx: &ScmContext,
        scm: &dyn ScmProvider,
        id: u64,
    ) -> Result<Directory, CourseError> {
        Ok(scm.get_directory(ctx, id).await?)
    }
}
