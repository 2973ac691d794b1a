use super::store_interface::{enrollment_entity, EnrollmentStore, OptionExt, StoreError};
use crate::domain::entities::{Course, Enrollment, RepoType, Repository, RepositoryQuery, User};
use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Serializable contents of a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub courses: Vec<Course>,

    #[serde(default)]
    pub enrollments: Vec<Enrollment>,

    #[serde(default)]
    pub repositories: Vec<Repository>,
}

fn status_matches(statuses: &[EnrollmentStatus], status: EnrollmentStatus) -> bool {
    statuses.is_empty() || statuses.contains(&status)
}

impl StoreState {
    fn enrollment_mut(&mut self, user_id: u64, course_id: u64) -> Result<&mut Enrollment, StoreError> {
        self.enrollments
            .iter_mut()
            .find(|e| e.is_same_pair(user_id, course_id))
            .ok_or_not_found(|| enrollment_entity(user_id, course_id))
    }

    fn set_status(
        &mut self,
        user_id: u64,
        course_id: u64,
        status: EnrollmentStatus,
    ) -> Result<(), StoreError> {
        self.enrollment_mut(user_id, course_id)?.status = status;
        Ok(())
    }

    /// Check whether a new record would break a uniqueness rule
    fn validate_unique(&self) -> Result<(), StoreError> {
        for (i, e) in self.enrollments.iter().enumerate() {
            if self.enrollments[..i]
                .iter()
                .any(|other| other.is_same_pair(e.user_id, e.course_id))
            {
                return Err(StoreError::conflict(enrollment_entity(e.user_id, e.course_id)));
            }
        }
        Ok(())
    }
}

/// In-process store guarded by a tokio `RwLock`
///
/// Enforces one enrollment per (user, course) and one USER repository per
/// (organization, user).
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a previously captured state
    pub fn from_state(state: StoreState) -> Result<Self, StoreError> {
        state.validate_unique()?;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    pub(crate) fn into_state(self) -> StoreState {
        self.state.into_inner()
    }

    /// Swap in a state that was validated elsewhere
    pub(crate) async fn replace(&self, state: StoreState) {
        *self.state.write().await = state;
    }

    /// Insert or replace a user record
    pub async fn put_user(&self, user: User) {
        let mut state = self.state.write().await;
        state.users.retain(|u| u.id != user.id);
        state.users.push(user);
    }

    /// Insert or replace a course record
    pub async fn put_course(&self, course: Course) {
        let mut state = self.state.write().await;
        state.courses.retain(|c| c.id != course.id);
        state.courses.push(course);
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn create_enrollment(
        &self,
        user_id: u64,
        course_id: u64,
    ) -> Result<Enrollment, StoreError> {
        let mut state = self.state.write().await;
        if state
            .enrollments
            .iter()
            .any(|e| e.is_same_pair(user_id, course_id))
        {
            return Err(StoreError::conflict(enrollment_entity(user_id, course_id)));
        }
        let enrollment = Enrollment::pending(user_id, course_id);
        state.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn get_enrollment(&self, user_id: u64, course_id: u64) -> Result<Enrollment, StoreError> {
        self.state
            .read()
            .await
            .enrollments
            .iter()
            .find(|e| e.is_same_pair(user_id, course_id))
            .cloned()
            .ok_or_not_found(|| enrollment_entity(user_id, course_id))
    }

    async fn get_enrollments_by_course(
        &self,
        course_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Enrollment>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id && status_matches(statuses, e.status))
            .cloned()
            .collect())
    }

    async fn set_pending(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .set_status(user_id, course_id, EnrollmentStatus::Pending)
    }

    async fn reject_enrollment(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .set_status(user_id, course_id, EnrollmentStatus::Rejected)
    }

    async fn enroll_student(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .set_status(user_id, course_id, EnrollmentStatus::Student)
    }

    async fn enroll_teacher(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .set_status(user_id, course_id, EnrollmentStatus::Teacher)
    }

    async fn get_repositories(
        &self,
        query: &RepositoryQuery,
    ) -> Result<Vec<Repository>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .repositories
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn create_repository(&self, repository: &Repository) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if repository.repo_type == RepoType::User
            && state.repositories.iter().any(|r| {
                r.repo_type == RepoType::User
                    && r.organization_id == repository.organization_id
                    && r.user_id == repository.user_id
            })
        {
            return Err(StoreError::conflict(format!(
                "user repository (organization {}, user {})",
                repository.organization_id, repository.user_id
            )));
        }
        state.repositories.push(repository.clone());
        Ok(())
    }

    async fn get_course(&self, course_id: u64) -> Result<Course, StoreError> {
        self.state
            .read()
            .await
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_not_found(|| format!("course {}", course_id))
    }

    async fn get_courses(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.state.read().await.courses.clone())
    }

    async fn get_courses_by_user(
        &self,
        user_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Course>, StoreError> {
        let state = self.state.read().await;
        let course_ids: Vec<u64> = state
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id && status_matches(statuses, e.status))
            .map(|e| e.course_id)
            .collect();
        Ok(state
            .courses
            .iter()
            .filter(|c| course_ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let existing = state
            .courses
            .iter_mut()
            .find(|c| c.id == course.id)
            .ok_or_not_found(|| format!("course {}", course.id))?;
        *existing = course.clone();
        Ok(())
    }

    async fn get_user(&self, user_id: u64) -> Result<User, StoreError> {
        self.state
            .read()
            .await
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_not_found(|| format!("user {}", user_id))
    }
}
