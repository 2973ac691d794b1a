use super::memory_store::{MemoryStore, StoreState};
use super::store_interface::{EnrollmentStore, StoreError};
use crate::domain::entities::{Course, Enrollment, Repository, RepositoryQuery, User};
use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Store persisted as a YAML snapshot
///
/// Every successful write rewrites the whole file. A write is applied to a
/// scratch copy, the copy is written to a sibling temporary file and renamed
/// into place, and only then does it replace the in-memory state.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the snapshot at `path`; a missing file yields an empty store
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => StoreState::default(),
            Ok(content) => serde_yaml::from_str(&content).map_err(|e| {
                StoreError::persistence(format!("failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => {
                return Err(StoreError::persistence(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            path,
            inner: MemoryStore::from_state(state)?,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> StoreState {
        self.inner.snapshot().await
    }

    /// Insert or replace a user and persist
    pub async fn put_user(&self, user: User) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.put_user(user).await;
        self.commit(scratch).await
    }

    /// Insert or replace a course and persist
    pub async fn put_course(&self, course: Course) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.put_course(course).await;
        self.commit(scratch).await
    }

    /// Take the write lock and a scratch copy of the current state
    async fn stage(&self) -> Result<(MutexGuard<'_, ()>, MemoryStore), StoreError> {
        let guard = self.write_lock.lock().await;
        let scratch = MemoryStore::from_state(self.inner.snapshot().await)?;
        Ok((guard, scratch))
    }

    /// Persist `scratch`, then publish it
    async fn commit(&self, scratch: MemoryStore) -> Result<(), StoreError> {
        let state = scratch.into_state();
        self.persist(&state).await?;
        self.inner.replace(state).await;
        Ok(())
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let yaml = serde_yaml::to_string(state)
            .map_err(|e| StoreError::persistence(format!("failed to serialize store: {}", e)))?;

        let tmp = self.path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, yaml).await.map_err(|e| {
            StoreError::persistence(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StoreError::persistence(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), "store snapshot written");
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for FileStore {
    async fn create_enrollment(
        &self,
        user_id: u64,
        course_id: u64,
    ) -> Result<Enrollment, StoreError> {
        let (_guard, scratch) = self.stage().await?;
        let enrollment = scratch.create_enrollment(user_id, course_id).await?;
        self.commit(scratch).await?;
        Ok(enrollment)
    }

    async fn get_enrollment(&self, user_id: u64, course_id: u64) -> Result<Enrollment, StoreError> {
        self.inner.get_enrollment(user_id, course_id).await
    }

    async fn get_enrollments_by_course(
        &self,
        course_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Enrollment>, StoreError> {
        self.inner.get_enrollments_by_course(course_id, statuses).await
    }

    async fn set_pending(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.set_pending(user_id, course_id).await?;
        self.commit(scratch).await
    }

    async fn reject_enrollment(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.reject_enrollment(user_id, course_id).await?;
        self.commit(scratch).await
    }

    async fn enroll_student(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.enroll_student(user_id, course_id).await?;
        self.commit(scratch).await
    }

    async fn enroll_teacher(&self, user_id: u64, course_id: u64) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.enroll_teacher(user_id, course_id).await?;
        self.commit(scratch).await
    }

    async fn get_repositories(
        &self,
        query: &RepositoryQuery,
    ) -> Result<Vec<Repository>, StoreError> {
        self.inner.get_repositories(query).await
    }

    async fn create_repository(&self, repository: &Repository) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.create_repository(repository).await?;
        self.commit(scratch).await
    }

    async fn get_course(&self, course_id: u64) -> Result<Course, StoreError> {
        self.inner.get_course(course_id).await
    }

    async fn get_courses(&self) -> Result<Vec<Course>, StoreError> {
        self.inner.get_courses().await
    }

    async fn get_courses_by_user(
        &self,
        user_id: u64,
        statuses: &[EnrollmentStatus],
    ) -> Result<Vec<Course>, StoreError> {
        self.inner.get_courses_by_user(user_id, statuses).await
    }

    async fn update_course(&self, course: &Course) -> Result<(), StoreError> {
        let (_guard, scratch) = self.stage().await?;
        scratch.update_course(course).await?;
        self.commit(scratch).await
    }

    async fn get_user(&self, user_id: u64) -> Result<User, StoreError> {
        self.inner.get_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("state.yaml")).await.unwrap();
        assert_eq!(store.snapshot().await, StoreState::default());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");

        {
            let store = FileStore::open(&path).await.unwrap();
            store.put_course(Course::new(7, 100, "Operating Systems")).await.unwrap();
            store.create_enrollment(42, 7).await.unwrap();
            store.enroll_student(42, 7).await.unwrap();
            store
                .create_repository(&Repository::user_repo(100, 42, 9001, "https://example.com/r"))
                .await
                .unwrap();
        }

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Student
        );
        assert_eq!(
            reopened
                .get_repositories(&RepositoryQuery::user_repo(100, 42))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_write_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        let store = FileStore::open(&path).await.unwrap();

        assert!(store.enroll_student(42, 7).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        let store = FileStore::open(&path).await.unwrap();
        store.put_course(Course::new(7, 100, "Operating Systems")).await.unwrap();
        store.create_enrollment(42, 7).await.unwrap();

        // The rename onto a directory fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = store.enroll_student(42, 7).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence { .. }));
        assert_eq!(
            store.get_enrollment(42, 7).await.unwrap().status,
            EnrollmentStatus::Pending
        );

        let err = store.put_user(User::new(42, "alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence { .. }));
        assert!(store.snapshot().await.users.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.yaml");
        std::fs::write(&path, "enrollments: [not, a, list, of, records").unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence { .. }));
    }
}
