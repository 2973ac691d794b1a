//! Test fixtures
//!
//! Course 7 lives in organization 100 ("dat320"); users 42 (alice) and
//! 43 (bob) have PENDING enrollments in it.

use super::mock_services::{CountingStore, RecordingScm};
use enrollsync::application::use_cases::EnrollmentSynchronizer;
use enrollsync::domain::entities::{Course, Repository, User};
use enrollsync::domain::value_objects::EnrollmentStatus;
use enrollsync::infrastructure::store::{EnrollmentStore, MemoryStore};
use std::sync::Arc;

pub const ORG_ID: u64 = 100;
pub const COURSE_ID: u64 = 7;
pub const ALICE: u64 = 42;
pub const BOB: u64 = 43;

pub fn course() -> Course {
    Course::new(COURSE_ID, ORG_ID, "Operating Systems").with_code("DAT320")
}

pub struct Fixture {
    pub store: Arc<CountingStore>,
    pub scm: RecordingScm,
    pub sync: EnrollmentSynchronizer,
}

impl Fixture {
    pub async fn new() -> Self {
        let memory = MemoryStore::new();
        memory.put_user(User::new(ALICE, "alice")).await;
        memory.put_user(User::new(BOB, "bob")).await;
        memory.put_course(course()).await;
        memory.create_enrollment(ALICE, COURSE_ID).await.unwrap();
        memory.create_enrollment(BOB, COURSE_ID).await.unwrap();

        let store = Arc::new(CountingStore::new(memory));
        let sync = EnrollmentSynchronizer::new(store.clone());
        Self {
            store,
            scm: RecordingScm::new(),
            sync,
        }
    }

    /// Put an enrollment into `status` without going through the synchronizer
    pub async fn force_status(&self, user_id: u64, status: EnrollmentStatus) {
        let store = self.store.inner();
        match status {
            EnrollmentStatus::Pending => store.set_pending(user_id, COURSE_ID).await.unwrap(),
            EnrollmentStatus::Rejected => store.reject_enrollment(user_id, COURSE_ID).await.unwrap(),
            EnrollmentStatus::Student => store.enroll_student(user_id, COURSE_ID).await.unwrap(),
            EnrollmentStatus::Teacher => store.enroll_teacher(user_id, COURSE_ID).await.unwrap(),
            EnrollmentStatus::None => {}
        }
    }

    /// Record an existing USER repository for the user in organization 100
    pub async fn seed_user_repository(&self, user_id: u64) {
        let repo = Repository::user_repo(
            ORG_ID,
            user_id,
            8000 + user_id,
            format!("https://github.com/dat320/user-{}-labs", user_id),
        );
        self.store.inner().create_repository(&repo).await.unwrap();
    }

    pub async fn status(&self, user_id: u64) -> EnrollmentStatus {
        self.store
            .inner()
            .get_enrollment(user_id, COURSE_ID)
            .await
            .unwrap()
            .status
    }
}
