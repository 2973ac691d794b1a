//! # enrollsync - course enrollment mirrored onto hosted SCM providers
//!
//! `enrollsync` keeps a course's enrollment records and its GitHub organization
//! or GitLab group in step. Accepting a student adds them to the course's
//! students team and provisions a personal repository plus a single-member
//! team; promoting a teacher makes them an organization owner and moves them to
//! the teachers team. The store is only updated after the SCM side has
//! accepted every change.
//!
//! ## Quick Start
//!
//! 1. Create a configuration file (`enrollsync.yaml`):
//!
//! ```yaml
//! scm:
//!   provider: github
//!   token_env: GITHUB_TOKEN
//! teams:
//!   students: students
//!   teachers: teachers
//! ```
//!
//! 2. Register a course and a user, then accept the enrollment:
//!
//! ```bash
//! enrollsync add-course --id 7 --org 100 --name "Operating Systems"
//! enrollsync add-user --id 42 --login alice
//! enrollsync enroll --user 42 --course 7
//! enrollsync transition --user 42 --course 7 --status student
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: enrollments, courses, users, repositories and their value objects
//! - [`application`]: the transition table, the provisioner and the use cases
//! - [`infrastructure`]: SCM providers, enrollment stores and configuration
//! - [`presentation`]: CLI interface
//! - [`common`]: crate-wide error and result types
//!
//! ## Using the Library
//!
//! ```rust,no_run
//! use enrollsync::application::use_cases::EnrollmentSynchronizer;
//! use enrollsync::domain::value_objects::EnrollmentStatus;
//! use enrollsync::infrastructure::filesystem::ConfigStore;
//! use enrollsync::infrastructure::scm::{ScmContext, ScmFactory};
//! use enrollsync::infrastructure::store::FileStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> enrollsync::Result<()> {
//! let store = Arc::new(FileStore::open("enrollsync-state.yaml").await?);
//! let config = ConfigStore::new().load_or_default("enrollsync.yaml")?;
//! let scm = ScmFactory::create(&config.scm, &config.scm.resolve_token()?)?;
//!
//! let sync = EnrollmentSynchronizer::new(store);
//! let ctx = ScmContext::with_timeout(Duration::from_secs(60));
//! let enrollment = sync
//!     .update_enrollment(&ctx, scm.as_ref(), 42, 7, EnrollmentStatus::Student)
//!     .await?;
//!
//! println!("user {} is now {}", enrollment.user_id, enrollment.status);
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::common::error::{EnrollSyncError, ErrorKind};
pub use crate::common::result::EnrollSyncResult as Result;
