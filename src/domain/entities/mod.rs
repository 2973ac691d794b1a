pub mod course;
pub mod enrollment;
pub mod repository;
pub mod user;

pub use course::Course;
pub use enrollment::Enrollment;
pub use repository::{RepoType, Repository, RepositoryQuery};
pub use user::User;
