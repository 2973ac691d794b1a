/// Application services shared by the use cases
pub mod provisioner;
pub mod transition_plan;

pub use provisioner::{Provisioned, Provisioner};
pub use transition_plan::{SyncStep, TeamNames, TransitionPlan};
