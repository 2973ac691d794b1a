/// Enrollment store implementations
pub mod file_store;
pub mod memory_store;
pub mod store_interface;

pub use file_store::FileStore;
pub use memory_store::{MemoryStore, StoreState};
pub use store_interface::{EnrollmentStore, OptionExt, StoreError};
