pub mod error;
pub mod result;

pub use error::{EnrollSyncError, ErrorKind};
pub use result::EnrollSyncResult;
