/// Filesystem-backed configuration
pub mod config_store;

pub use config_store::{AppConfig, ConfigStore, ConfigStoreError};
