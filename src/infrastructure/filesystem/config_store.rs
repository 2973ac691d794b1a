use crate::domain::value_objects::repo_name::{StudentRepoName, DEFAULT_STUDENT_REPO_SUFFIX};
use crate::domain::value_objects::scm_type::ScmType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "enrollsync.yaml";

/// Default location of the file-backed store
pub const DEFAULT_STORE_PATH: &str = "enrollsync-state.yaml";

/// Configuration store related errors
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Configuration file not found at path: {0}")]
    ConfigFileNotFound(String),

    #[error("Configuration file read failed: {0}")]
    ReadFailed(String),

    #[error("Configuration file write failed: {0}")]
    WriteFailed(String),

    #[error("YAML parsing failed: {0}")]
    YamlParsingFailed(String),

    #[error("YAML serialization failed: {0}")]
    YamlSerializationFailed(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Configuration directory creation failed: {0}")]
    DirectoryCreationFailed(String),

    #[error("No SCM token configured; set scm.token or the {0} environment variable")]
    MissingToken(String),
}

/// SCM provider connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScmSettings {
    pub provider: ScmType,

    /// API root; the provider's public instance when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub base_url: Option<String>,

    /// Inline token. Prefer `token_env` outside of local testing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the token
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    pub token_env: Option<String>,

    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

impl Default for ScmSettings {
    fn default() -> Self {
        Self {
            provider: ScmType::default(),
            base_url: None,
            token: None,
            token_env: None,
            timeout_secs: 30,
        }
    }
}

impl ScmSettings {
    /// Name of the environment variable consulted for the token
    pub fn token_variable(&self) -> &str {
        self.token_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_token_env())
    }

    /// Resolve the token from the inline value or the process environment
    pub fn resolve_token(&self) -> Result<String, ConfigStoreError> {
        self.resolve_token_with(|name| std::env::var(name).ok())
    }

    /// Resolve the token using `lookup` in place of the process environment
    pub fn resolve_token_with<F>(&self, lookup: F) -> Result<String, ConfigStoreError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if let Some(token) = self.token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(token.to_string());
        }
        let variable = self.token_variable();
        lookup(variable)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigStoreError::MissingToken(variable.to_string()))
    }
}

/// Names of the course-wide teams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TeamSettings {
    #[validate(length(min = 1, max = 100))]
    pub students: String,

    #[validate(length(min = 1, max = 100))]
    pub teachers: String,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            students: "students".to_string(),
            teachers: "teachers".to_string(),
        }
    }
}

/// Per-student repository settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RepositorySettings {
    #[validate(length(min = 1, max = 40))]
    pub suffix: String,

    pub private: bool,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_STUDENT_REPO_SUFFIX.to_string(),
            private: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

/// Contents of `enrollsync.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub scm: ScmSettings,

    #[validate(nested)]
    pub teams: TeamSettings,

    #[validate(nested)]
    pub repositories: RepositorySettings,

    pub store: StoreSettings,
}

/// Configuration store for reading and writing `enrollsync.yaml`
pub struct ConfigStore {
    validate_on_read: bool,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            validate_on_read: true,
        }
    }

    /// Create a store that skips validation when reading
    pub fn without_validation() -> Self {
        Self {
            validate_on_read: false,
        }
    }

    /// Read configuration from a YAML file
    pub fn read_config<P: AsRef<Path>>(&self, config_path: P) -> Result<AppConfig, ConfigStoreError> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Err(ConfigStoreError::ConfigFileNotFound(
                config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(config_path)
            .map_err(|e| ConfigStoreError::ReadFailed(e.to_string()))?;

        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ConfigStoreError::YamlParsingFailed(e.to_string()))?
        };

        if self.validate_on_read {
            self.validate_config(&config)?;
        }

        Ok(config)
    }

    /// Read configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(&self, config_path: P) -> Result<AppConfig, ConfigStoreError> {
        match self.read_config(config_path) {
            Err(ConfigStoreError::ConfigFileNotFound(_)) => Ok(AppConfig::default()),
            other => other,
        }
    }

    /// Write configuration to a YAML file
    pub fn write_config<P: AsRef<Path>>(
        &self,
        config_path: P,
        config: &AppConfig,
    ) -> Result<(), ConfigStoreError> {
        let config_path = config_path.as_ref();

        self.validate_config(config)?;

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigStoreError::DirectoryCreationFailed(e.to_string()))?;
        }

        let yaml_content = serde_yaml::to_string(config)
            .map_err(|e| ConfigStoreError::YamlSerializationFailed(e.to_string()))?;

        fs::write(config_path, yaml_content)
            .map_err(|e| ConfigStoreError::WriteFailed(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate_config(&self, config: &AppConfig) -> Result<(), ConfigStoreError> {
        config
            .validate()
            .map_err(|e| ConfigStoreError::ValidationFailed(e.to_string()))?;

        // The suffix must produce valid repository names
        StudentRepoName::with_suffix("user", &config.repositories.suffix)
            .map_err(|e| ConfigStoreError::ValidationFailed(format!("repositories.suffix: {}", e)))?;

        if config.teams.students == config.teams.teachers {
            return Err(ConfigStoreError::ValidationFailed(
                "teams.students and teams.teachers must differ".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
