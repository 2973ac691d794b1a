use super::github_scm::GithubScm;
use super::gitlab_scm::GitlabScm;
use super::scm_interface::{ScmError, ScmProvider};
use crate::domain::value_objects::scm_type::ScmType;
use crate::infrastructure::filesystem::config_store::ScmSettings;
use std::sync::Arc;
use std::time::Duration;

/// Factory for creating SCM provider instances
pub struct ScmFactory;

impl ScmFactory {
    /// Create the provider selected by `settings`, authenticated with `token`
    pub fn create(settings: &ScmSettings, token: &str) -> Result<Arc<dyn ScmProvider>, ScmError> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or_else(|| settings.provider.default_api_url());

        match settings.provider {
            ScmType::Github => Ok(Arc::new(GithubScm::with_base_url(base_url, token, timeout)?)),
            ScmType::Gitlab => Ok(Arc::new(GitlabScm::with_base_url(base_url, token, timeout)?)),
        }
    }
}
