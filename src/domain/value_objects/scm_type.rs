use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hosted SCM provider backing a course organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmType {
    /// GitHub (organizations and teams)
    Github,
    /// GitLab (groups and subgroups)
    Gitlab,
}

impl Default for ScmType {
    fn default() -> Self {
        Self::Github
    }
}

impl fmt::Display for ScmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmType::Github => write!(f, "github"),
            ScmType::Gitlab => write!(f, "gitlab"),
        }
    }
}

impl FromStr for ScmType {
    type Err = ScmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" | "gh" => Ok(ScmType::Github),
            "gitlab" | "gl" => Ok(ScmType::Gitlab),
            _ => Err(ScmTypeError::UnsupportedScmType(s.to_string())),
        }
    }
}

impl ScmType {
    /// Public API root used when no base URL is configured
    pub fn default_api_url(&self) -> &'static str {
        match self {
            ScmType::Github => "https://api.github.com/",
            ScmType::Gitlab => "https://gitlab.com/api/v4/",
        }
    }

    /// Environment variable conventionally holding the access token
    pub fn default_token_env(&self) -> &'static str {
        match self {
            ScmType::Github => "GITHUB_TOKEN",
            ScmType::Gitlab => "GITLAB_TOKEN",
        }
    }

    /// Whether organizations (directories) can be created through the API
    pub fn supports_directory_creation(&self) -> bool {
        match self {
            ScmType::Github => false, // orgs are created through the web UI only
            ScmType::Gitlab => true,
        }
    }
}

/// Errors that can occur when working with SCM types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScmTypeError {
    /// The specified SCM type is not supported
    UnsupportedScmType(String),
}

impl fmt::Display for ScmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmTypeError::UnsupportedScmType(scm) => {
                write!(f, "Unsupported SCM type: '{}'. Supported types are: github, gitlab", scm)
            }
        }
    }
}

impl std::error::Error for ScmTypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scm_type_from_str() {
        assert_eq!("github".parse::<ScmType>().unwrap(), ScmType::Github);
        assert_eq!("GitHub".parse::<ScmType>().unwrap(), ScmType::Github);
        assert_eq!("gitlab".parse::<ScmType>().unwrap(), ScmType::Gitlab);
        assert_eq!("gl".parse::<ScmType>().unwrap(), ScmType::Gitlab);

        assert!("bitbucket".parse::<ScmType>().is_err());
    }

    #[test]
    fn test_scm_type_display() {
        assert_eq!(ScmType::Github.to_string(), "github");
        assert_eq!(ScmType::Gitlab.to_string(), "gitlab");
    }

    #[test]
    fn test_scm_capabilities() {
        assert!(!ScmType::Github.supports_directory_creation());
        assert!(ScmType::Gitlab.supports_directory_creation());
        assert_eq!(ScmType::Github.default_token_env(), "GITHUB_TOKEN");
        assert!(ScmType::Gitlab.default_api_url().ends_with("/api/v4/"));
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&ScmType::Gitlab).unwrap();
        assert_eq!(json, "\"gitlab\"");

        let deserialized: ScmType = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ScmType::Gitlab);
    }
}
