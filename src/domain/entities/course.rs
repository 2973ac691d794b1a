use crate::domain::value_objects::scm_type::ScmType;
use serde::{Deserialize, Serialize};

/// Course whose repositories and teams live in one SCM directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,

    /// SCM-side directory (organization or group) identifier
    pub organization_id: u64,

    pub name: String,

    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub year: u32,

    #[serde(default)]
    pub tag: String,

    /// Provider hosting `organization_id`
    #[serde(default)]
    pub provider: ScmType,
}

impl Course {
    pub fn new(id: u64, organization_id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            organization_id,
            name: name.into(),
            code: String::new(),
            year: 0,
            tag: String::new(),
            provider: ScmType::default(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_provider(mut self, provider: ScmType) -> Self {
        self.provider = provider;
        self
    }
}
