use crate::error::SecurityResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for the default decision managers of
/// [`SecurityFlowExecutionListener`](crate::SecurityFlowExecutionListener).
///
/// ```toml
/// role-prefix = "ROLE_"
/// allow-if-all-abstain = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Attributes starting with this prefix are treated as roles.
    pub role_prefix: String,
    /// Grant when every voter abstains.
    pub allow_if_all_abstain: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            role_prefix: crate::voter::RoleVoter::DEFAULT_PREFIX.to_string(),
            allow_if_all_abstain: false,
        }
    }
}

impl SecurityConfig {
    pub fn from_toml_str(source: &str) -> SecurityResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> SecurityResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
