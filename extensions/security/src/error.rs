use thiserror::Error;

pub type SecurityResult<T> = Result<T, SecurityError>;

#[derive(Error, Debug)]
pub enum SecurityError {
    /// Expected control flow: the caller may not proceed.
    #[error("access denied to {element}: {reason}")]
    AccessDenied { element: String, reason: String },

    /// Configuration error; never retried.
    #[error("unknown security rule match type: '{0}'")]
    UnknownComparison(String),

    #[error("decision manager requires at least one voter")]
    NoVoters,

    #[error("failed to read security config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid security config: {0}")]
    Config(#[from] toml::de::Error),
}

impl SecurityError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, SecurityError::AccessDenied { .. })
    }
}
