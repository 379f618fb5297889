use crate::listener::Phase;
use thiserror::Error;

pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("invalid flow definition: {0}")]
    Definition(String),

    /// A guarded phase (session creation, state entry, transition) was aborted
    /// by a listener. `source` keeps the listener's concrete error.
    #[error("{phase} vetoed for {element}")]
    Vetoed {
        phase: Phase,
        element: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("listener failed during {phase} for {element}")]
    Listener {
        phase: Phase,
        element: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("state '{state}' has no transition on '{event}'")]
    NoTransition { state: String, event: String },

    #[error("failed to read flow definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse flow definition: {0}")]
    Parse(#[from] toml::de::Error),
}

impl FlowError {
    /// The listener error behind a veto or listener failure, if any.
    pub fn listener_source(&self) -> Option<&anyhow::Error> {
        match self {
            FlowError::Vetoed { source, .. } | FlowError::Listener { source, .. } => Some(source),
            _ => None,
        }
    }
}
