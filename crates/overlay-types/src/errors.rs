use thiserror::Error;

pub type Result<T, E = OverlayError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("source not available: {0}")]
    Discovery(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("rule error: {0}")]
    Rule(String),
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("orchestrator error: {0}")]
    Orchestrator(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OverlayError {
    /// Discovery and fetch failures both mean "no usable connection to the client".
    pub fn is_connection(&self) -> bool {
        matches!(self, OverlayError::Discovery(_) | OverlayError::Fetch(_))
    }
}
