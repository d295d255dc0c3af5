use thiserror::Error;

pub type Result<T, E = RaidscopeError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum RaidscopeError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("scraper error: {0}")]
    Scraper(String),
    #[error("tracker error: {0}")]
    Tracker(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
