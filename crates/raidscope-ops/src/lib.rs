//! Operational helpers: logging, persistence backends, the observation log.

use std::path::PathBuf;

use raidscope_types::{config::OpsConfig, RaidscopeError, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod persistence;
pub mod store;

pub use persistence::{JsonFileStore, MemoryStore, PersistenceStore};
pub use store::ObservationStore;

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| RaidscopeError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| RaidscopeError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// Creates the directory that will hold the state file, if it has one.
pub fn ensure_state_dir(state_path: &str) -> Result<PathBuf> {
    let path = PathBuf::from(state_path);
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|err| RaidscopeError::Ops(format!("failed to create state dir: {err}")))?;
        info!(dir = %dir.display(), "State directory ready");
    }
    Ok(path)
}
