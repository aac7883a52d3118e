//! Error types for the proxy adapter.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to read upstream file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write upstream file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid upstream name '{group}'")]
    InvalidGroupName { group: String },

    #[error("invalid server host '{host}' in group '{group}'")]
    InvalidHost { group: String, host: String },

    #[error("reload command is empty")]
    EmptyReloadCommand,

    #[error("failed to run reload command '{command}': {reason}")]
    Reload { command: String, reason: String },
}

impl AdapterError {
    /// Whether the request itself was unusable, as opposed to a local failure.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            AdapterError::InvalidGroupName { .. } | AdapterError::InvalidHost { .. }
        )
    }
}
