//! Error types for propagation.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single outbound HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to encode request body: {0}")]
    Encode(String),

    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("http handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
}

/// The proxy could not be told about a group's new state.
///
/// The registry mutation that triggered the push has already been applied.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to submit node group '{group}' to the proxy: {reason}")]
    Propagation { group: String, reason: String },
}

impl SyncError {
    pub fn propagation(group: &str, reason: impl ToString) -> Self {
        SyncError::Propagation {
            group: group.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn group(&self) -> &str {
        match self {
            SyncError::Propagation { group, .. } => group,
        }
    }
}
