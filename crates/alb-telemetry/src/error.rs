//! Error types for the telemetry feed.

use std::time::Duration;

use thiserror::Error;

/// A remote command could not produce output.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("Process exited with code {code:?}. Error log:\n{stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// A sample could not be obtained for one node.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to collect a {metric} for the '{host}' - {source}")]
    Exec {
        metric: &'static str,
        host: String,
        source: ExecError,
    },

    #[error("Failed to collect a {metric} for the '{host}' - unexpected output '{output}'")]
    Unparsable {
        metric: &'static str,
        host: String,
        output: String,
    },

    #[error("Failed to collect a {metric} for the '{host}' - no answer within {timeout:?}")]
    TimedOut {
        metric: &'static str,
        host: String,
        timeout: Duration,
    },

    #[error("Failed to collect a {metric} for the '{host}' - not a usable host name")]
    InvalidHost { metric: &'static str, host: String },
}

/// The registry could not be read or updated.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to load node groups: {0}")]
    Fetch(String),

    #[error("failed to update '{attribute}' of '{node}' in group '{group}': {reason}")]
    Update {
        group: String,
        node: String,
        attribute: String,
        reason: String,
    },
}
