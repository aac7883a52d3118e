//! Proxy reload trigger.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::AdapterError;

/// Makes the proxy pick up a rewritten upstream file.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> Result<(), AdapterError>;
}

/// Runs a shell-style command line, e.g. `service nginx reload`.
///
/// The command is split on whitespace; no shell is involved.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    program: String,
    args: Vec<String>,
}

impl CommandReloader {
    pub fn parse(command: &str) -> Result<Self, AdapterError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(AdapterError::EmptyReloadCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Reloader for CommandReloader {
    async fn reload(&self) -> Result<(), AdapterError> {
        let command = self.command_line();
        debug!(%command, "reloading proxy");

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| AdapterError::Reload {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AdapterError::Reload {
                command,
                reason: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        info!(%command, "proxy reloaded");
        Ok(())
    }
}
