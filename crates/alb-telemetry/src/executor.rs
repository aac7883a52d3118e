//! Command execution, on a node over ssh or on the sweeper's own host.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ExecError;

/// Runs a shell command on a host and returns its stdout.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, host: &str, command: &str) -> Result<String, ExecError>;
}

/// Shells out to an ssh client: `ssh [-l user] [extra args] host command`.
///
/// Authentication is whatever the ssh client is configured with (agent,
/// keys, `~/.ssh/config`).
#[derive(Debug, Clone)]
pub struct SshExecutor {
    program: String,
    username: Option<String>,
    extra_args: Vec<String>,
}

impl SshExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            username: None,
            extra_args: vec![
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                "-o".to_string(),
                "ConnectTimeout=5".to_string(),
            ],
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    fn args(&self, host: &str, command: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(user) = &self.username {
            args.push("-l".to_string());
            args.push(user.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(host.to_string());
        args.push(command.to_string());
        args
    }
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new("ssh")
    }
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    async fn execute(&self, host: &str, command: &str) -> Result<String, ExecError> {
        debug!(host, program = %self.program, "running remote command");
        run(&self.program, self.args(host, command)).await
    }
}

/// Runs commands on the local host with `sh -c`. The host argument only
/// labels the log line; the command is expected to carry it already.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, host: &str, command: &str) -> Result<String, ExecError> {
        debug!(host, shell = %self.shell, "running local command");
        run(&self.shell, vec!["-c".to_string(), command.to_string()]).await
    }
}

/// Spawn `program`, wait for it, and return stdout on a zero exit. The
/// child is killed if the returned future is dropped.
async fn run(program: &str, args: Vec<String>) -> Result<String, ExecError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ExecError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(ExecError::Failed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
