//! Metric collectors.
//!
//! A collector is a named command whose trimmed stdout is a single number.
//! The attribute name it feeds is the key it is registered under in the
//! sweeper. Remote collectors run on the node itself; local collectors run
//! on the sweeper's host with `{host}` replaced by the node address.

use alb_registry::is_valid_host;

use crate::error::CollectError;
use crate::executor::CommandExecutor;

/// Where a collector's command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// On the node, through the remote executor.
    Remote,
    /// On the sweeper's host, through the local executor.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collector {
    /// Human-readable metric name used in log and error messages.
    metric: &'static str,
    command: String,
    scope: Scope,
}

impl Collector {
    pub fn new(metric: &'static str, command: impl Into<String>) -> Self {
        Self {
            metric,
            command: command.into(),
            scope: Scope::Remote,
        }
    }

    /// A collector run on the sweeper's host. `{host}` in `command` is
    /// replaced with the node address.
    pub fn local(metric: &'static str, command: impl Into<String>) -> Self {
        Self {
            scope: Scope::Local,
            ..Self::new(metric, command)
        }
    }

    /// CPU usage percent from `/proc/stat`.
    pub fn cpu_load() -> Self {
        Self::new(
            "CPU load",
            "grep 'cpu' /proc/stat | awk '{usage=($2+$4)*100/($2+$4+$5)} END {print usage}'",
        )
    }

    /// Available memory in KiB from `free`.
    pub fn free_memory() -> Self {
        Self::new("free memory", "free | grep 'Mem' | awk '{print $7}'")
    }

    /// Round-trip time in milliseconds to the last traceroute hop.
    pub fn latency() -> Self {
        Self::local(
            "latency",
            "traceroute -n -q 1 -w 1 -m 30 {host} 2>/dev/null | tail -n 1 | awk '{print $3}'",
        )
    }

    /// Number of traceroute hops to the node.
    pub fn distance() -> Self {
        Self::local(
            "distance",
            "traceroute -n -q 1 -w 1 -m 30 {host} 2>/dev/null | grep -c '^ *[0-9]'",
        )
    }

    pub fn metric(&self) -> &'static str {
        self.metric
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The command to run for `host`.
    fn command_for(&self, host: &str) -> Result<String, CollectError> {
        match self.scope {
            Scope::Remote => Ok(self.command.clone()),
            Scope::Local => {
                // Substituted into a shell line, so only plain host syntax.
                if !is_valid_host(host) {
                    return Err(CollectError::InvalidHost {
                        metric: self.metric,
                        host: host.to_string(),
                    });
                }
                let bare = host.trim_start_matches('[').trim_end_matches(']');
                Ok(self.command.replace("{host}", bare))
            }
        }
    }

    pub async fn collect(
        &self,
        executor: &dyn CommandExecutor,
        host: &str,
    ) -> Result<f64, CollectError> {
        let command = self.command_for(host)?;
        let output = executor
            .execute(host, &command)
            .await
            .map_err(|source| CollectError::Exec {
                metric: self.metric,
                host: host.to_string(),
                source,
            })?;

        let trimmed = output.trim();
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CollectError::Unparsable {
                metric: self.metric,
                host: host.to_string(),
                output: trimmed.to_string(),
            })
    }
}
