//! Sweeper — periodic sampling of node metrics into the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::collector::{Collector, Scope};
use crate::error::{CollectError, FeedError};
use crate::executor::{CommandExecutor, ShellExecutor};
use crate::handle::RegistryHandle;

/// Outcome of a single sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Attributes that matched a collector.
    pub attempted: usize,
    /// Attributes whose value was written.
    pub updated: usize,
    /// Attributes skipped because sampling or the update failed.
    pub failed: usize,
}

/// One sample to take: a node attribute with a matching collector.
struct Job {
    group: String,
    node: String,
    attribute: String,
    host: String,
    collector: Collector,
}

pub struct Sweeper {
    registry: Arc<dyn RegistryHandle>,
    /// Runs `Scope::Remote` collectors on the node.
    executor: Arc<dyn CommandExecutor>,
    /// Runs `Scope::Local` collectors on this host.
    local_executor: Arc<dyn CommandExecutor>,
    /// Attribute name → collector.
    collectors: HashMap<String, Collector>,
    interval: Duration,
    max_concurrency: usize,
    sample_timeout: Duration,
}

impl Sweeper {
    /// Create a sweeper with the standard `cpu`, `memory`, `latency` and
    /// `distance` collectors.
    pub fn new(registry: Arc<dyn RegistryHandle>, executor: Arc<dyn CommandExecutor>) -> Self {
        let mut collectors = HashMap::new();
        collectors.insert("cpu".to_string(), Collector::cpu_load());
        collectors.insert("memory".to_string(), Collector::free_memory());
        collectors.insert("latency".to_string(), Collector::latency());
        collectors.insert("distance".to_string(), Collector::distance());
        Self {
            registry,
            executor,
            local_executor: Arc::new(ShellExecutor::default()),
            collectors,
            interval: Duration::from_secs(10),
            max_concurrency: 16,
            sample_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_local_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.local_executor = executor;
        self
    }

    /// Longest a single sample may take before it is abandoned and counted
    /// as failed.
    pub fn with_sample_timeout(mut self, timeout: Duration) -> Self {
        self.sample_timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upper bound on samples in flight at once. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Register (or replace) the collector for an attribute name.
    pub fn with_collector(mut self, attribute: impl Into<String>, collector: Collector) -> Self {
        self.collectors.insert(attribute.into(), collector);
        self
    }

    /// Sample every matching attribute once.
    ///
    /// Fails only if the node groups could not be read; per-node failures
    /// are logged and counted in the report.
    pub async fn sweep_once(&self) -> Result<SweepReport, FeedError> {
        debug!("loading node groups");
        let groups = self.registry.node_groups().await?;

        let mut jobs = Vec::new();
        for (group_name, group) in &groups {
            for (node_name, node) in &group.nodes {
                for attribute in node.attributes.keys() {
                    if let Some(collector) = self.collectors.get(attribute) {
                        jobs.push(Job {
                            group: group_name.clone(),
                            node: node_name.clone(),
                            attribute: attribute.clone(),
                            host: node.host.clone(),
                            collector: collector.clone(),
                        });
                    }
                }
            }
        }

        let mut report = SweepReport {
            attempted: jobs.len(),
            ..Default::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for job in jobs {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let registry = self.registry.clone();
            let executor = match job.collector.scope() {
                Scope::Remote => self.executor.clone(),
                Scope::Local => self.local_executor.clone(),
            };
            let timeout = self.sample_timeout;
            tasks.spawn(async move {
                let ok = run_job(&job, registry.as_ref(), executor.as_ref(), timeout).await;
                drop(permit);
                ok
            });
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(true) => report.updated += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    warn!(error = %e, "sample task panicked");
                    report.failed += 1;
                }
            }
        }

        info!(
            attempted = report.attempted,
            updated = report.updated,
            failed = report.failed,
            "sweep complete"
        );
        Ok(report)
    }

    /// Sweep on every interval until `shutdown` flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_concurrency = self.max_concurrency,
            sample_timeout_secs = self.sample_timeout.as_secs(),
            "telemetry sweeper started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.sweep_once().await {
                        warn!(error = %e, "sweep skipped");
                    }
                }
                _ = shutdown.changed() => {
                    info!("telemetry sweeper shutting down");
                    break;
                }
            }
        }
    }
}

/// Sample one attribute and write it back. Failures are logged here.
/// Only the sample is bounded by `timeout`; the registry update is not.
async fn run_job(
    job: &Job,
    registry: &dyn RegistryHandle,
    executor: &dyn CommandExecutor,
    timeout: Duration,
) -> bool {
    debug!(
        group = %job.group,
        node = %job.node,
        attribute = %job.attribute,
        "collecting sample"
    );

    let sample = tokio::time::timeout(timeout, job.collector.collect(executor, &job.host))
        .await
        .unwrap_or_else(|_| {
            Err(CollectError::TimedOut {
                metric: job.collector.metric(),
                host: job.host.clone(),
                timeout,
            })
        });

    let value = match sample {
        Ok(value) => value,
        Err(e) => {
            warn!(group = %job.group, node = %job.node, error = %e, "collection failed");
            return false;
        }
    };

    match registry
        .update_attribute_value(&job.group, &job.node, &job.attribute, value)
        .await
    {
        Ok(()) => {
            debug!(
                group = %job.group,
                node = %job.node,
                attribute = %job.attribute,
                value,
                "sample stored"
            );
            true
        }
        Err(e) => {
            warn!(error = %e, "failed to store sample");
            false
        }
    }
}
