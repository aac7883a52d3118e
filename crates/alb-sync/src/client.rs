//! Sync clients — push a group's full node list to the proxy.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use alb_registry::NodeEntry;

use crate::error::SyncError;
use crate::transport;

/// Body of `POST /node_group/{group}` on the proxy adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitRequest {
    pub nodes: Vec<NodeEntry>,
}

/// Destination for node group state.
///
/// `submit` always receives the complete current node list of the group;
/// an empty list tells the proxy the group has no backends.
#[async_trait]
pub trait SyncClient: Send + Sync {
    async fn submit(&self, group: &str, nodes: &[NodeEntry]) -> Result<(), SyncError>;
}

/// Posts node lists to the proxy adapter over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSyncClient {
    base_url: String,
    timeout: Duration,
}

impl HttpSyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn group_url(&self, group: &str) -> String {
        format!("{}/node_group/{}", self.base_url, transport::path_segment(group))
    }
}

#[async_trait]
impl SyncClient for HttpSyncClient {
    async fn submit(&self, group: &str, nodes: &[NodeEntry]) -> Result<(), SyncError> {
        let url = self.group_url(group);
        let body = SubmitRequest {
            nodes: nodes.to_vec(),
        };

        let result = transport::request(Method::POST, &url, Some(&body), self.timeout)
            .await
            .and_then(transport::Response::accepted);

        match result {
            Ok(resp) => {
                debug!(group, nodes = nodes.len(), status = %resp.status, "node group submitted to proxy");
                Ok(())
            }
            Err(e) => {
                warn!(group, error = %e, "failed to submit node group to proxy");
                Err(SyncError::propagation(group, e))
            }
        }
    }
}

/// Keeps every push in memory instead of sending it anywhere.
///
/// Used when no proxy is configured and throughout the tests. It can be
/// switched into a failing mode to exercise the propagation error path,
/// and given a delay to widen the window between mutation and push.
#[derive(Debug, Default)]
pub struct RecordingSyncClient {
    pushes: Mutex<Vec<(String, Vec<NodeEntry>)>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingSyncClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All pushes so far, oldest first.
    pub fn pushes(&self) -> Vec<(String, Vec<NodeEntry>)> {
        self.pushes.lock().expect("pushes lock").clone()
    }

    /// Most recent node list pushed for a group.
    pub fn last_push(&self, group: &str) -> Option<Vec<NodeEntry>> {
        self.pushes
            .lock()
            .expect("pushes lock")
            .iter()
            .rev()
            .find(|(g, _)| g == group)
            .map(|(_, nodes)| nodes.clone())
    }
}

#[async_trait]
impl SyncClient for RecordingSyncClient {
    async fn submit(&self, group: &str, nodes: &[NodeEntry]) -> Result<(), SyncError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::propagation(group, "proxy unavailable"));
        }
        self.pushes
            .lock()
            .expect("pushes lock")
            .push((group.to_string(), nodes.to_vec()));
        Ok(())
    }
}
