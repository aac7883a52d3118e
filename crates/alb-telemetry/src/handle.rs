//! Registry access for the sweeper.
//!
//! The sweeper can run inside the control plane process (talking to
//! [`ControlPlane`] directly) or as its own process against the REST API
//! ([`RemoteRegistry`]). Both go through the same attribute-update path,
//! so a sample always triggers a push to the proxy.

use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use indexmap::IndexMap;

use alb_control::ControlPlane;
use alb_registry::{AttributeUpdate, GroupView};
use alb_sync::transport::{self, path_segment};

use crate::error::FeedError;

#[async_trait]
pub trait RegistryHandle: Send + Sync {
    async fn node_groups(&self) -> Result<IndexMap<String, GroupView>, FeedError>;

    /// Set an attribute's `value`, leaving its `weight` as is.
    async fn update_attribute_value(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
        value: f64,
    ) -> Result<(), FeedError>;
}

fn update_error(group: &str, node: &str, attribute: &str, reason: impl ToString) -> FeedError {
    FeedError::Update {
        group: group.to_string(),
        node: node.to_string(),
        attribute: attribute.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl RegistryHandle for ControlPlane {
    async fn node_groups(&self) -> Result<IndexMap<String, GroupView>, FeedError> {
        Ok(ControlPlane::node_groups(self))
    }

    async fn update_attribute_value(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
        value: f64,
    ) -> Result<(), FeedError> {
        self.update_node_attribute(group, node, attribute, AttributeUpdate::value(value))
            .await
            .map_err(|e| update_error(group, node, attribute, e))
    }
}

/// REST client for a control plane in another process.
#[derive(Debug, Clone)]
pub struct RemoteRegistry {
    base_url: String,
    timeout: Duration,
}

impl RemoteRegistry {
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

    fn attribute_url(&self, group: &str, node: &str, attribute: &str) -> String {
        format!(
            "{}/node_group/{}/node/{}/attribute/{}",
            self.base_url,
            path_segment(group),
            path_segment(node),
            path_segment(attribute)
        )
    }
}

#[async_trait]
impl RegistryHandle for RemoteRegistry {
    async fn node_groups(&self) -> Result<IndexMap<String, GroupView>, FeedError> {
        let url = format!("{}/node_group", self.base_url);
        transport::request::<()>(Method::GET, &url, None, self.timeout)
            .await
            .and_then(transport::Response::accepted)
            .and_then(|resp| resp.json())
            .map_err(|e| FeedError::Fetch(e.to_string()))
    }

    async fn update_attribute_value(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
        value: f64,
    ) -> Result<(), FeedError> {
        let url = self.attribute_url(group, node, attribute);
        let body = AttributeUpdate::value(value);
        transport::request(Method::PUT, &url, Some(&body), self.timeout)
            .await
            .and_then(transport::Response::accepted)
            .map(|_| ())
            .map_err(|e| update_error(group, node, attribute, e))
    }
}
