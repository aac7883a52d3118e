//! ControlPlane — registry access plus propagation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info};

use alb_registry::*;
use alb_sync::SyncClient;

use crate::error::ControlResult;

type GroupLock = Arc<tokio::sync::Mutex<()>>;

/// Process-wide registry handle, shared by reference with every handler.
pub struct ControlPlane {
    registry: RwLock<NodeGroupRepository>,
    /// Per-group mutation locks: group name → lock. An entry exists only
    /// while its group does, or while a create is in flight.
    group_locks: Mutex<HashMap<String, GroupLock>>,
    sync: Arc<dyn SyncClient>,
}

impl ControlPlane {
    pub fn new(sync: Arc<dyn SyncClient>) -> Self {
        Self {
            registry: RwLock::new(NodeGroupRepository::new()),
            group_locks: Mutex::new(HashMap::new()),
            sync,
        }
    }

    // ── Groups ─────────────────────────────────────────────────────

    pub fn node_groups(&self) -> IndexMap<String, GroupView> {
        self.read().groups()
    }

    pub fn node_group(&self, group: &str) -> ControlResult<GroupView> {
        Ok(self.read().group(group)?)
    }

    /// Create an empty group. The proxy is not notified: no node list changed.
    pub async fn create_node_group(&self, group: &str) -> ControlResult<()> {
        let (lock, _guard) = self.lock_group(group, true).await?;
        let created = self.write().create_group(group);
        self.forget_if_gone(group, &lock);
        created?;
        info!(group, "node group created");
        Ok(())
    }

    /// Remove a group and tell the proxy it has no nodes left.
    pub async fn remove_node_group(&self, group: &str) -> ControlResult<()> {
        self.mutate(group, |registry| {
            registry.remove_group(group)?;
            Ok(Vec::new())
        })
        .await?;
        info!(group, "node group removed");
        Ok(())
    }

    // ── Nodes ──────────────────────────────────────────────────────

    pub fn nodes(&self, group: &str) -> ControlResult<IndexMap<String, NodeView>> {
        Ok(self.read().nodes(group)?)
    }

    pub fn node(&self, group: &str, node: &str) -> ControlResult<NodeView> {
        Ok(self.read().node(group, node)?)
    }

    pub async fn create_node(&self, group: &str, node: &str, req: NewNode) -> ControlResult<()> {
        self.mutate(group, |registry| {
            registry.add_node(group, node, req)?;
            registry.node_list(group)
        })
        .await
    }

    pub async fn update_node(
        &self,
        group: &str,
        node: &str,
        update: NodeUpdate,
    ) -> ControlResult<()> {
        self.mutate(group, |registry| {
            registry.update_node(group, node, &update)?;
            registry.node_list(group)
        })
        .await
    }

    pub async fn remove_node(&self, group: &str, node: &str) -> ControlResult<()> {
        self.mutate(group, |registry| {
            registry.remove_node(group, node)?;
            registry.node_list(group)
        })
        .await
    }

    // ── Attributes ─────────────────────────────────────────────────

    pub fn node_attributes(
        &self,
        group: &str,
        node: &str,
    ) -> ControlResult<IndexMap<String, AttributeView>> {
        Ok(self.read().node_attributes(group, node)?)
    }

    pub fn node_attribute(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
    ) -> ControlResult<AttributeView> {
        Ok(self.read().node_attribute(group, node, attribute)?)
    }

    pub async fn create_node_attribute(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
        req: NewAttribute,
    ) -> ControlResult<()> {
        self.mutate(group, |registry| {
            registry.add_node_attribute(group, node, attribute, req)?;
            registry.node_list(group)
        })
        .await
    }

    pub async fn update_node_attribute(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
        update: AttributeUpdate,
    ) -> ControlResult<()> {
        self.mutate(group, |registry| {
            registry.update_node_attribute(group, node, attribute, &update)?;
            registry.node_list(group)
        })
        .await
    }

    pub async fn remove_node_attribute(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
    ) -> ControlResult<()> {
        self.mutate(group, |registry| {
            registry.remove_node_attribute(group, node, attribute)?;
            registry.node_list(group)
        })
        .await
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Apply a registry change under the group's lock, then push the node
    /// list the change returned. The registry lock is released before the
    /// push; the group lock is held until the push completes.
    async fn mutate<F>(&self, group: &str, change: F) -> ControlResult<()>
    where
        F: FnOnce(&mut NodeGroupRepository) -> RegistryResult<Vec<NodeEntry>>,
    {
        let (lock, _guard) = self.lock_group(group, false).await?;

        let changed = {
            let mut registry = self.write();
            change(&mut registry)
        };
        let result = match changed {
            Ok(nodes) => self.push(group, &nodes).await,
            Err(e) => Err(e.into()),
        };

        self.forget_if_gone(group, &lock);
        result
    }

    async fn push(&self, group: &str, nodes: &[NodeEntry]) -> ControlResult<()> {
        debug!(group, nodes = nodes.len(), "propagating node group");
        if let Err(e) = self.sync.submit(group, nodes).await {
            error!(group, error = %e, "registry updated but proxy was not notified");
            return Err(e.into());
        }
        Ok(())
    }

    /// Acquire the mutation lock of `group`. Without `create`, no entry is
    /// made for a group that does not exist.
    async fn lock_group(
        &self,
        group: &str,
        create: bool,
    ) -> ControlResult<(GroupLock, OwnedMutexGuard<()>)> {
        loop {
            let lock = {
                let mut locks = self.group_locks.lock().expect("group locks");
                match locks.get(group) {
                    Some(lock) => lock.clone(),
                    None => {
                        if !create && !self.read().contains_group(group) {
                            return Err(RegistryError::UnknownGroup {
                                group: group.to_string(),
                            }
                            .into());
                        }
                        let lock = GroupLock::default();
                        locks.insert(group.to_string(), lock.clone());
                        lock
                    }
                }
            };
            let guard = lock.clone().lock_owned().await;
            // The entry may have been dropped while this task waited.
            if self.is_current(group, &lock) {
                return Ok((lock, guard));
            }
        }
    }

    fn is_current(&self, group: &str, lock: &GroupLock) -> bool {
        let locks = self.group_locks.lock().expect("group locks");
        locks
            .get(group)
            .is_some_and(|current| Arc::ptr_eq(current, lock))
    }

    /// Drop the lock entry of a group that no longer exists. Called with
    /// the lock held, so no create can race the check.
    fn forget_if_gone(&self, group: &str, lock: &GroupLock) {
        if self.read().contains_group(group) {
            return;
        }
        let mut locks = self.group_locks.lock().expect("group locks");
        if locks
            .get(group)
            .is_some_and(|current| Arc::ptr_eq(current, lock))
        {
            locks.remove(group);
            debug!(group, "group lock released");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeGroupRepository> {
        self.registry.read().expect("registry lock")
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeGroupRepository> {
        self.registry.write().expect("registry lock")
    }
}
