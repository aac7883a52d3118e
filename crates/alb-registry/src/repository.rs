//! NodeGroupRepository — the root of the registry tree.
//!
//! Owns every node group and forwards node and attribute operations to
//! the owning group, qualifying errors with the group name.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::types::*;
use crate::validate::is_valid_group_name;

/// All node groups known to the control plane.
#[derive(Debug, Default)]
pub struct NodeGroupRepository {
    groups: IndexMap<String, NodeGroup>,
}

impl NodeGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Groups ─────────────────────────────────────────────────────

    pub fn groups(&self) -> IndexMap<String, GroupView> {
        self.groups
            .iter()
            .map(|(name, group)| (name.clone(), group.view()))
            .collect()
    }

    pub fn group(&self, name: &str) -> RegistryResult<GroupView> {
        self.get(name).map(NodeGroup::view)
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn create_group(&mut self, name: &str) -> RegistryResult<()> {
        if !is_valid_group_name(name) {
            return Err(RegistryError::InvalidGroupName {
                group: name.to_string(),
            });
        }
        if self.groups.contains_key(name) {
            return Err(RegistryError::GroupExists {
                group: name.to_string(),
            });
        }
        self.groups.insert(name.to_string(), NodeGroup::new());
        debug!(group = name, "node group created");
        Ok(())
    }

    pub fn remove_group(&mut self, name: &str) -> RegistryResult<()> {
        self.groups
            .shift_remove(name)
            .ok_or_else(|| unknown_group(name))?;
        debug!(group = name, "node group removed");
        Ok(())
    }

    /// Current node list of a group in the shape pushed to the proxy.
    pub fn node_list(&self, group: &str) -> RegistryResult<Vec<NodeEntry>> {
        Ok(self.get(group)?.node_list())
    }

    // ── Nodes ──────────────────────────────────────────────────────

    pub fn nodes(&self, group: &str) -> RegistryResult<IndexMap<String, NodeView>> {
        Ok(self.get(group)?.nodes())
    }

    pub fn node(&self, group: &str, node: &str) -> RegistryResult<NodeView> {
        self.get(group)?
            .node(node)
            .map_err(|e| RegistryError::in_group(group, e))
    }

    pub fn add_node(&mut self, group: &str, node: &str, req: NewNode) -> RegistryResult<()> {
        self.get_mut(group)?
            .add_node(node, Node::new(req.host, req.port))
            .map_err(|e| RegistryError::in_group(group, e))?;
        debug!(group, node, "node added");
        Ok(())
    }

    pub fn update_node(&mut self, group: &str, node: &str, update: &NodeUpdate) -> RegistryResult<()> {
        self.get_mut(group)?
            .update_node(node, update)
            .map_err(|e| RegistryError::in_group(group, e))
    }

    pub fn remove_node(&mut self, group: &str, node: &str) -> RegistryResult<()> {
        self.get_mut(group)?
            .remove_node(node)
            .map_err(|e| RegistryError::in_group(group, e))?;
        debug!(group, node, "node removed");
        Ok(())
    }

    // ── Attributes ─────────────────────────────────────────────────

    pub fn node_attributes(
        &self,
        group: &str,
        node: &str,
    ) -> RegistryResult<IndexMap<String, AttributeView>> {
        self.get(group)?
            .node_attributes(node)
            .map_err(|e| RegistryError::in_group(group, e))
    }

    pub fn node_attribute(
        &self,
        group: &str,
        node: &str,
        attribute: &str,
    ) -> RegistryResult<AttributeView> {
        self.get(group)?
            .node_attribute(node, attribute)
            .map_err(|e| RegistryError::in_group(group, e))
    }

    pub fn add_node_attribute(
        &mut self,
        group: &str,
        node: &str,
        attribute: &str,
        req: NewAttribute,
    ) -> RegistryResult<()> {
        self.get_mut(group)?
            .add_node_attribute(node, attribute, req.into())
            .map_err(|e| RegistryError::in_group(group, e))
    }

    pub fn update_node_attribute(
        &mut self,
        group: &str,
        node: &str,
        attribute: &str,
        update: &AttributeUpdate,
    ) -> RegistryResult<()> {
        self.get_mut(group)?
            .update_node_attribute(node, attribute, update)
            .map_err(|e| RegistryError::in_group(group, e))
    }

    pub fn remove_node_attribute(
        &mut self,
        group: &str,
        node: &str,
        attribute: &str,
    ) -> RegistryResult<()> {
        self.get_mut(group)?
            .remove_node_attribute(node, attribute)
            .map_err(|e| RegistryError::in_group(group, e))
    }

    fn get(&self, name: &str) -> RegistryResult<&NodeGroup> {
        self.groups.get(name).ok_or_else(|| unknown_group(name))
    }

    fn get_mut(&mut self, name: &str) -> RegistryResult<&mut NodeGroup> {
        self.groups.get_mut(name).ok_or_else(|| unknown_group(name))
    }
}

fn unknown_group(name: &str) -> RegistryError {
    RegistryError::UnknownGroup {
        group: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn web_repo() -> NodeGroupRepository {
        let mut repo = NodeGroupRepository::new();
        repo.create_group("web").unwrap();
        repo.add_node(
            "web",
            "a",
            NewNode {
                host: "10.0.0.1".to_string(),
                port: 80,
            },
        )
        .unwrap();
        repo
    }

    #[test]
    fn empty_repository_lists_nothing() {
        let repo = NodeGroupRepository::new();
        assert!(repo.groups().is_empty());
    }

    #[test]
    fn create_read_back_exact_attributes() {
        let mut repo = web_repo();
        repo.add_node_attribute(
            "web",
            "a",
            "cpu",
            NewAttribute {
                value: 50.0,
                weight: 0.1,
            },
        )
        .unwrap();

        let node = repo.node("web", "a").unwrap();
        assert_eq!(node.attributes.len(), 1);
        assert_eq!(
            node.attributes["cpu"],
            AttributeView {
                value: 50.0,
                weight: 0.1
            }
        );
    }

    #[test]
    fn duplicate_group_leaves_existing_state() {
        let mut repo = web_repo();
        let err = repo.create_group("web").unwrap_err();
        assert_eq!(
            err,
            RegistryError::GroupExists {
                group: "web".to_string()
            }
        );
        assert_eq!(repo.nodes("web").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_node_leaves_existing_state() {
        let mut repo = web_repo();
        let err = repo
            .add_node(
                "web",
                "a",
                NewNode {
                    host: "10.9.9.9".to_string(),
                    port: 1,
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NodeExists {
                group: "web".to_string(),
                node: "a".to_string()
            }
        );
        assert_eq!(repo.node("web", "a").unwrap().host, "10.0.0.1");
    }

    #[test]
    fn missing_group_is_reported_for_nested_calls() {
        let repo = NodeGroupRepository::new();
        assert_eq!(
            repo.node_attribute("api", "a", "cpu").unwrap_err(),
            RegistryError::UnknownGroup {
                group: "api".to_string()
            }
        );
    }

    #[test]
    fn missing_attribute_is_fully_qualified() {
        let mut repo = web_repo();
        let err = repo
            .update_node_attribute("web", "a", "cpu", &AttributeUpdate::value(1.0))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownAttribute {
                group: "web".to_string(),
                node: "a".to_string(),
                attribute: "cpu".to_string()
            }
        );
    }

    #[test]
    fn remove_missing_entries_fails() {
        let mut repo = web_repo();
        assert!(repo.remove_group("api").is_err());
        assert!(repo.remove_node("web", "b").is_err());
        assert!(repo.remove_node_attribute("web", "a", "cpu").is_err());
    }

    #[test]
    fn node_list_reflects_current_weights() {
        let mut repo = web_repo();
        repo.add_node_attribute(
            "web",
            "a",
            "cpu",
            NewAttribute {
                value: 3.0,
                weight: 2.0,
            },
        )
        .unwrap();
        let list = repo.node_list("web").unwrap();
        assert_eq!(
            list,
            vec![NodeEntry {
                host: "10.0.0.1".to_string(),
                port: 80,
                weight: 6.0
            }]
        );
    }

    #[test]
    fn groups_view_serializes_nested_shape() {
        let repo = web_repo();
        let json = serde_json::to_value(repo.groups()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "web": {
                    "nodes": {
                        "a": {
                            "host": "10.0.0.1",
                            "port": 80,
                            "weight": 0.0,
                            "attributes": {}
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn group_name_must_survive_the_upstream_file() {
        let mut repo = NodeGroupRepository::new();
        for name in ["my group", "web;", "a}b", ""] {
            let err = repo.create_group(name).unwrap_err();
            assert_eq!(
                err,
                RegistryError::InvalidGroupName {
                    group: name.to_string()
                }
            );
        }
        assert!(repo.groups().is_empty());
    }

    #[test]
    fn non_finite_weight_is_qualified_and_state_unchanged() {
        let mut repo = web_repo();
        let err = repo
            .add_node_attribute(
                "web",
                "a",
                "cpu",
                NewAttribute {
                    value: 1e308,
                    weight: 10.0,
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NonFiniteWeight {
                group: "web".to_string(),
                node: "a".to_string(),
                attribute: "cpu".to_string()
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(repo.node_attributes("web", "a").unwrap().is_empty());
        assert_eq!(repo.node_list("web").unwrap()[0].weight, 0.0);
    }
}
