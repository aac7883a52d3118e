//! Domain types for the registry.
//!
//! `Attribute`, `Node`, and `NodeGroup` own their children exclusively.
//! Read access goes through serializable view types so callers never hold
//! references into the tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GroupError, NodeError};
use crate::validate::is_valid_host;

// ── Requests ───────────────────────────────────────────────────────

/// Body of a node create request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNode {
    pub host: String,
    pub port: u16,
}

/// Partial node update. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Body of an attribute create request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NewAttribute {
    pub value: f64,
    pub weight: f64,
}

/// Partial attribute update. `None` keeps the current value; an explicit
/// zero is applied like any other number.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AttributeUpdate {
    pub value: Option<f64>,
    pub weight: Option<f64>,
}

impl AttributeUpdate {
    /// Update that only sets the sampled value.
    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            weight: None,
        }
    }
}

// ── Views ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AttributeView {
    pub value: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeView {
    pub host: String,
    pub port: u16,
    /// Derived weight at the time of the read.
    pub weight: f64,
    pub attributes: IndexMap<String, AttributeView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroupView {
    pub nodes: IndexMap<String, NodeView>,
}

/// One entry of the node list pushed to the proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeEntry {
    pub host: String,
    pub port: u16,
    pub weight: f64,
}

// ── Attribute ──────────────────────────────────────────────────────

/// A named, weighted numeric signal attached to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attribute {
    value: f64,
    weight: f64,
}

impl Attribute {
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Contribution of this attribute to its node's weight.
    pub fn current_weight(&self) -> f64 {
        self.value * self.weight
    }

    fn apply(&mut self, update: &AttributeUpdate) {
        if let Some(value) = update.value {
            self.value = value;
        }
        if let Some(weight) = update.weight {
            self.weight = weight;
        }
    }

    fn view(&self) -> AttributeView {
        AttributeView {
            value: self.value,
            weight: self.weight,
        }
    }
}

impl From<NewAttribute> for Attribute {
    fn from(req: NewAttribute) -> Self {
        Self::new(req.value, req.weight)
    }
}

// ── Node ───────────────────────────────────────────────────────────

/// A routable endpoint and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    host: String,
    port: u16,
    attributes: IndexMap<String, Attribute>,
}

impl Node {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            attributes: IndexMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Sum of `value * weight` over all attributes, 0 when there are none.
    pub fn weight(&self) -> f64 {
        self.attributes.values().map(Attribute::current_weight).sum()
    }

    fn apply(&mut self, update: &NodeUpdate) {
        if let Some(host) = &update.host {
            self.host = host.clone();
        }
        if let Some(port) = update.port {
            self.port = port;
        }
    }

    pub fn attributes(&self) -> IndexMap<String, AttributeView> {
        self.attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.view()))
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Result<AttributeView, NodeError> {
        self.attributes
            .get(name)
            .map(Attribute::view)
            .ok_or_else(|| unknown_attribute(name))
    }

    pub fn add_attribute(&mut self, name: &str, attribute: Attribute) -> Result<(), NodeError> {
        if self.attributes.contains_key(name) {
            return Err(NodeError::AttributeExists {
                attribute: name.to_string(),
            });
        }
        self.ensure_finite(name, Some(&attribute))?;
        self.attributes.insert(name.to_string(), attribute);
        Ok(())
    }

    pub fn update_attribute(
        &mut self,
        name: &str,
        update: &AttributeUpdate,
    ) -> Result<(), NodeError> {
        let mut updated = *self
            .attributes
            .get(name)
            .ok_or_else(|| unknown_attribute(name))?;
        updated.apply(update);
        self.ensure_finite(name, Some(&updated))?;
        self.attributes.insert(name.to_string(), updated);
        Ok(())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Result<(), NodeError> {
        if !self.attributes.contains_key(name) {
            return Err(unknown_attribute(name));
        }
        self.ensure_finite(name, None)?;
        self.attributes.shift_remove(name);
        Ok(())
    }

    /// Rejects a change to attribute `name` (`None` removes it) that would
    /// leave a non-finite value, weight, or node weight behind.
    fn ensure_finite(&self, name: &str, candidate: Option<&Attribute>) -> Result<(), NodeError> {
        let mut total = 0.0;
        for (existing, attr) in &self.attributes {
            if existing != name {
                total += attr.current_weight();
            } else if let Some(candidate) = candidate {
                total += candidate.current_weight();
            }
        }
        if let Some(candidate) = candidate {
            if !self.attributes.contains_key(name) {
                total += candidate.current_weight();
            }
            if !candidate.value.is_finite() || !candidate.weight.is_finite() {
                return Err(non_finite(name));
            }
        }
        if total.is_finite() {
            Ok(())
        } else {
            Err(non_finite(name))
        }
    }

    pub fn view(&self) -> NodeView {
        NodeView {
            host: self.host.clone(),
            port: self.port,
            weight: self.weight(),
            attributes: self.attributes(),
        }
    }

    pub fn entry(&self) -> NodeEntry {
        NodeEntry {
            host: self.host.clone(),
            port: self.port,
            weight: self.weight(),
        }
    }
}

fn unknown_attribute(name: &str) -> NodeError {
    NodeError::UnknownAttribute {
        attribute: name.to_string(),
    }
}

fn non_finite(name: &str) -> NodeError {
    NodeError::NonFiniteWeight {
        attribute: name.to_string(),
    }
}

// ── NodeGroup ──────────────────────────────────────────────────────

/// Nodes serving the same logical service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeGroup {
    nodes: IndexMap<String, Node>,
}

impl NodeGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flat node list in registry order, as pushed to the proxy.
    pub fn node_list(&self) -> Vec<NodeEntry> {
        self.nodes.values().map(Node::entry).collect()
    }

    pub fn nodes(&self) -> IndexMap<String, NodeView> {
        self.nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.view()))
            .collect()
    }

    pub fn node(&self, name: &str) -> Result<NodeView, GroupError> {
        self.get(name).map(Node::view)
    }

    pub fn add_node(&mut self, name: &str, node: Node) -> Result<(), GroupError> {
        if self.nodes.contains_key(name) {
            return Err(GroupError::NodeExists {
                node: name.to_string(),
            });
        }
        check_host(name, &node.host)?;
        self.nodes.insert(name.to_string(), node);
        Ok(())
    }

    pub fn update_node(&mut self, name: &str, update: &NodeUpdate) -> Result<(), GroupError> {
        let node = self.get_mut(name)?;
        if let Some(host) = &update.host {
            check_host(name, host)?;
        }
        node.apply(update);
        Ok(())
    }

    pub fn remove_node(&mut self, name: &str) -> Result<(), GroupError> {
        self.nodes
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| unknown_node(name))
    }

    pub fn node_attributes(
        &self,
        node: &str,
    ) -> Result<IndexMap<String, AttributeView>, GroupError> {
        Ok(self.get(node)?.attributes())
    }

    pub fn node_attribute(&self, node: &str, attribute: &str) -> Result<AttributeView, GroupError> {
        self.get(node)?
            .attribute(attribute)
            .map_err(|e| GroupError::from_node(node, e))
    }

    pub fn add_node_attribute(
        &mut self,
        node: &str,
        attribute: &str,
        value: Attribute,
    ) -> Result<(), GroupError> {
        self.get_mut(node)?
            .add_attribute(attribute, value)
            .map_err(|e| GroupError::from_node(node, e))
    }

    pub fn update_node_attribute(
        &mut self,
        node: &str,
        attribute: &str,
        update: &AttributeUpdate,
    ) -> Result<(), GroupError> {
        self.get_mut(node)?
            .update_attribute(attribute, update)
            .map_err(|e| GroupError::from_node(node, e))
    }

    pub fn remove_node_attribute(&mut self, node: &str, attribute: &str) -> Result<(), GroupError> {
        self.get_mut(node)?
            .remove_attribute(attribute)
            .map_err(|e| GroupError::from_node(node, e))
    }

    pub fn view(&self) -> GroupView {
        GroupView {
            nodes: self.nodes(),
        }
    }

    fn get(&self, name: &str) -> Result<&Node, GroupError> {
        self.nodes.get(name).ok_or_else(|| unknown_node(name))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Node, GroupError> {
        self.nodes.get_mut(name).ok_or_else(|| unknown_node(name))
    }
}

fn unknown_node(name: &str) -> GroupError {
    GroupError::UnknownNode {
        node: name.to_string(),
    }
}

fn check_host(node: &str, host: &str) -> Result<(), GroupError> {
    if is_valid_host(host) {
        Ok(())
    } else {
        Err(GroupError::InvalidHost {
            node: node.to_string(),
            host: host.to_string(),
        })
    }
}
