//! Layered error types for the registry.
//!
//! A failure is first raised at the level that owns the missing or
//! duplicated entry, then re-qualified explicitly by each owner on the way
//! up, so a message never names something the caller did not ask about.

use thiserror::Error;

/// Result type alias for repository operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Coarse classification used at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
}

/// Errors raised by a single node about its own attributes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("Unknown attribute: '{attribute}'")]
    UnknownAttribute { attribute: String },

    #[error("Attribute with the name '{attribute}' already exists")]
    AttributeExists { attribute: String },

    #[error("Attribute '{attribute}' would make the node weight non-finite")]
    NonFiniteWeight { attribute: String },
}

/// Errors raised by a node group about its nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("Unknown node: '{node}'")]
    UnknownNode { node: String },

    #[error("Node '{node}' already exists")]
    NodeExists { node: String },

    #[error("Node '{node}' has an invalid host: '{host}'")]
    InvalidHost { node: String, host: String },

    #[error("Node with name '{node}' has no attribute '{attribute}'")]
    UnknownNodeAttribute { node: String, attribute: String },

    #[error("Node '{node}' already has an attribute, called '{attribute}'")]
    NodeAttributeExists { node: String, attribute: String },

    #[error("Attribute '{attribute}' would make the weight of node '{node}' non-finite")]
    NodeNonFiniteWeight { node: String, attribute: String },
}

impl GroupError {
    /// Qualify a node-level error with the name of the node it came from.
    pub fn from_node(node: &str, err: NodeError) -> Self {
        match err {
            NodeError::UnknownAttribute { attribute } => GroupError::UnknownNodeAttribute {
                node: node.to_string(),
                attribute,
            },
            NodeError::AttributeExists { attribute } => GroupError::NodeAttributeExists {
                node: node.to_string(),
                attribute,
            },
            NodeError::NonFiniteWeight { attribute } => GroupError::NodeNonFiniteWeight {
                node: node.to_string(),
                attribute,
            },
        }
    }
}

/// Errors surfaced by the repository, fully qualified by group name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Node group with the name '{group}' does not exist")]
    UnknownGroup { group: String },

    #[error("Node group with the name '{group}' already exists")]
    GroupExists { group: String },

    #[error("Invalid node group name: '{group}'")]
    InvalidGroupName { group: String },

    #[error("There is no node with the name '{node}' in the group '{group}'")]
    UnknownNode { group: String, node: String },

    #[error("Group '{group}' already has a node, called '{node}'")]
    NodeExists { group: String, node: String },

    #[error("Node from group '{group}' with name '{node}' has no attribute '{attribute}'")]
    UnknownAttribute {
        group: String,
        node: String,
        attribute: String,
    },

    #[error("Node '{node}' from the group '{group}' already has an attribute, called '{attribute}'")]
    AttributeExists {
        group: String,
        node: String,
        attribute: String,
    },

    #[error("Node '{node}' from the group '{group}' has an invalid host: '{host}'")]
    InvalidHost {
        group: String,
        node: String,
        host: String,
    },

    #[error("Attribute '{attribute}' would make the weight of node '{node}' from the group '{group}' non-finite")]
    NonFiniteWeight {
        group: String,
        node: String,
        attribute: String,
    },
}

impl RegistryError {
    /// Qualify a group-level error with the name of the group it came from.
    pub fn in_group(group: &str, err: GroupError) -> Self {
        let group = group.to_string();
        match err {
            GroupError::UnknownNode { node } => RegistryError::UnknownNode { group, node },
            GroupError::NodeExists { node } => RegistryError::NodeExists { group, node },
            GroupError::UnknownNodeAttribute { node, attribute } => {
                RegistryError::UnknownAttribute {
                    group,
                    node,
                    attribute,
                }
            }
            GroupError::NodeAttributeExists { node, attribute } => {
                RegistryError::AttributeExists {
                    group,
                    node,
                    attribute,
                }
            }
            GroupError::InvalidHost { node, host } => {
                RegistryError::InvalidHost { group, node, host }
            }
            GroupError::NodeNonFiniteWeight { node, attribute } => {
                RegistryError::NonFiniteWeight {
                    group,
                    node,
                    attribute,
                }
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::UnknownGroup { .. }
            | RegistryError::UnknownNode { .. }
            | RegistryError::UnknownAttribute { .. } => ErrorKind::NotFound,
            RegistryError::GroupExists { .. }
            | RegistryError::NodeExists { .. }
            | RegistryError::AttributeExists { .. } => ErrorKind::AlreadyExists,
            RegistryError::InvalidGroupName { .. }
            | RegistryError::InvalidHost { .. }
            | RegistryError::NonFiniteWeight { .. } => ErrorKind::InvalidInput,
        }
    }
}
