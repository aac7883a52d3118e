//! alb-registry — in-memory registry of node groups for the ALB control plane.
//!
//! The registry is a three-level ownership tree:
//!
//! ```text
//! NodeGroupRepository
//!   └── NodeGroup (by name)
//!         └── Node (by name) ─ host, port
//!               └── Attribute (by name) ─ value, weight
//! ```
//!
//! A node's traffic weight is derived on every read as the sum of
//! `value * weight` over its attributes. Nothing is cached.
//!
//! Every level reports failures with identifiers meaningful at its own
//! scope: `NodeError` knows attribute names, `GroupError` adds the node
//! name, and `RegistryError` adds the group name.
//!
//! Group names and node hosts are written into the proxy configuration,
//! so both are checked against `validate` before they enter the tree, and
//! no attribute change may leave a node with a non-finite weight.
//!
//! The repository is plain data. Callers that share it across tasks wrap
//! it in a lock (see `alb-control`).

pub mod error;
pub mod repository;
pub mod types;
pub mod validate;

pub use error::{ErrorKind, GroupError, NodeError, RegistryError, RegistryResult};
pub use repository::NodeGroupRepository;
pub use types::*;
pub use validate::{is_valid_group_name, is_valid_host};
