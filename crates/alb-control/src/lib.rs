//! alb-control — the control plane facade.
//!
//! `ControlPlane` owns the registry and a [`SyncClient`](alb_sync::SyncClient).
//! Every mutation that changes a group's node list is followed by a push
//! of that group's full node list to the proxy.
//!
//! # Ordering
//!
//! Mutations of one group are serialized with a per-group async mutex held
//! across "mutate registry, then push". Without it two concurrent requests
//! could apply in one order and push in the other, leaving the proxy on a
//! stale list. Different groups never wait on each other.
//!
//! A failed push does not undo the mutation. Retrying any mutating call
//! for the group re-sends the complete current state.

pub mod error;
pub mod facade;

pub use error::{ControlError, ControlResult};
pub use facade::ControlPlane;
