//! alb-sync — propagation of node group state to the proxy.
//!
//! After every mutation that changes a group's node set or a node's
//! attributes, the control plane hands the group's *entire* node list to
//! a [`SyncClient`]. There is no diffing and no retry: a failed push is
//! reported to the caller and the next successful push reconciles.
//!
//! # Components
//!
//! - **`client`**: the `SyncClient` trait, the HTTP implementation, and
//!   an in-memory recorder
//! - **`transport`**: minimal JSON-over-HTTP/1 request helper built on hyper

pub mod client;
pub mod error;
pub mod transport;

pub use client::{HttpSyncClient, RecordingSyncClient, SubmitRequest, SyncClient};
pub use error::{HttpError, SyncError};
