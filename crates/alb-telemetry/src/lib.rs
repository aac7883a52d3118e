//! alb-telemetry — the feed that closes the control loop.
//!
//! On every interval the [`Sweeper`] reads all node groups, and for each
//! node attribute whose name matches a known metric it samples the node
//! out-of-band and writes the sample as the attribute's `value`. The
//! attribute's static `weight` is never touched here.
//!
//! `cpu` and `memory` run on the node over ssh. `latency` and `distance`
//! run a traceroute from the sweeper's own host towards the node.
//!
//! # Architecture
//!
//! ```text
//! Sweeper::run (interval loop)
//!   └── sweep_once
//!         ├── RegistryHandle::node_groups()
//!         ├── one job per matched attribute, at most N in flight (semaphore)
//!         │     ├── Collector::collect() → CommandExecutor::execute(host, cmd)
//!         │     │     (bounded by the sample timeout)
//!         │     └── RegistryHandle::update_attribute_value()
//!         └── SweepReport { attempted, updated, failed }
//! ```
//!
//! A failing or unresponsive node is logged and counted; the rest of the
//! sweep continues.

pub mod collector;
pub mod error;
pub mod executor;
pub mod handle;
pub mod sweeper;

pub use collector::{Collector, Scope};
pub use error::{CollectError, ExecError, FeedError};
pub use executor::{CommandExecutor, ShellExecutor, SshExecutor};
pub use handle::{RegistryHandle, RemoteRegistry};
pub use sweeper::{SweepReport, Sweeper};
