//! alb-adapter — proxy-side half of the control loop.
//!
//! Receives a group's full node list, turns raw weights into rank-based
//! weights in `[1, 100]`, rewrites that group's `upstream` block in the
//! nginx upstream file, and reloads the proxy.
//!
//! # Components
//!
//! - **`normalize`**: rank-based weight normalization
//! - **`upstream`**: parse/render of the upstream file, block replacement
//! - **`store`**: serialized, atomic read-modify-write of the file
//! - **`reload`**: proxy reload trigger
//! - **`server`**: axum router accepting pushes from the control plane

pub mod error;
pub mod normalize;
pub mod reload;
pub mod server;
pub mod store;
pub mod upstream;

pub use error::AdapterError;
pub use normalize::{WeightedServer, normalize};
pub use reload::{CommandReloader, Reloader};
pub use server::build_router;
pub use store::UpstreamStore;
pub use upstream::UpstreamFile;
