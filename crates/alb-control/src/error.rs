//! Errors surfaced by the control plane facade.

use thiserror::Error;

use alb_registry::RegistryError;
use alb_sync::SyncError;

pub type ControlResult<T> = Result<T, ControlError>;

#[derive(Debug, Error)]
pub enum ControlError {
    /// Missing, duplicate or invalid group, node, or attribute. Nothing was
    /// changed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The registry was updated but the proxy was not told.
    #[error(transparent)]
    Propagation(#[from] SyncError),
}
