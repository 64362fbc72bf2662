//! Values that become available later.
//!
//! [`FutureValue`] is a snapshot of an asynchronous computation's lifecycle;
//! [`FutureCell`] holds one and lets observers follow its transitions.

mod cell;
mod value;

pub use cell::FutureCell;
pub(crate) use value::elapsed_since;
pub use value::{FutureKind, FutureValue, SharedError};

use thiserror::Error;

/// Errors raised when driving a [`FutureCell`].
#[derive(Debug, Error)]
pub enum FutureError {
    /// Attempted to move backwards or re-enter a lifecycle stage.
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: FutureKind, to: FutureKind },
}
