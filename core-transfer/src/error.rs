//! Error types for the transfer registry.

use bridge_traits::error::BridgeError;
use bridge_traits::storage::StorageFault;
use thiserror::Error;

/// Errors produced by transfer registration, pausing, and settlement.
#[derive(Debug, Error)]
pub enum TransferError {
    /// No running transfer is registered under the given request id.
    #[error("No active transfer for request id: {request_id}")]
    NotFound { request_id: String },

    /// The transfer exists but its client cannot produce a resume token.
    #[error("Transfer {request_id} cannot be paused")]
    NotPausable { request_id: String },

    /// A request parameter failed validation, including a start under a
    /// request id that already has a running transfer.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage backend rejected or failed the transfer.
    #[error(transparent)]
    Fault(#[from] StorageFault),

    /// A host capability failed beneath the transfer.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A transfer state change violated the lifecycle rules.
    #[error("Cannot transition transfer from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// The tracking task disappeared before settling the transfer.
    #[error("Transfer tracking was interrupted before completion")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, TransferError>;
