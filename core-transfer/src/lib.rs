//! # Core Transfer
//!
//! Transfer lifecycle tracking for the bridge. The [`TransferRegistry`] owns
//! the map of in-flight transfers, forwards client progress to the host event
//! bus, and books resume tokens across pause and restart.

pub mod error;
pub mod registry;
pub mod state;

pub use error::{Result, TransferError};
pub use registry::{TransferOutcome, TransferReceipt, TransferRegistry, TransferTicket};
pub use state::{RequestId, TransferState};
