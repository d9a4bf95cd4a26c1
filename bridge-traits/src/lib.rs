//! # Host Bridge Traits
//!
//! Capability traits the host application must implement for the
//! object-storage bridge core.
//!
//! ## Overview
//!
//! This crate defines the contract between the bridge core and its two
//! external collaborators:
//!
//! - the **storage SDK**, reached through [`StorageClient`] /
//!   [`StorageTransfer`] and constructed via [`StorageClientFactory`]; the
//!   core never sees the wire protocol or signing;
//! - the **host platform**, which supplies filesystem access
//!   ([`FileSystemAccess`]) and, for the brokered-credential mode, answers
//!   credential requests (see [`CredentialProvider`]).
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; implementations are called concurrently
//! from tokio tasks and from whatever contexts the storage SDK uses
//! internally.
//!
//! ## Error Handling
//!
//! Capability implementations report [`BridgeError`]; storage operation
//! failures use the dedicated [`storage::StorageFault`] taxonomy so callers
//! can tell local faults from service rejections.

pub mod credentials;
pub mod error;
pub mod fs;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use credentials::{CredentialError, CredentialProvider, SessionCredentials};
pub use fs::FileSystemAccess;
pub use storage::{
    ClientSettings, StorageClient, StorageClientFactory, StorageFault, StorageTransfer,
    TransferDirection, TransferSpec, TransferSummary, TransferUpdate, UpdateSender, UploadSource,
};
pub use time::{Clock, SystemClock};
