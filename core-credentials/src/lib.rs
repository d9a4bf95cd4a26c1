//! # Core Credentials
//!
//! Session credential plumbing for the bridge. [`CredentialBroker`] mediates
//! the pull/push exchange between the storage client and the host, while
//! [`StaticCredentialProvider`] covers hosts that embed a fixed secret pair.

pub mod broker;

pub use broker::{CredentialBroker, StaticCredentialProvider};
