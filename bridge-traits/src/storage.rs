//! Storage Client Abstractions
//!
//! The object-storage SDK is an external collaborator reached through the
//! traits in this module. Implementations own the wire protocol, request
//! signing, and retry policy; the core only describes *what* to transfer and
//! consumes the update stream the client produces.
//!
//! A transfer is started with [`StorageClient::begin_transfer`]. The client
//! reports [`TransferUpdate`]s through the provided sender from its own
//! execution context; after a terminal update it must send nothing further
//! and drop the sender. The returned [`StorageTransfer`] handle is the only
//! way to pause the operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::credentials::CredentialProvider;
use crate::error::Result;

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Upload,
    Download,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::Upload => "upload",
            TransferDirection::Download => "download",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where upload bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// A plain filesystem path.
    File(PathBuf),
    /// An opaque host content handle (e.g. a `content://` document URI) the
    /// client resolves through platform APIs.
    Content(String),
}

/// What the storage client is asked to do.
///
/// A `resume_token` carries the opaque identifier captured by an earlier
/// pause; the client continues from the recorded offset instead of starting
/// over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSpec {
    Upload {
        bucket: String,
        key: String,
        source: UploadSource,
        resume_token: Option<String>,
    },
    Download {
        bucket: String,
        key: String,
        destination: PathBuf,
        resume_token: Option<String>,
    },
}

impl TransferSpec {
    pub fn direction(&self) -> TransferDirection {
        match self {
            TransferSpec::Upload { .. } => TransferDirection::Upload,
            TransferSpec::Download { .. } => TransferDirection::Download,
        }
    }

    pub fn bucket(&self) -> &str {
        match self {
            TransferSpec::Upload { bucket, .. } | TransferSpec::Download { bucket, .. } => bucket,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            TransferSpec::Upload { key, .. } | TransferSpec::Download { key, .. } => key,
        }
    }

    pub fn resume_token(&self) -> Option<&str> {
        match self {
            TransferSpec::Upload { resume_token, .. }
            | TransferSpec::Download { resume_token, .. } => resume_token.as_deref(),
        }
    }

    /// Attaches a resume token captured by an earlier pause.
    pub fn with_resume_token(mut self, token: impl Into<String>) -> Self {
        match &mut self {
            TransferSpec::Upload { resume_token, .. }
            | TransferSpec::Download { resume_token, .. } => *resume_token = Some(token.into()),
        }
        self
    }
}

/// Fault reported by the storage client for a failed operation.
///
/// Callers react differently to the two classes (client faults may be worth
/// retrying manually, service faults must be surfaced), so the distinction is
/// part of the contract. The core retries neither.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageFault {
    /// Local fault: I/O error, malformed input, cancellation.
    #[error("storage client fault: {message}")]
    Client { message: String },

    /// The remote service rejected the request (auth, not-found, quota).
    #[error("storage service fault (status {status}): {message}")]
    Service {
        status: u16,
        /// Service-provided error code, when one was returned.
        code: Option<String>,
        message: String,
    },
}

impl StorageFault {
    pub fn client(message: impl Into<String>) -> Self {
        StorageFault::Client {
            message: message.into(),
        }
    }

    pub fn service(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        StorageFault::Service {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, StorageFault::Client { .. })
    }

    pub fn is_service(&self) -> bool {
        matches!(self, StorageFault::Service { .. })
    }
}

/// Result data for a finished transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferSummary {
    /// Entity tag reported by the service, when the operation produced one.
    pub etag: Option<String>,
    /// Total bytes moved.
    pub total_bytes: u64,
}

/// One update from the storage client for an in-flight transfer.
///
/// `Progress` samples are monotonically non-decreasing in `completed` and may
/// arrive arbitrarily often; exactly one terminal variant ends the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferUpdate {
    Progress { completed: u64, total: u64 },
    Completed(TransferSummary),
    Failed(StorageFault),
}

/// Sender half the storage client reports transfer updates through.
pub type UpdateSender = mpsc::UnboundedSender<TransferUpdate>;

/// Control handle for one in-flight transfer.
#[async_trait]
pub trait StorageTransfer: Send + Sync {
    /// Ask the client to stop at the next safe checkpoint.
    ///
    /// Returns the resume token when the transfer was parked, or `None` when
    /// the operation cannot currently be paused (past the point of no return,
    /// or the request shape has no resumable form). Pausing is cooperative;
    /// `None` is a normal outcome, not a failure.
    async fn pause(&self) -> Result<Option<String>>;
}

/// Opaque object-storage SDK capability.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Begin a transfer. Updates flow through `updates` until a terminal
    /// [`TransferUpdate`]; the sender is dropped afterwards.
    async fn begin_transfer(
        &self,
        spec: TransferSpec,
        updates: UpdateSender,
    ) -> Result<Arc<dyn StorageTransfer>>;

    /// Object metadata query. Returns response header names mapped to their
    /// values, preserving multi-valued headers.
    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> std::result::Result<HashMap<String, Vec<String>>, StorageFault>;
}

/// Region and scheme the factory needs to construct a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub region: String,
    pub https: bool,
}

/// Constructs a [`StorageClient`] bound to a region and credential source.
///
/// Supplied by the host; called once per service session.
pub trait StorageClientFactory: Send + Sync {
    fn create(
        &self,
        settings: &ClientSettings,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Arc<dyn StorageClient>>;
}
