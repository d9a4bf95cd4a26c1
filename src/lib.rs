//! # COS Bridge
//!
//! Umbrella crate for the object-storage host bridge. Hosts embed this crate,
//! supply the capability implementations from [`bridge_traits`], and drive
//! everything through [`BridgeService`].
//!
//! ```no_run
//! use cos_bridge::{BridgeDependencies, BridgeService, ServiceConfig, UploadRequest};
//! # use std::sync::Arc;
//! # use cos_bridge::traits::{FileSystemAccess, StorageClientFactory};
//!
//! # async fn example(
//! #     factory: Arc<dyn StorageClientFactory>,
//! #     filesystem: Arc<dyn FileSystemAccess>,
//! # ) -> cos_bridge::Result<()> {
//! let deps = BridgeDependencies::new(factory, filesystem);
//! let service = BridgeService::with_brokered_credentials(deps, ServiceConfig::new("ap-guangzhou"))?;
//!
//! let outcome = service
//!     .upload(UploadRequest {
//!         request_id: Some("upload-1".to_string()),
//!         bucket: "examplebucket-125000000".to_string(),
//!         key: "dir/photo.png".to_string(),
//!         file_uri: "file:///tmp/photo.png".to_string(),
//!     })
//!     .await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_service::{
    BridgeDependencies, BridgeEvent, BridgeService, CoreError, DownloadOutcome, DownloadRequest,
    DownloadResult, EventStream, RequestId, Result, ServiceConfig, SessionCredentials,
    TransferError, UploadOutcome, UploadRequest, UploadResult,
};

/// Capability traits the host implements.
pub mod traits {
    pub use bridge_traits::credentials::{CredentialError, CredentialProvider};
    pub use bridge_traits::error::BridgeError;
    pub use bridge_traits::fs::FileSystemAccess;
    pub use bridge_traits::storage::{
        ClientSettings, StorageClient, StorageClientFactory, StorageFault, StorageTransfer,
        TransferSpec, TransferSummary, TransferUpdate, UpdateSender, UploadSource,
    };
    pub use bridge_traits::time::{Clock, SystemClock};
}
