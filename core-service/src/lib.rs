//! Bridge service facade and bootstrap helpers.
//!
//! This crate wires host-provided capabilities (the storage client factory
//! and filesystem access) into the shared core and exposes the operations a
//! host application calls: upload, download, pause, object metadata, and
//! credential delivery. Hosts observe progress and credential requests by
//! subscribing to the service's event stream.
//!
//! Two credential modes are supported. With
//! [`BridgeService::with_static_credentials`] the service signs requests from
//! an embedded secret pair. With
//! [`BridgeService::with_brokered_credentials`] the service emits
//! [`BridgeEvent::CredentialsNeeded`] whenever the storage client needs to
//! sign a request, and the host answers through
//! [`BridgeService::deliver_credentials`].

pub mod error;

pub use error::{CoreError, Result};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::credentials::CredentialProvider;
use bridge_traits::storage::{StorageClient, TransferSpec, UploadSource};
use bridge_traits::time::SystemClock;
use core_runtime::events::EventBus;
use core_transfer::{TransferOutcome, TransferReceipt, TransferRegistry};
use tracing::{info, instrument, warn};

pub use bridge_traits::credentials::SessionCredentials;
pub use bridge_traits::fs::FileSystemAccess;
pub use bridge_traits::storage::StorageClientFactory;
pub use core_credentials::{CredentialBroker, StaticCredentialProvider};
pub use core_runtime::config::ServiceConfig;
pub use core_runtime::events::{BridgeEvent, EventStream};
pub use core_transfer::{RequestId, TransferError};

/// Directory under the host cache where downloads land when the caller
/// does not name a destination.
const DEFAULT_DOWNLOAD_DIR: &str = "cos_download";

/// Aggregated handle to the host capabilities the bridge requires.
pub struct BridgeDependencies {
    pub storage_factory: Arc<dyn StorageClientFactory>,
    pub filesystem: Arc<dyn FileSystemAccess>,
}

impl BridgeDependencies {
    /// Construct a dependency bundle from explicit capability handles.
    pub fn new(
        storage_factory: Arc<dyn StorageClientFactory>,
        filesystem: Arc<dyn FileSystemAccess>,
    ) -> Self {
        Self {
            storage_factory,
            filesystem,
        }
    }
}

/// Upload operation parameters.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Correlates progress events and pause calls; untracked when absent.
    pub request_id: Option<String>,
    pub bucket: String,
    pub key: String,
    /// `file://` path, `content://` handle, or plain filesystem path.
    pub file_uri: String,
}

/// Result data for an upload that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    /// Entity tag reported by the service; empty when none was returned.
    pub etag: String,
    /// Public object URL.
    pub location: String,
}

/// How an upload settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed(UploadResult),
    Paused { resume_token: String },
}

/// Download operation parameters.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub request_id: Option<String>,
    pub bucket: String,
    pub key: String,
    /// Destination path; resolved under the host cache when absent.
    pub file_path: Option<String>,
}

/// Result data for a download that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub bucket: String,
    pub key: String,
    pub file_path: PathBuf,
}

/// How a download settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed(DownloadResult),
    Paused { resume_token: String },
}

/// Primary facade exposed to host applications.
pub struct BridgeService {
    config: ServiceConfig,
    event_bus: EventBus,
    registry: TransferRegistry,
    storage: Arc<dyn StorageClient>,
    /// Present in brokered credential mode only.
    broker: Option<Arc<CredentialBroker>>,
    filesystem: Arc<dyn FileSystemAccess>,
}

impl BridgeService {
    /// Creates a service signing requests from an embedded secret pair.
    pub fn with_static_credentials(
        deps: BridgeDependencies,
        config: ServiceConfig,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let event_bus = EventBus::new(config.event_buffer);
        let provider = Arc::new(StaticCredentialProvider::new(
            secret_id,
            secret_key,
            Arc::new(SystemClock),
        ));
        Self::build(deps, config, event_bus, provider, None)
    }

    /// Creates a service that requests session credentials from the host on
    /// demand, via `CredentialsNeeded` events answered by
    /// [`deliver_credentials`](Self::deliver_credentials).
    pub fn with_brokered_credentials(
        deps: BridgeDependencies,
        config: ServiceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let event_bus = EventBus::new(config.event_buffer);
        let broker = Arc::new(CredentialBroker::new(
            event_bus.clone(),
            Arc::new(SystemClock),
            config.credential_timeout(),
        ));
        Self::build(
            deps,
            config,
            event_bus,
            Arc::clone(&broker) as Arc<dyn CredentialProvider>,
            Some(broker),
        )
    }

    fn build(
        deps: BridgeDependencies,
        config: ServiceConfig,
        event_bus: EventBus,
        provider: Arc<dyn CredentialProvider>,
        broker: Option<Arc<CredentialBroker>>,
    ) -> Result<Self> {
        let storage = deps
            .storage_factory
            .create(&config.client_settings(), provider)
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
        let registry = TransferRegistry::new(Arc::clone(&storage), event_bus.clone(), config.clone());

        info!(region = %config.region, brokered = broker.is_some(), "Bridge service initialized");
        Ok(Self {
            config,
            event_bus,
            registry,
            storage,
            broker,
            filesystem: deps.filesystem,
        })
    }

    /// Subscribes to the service's outbound events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// The configuration the service was built with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Hands fresh session credentials to the broker, waking any transfer
    /// suspended on a credential request. Ignored in static credential mode.
    pub async fn deliver_credentials(&self, credentials: SessionCredentials) {
        match &self.broker {
            Some(broker) => broker.deliver(credentials).await,
            None => warn!("Credential delivery ignored in static credential mode"),
        }
    }

    /// Uploads an object, waiting until it completes, fails, or is paused.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Transfer`] for registry errors such as a duplicate
    ///   request id or an invalid source URI.
    /// - [`CoreError::Fault`] when the storage client or service failed the
    ///   transfer.
    #[instrument(skip(self, request), fields(bucket = %request.bucket, key = %request.key))]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome> {
        let source = parse_upload_source(&request.file_uri)?;
        let spec = TransferSpec::Upload {
            bucket: request.bucket.clone(),
            key: request.key.clone(),
            source,
            resume_token: None,
        };

        let ticket = self
            .registry
            .start(request.request_id.map(RequestId::from), spec)
            .await?;

        match ticket.outcome().await? {
            TransferOutcome::Completed(TransferReceipt::Upload { etag, location }) => {
                Ok(UploadOutcome::Completed(UploadResult {
                    bucket: request.bucket,
                    key: request.key,
                    etag,
                    location,
                }))
            }
            TransferOutcome::Completed(receipt) => Err(CoreError::Internal(format!(
                "upload settled with mismatched receipt: {receipt:?}"
            ))),
            TransferOutcome::Paused { resume_token } => Ok(UploadOutcome::Paused { resume_token }),
        }
    }

    /// Downloads an object, waiting until it completes, fails, or is paused.
    ///
    /// Without an explicit destination the object lands under the host cache
    /// at `cos_download/<key>`; missing directories are created either way.
    #[instrument(skip(self, request), fields(bucket = %request.bucket, key = %request.key))]
    pub async fn download(&self, request: DownloadRequest) -> Result<DownloadOutcome> {
        let destination = self
            .resolve_destination(request.file_path.as_deref(), &request.key)
            .await?;
        let spec = TransferSpec::Download {
            bucket: request.bucket.clone(),
            key: request.key.clone(),
            destination: destination.clone(),
            resume_token: None,
        };

        let ticket = self
            .registry
            .start(request.request_id.map(RequestId::from), spec)
            .await?;

        match ticket.outcome().await? {
            TransferOutcome::Completed(TransferReceipt::Download { destination }) => {
                Ok(DownloadOutcome::Completed(DownloadResult {
                    bucket: request.bucket,
                    key: request.key,
                    file_path: destination,
                }))
            }
            TransferOutcome::Completed(receipt) => Err(CoreError::Internal(format!(
                "download settled with mismatched receipt: {receipt:?}"
            ))),
            TransferOutcome::Paused { resume_token } => {
                Ok(DownloadOutcome::Paused { resume_token })
            }
        }
    }

    /// Pauses the running transfer tracked under `request_id`, returning the
    /// resume token. The next upload or download under the same id continues
    /// from the recorded offset.
    #[instrument(skip(self))]
    pub async fn pause(&self, request_id: &str) -> Result<String> {
        Ok(self.registry.pause(&RequestId::from(request_id)).await?)
    }

    /// Queries object metadata. Multi-valued response headers are joined
    /// with commas.
    #[instrument(skip(self))]
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<HashMap<String, String>> {
        let headers = self.storage.head_object(bucket, key).await?;
        Ok(headers
            .into_iter()
            .map(|(name, values)| (name, values.join(",")))
            .collect())
    }

    async fn resolve_destination(&self, file_path: Option<&str>, key: &str) -> Result<PathBuf> {
        let destination = match file_path {
            Some(path) if !path.is_empty() => {
                PathBuf::from(path.strip_prefix("file://").unwrap_or(path))
            }
            _ => self
                .filesystem
                .cache_directory()
                .await?
                .join(DEFAULT_DOWNLOAD_DIR)
                .join(key),
        };

        if let Some(parent) = destination.parent() {
            if !self.filesystem.exists(parent).await? {
                self.filesystem.create_dir_all(parent).await?;
            }
        }

        Ok(destination)
    }
}

impl std::fmt::Debug for BridgeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeService")
            .field("region", &self.config.region)
            .field("brokered", &self.broker.is_some())
            .finish()
    }
}

/// Resolves the caller-facing source URI into an upload source.
fn parse_upload_source(file_uri: &str) -> Result<UploadSource> {
    if file_uri.is_empty() {
        return Err(TransferError::InvalidArgument("upload source URI is empty".to_string()).into());
    }
    if let Some(path) = file_uri.strip_prefix("file://") {
        if path.is_empty() {
            return Err(
                TransferError::InvalidArgument("upload source URI has no path".to_string()).into(),
            );
        }
        return Ok(UploadSource::File(PathBuf::from(path)));
    }
    if file_uri.starts_with("content://") {
        // Opaque document handle; the storage client resolves it through
        // platform APIs.
        return Ok(UploadSource::Content(file_uri.to_string()));
    }
    Ok(UploadSource::File(PathBuf::from(file_uri)))
}
