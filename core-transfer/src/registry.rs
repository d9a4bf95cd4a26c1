//! # Transfer Registry
//!
//! Tracks in-flight transfers by caller-chosen request id, forwards their
//! progress to the host event bus, and books resume tokens across pause and
//! restart.
//!
//! ## Lifecycle
//!
//! [`TransferRegistry::start`] hands the spec to the storage client and
//! returns a [`TransferTicket`] whose [`outcome`](TransferTicket::outcome)
//! resolves exactly once: with a [`TransferReceipt`] on completion, with
//! [`TransferOutcome::Paused`] when a pause wins, or with an error. A
//! background task per transfer pumps the client's update stream, publishing
//! [`BridgeEvent::TransferProgress`] samples in arrival order until the first
//! terminal update.
//!
//! [`TransferRegistry::pause`] asks the client's transfer handle to park the
//! operation. A token coming back removes the registration, settles the
//! pending ticket as paused, and stores the token; the next `start` under the
//! same request id picks the token up automatically so the client can
//! continue from the recorded offset.

use crate::error::{Result, TransferError};
use crate::state::{RequestId, TransferState};
use bridge_traits::storage::{
    StorageClient, StorageTransfer, TransferDirection, TransferSpec, TransferSummary,
    TransferUpdate,
};
use core_runtime::config::ServiceConfig;
use core_runtime::events::{BridgeEvent, EventBus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, instrument, warn};

/// Final result data for a transfer that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferReceipt {
    Upload {
        /// Entity tag reported by the service; empty when none was returned.
        etag: String,
        /// Public object URL derived from bucket, region, and key.
        location: String,
    },
    Download {
        /// Local path the object was written to.
        destination: PathBuf,
    },
}

/// How a tracked transfer ended from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed(TransferReceipt),
    /// A pause won the race; the token restarts the transfer later.
    Paused { resume_token: String },
}

/// Caller handle for one started transfer.
#[derive(Debug)]
pub struct TransferTicket {
    request_id: Option<RequestId>,
    outcome: oneshot::Receiver<Result<TransferOutcome>>,
}

impl TransferTicket {
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Waits for the transfer to settle.
    ///
    /// Resolves exactly once per started transfer, whichever of completion,
    /// failure, or pause happens first.
    pub async fn outcome(self) -> Result<TransferOutcome> {
        match self.outcome.await {
            Ok(result) => result,
            Err(_) => Err(TransferError::Interrupted),
        }
    }
}

/// Receipt fields fixed at start time, before any update arrives.
#[derive(Debug, Clone)]
enum ReceiptSeed {
    Upload { location: String },
    Download { destination: PathBuf },
}

impl ReceiptSeed {
    fn from_spec(spec: &TransferSpec, config: &ServiceConfig) -> Self {
        match spec {
            TransferSpec::Upload { bucket, key, .. } => ReceiptSeed::Upload {
                location: config.object_location(bucket, key),
            },
            TransferSpec::Download { destination, .. } => ReceiptSeed::Download {
                destination: destination.clone(),
            },
        }
    }

    fn into_receipt(self, summary: TransferSummary) -> TransferReceipt {
        match self {
            ReceiptSeed::Upload { location } => TransferReceipt::Upload {
                etag: summary.etag.unwrap_or_default(),
                location,
            },
            ReceiptSeed::Download { destination } => TransferReceipt::Download { destination },
        }
    }
}

/// Registry record for one running transfer.
struct ActiveTransfer {
    transfer: Arc<dyn StorageTransfer>,
    /// Consumed by whichever of pump or pause settles first.
    settle: Option<oneshot::Sender<Result<TransferOutcome>>>,
    /// Set by a successful pause; tells the pump to stop forwarding.
    detached: Arc<AtomicBool>,
    state: TransferState,
    direction: TransferDirection,
    bucket: String,
    key: String,
}

#[derive(Default)]
struct RegistryInner {
    active: HashMap<RequestId, ActiveTransfer>,
    /// Resume tokens from paused transfers, consumed by the next start
    /// under the same request id.
    resume: HashMap<RequestId, String>,
}

/// Where a terminal pump result gets delivered.
enum SettleVia {
    /// Look the entry up and take its settle sender under the registry lock.
    Tracked {
        inner: Arc<Mutex<RegistryInner>>,
        request_id: RequestId,
    },
    /// Untracked transfer; the pump holds the sender itself.
    Direct(oneshot::Sender<Result<TransferOutcome>>),
}

/// Tracks transfers, forwards progress, and books pause/resume state.
pub struct TransferRegistry {
    storage: Arc<dyn StorageClient>,
    event_bus: EventBus,
    config: ServiceConfig,
    inner: Arc<Mutex<RegistryInner>>,
}

impl TransferRegistry {
    pub fn new(storage: Arc<dyn StorageClient>, event_bus: EventBus, config: ServiceConfig) -> Self {
        Self {
            storage,
            event_bus,
            config,
            inner: Arc::new(Mutex::new(RegistryInner::default())),
        }
    }

    /// Starts a transfer, optionally tracked under `request_id`.
    ///
    /// A tracked start consumes any resume token stored by an earlier pause
    /// of the same request id, unless the spec already carries one. An
    /// untracked transfer still reports progress (with no request id) but
    /// cannot be paused.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidArgument`] when a transfer is already
    ///   running under `request_id`.
    /// - [`TransferError::Bridge`] when the storage client rejects the spec.
    #[instrument(
        skip(self, spec),
        fields(
            request_id = request_id.as_ref().map(RequestId::as_str),
            direction = %spec.direction(),
            bucket = spec.bucket(),
            key = spec.key(),
        )
    )]
    pub async fn start(
        &self,
        request_id: Option<RequestId>,
        mut spec: TransferSpec,
    ) -> Result<TransferTicket> {
        let (settle_tx, settle_rx) = oneshot::channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let detached = Arc::new(AtomicBool::new(false));
        let seed = ReceiptSeed::from_spec(&spec, &self.config);
        let direction = spec.direction();
        let bucket = spec.bucket().to_string();
        let key = spec.key().to_string();

        // Held across begin_transfer so a racing start under the same id
        // observes either the existing entry or this one, never neither.
        let mut inner = self.inner.lock().await;

        if let Some(id) = &request_id {
            if inner.active.contains_key(id) {
                warn!("Request id already has a running transfer");
                return Err(TransferError::InvalidArgument(format!(
                    "request id {id} already has a running transfer"
                )));
            }
            if spec.resume_token().is_none() {
                if let Some(token) = inner.resume.remove(id) {
                    debug!("Attaching stored resume token");
                    spec = spec.with_resume_token(token);
                }
            }
        }

        let transfer = self.storage.begin_transfer(spec, update_tx).await?;
        info!("Transfer started");

        let settle_via = match &request_id {
            Some(id) => {
                inner.active.insert(
                    id.clone(),
                    ActiveTransfer {
                        transfer,
                        settle: Some(settle_tx),
                        detached: Arc::clone(&detached),
                        state: TransferState::Running,
                        direction,
                        bucket,
                        key,
                    },
                );
                SettleVia::Tracked {
                    inner: Arc::clone(&self.inner),
                    request_id: id.clone(),
                }
            }
            None => SettleVia::Direct(settle_tx),
        };
        drop(inner);

        tokio::spawn(Self::pump(
            update_rx,
            self.event_bus.clone(),
            seed,
            request_id.as_ref().map(RequestId::to_string),
            detached,
            settle_via,
        ));

        Ok(TransferTicket {
            request_id,
            outcome: settle_rx,
        })
    }

    /// Pauses the running transfer registered under `request_id`.
    ///
    /// On success the registration is removed, the pending ticket settles as
    /// [`TransferOutcome::Paused`], and the returned token is stored for the
    /// next start under the same id.
    ///
    /// # Errors
    ///
    /// - [`TransferError::NotFound`] when no transfer is running under the
    ///   id (including a terminal update racing ahead of the pause).
    /// - [`TransferError::NotPausable`] when the client declined to park the
    ///   operation; the transfer keeps running.
    #[instrument(skip(self), fields(request_id = request_id.as_str()))]
    pub async fn pause(&self, request_id: &RequestId) -> Result<String> {
        let transfer = {
            let inner = self.inner.lock().await;
            let entry = inner
                .active
                .get(request_id)
                .ok_or_else(|| TransferError::NotFound {
                    request_id: request_id.to_string(),
                })?;
            debug!(
                direction = %entry.direction,
                bucket = %entry.bucket,
                key = %entry.key,
                "Pausing transfer"
            );
            Arc::clone(&entry.transfer)
        };

        // The registry lock is not held across the client call; a terminal
        // update may settle the transfer while the pause is in flight.
        let token = transfer.pause().await?;

        let Some(token) = token else {
            info!("Client declined to pause, transfer keeps running");
            return Err(TransferError::NotPausable {
                request_id: request_id.to_string(),
            });
        };

        let mut inner = self.inner.lock().await;
        let Some(mut entry) = inner.active.remove(request_id) else {
            // Terminal update won the race; the ticket already settled.
            warn!("Transfer settled while pause was in flight");
            return Err(TransferError::NotFound {
                request_id: request_id.to_string(),
            });
        };

        entry.state.validate_transition(TransferState::Paused)?;
        entry.detached.store(true, Ordering::SeqCst);
        if let Some(tx) = entry.settle.take() {
            let _ = tx.send(Ok(TransferOutcome::Paused {
                resume_token: token.clone(),
            }));
        }
        inner.resume.insert(request_id.clone(), token.clone());

        info!("Transfer paused, resume token stored");
        Ok(token)
    }

    /// Whether a transfer is currently registered under `request_id`.
    pub async fn is_running(&self, request_id: &RequestId) -> bool {
        self.inner.lock().await.active.contains_key(request_id)
    }

    /// The stored resume token awaiting the next start, if any.
    pub async fn pending_resume(&self, request_id: &RequestId) -> Option<String> {
        self.inner.lock().await.resume.get(request_id).cloned()
    }

    /// Number of transfers currently registered.
    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.active.len()
    }

    /// Forwards one transfer's update stream until the first terminal update,
    /// then settles the ticket.
    async fn pump(
        mut updates: mpsc::UnboundedReceiver<TransferUpdate>,
        event_bus: EventBus,
        seed: ReceiptSeed,
        request_id: Option<String>,
        detached: Arc<AtomicBool>,
        settle: SettleVia,
    ) {
        let mut seed = Some(seed);
        let mut settle = Some(settle);

        while let Some(update) = updates.recv().await {
            if detached.load(Ordering::SeqCst) {
                // Pause already settled the ticket; late updates are noise.
                return;
            }
            match update {
                TransferUpdate::Progress { completed, total } => {
                    let _ = event_bus.emit(BridgeEvent::TransferProgress {
                        request_id: request_id.clone(),
                        processed_bytes: completed,
                        target_bytes: total,
                    });
                }
                TransferUpdate::Completed(summary) => {
                    if let (Some(seed), Some(via)) = (seed.take(), settle.take()) {
                        let outcome = TransferOutcome::Completed(seed.into_receipt(summary));
                        Self::resolve(via, Ok(outcome)).await;
                    }
                    return;
                }
                TransferUpdate::Failed(fault) => {
                    if let Some(via) = settle.take() {
                        Self::resolve(via, Err(TransferError::Fault(fault))).await;
                    }
                    return;
                }
            }
        }

        // Update sender dropped without a terminal update.
        if !detached.load(Ordering::SeqCst) {
            if let Some(via) = settle.take() {
                warn!(request_id = ?request_id, "Update stream closed without terminal update");
                Self::resolve(via, Err(TransferError::Interrupted)).await;
            }
        }
    }

    /// Delivers a terminal result, deregistering the transfer when tracked.
    async fn resolve(via: SettleVia, result: Result<TransferOutcome>) {
        match via {
            SettleVia::Direct(tx) => {
                let _ = tx.send(result);
            }
            SettleVia::Tracked { inner, request_id } => {
                let mut inner = inner.lock().await;
                // A pause that won the race already removed the entry.
                if let Some(mut entry) = inner.active.remove(&request_id) {
                    let to = if result.is_ok() {
                        TransferState::Completed
                    } else {
                        TransferState::Failed
                    };
                    if let Err(e) = entry.state.validate_transition(to) {
                        warn!(request_id = %request_id, error = %e, "Unexpected transfer state");
                    }
                    entry.state = to;
                    if let Some(tx) = entry.settle.take() {
                        let _ = tx.send(result);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for TransferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRegistry")
            .field("region", &self.config.region)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::storage::{StorageFault, UpdateSender, UploadSource};
    use core_runtime::events::EventStream;
    use tokio::time::{sleep, Duration};

    /// Transfer handle scripted with a fixed pause answer.
    struct ScriptedTransfer {
        resume_token: Option<String>,
    }

    #[async_trait]
    impl StorageTransfer for ScriptedTransfer {
        async fn pause(&self) -> BridgeResult<Option<String>> {
            Ok(self.resume_token.clone())
        }
    }

    /// Storage client capturing specs and handing update senders to the test.
    struct ScriptedClient {
        resume_token: Option<String>,
        specs: std::sync::Mutex<Vec<TransferSpec>>,
        senders: std::sync::Mutex<Vec<UpdateSender>>,
    }

    impl ScriptedClient {
        fn new(resume_token: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                resume_token: resume_token.map(str::to_string),
                specs: std::sync::Mutex::new(Vec::new()),
                senders: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn sender(&self, index: usize) -> UpdateSender {
            self.senders.lock().unwrap()[index].clone()
        }

        fn spec(&self, index: usize) -> TransferSpec {
            self.specs.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl StorageClient for ScriptedClient {
        async fn begin_transfer(
            &self,
            spec: TransferSpec,
            updates: UpdateSender,
        ) -> BridgeResult<Arc<dyn StorageTransfer>> {
            self.specs.lock().unwrap().push(spec);
            self.senders.lock().unwrap().push(updates);
            Ok(Arc::new(ScriptedTransfer {
                resume_token: self.resume_token.clone(),
            }))
        }

        async fn head_object(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> std::result::Result<HashMap<String, Vec<String>>, StorageFault> {
            Err(StorageFault::client("not scripted"))
        }
    }

    fn registry(client: Arc<ScriptedClient>, bus: EventBus) -> TransferRegistry {
        TransferRegistry::new(client, bus, ServiceConfig::new("ap-guangzhou"))
    }

    fn upload_spec(key: &str) -> TransferSpec {
        TransferSpec::Upload {
            bucket: "examplebucket-125000000".into(),
            key: key.into(),
            source: UploadSource::File(PathBuf::from("/tmp/payload.bin")),
            resume_token: None,
        }
    }

    fn progress(completed: u64, total: u64) -> TransferUpdate {
        TransferUpdate::Progress { completed, total }
    }

    fn completed(etag: &str) -> TransferUpdate {
        TransferUpdate::Completed(TransferSummary {
            etag: Some(etag.to_string()),
            total_bytes: 100,
        })
    }

    #[tokio::test]
    async fn test_upload_reports_progress_then_completes() {
        let client = ScriptedClient::new(None);
        let bus = EventBus::new(32);
        let mut events = EventStream::new(bus.subscribe());
        let registry = registry(Arc::clone(&client), bus);

        let ticket = registry
            .start(Some(RequestId::from("r1")), upload_spec("dir/object"))
            .await
            .unwrap();

        let sender = client.sender(0);
        sender.send(progress(25, 100)).unwrap();
        sender.send(progress(100, 100)).unwrap();
        sender.send(completed("\"abc123\"")).unwrap();
        drop(sender);

        let outcome = ticket.outcome().await.unwrap();
        assert_eq!(
            outcome,
            TransferOutcome::Completed(TransferReceipt::Upload {
                etag: "\"abc123\"".to_string(),
                location:
                    "https://examplebucket-125000000.cos.ap-guangzhou.myqcloud.com/dir/object"
                        .to_string(),
            })
        );

        // Progress samples arrive in order and carry the request id.
        for expected in [25u64, 100] {
            match events.recv().await.unwrap() {
                BridgeEvent::TransferProgress {
                    request_id,
                    processed_bytes,
                    target_bytes,
                } => {
                    assert_eq!(request_id.as_deref(), Some("r1"));
                    assert_eq!(processed_bytes, expected);
                    assert_eq!(target_bytes, 100);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert!(!registry.is_running(&RequestId::from("r1")).await);
    }

    #[tokio::test]
    async fn test_download_receipt_carries_destination() {
        let client = ScriptedClient::new(None);
        let bus = EventBus::new(32);
        let registry = registry(Arc::clone(&client), bus);

        let dest = PathBuf::from("/data/cache/cos_download/dir/object");
        let ticket = registry
            .start(
                Some(RequestId::from("r2")),
                TransferSpec::Download {
                    bucket: "examplebucket-125000000".into(),
                    key: "dir/object".into(),
                    destination: dest.clone(),
                    resume_token: None,
                },
            )
            .await
            .unwrap();

        client.sender(0).send(completed("\"e\"")).unwrap();

        assert_eq!(
            ticket.outcome().await.unwrap(),
            TransferOutcome::Completed(TransferReceipt::Download { destination: dest })
        );
    }

    #[tokio::test]
    async fn test_pause_settles_ticket_and_stores_token() {
        let client = ScriptedClient::new(Some("upload-id-77"));
        let bus = EventBus::new(32);
        let registry = registry(Arc::clone(&client), bus);
        let id = RequestId::from("r1");

        let ticket = registry
            .start(Some(id.clone()), upload_spec("dir/object"))
            .await
            .unwrap();

        let token = registry.pause(&id).await.unwrap();
        assert_eq!(token, "upload-id-77");

        assert_eq!(
            ticket.outcome().await.unwrap(),
            TransferOutcome::Paused {
                resume_token: "upload-id-77".to_string()
            }
        );

        assert!(!registry.is_running(&id).await);
        assert_eq!(
            registry.pending_resume(&id).await.as_deref(),
            Some("upload-id-77")
        );
    }

    #[tokio::test]
    async fn test_restart_consumes_stored_resume_token() {
        let client = ScriptedClient::new(Some("upload-id-77"));
        let bus = EventBus::new(32);
        let registry = registry(Arc::clone(&client), bus);
        let id = RequestId::from("r1");

        let ticket = registry
            .start(Some(id.clone()), upload_spec("dir/object"))
            .await
            .unwrap();
        registry.pause(&id).await.unwrap();
        ticket.outcome().await.unwrap();

        // Second start under the same id picks the token up.
        let _ticket = registry
            .start(Some(id.clone()), upload_spec("dir/object"))
            .await
            .unwrap();

        assert_eq!(client.spec(1).resume_token(), Some("upload-id-77"));
        assert!(registry.pending_resume(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_pause_without_token_leaves_transfer_running() {
        let client = ScriptedClient::new(None);
        let bus = EventBus::new(32);
        let registry = registry(Arc::clone(&client), bus);
        let id = RequestId::from("r3");

        let ticket = registry
            .start(Some(id.clone()), upload_spec("dir/object"))
            .await
            .unwrap();

        let err = registry.pause(&id).await.unwrap_err();
        assert!(matches!(err, TransferError::NotPausable { .. }));
        assert!(registry.is_running(&id).await);

        // The transfer still settles normally afterwards.
        client.sender(0).send(completed("\"e\"")).unwrap();
        assert!(matches!(
            ticket.outcome().await.unwrap(),
            TransferOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_pause_unknown_request_id() {
        let client = ScriptedClient::new(Some("t"));
        let bus = EventBus::new(32);
        let registry = registry(client, bus);

        let err = registry.pause(&RequestId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, TransferError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_request_id_rejected() {
        let client = ScriptedClient::new(None);
        let bus = EventBus::new(32);
        let registry = registry(Arc::clone(&client), bus);
        let id = RequestId::from("r1");

        let _ticket = registry
            .start(Some(id.clone()), upload_spec("a"))
            .await
            .unwrap();

        let err = registry
            .start(Some(id.clone()), upload_spec("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidArgument(_)));
        assert_eq!(registry.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_service_fault_propagates_to_ticket() {
        let client = ScriptedClient::new(None);
        let bus = EventBus::new(32);
        let registry = registry(Arc::clone(&client), bus);
        let id = RequestId::from("r1");

        let ticket = registry
            .start(Some(id.clone()), upload_spec("dir/object"))
            .await
            .unwrap();

        let fault = StorageFault::service(403, Some("AccessDenied".into()), "denied");
        client
            .sender(0)
            .send(TransferUpdate::Failed(fault.clone()))
            .unwrap();

        match ticket.outcome().await.unwrap_err() {
            TransferError::Fault(got) => assert_eq!(got, fault),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!registry.is_running(&id).await);
    }

    #[tokio::test]
    async fn test_untracked_transfer_reports_anonymous_progress() {
        let client = ScriptedClient::new(None);
        let bus = EventBus::new(32);
        let mut events = EventStream::new(bus.subscribe());
        let registry = registry(Arc::clone(&client), bus);

        let ticket = registry.start(None, upload_spec("dir/object")).await.unwrap();
        assert!(ticket.request_id().is_none());

        let sender = client.sender(0);
        sender.send(progress(10, 100)).unwrap();
        sender.send(completed("\"e\"")).unwrap();

        match events.recv().await.unwrap() {
            BridgeEvent::TransferProgress { request_id, .. } => assert!(request_id.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            ticket.outcome().await.unwrap(),
            TransferOutcome::Completed(_)
        ));
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_closed_stream_without_terminal_is_interrupted() {
        let client = ScriptedClient::new(None);
        let bus = EventBus::new(32);
        let registry = registry(Arc::clone(&client), bus);

        let ticket = registry
            .start(Some(RequestId::from("r1")), upload_spec("dir/object"))
            .await
            .unwrap();

        client.senders.lock().unwrap().clear();

        assert!(matches!(
            ticket.outcome().await.unwrap_err(),
            TransferError::Interrupted
        ));
    }

    #[tokio::test]
    async fn test_no_progress_events_after_pause() {
        let client = ScriptedClient::new(Some("token"));
        let bus = EventBus::new(32);
        let mut events = EventStream::new(bus.subscribe());
        let registry = registry(Arc::clone(&client), bus);
        let id = RequestId::from("r1");

        let _ticket = registry
            .start(Some(id.clone()), upload_spec("dir/object"))
            .await
            .unwrap();
        registry.pause(&id).await.unwrap();

        // Late samples from the parked transfer are dropped, not forwarded.
        client.sender(0).send(progress(90, 100)).ok();
        sleep(Duration::from_millis(20)).await;

        assert!(events.try_recv().is_none());
    }
}
