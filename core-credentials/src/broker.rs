//! # Credential Broker
//!
//! Rendezvous point between the storage client, which pulls session
//! credentials on demand, and the host application, which pushes them in
//! response to a [`BridgeEvent::CredentialsNeeded`] notification.
//!
//! ## Protocol
//!
//! 1. The storage client calls [`CredentialBroker::fetch`] (usually through
//!    the [`CredentialProvider`] impl) when it needs to sign a request.
//! 2. With no delivery retained, the broker emits `CredentialsNeeded` and
//!    suspends the caller.
//! 3. The host fetches fresh credentials from its own backend and calls
//!    [`CredentialBroker::deliver`], which wakes the waiter.
//! 4. The waiter takes the delivered credentials and resumes signing.
//!
//! A delivery that arrives before any fetch is retained and satisfies the
//! next fetch without emitting a request event. Repeated deliveries overwrite
//! each other; only the most recent one is observable.
//!
//! The [`CredentialProvider`] impl layers caching on top: unexpired
//! credentials from an earlier exchange are reused without another round
//! trip, and a refresh lock ensures concurrent callers trigger at most one
//! host round trip.

use async_trait::async_trait;
use bridge_traits::credentials::{CredentialError, CredentialProvider, SessionCredentials};
use bridge_traits::time::Clock;
use core_runtime::events::{BridgeEvent, EventBus};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, instrument, warn};

/// Buffer before expiry at which cached credentials stop being reused.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Mediates credential exchange between the storage client and the host.
pub struct CredentialBroker {
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    /// Upper bound on how long a fetch waits for the host to respond.
    wait_bound: Duration,
    /// Most recent delivery not yet consumed by a fetch.
    slot: Mutex<Option<SessionCredentials>>,
    delivered: Notify,
    /// Unexpired credentials from the last completed exchange.
    cache: Mutex<Option<SessionCredentials>>,
    /// Serializes host round trips so concurrent callers share one delivery.
    refresh_lock: Mutex<()>,
}

impl CredentialBroker {
    pub fn new(event_bus: EventBus, clock: Arc<dyn Clock>, wait_bound: Duration) -> Self {
        Self {
            event_bus,
            clock,
            wait_bound,
            slot: Mutex::new(None),
            delivered: Notify::new(),
            cache: Mutex::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Hands fresh session credentials to the broker, waking any suspended
    /// fetch. A later delivery replaces an unconsumed earlier one.
    #[instrument(skip_all)]
    pub async fn deliver(&self, credentials: SessionCredentials) {
        {
            let mut slot = self.slot.lock().await;
            if slot.is_some() {
                debug!("Replacing unconsumed credential delivery");
            }
            *slot = Some(credentials);
        }
        self.delivered.notify_one();
        info!("Session credentials delivered");
    }

    /// Takes the next delivery, requesting one from the host if none is
    /// retained.
    ///
    /// # Errors
    ///
    /// [`CredentialError::Timeout`] when the host does not deliver within the
    /// configured wait bound.
    #[instrument(skip_all)]
    pub async fn fetch(&self) -> std::result::Result<SessionCredentials, CredentialError> {
        // Fast path: a delivery arrived before we asked.
        if let Some(credentials) = self.slot.lock().await.take() {
            debug!("Consuming retained credential delivery");
            return Ok(credentials);
        }

        info!("Requesting session credentials from host");
        let _ = self.event_bus.emit(BridgeEvent::CredentialsNeeded);

        let wait = async {
            loop {
                self.delivered.notified().await;
                // A stored notify permit can predate a consumed delivery,
                // so re-check the slot instead of trusting the wakeup.
                if let Some(credentials) = self.slot.lock().await.take() {
                    return credentials;
                }
            }
        };

        match timeout(self.wait_bound, wait).await {
            Ok(credentials) => {
                debug!("Credential delivery received");
                Ok(credentials)
            }
            Err(_) => {
                warn!(
                    waited_secs = self.wait_bound.as_secs(),
                    "Timed out waiting for credential delivery"
                );
                Err(CredentialError::Timeout {
                    waited_secs: self.wait_bound.as_secs(),
                })
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for CredentialBroker {
    /// Returns cached credentials while they remain comfortably unexpired,
    /// otherwise performs one host exchange shared by all concurrent callers.
    async fn credentials(&self) -> std::result::Result<SessionCredentials, CredentialError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.as_ref() {
                if !cached.is_expired_with_buffer(self.clock.now(), EXPIRY_BUFFER_SECS) {
                    debug!("Reusing cached session credentials");
                    return Ok(cached.clone());
                }
            }
        }

        let fresh = self.fetch().await?;
        *self.cache.lock().await = Some(fresh.clone());
        Ok(fresh)
    }
}

impl std::fmt::Debug for CredentialBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBroker")
            .field("wait_bound", &self.wait_bound)
            .finish()
    }
}

/// Issues fixed-key credentials with a rolling short lifetime.
///
/// Used when the host embeds a long-lived secret pair instead of brokering
/// per-request session tokens. Each call stamps a fresh expiry so downstream
/// caching never treats the pair as stale.
pub struct StaticCredentialProvider {
    secret_id: String,
    secret_key: String,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl StaticCredentialProvider {
    /// Default validity stamped on each issued credential set.
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(600);

    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            lifetime: Self::DEFAULT_LIFETIME,
            clock,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(&self) -> std::result::Result<SessionCredentials, CredentialError> {
        let expires_at = self.clock.now() + chrono::Duration::seconds(self.lifetime.as_secs() as i64);
        Ok(SessionCredentials::new(
            self.secret_id.clone(),
            self.secret_key.clone(),
            None,
            expires_at,
        ))
    }
}

impl std::fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("secret_id", &self.secret_id)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}
