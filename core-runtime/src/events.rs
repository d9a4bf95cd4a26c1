//! # Event Bus
//!
//! Outbound host notifications over `tokio::sync::broadcast`.
//!
//! The bridge pushes two kinds of asynchronous events to the host:
//!
//! - [`BridgeEvent::CredentialsNeeded`]: the credential broker is suspended
//!   waiting for a delivery; the host should fetch fresh session credentials
//!   and hand them back through the service.
//! - [`BridgeEvent::TransferProgress`]: a progress sample for an in-flight
//!   transfer, correlated by the caller-supplied request id.
//!
//! Emission is fire-and-forget: a missing or slow subscriber never blocks or
//! fails the component that emitted the event. Subscribers that fall behind
//! receive `RecvError::Lagged` and keep going.
//!
//! ```
//! use core_runtime::events::{BridgeEvent, EventBus};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(BridgeEvent::CredentialsNeeded).ok();
//! assert_eq!(sub.recv().await.unwrap(), BridgeEvent::CredentialsNeeded);
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Asynchronous notification pushed from the bridge core to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    /// The credential broker is blocked awaiting a delivery. No payload; the
    /// host answers by calling the service's credential-delivery operation.
    CredentialsNeeded,

    /// Progress sample for an in-flight transfer. Samples for one request id
    /// arrive in non-decreasing `processed_bytes` order and always precede
    /// that transfer's terminal result.
    TransferProgress {
        /// Caller-supplied request id; absent for untracked transfers.
        request_id: Option<String>,
        processed_bytes: u64,
        target_bytes: u64,
    },
}

impl BridgeEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            BridgeEvent::CredentialsNeeded => "Session credentials requested",
            BridgeEvent::TransferProgress { .. } => "Transfer progress update",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            BridgeEvent::CredentialsNeeded => EventSeverity::Info,
            BridgeEvent::TransferProgress { .. } => EventSeverity::Debug,
        }
    }
}

/// Broadcast channel carrying [`BridgeEvent`]s to host subscribers.
///
/// Cloning the bus produces another producer handle; each `subscribe()`
/// creates an independent receiver. Events are cloned per subscriber, so
/// payloads stay lightweight.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber before the subscriber starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none. Emitters treat both the same way.
    pub fn emit(&self, event: BridgeEvent) -> Result<usize, SendError<BridgeEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber receiving all future events.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&BridgeEvent) -> bool + Send + Sync>;

/// A receiver wrapper that skips events failing a predicate.
///
/// ```
/// use core_runtime::events::{BridgeEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let progress_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, BridgeEvent::TransferProgress { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<BridgeEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BridgeEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when the subscriber fell behind by `n` events;
    /// `RecvError::Closed` when all senders are gone.
    pub async fn recv(&mut self) -> Result<BridgeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Attempts to receive a matching event without blocking.
    pub fn try_recv(&mut self) -> Option<Result<BridgeEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => match &self.filter {
                    Some(filter) if !filter(&event) => continue,
                    _ => return Some(Ok(event)),
                },
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
