//! # Core Runtime
//!
//! Shared runtime plumbing for the bridge: service configuration, the
//! host-facing event bus, and tracing bootstrap. Domain crates depend on this
//! one for everything that is not transfer or credential logic.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use events::{BridgeEvent, EventBus, EventSeverity, EventStream};
pub use logging::{init_logging, LogFormat, LoggingConfig};
