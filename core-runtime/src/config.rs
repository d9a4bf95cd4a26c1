//! # Service Configuration
//!
//! Region, scheme, and bridge-level tuning knobs for one service session.
//!
//! The configuration also owns request-host derivation: the service uses
//! virtual-hosted addressing, so the public location of an uploaded object is
//! computed here rather than reported by the storage client.

use bridge_traits::storage::ClientSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default bound on a credential rendezvous (seconds).
pub const DEFAULT_CREDENTIAL_TIMEOUT_SECS: u64 = 120;

/// Default event bus buffer capacity.
pub const DEFAULT_EVENT_BUFFER: usize = 100;

/// Configuration for one bridge service session.
///
/// # Examples
///
/// ```
/// use core_runtime::config::ServiceConfig;
///
/// let config = ServiceConfig::new("ap-guangzhou");
/// assert_eq!(
///     config.object_location("examplebucket", "dir/movie.mp4"),
///     "https://examplebucket.cos.ap-guangzhou.myqcloud.com/dir/movie.mp4"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service region identifier, e.g. `ap-guangzhou`.
    pub region: String,
    /// Use https for client requests and derived object locations.
    pub https: bool,
    /// Upper bound on how long a credential request may wait for a host
    /// delivery before failing with a timeout.
    pub credential_timeout_secs: u64,
    /// Buffer capacity of the outbound event bus.
    pub event_buffer: usize,
}

impl ServiceConfig {
    /// Create a configuration for the given region with default settings.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            https: true,
            credential_timeout_secs: DEFAULT_CREDENTIAL_TIMEOUT_SECS,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Set the credential rendezvous bound.
    pub fn with_credential_timeout(mut self, timeout: Duration) -> Self {
        self.credential_timeout_secs = timeout.as_secs();
        self
    }

    /// Use plain http instead of https.
    pub fn with_plain_http(mut self) -> Self {
        self.https = false;
        self
    }

    /// Set the event bus buffer capacity.
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Validate the configuration before constructing a service.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(Error::Config("region must not be empty".into()));
        }
        if self.credential_timeout_secs == 0 {
            return Err(Error::Config(
                "credential_timeout_secs must be non-zero".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be non-zero".into()));
        }
        Ok(())
    }

    pub fn credential_timeout(&self) -> Duration {
        Duration::from_secs(self.credential_timeout_secs)
    }

    /// Virtual-hosted request host for a bucket.
    pub fn request_host(&self, bucket: &str) -> String {
        format!("{}.cos.{}.myqcloud.com", bucket, self.region)
    }

    /// Public location URL for an object.
    pub fn object_location(&self, bucket: &str, key: &str) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}/{}", scheme, self.request_host(bucket), key)
    }

    /// The subset of settings the storage client factory needs.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            region: self.region.clone(),
            https: self.https,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::new("ap-shanghai");
        assert!(config.https);
        assert_eq!(
            config.credential_timeout(),
            Duration::from_secs(DEFAULT_CREDENTIAL_TIMEOUT_SECS)
        );
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ServiceConfig::new("ap-beijing")
            .with_credential_timeout(Duration::from_secs(30))
            .with_plain_http()
            .with_event_buffer(16);

        assert_eq!(config.credential_timeout_secs, 30);
        assert!(!config.https);
        assert_eq!(config.event_buffer, 16);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ServiceConfig::new("").validate().is_err());
        assert!(ServiceConfig::new("  ").validate().is_err());

        let mut config = ServiceConfig::new("ap-guangzhou");
        config.credential_timeout_secs = 0;
        assert!(config.validate().is_err());

        let config = ServiceConfig::new("ap-guangzhou").with_event_buffer(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_location_derivation() {
        let config = ServiceConfig::new("ap-guangzhou");
        assert_eq!(
            config.request_host("examplebucket"),
            "examplebucket.cos.ap-guangzhou.myqcloud.com"
        );

        let plain = ServiceConfig::new("ap-guangzhou").with_plain_http();
        assert_eq!(
            plain.object_location("b", "k"),
            "http://b.cos.ap-guangzhou.myqcloud.com/k"
        );
    }

    #[test]
    fn test_client_settings_subset() {
        let config = ServiceConfig::new("eu-frankfurt").with_plain_http();
        let settings = config.client_settings();
        assert_eq!(settings.region, "eu-frankfurt");
        assert!(!settings.https);
    }
}
