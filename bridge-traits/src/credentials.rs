//! Credential Abstractions
//!
//! Defines the session credential value object and the provider seam the
//! storage client pulls credentials through. How credentials are obtained
//! (fixed secret, host round-trip) is up to the implementation; the client
//! only ever sees a [`CredentialProvider`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors a [`CredentialProvider`] may report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No credential delivery arrived within the configured bound.
    ///
    /// Fails the operation that needed credentials; the provider itself
    /// remains usable for later requests.
    #[error("credential delivery timed out after {waited_secs}s")]
    Timeout { waited_secs: u64 },

    /// The provider cannot serve credentials at all (misconfiguration,
    /// shut-down host channel).
    #[error("credential provider unavailable: {0}")]
    Unavailable(String),
}

/// Time-bounded session credentials authorizing storage operations.
///
/// Immutable once constructed. Produced by the host (or derived from a fixed
/// secret); consumed by the storage client when signing requests.
///
/// # Security
///
/// The `Debug` implementation redacts the secret key and session token so
/// credentials can be logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    /// Temporary access-key id.
    pub secret_id: String,
    /// Temporary access-key secret.
    pub secret_key: String,
    /// Session token accompanying temporary credentials, if any.
    pub session_token: Option<String>,
    /// When the credentials stop being valid (UTC).
    pub expires_at: DateTime<Utc>,
}

impl SessionCredentials {
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            session_token,
            expires_at,
        }
    }

    /// Whether the credentials are expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the credentials are expired, or will be within `buffer_secs`.
    ///
    /// Refreshing slightly early keeps an in-flight request from racing the
    /// expiry on the service side.
    pub fn is_expired_with_buffer(&self, now: DateTime<Utc>, buffer_secs: i64) -> bool {
        now + chrono::Duration::seconds(buffer_secs) >= self.expires_at
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of signing credentials for the storage client.
///
/// Implementations must be safe to call from whatever execution context the
/// storage client refreshes credentials on, concurrently with the rest of the
/// bridge.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return credentials currently valid for signing a request, obtaining
    /// fresh ones when the cached set is absent or expired.
    async fn credentials(&self) -> Result<SessionCredentials, CredentialError>;
}
