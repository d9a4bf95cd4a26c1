//! Transfer identity and lifecycle states.

use crate::error::{Result, TransferError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller-chosen identifier correlating a transfer across start, progress
/// events, and pause calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a tracked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    /// Transfer is moving bytes.
    Running,
    /// Transfer was suspended and left a resume token behind.
    Paused,
    /// Transfer finished successfully.
    Completed,
    /// Transfer ended with a fault.
    Failed,
}

impl TransferState {
    /// Check if this state represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Running => "running",
            TransferState::Paused => "paused",
            TransferState::Completed => "completed",
            TransferState::Failed => "failed",
        }
    }

    /// Validate a state transition
    pub fn validate_transition(&self, to: TransferState) -> Result<()> {
        let valid = match (*self, to) {
            // From Running
            (TransferState::Running, TransferState::Paused) => true,
            (TransferState::Running, TransferState::Completed) => true,
            (TransferState::Running, TransferState::Failed) => true,

            // A paused transfer resumes as a new registration, not by
            // mutating the old record.
            (TransferState::Paused, _) => false,

            // Terminal states cannot transition
            (TransferState::Completed, _) => false,
            (TransferState::Failed, _) => false,

            _ => false,
        };

        if !valid {
            return Err(TransferError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        Ok(())
    }
}

impl FromStr for TransferState {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "running" => Ok(TransferState::Running),
            "paused" => Ok(TransferState::Paused),
            "completed" => Ok(TransferState::Completed),
            "failed" => Ok(TransferState::Failed),
            _ => Err(TransferError::InvalidArgument(format!(
                "unknown transfer state: {s}"
            ))),
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_round_trip() {
        let id = RequestId::from("upload-42");
        assert_eq!(id.as_str(), "upload-42");
        assert_eq!(id.to_string(), "upload-42");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"upload-42\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TransferState::Running.is_terminal());
        assert!(!TransferState::Paused.is_terminal());
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Failed.is_terminal());
    }

    #[test]
    fn test_valid_transitions_from_running() {
        for to in [
            TransferState::Paused,
            TransferState::Completed,
            TransferState::Failed,
        ] {
            assert!(TransferState::Running.validate_transition(to).is_ok());
        }
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        for from in [TransferState::Completed, TransferState::Failed] {
            let err = from
                .validate_transition(TransferState::Running)
                .unwrap_err();
            assert!(matches!(
                err,
                TransferError::InvalidStateTransition { .. }
            ));
        }
    }

    #[test]
    fn test_paused_does_not_resume_in_place() {
        assert!(TransferState::Paused
            .validate_transition(TransferState::Running)
            .is_err());
    }

    #[test]
    fn test_state_from_str() {
        assert_eq!(
            "Running".parse::<TransferState>().unwrap(),
            TransferState::Running
        );
        assert!("suspended".parse::<TransferState>().is_err());
    }
}
