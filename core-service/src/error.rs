use bridge_traits::credentials::CredentialError;
use bridge_traits::error::BridgeError;
use bridge_traits::storage::StorageFault;
use core_transfer::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Bridge initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transfer(TransferError),

    #[error(transparent)]
    Fault(#[from] StorageFault),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

/// Transfer errors surface directly, except the storage fault wrapper which
/// unwraps so callers see one fault shape regardless of the operation.
impl From<TransferError> for CoreError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Fault(fault) => CoreError::Fault(fault),
            TransferError::Bridge(bridge) => CoreError::Bridge(bridge),
            other => CoreError::Transfer(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
