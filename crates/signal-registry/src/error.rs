use crate::SignalKind;
use thiserror::Error;

pub type Result<T, E = RegistryError> = core::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("signal already exists: {0}")]
    DuplicateName(String),
    #[error("out of memory while registering signal")]
    OutOfMemory,
    #[error("kind mismatch: signal is {actual}, accessor expects {expected}")]
    KindMismatch {
        expected: SignalKind,
        actual: SignalKind,
    },
    #[error("handle is from an earlier registry generation")]
    StaleHandle,
    #[error("handle does not refer to a registered signal")]
    UnknownHandle,
    #[error("signal storage has been dropped by its owner")]
    StorageDropped,
}

impl From<std::collections::TryReserveError> for RegistryError {
    fn from(_: std::collections::TryReserveError) -> Self {
        RegistryError::OutOfMemory
    }
}
