use crate::DeviceHandle;
use signal_registry::SignalKind;
use thiserror::Error;

pub type Result<T, E = InputError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("report too short for boot keyboard: {len} bytes")]
    ShortReport { len: usize },
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceHandle),
    #[error("operation not supported by this host: {0}")]
    Unsupported(&'static str),
    #[error("host driver error: {0}")]
    Host(String),
}

/// Errors building a key map. These are configuration errors, raised at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslatorError {
    #[error("unknown signal: {0}")]
    UnknownSignal(String),
    #[error("signal '{name}' is {actual}, expected {expected}")]
    WrongKind {
        name: String,
        expected: SignalKind,
        actual: SignalKind,
    },
    #[error("not a usable key: {0}")]
    UnknownKey(String),
}
