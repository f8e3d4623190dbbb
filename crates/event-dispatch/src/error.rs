use thiserror::Error;

pub type Result<T, E = DispatchError> = core::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("queue capacity must be at least 1")]
    InvalidCapacity,
    #[error("dispatch queue closed")]
    Closed,
    #[error("dispatch queue full")]
    Full,
    #[error("metrics error: {0}")]
    Metrics(String),
}
