//! signal-registry: named, typed registry of externally-owned control signals
//!
//! Producers and consumers agree on a signal by name once, during setup, and
//! then keep the returned [`SignalHandle`] for lock-free access on hot paths.
//! Storage is owned by the caller ([`SignalCell`] behind an `Arc`); the
//! registry keeps only weak references.

mod types;
pub use types::{Direction, SignalCell, SignalHandle, SignalInfo, SignalKind, SignalValue};

mod error;
pub use error::{RegistryError, Result};

mod registry;
pub use registry::SignalRegistry;

mod loader;
pub use loader::{load_signal_file, parse_signal_specs, SignalBank, SignalSpec};

#[cfg(feature = "schema")]
pub use loader::signal_spec_schema;
