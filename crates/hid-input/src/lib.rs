//! hid-input: keyboard boot reports to signal edges
//!
//! Diffs successive boot keyboard reports into press/release edges and maps
//! those edges onto registry signals. The USB host itself sits behind the
//! [`HidHost`] trait; the default build enables a `mock` backend so that
//! binaries and tests run without hardware.

mod types;
pub use types::{
    DeviceHandle, DeviceParams, DriverEvent, EdgeBatch, EdgeEvent, KeyCode, KeySnapshot,
    KeyState, KeyboardReport, Protocol, SubClass, BOOT_REPORT_LEN, KEY_SLOTS, MAX_EDGES,
};

mod error;
pub use error::{InputError, Result, TranslatorError};

pub mod usage;

mod diff;
pub use diff::{diff, ReportDifferencer};

mod translator;
pub use translator::{InputTranslator, KeyBinding, KeySpec, Translation, TranslationStats};

mod pipeline;
pub use pipeline::KeyboardPipeline;

mod traits;
pub use traits::HidHost;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockCall, MockHost};
