use core::fmt;
use hid_input::{DeviceHandle, DriverEvent};

/// What travels through the dispatch queue. Consumed exactly once.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DispatchEnvelope {
    /// Lifecycle notification from the host driver context.
    Device {
        device: DeviceHandle,
        event: DriverEvent,
    },
    /// Quit request from the interrupt context.
    Cancel,
}

impl fmt::Display for DispatchEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchEnvelope::Device { device, event } => write!(f, "{device}: {event:?}"),
            DispatchEnvelope::Cancel => f.write_str("cancel"),
        }
    }
}
