//! event-dispatch: one queue, one consumer
//!
//! Interrupt-context and driver-context producers post into a single bounded
//! FIFO. [`EventLoop`] drains it, keeps one [`DeviceSessions`] entry per open
//! HID device and stops on the first cancellation marker.

mod error;
pub use error::{DispatchError, Result};

mod envelope;
pub use envelope::DispatchEnvelope;

mod queue;
pub use queue::{
    dispatch_queue, DispatchReceiver, DriverSender, IsrSender, DEFAULT_QUEUE_CAPACITY,
};

mod metrics;
pub use metrics::{BridgeMetrics, InputMetrics, QueueMetrics};

mod sessions;
pub use sessions::{DeviceSessions, REPORT_BUF_LEN};

mod event_loop;
pub use event_loop::{EventLoop, ExitReason, LoopSummary};
