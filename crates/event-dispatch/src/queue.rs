use crate::{DispatchEnvelope, DispatchError, Result};
use hid_input::{DeviceHandle, DriverEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

/// Capacity used by the pendant firmware's application queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Create the bounded queue and its three endpoints.
///
/// All producers share one FIFO, so the consumer sees envelopes in arrival
/// order regardless of which context sent them.
pub fn dispatch_queue(capacity: usize) -> Result<(IsrSender, DriverSender, DispatchReceiver)> {
    if capacity == 0 {
        return Err(DispatchError::InvalidCapacity);
    }
    let (tx, rx) = mpsc::channel(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    Ok((
        IsrSender {
            tx: tx.clone(),
            dropped: dropped.clone(),
        },
        DriverSender { tx },
        DispatchReceiver { rx, dropped },
    ))
}

/// Producer end for interrupt context. Never blocks, never logs.
#[derive(Clone, Debug)]
pub struct IsrSender {
    tx: mpsc::Sender<DispatchEnvelope>,
    dropped: Arc<AtomicU64>,
}

impl IsrSender {
    /// Enqueue the cancellation marker. If the queue is full or already gone
    /// the marker is dropped and counted; returns whether it was queued.
    pub fn raise_cancel(&self) -> bool {
        match self.tx.try_send(DispatchEnvelope::Cancel) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Markers dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Producer end for the host driver's background task.
#[derive(Clone, Debug)]
pub struct DriverSender {
    tx: mpsc::Sender<DispatchEnvelope>,
}

impl DriverSender {
    /// Wait for room, then enqueue.
    pub async fn post(&self, device: DeviceHandle, event: DriverEvent) -> Result<()> {
        self.tx
            .send(DispatchEnvelope::Device { device, event })
            .await
            .map_err(|_| DispatchError::Closed)
    }

    /// Blocking variant for plain driver threads. Must not be called from
    /// inside an async runtime.
    pub fn blocking_post(&self, device: DeviceHandle, event: DriverEvent) -> Result<()> {
        self.tx
            .blocking_send(DispatchEnvelope::Device { device, event })
            .map_err(|_| DispatchError::Closed)
    }

    pub fn try_post(&self, device: DeviceHandle, event: DriverEvent) -> Result<()> {
        self.tx
            .try_send(DispatchEnvelope::Device { device, event })
            .map_err(|e| match e {
                TrySendError::Full(_) => DispatchError::Full,
                TrySendError::Closed(_) => DispatchError::Closed,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The single consumer end.
#[derive(Debug)]
pub struct DispatchReceiver {
    rx: mpsc::Receiver<DispatchEnvelope>,
    dropped: Arc<AtomicU64>,
}

impl DispatchReceiver {
    /// Suspend until an envelope arrives. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<DispatchEnvelope> {
        self.rx.recv().await
    }

    /// Blocking variant for consumers outside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<DispatchEnvelope> {
        self.rx.blocking_recv()
    }

    pub fn try_recv(&mut self) -> Option<DispatchEnvelope> {
        match self.rx.try_recv() {
            Ok(env) => Some(env),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Refuse new envelopes; anything already queued can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Cancellation markers the interrupt side had to drop.
    pub fn isr_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
