use crate::{BridgeMetrics, DeviceSessions, DispatchEnvelope, DispatchReceiver};
use hid_input::HidHost;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitReason {
    /// A cancellation marker was dequeued.
    Cancelled,
    /// Every producer went away.
    ProducersGone,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoopSummary {
    pub dispatched: u64,
    /// Envelopes still queued behind the cancellation marker.
    pub discarded: u64,
    pub isr_dropped: u64,
    pub reason: ExitReason,
}

/// The single consumer: pulls envelopes in FIFO order and routes device
/// events to the open sessions until cancelled.
pub struct EventLoop<H: HidHost> {
    rx: DispatchReceiver,
    sessions: DeviceSessions<H>,
    metrics: Option<BridgeMetrics>,
}

impl<H: HidHost> EventLoop<H> {
    pub fn new(rx: DispatchReceiver, sessions: DeviceSessions<H>) -> Self {
        Self {
            rx,
            sessions,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: BridgeMetrics) -> Self {
        self.sessions = self.sessions.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    /// Run until cancelled. Once the marker is seen nothing else is
    /// dispatched: the queue is closed, drained, and every open device closed.
    pub async fn run(mut self) -> LoopSummary {
        info!("event loop started");
        let mut dispatched = 0u64;
        let reason = loop {
            match self.rx.recv().await {
                Some(DispatchEnvelope::Cancel) => {
                    info!("cancellation requested");
                    break ExitReason::Cancelled;
                }
                Some(DispatchEnvelope::Device { device, event }) => {
                    debug!(%device, ?event, "dispatch");
                    self.sessions.handle(device, event);
                    dispatched += 1;
                    if let Some(m) = &self.metrics {
                        m.queue.dispatched.inc();
                    }
                }
                None => {
                    warn!("all producers dropped");
                    break ExitReason::ProducersGone;
                }
            }
        };

        self.rx.close();
        let mut discarded = 0u64;
        while let Some(env) = self.rx.try_recv() {
            debug!(%env, "discarded after cancellation");
            discarded += 1;
        }
        self.sessions.shutdown();

        let isr_dropped = self.rx.isr_dropped();
        if isr_dropped > 0 {
            warn!(isr_dropped, "cancellation markers were dropped on a full queue");
        }
        if let Some(m) = &self.metrics {
            m.queue.discarded.inc_by(discarded);
            m.queue.isr_dropped.set(isr_dropped as i64);
        }
        info!(dispatched, discarded, ?reason, "event loop stopped");
        LoopSummary {
            dispatched,
            discarded,
            isr_dropped,
            reason,
        }
    }
}
