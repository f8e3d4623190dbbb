use crate::{DispatchError, Result};
use hid_input::TranslationStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct QueueMetrics {
    pub dispatched: IntCounter,
    pub discarded: IntCounter,
    pub isr_dropped: IntGauge,
}

#[derive(Clone)]
pub struct InputMetrics {
    pub edges_pressed: IntCounter,
    pub edges_released: IntCounter,
    pub keys_unmapped: IntCounter,
    pub report_errors: IntCounter,
    pub devices_open: IntGauge,
    pub signals_registered: IntGauge,
}

#[derive(Clone)]
pub struct BridgeMetrics {
    pub registry: Registry,
    pub queue: QueueMetrics,
    pub input: InputMetrics,
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    IntCounter::new(name, help).map_err(|e| DispatchError::Metrics(format!("init {name}: {e}")))
}

fn gauge(name: &str, help: &str) -> Result<IntGauge> {
    IntGauge::new(name, help).map_err(|e| DispatchError::Metrics(format!("init {name}: {e}")))
}

impl BridgeMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let queue = QueueMetrics {
            dispatched: counter("pendant_envelopes_dispatched", "Envelopes handled by the event loop")?,
            discarded: counter(
                "pendant_envelopes_discarded",
                "Envelopes drained unhandled after cancellation",
            )?,
            isr_dropped: gauge(
                "pendant_isr_dropped",
                "Cancellation markers dropped because the queue was full",
            )?,
        };
        let input = InputMetrics {
            edges_pressed: counter("pendant_edges_pressed", "Key press edges translated")?,
            edges_released: counter("pendant_edges_released", "Key release edges translated")?,
            keys_unmapped: counter("pendant_keys_unmapped", "Edges with no bound signal")?,
            report_errors: counter("pendant_report_errors", "Input reports that failed to read or parse")?,
            devices_open: gauge("pendant_devices_open", "HID devices currently open")?,
            signals_registered: gauge("pendant_signals_registered", "Signals in the registry")?,
        };

        let collectors: [Box<dyn prometheus::core::Collector>; 9] = [
            Box::new(queue.dispatched.clone()),
            Box::new(queue.discarded.clone()),
            Box::new(queue.isr_dropped.clone()),
            Box::new(input.edges_pressed.clone()),
            Box::new(input.edges_released.clone()),
            Box::new(input.keys_unmapped.clone()),
            Box::new(input.report_errors.clone()),
            Box::new(input.devices_open.clone()),
            Box::new(input.signals_registered.clone()),
        ];
        for c in collectors {
            registry
                .register(c)
                .map_err(|e| DispatchError::Metrics(format!("register: {e}")))?;
        }
        Ok(Self {
            registry,
            queue,
            input,
        })
    }

    pub fn record_translation(&self, stats: &TranslationStats) {
        self.input.edges_pressed.inc_by(u64::from(stats.pressed));
        self.input.edges_released.inc_by(u64::from(stats.released));
        self.input.keys_unmapped.inc_by(u64::from(stats.unmapped));
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
