use crate::BridgeMetrics;
use hid_input::{
    DeviceHandle, DeviceParams, DriverEvent, HidHost, InputError, InputTranslator,
    KeyboardPipeline, Protocol, SubClass,
};
use signal_registry::SignalRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Largest raw report the bridge reads in one go.
pub const REPORT_BUF_LEN: usize = 64;

#[derive(Debug)]
struct Session {
    params: DeviceParams,
    keyboard: Option<KeyboardPipeline>,
}

/// Open devices and the per-keyboard report state behind them.
///
/// Every driver event lands in [`DeviceSessions::handle`]. Failures are
/// logged and never propagate; the loop keeps running.
pub struct DeviceSessions<H: HidHost> {
    host: H,
    registry: Arc<SignalRegistry>,
    translator: Arc<InputTranslator>,
    sessions: HashMap<DeviceHandle, Session>,
    metrics: Option<BridgeMetrics>,
}

impl<H: HidHost> DeviceSessions<H> {
    pub fn new(host: H, registry: Arc<SignalRegistry>, translator: Arc<InputTranslator>) -> Self {
        Self {
            host,
            registry,
            translator,
            sessions: HashMap::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: BridgeMetrics) -> Self {
        metrics.input.signals_registered.set(self.registry.len() as i64);
        self.metrics = Some(metrics);
        self
    }

    pub fn handle(&mut self, device: DeviceHandle, event: DriverEvent) {
        match event {
            DriverEvent::Connected => self.connect(device),
            DriverEvent::InputReport => self.input_report(device),
            DriverEvent::Disconnected => {
                info!(%device, "device disconnected");
                self.close(device);
            }
            DriverEvent::TransferError => {
                warn!(%device, "transfer error, closing device");
                self.close(device);
            }
        }
    }

    /// Close every open device, then uninstall the host driver.
    pub fn shutdown(&mut self) {
        let mut open: Vec<_> = self.sessions.keys().copied().collect();
        open.sort();
        for device in open {
            self.close(device);
        }
        match self.host.uninstall() {
            Ok(()) => info!("host driver uninstalled"),
            Err(InputError::Unsupported(op)) => debug!(op, "host has no uninstall"),
            Err(e) => warn!(error = %e, "host uninstall failed"),
        }
    }

    pub fn open_devices(&self) -> Vec<DeviceHandle> {
        let mut out: Vec<_> = self.sessions.keys().copied().collect();
        out.sort();
        out
    }

    pub fn is_open(&self, device: DeviceHandle) -> bool {
        self.sessions.contains_key(&device)
    }

    fn connect(&mut self, device: DeviceHandle) {
        if self.sessions.contains_key(&device) {
            warn!(%device, "connect for a device that is already open");
            return;
        }
        let params = match self.host.params(device) {
            Ok(p) => p,
            Err(e) => {
                error!(%device, error = %e, "reading device parameters failed");
                return;
            }
        };
        if let Err(e) = self.host.open(device) {
            error!(%device, error = %e, "open failed");
            return;
        }
        if let Err(e) = self.configure(device, params) {
            error!(%device, error = %e, "device setup failed");
            if let Err(e) = self.host.close(device) {
                debug!(%device, error = %e, "close after failed setup");
            }
            return;
        }

        let keyboard = params
            .is_boot_keyboard()
            .then(|| KeyboardPipeline::new(self.translator.clone()));
        self.sessions.insert(device, Session { params, keyboard });
        self.set_open_gauge();
        info!(
            %device,
            sub_class = %params.sub_class,
            protocol = %params.protocol,
            "device connected"
        );
    }

    fn configure(&mut self, device: DeviceHandle, params: DeviceParams) -> Result<(), InputError> {
        if params.sub_class == SubClass::Boot {
            self.host.set_boot_protocol(device)?;
            if params.protocol == Protocol::Keyboard {
                self.host.set_idle(device, 0, 0)?;
            }
        }
        self.host.start(device)
    }

    fn input_report(&mut self, device: DeviceHandle) {
        let Some(session) = self.sessions.get_mut(&device) else {
            debug!(%device, "input report for a device that is not open");
            return;
        };
        let mut buf = [0u8; REPORT_BUF_LEN];
        let len = match self.host.read_report(device, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                warn!(%device, error = %e, "reading input report failed");
                if let Some(m) = &self.metrics {
                    m.input.report_errors.inc();
                }
                return;
            }
        };
        let data = &buf[..len];

        match (&mut session.keyboard, session.params.protocol) {
            (Some(pipeline), _) => match pipeline.on_report(&self.registry, data) {
                Ok(stats) => {
                    if let Some(m) = &self.metrics {
                        m.record_translation(&stats);
                    }
                }
                Err(e) => {
                    warn!(%device, error = %e, "bad keyboard report");
                    if let Some(m) = &self.metrics {
                        m.input.report_errors.inc();
                    }
                }
            },
            (None, Protocol::Mouse) => trace!(%device, len, "mouse report"),
            (None, _) => trace!(%device, len, "generic report"),
        }
    }

    fn close(&mut self, device: DeviceHandle) {
        let Some(mut session) = self.sessions.remove(&device) else {
            debug!(%device, "close for a device that is not open");
            return;
        };
        if let Some(pipeline) = session.keyboard.as_mut() {
            let stats = pipeline.release_all(&self.registry);
            if stats.released > 0 {
                info!(%device, released = stats.released, "released keys held at close");
            }
            if let Some(m) = &self.metrics {
                m.record_translation(&stats);
            }
        }
        if let Err(e) = self.host.close(device) {
            warn!(%device, error = %e, "close failed");
        }
        self.set_open_gauge();
    }

    fn set_open_gauge(&self) {
        if let Some(m) = &self.metrics {
            m.input.devices_open.set(self.sessions.len() as i64);
        }
    }
}
