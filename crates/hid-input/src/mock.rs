use crate::{DeviceHandle, DeviceParams, HidHost, InputError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Host call recorded by [`MockHost`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MockCall {
    Open(DeviceHandle),
    Close(DeviceHandle),
    Start(DeviceHandle),
    SetBootProtocol(DeviceHandle),
    SetIdle(DeviceHandle),
    ReadReport(DeviceHandle),
    Uninstall,
}

#[derive(Debug, Default)]
struct MockDevice {
    params: DeviceParams,
    open: bool,
    started: bool,
    reports: VecDeque<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Inner {
    devices: HashMap<DeviceHandle, MockDevice>,
    calls: Vec<MockCall>,
    fail_start: bool,
    uninstalled: bool,
}

/// In-process host. Clones share state, so a test or a simulated driver
/// thread can attach devices and queue reports while the event loop owns
/// another clone.
#[derive(Clone, Debug, Default)]
pub struct MockHost {
    inner: Arc<Mutex<Inner>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, device: DeviceHandle, params: DeviceParams) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.devices.insert(
                device,
                MockDevice {
                    params,
                    ..Default::default()
                },
            );
        }
    }

    pub fn detach(&self, device: DeviceHandle) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.devices.remove(&device);
        }
    }

    /// Queue a raw report for the next `read_report` on `device`.
    pub fn push_report(&self, device: DeviceHandle, data: &[u8]) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(dev) = inner.devices.get_mut(&device) {
                dev.reports.push_back(data.to_vec());
            }
        }
    }

    /// Make every subsequent `start` fail.
    pub fn fail_start(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_start = fail;
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.inner
            .lock()
            .map(|i| i.calls.clone())
            .unwrap_or_default()
    }

    pub fn is_open(&self, device: DeviceHandle) -> bool {
        self.inner
            .lock()
            .ok()
            .and_then(|i| i.devices.get(&device).map(|d| d.open))
            .unwrap_or(false)
    }

    pub fn is_started(&self, device: DeviceHandle) -> bool {
        self.inner
            .lock()
            .ok()
            .and_then(|i| i.devices.get(&device).map(|d| d.started))
            .unwrap_or(false)
    }

    pub fn is_uninstalled(&self) -> bool {
        self.inner.lock().map(|i| i.uninstalled).unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| InputError::Host("mock host lock poisoned".into()))
    }
}

impl HidHost for MockHost {
    fn params(&self, device: DeviceHandle) -> Result<DeviceParams> {
        let inner = self.lock()?;
        inner
            .devices
            .get(&device)
            .map(|d| d.params)
            .ok_or(InputError::UnknownDevice(device))
    }

    fn open(&mut self, device: DeviceHandle) -> Result<()> {
        let mut inner = self.lock()?;
        inner.calls.push(MockCall::Open(device));
        let dev = inner
            .devices
            .get_mut(&device)
            .ok_or(InputError::UnknownDevice(device))?;
        dev.open = true;
        Ok(())
    }

    fn close(&mut self, device: DeviceHandle) -> Result<()> {
        let mut inner = self.lock()?;
        inner.calls.push(MockCall::Close(device));
        match inner.devices.get_mut(&device) {
            Some(dev) if dev.open => {
                dev.open = false;
                dev.started = false;
                Ok(())
            }
            Some(_) => Err(InputError::Host(format!("{device} is not open"))),
            None => Err(InputError::UnknownDevice(device)),
        }
    }

    fn start(&mut self, device: DeviceHandle) -> Result<()> {
        let mut inner = self.lock()?;
        inner.calls.push(MockCall::Start(device));
        if inner.fail_start {
            return Err(InputError::Host(format!("start failed for {device}")));
        }
        let dev = inner
            .devices
            .get_mut(&device)
            .ok_or(InputError::UnknownDevice(device))?;
        if !dev.open {
            return Err(InputError::Host(format!("{device} is not open")));
        }
        dev.started = true;
        Ok(())
    }

    fn set_boot_protocol(&mut self, device: DeviceHandle) -> Result<()> {
        self.lock()?.calls.push(MockCall::SetBootProtocol(device));
        Ok(())
    }

    fn set_idle(&mut self, device: DeviceHandle, _duration: u8, _report_id: u8) -> Result<()> {
        self.lock()?.calls.push(MockCall::SetIdle(device));
        Ok(())
    }

    fn read_report(&mut self, device: DeviceHandle, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock()?;
        inner.calls.push(MockCall::ReadReport(device));
        let dev = inner
            .devices
            .get_mut(&device)
            .ok_or(InputError::UnknownDevice(device))?;
        let report = dev
            .reports
            .pop_front()
            .ok_or_else(|| InputError::Host(format!("no pending report on {device}")))?;
        let n = report.len().min(buf.len());
        buf[..n].copy_from_slice(&report[..n]);
        Ok(n)
    }

    fn uninstall(&mut self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.calls.push(MockCall::Uninstall);
        inner.uninstalled = true;
        Ok(())
    }
}
