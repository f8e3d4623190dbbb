use crate::{DeviceHandle, DeviceParams, InputError, Result};

/// The USB HID host driver, as far as the bridge needs it.
///
/// Enumeration, transfer scheduling and descriptor parsing stay behind this
/// trait.
pub trait HidHost {
    /// Sub-class and protocol reported by the device interface.
    fn params(&self, device: DeviceHandle) -> Result<DeviceParams>;

    fn open(&mut self, device: DeviceHandle) -> Result<()>;

    fn close(&mut self, device: DeviceHandle) -> Result<()>;

    /// Begin input transfers.
    fn start(&mut self, device: DeviceHandle) -> Result<()>;

    /// Switch a boot-subclass interface to the boot report protocol.
    fn set_boot_protocol(&mut self, _device: DeviceHandle) -> Result<()> {
        Ok(())
    }

    /// SET_IDLE class request; a duration of 0 reports only on change.
    fn set_idle(&mut self, _device: DeviceHandle, _duration: u8, _report_id: u8) -> Result<()> {
        Ok(())
    }

    /// Copy the latest raw input report into `buf`, returning its length.
    fn read_report(&mut self, device: DeviceHandle, buf: &mut [u8]) -> Result<usize>;

    fn uninstall(&mut self) -> Result<()> {
        Err(InputError::Unsupported("uninstall"))
    }
}
