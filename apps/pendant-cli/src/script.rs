//! Report scripts that stand in for the USB host driver.
//!
//! One step per line, `#` starts a comment:
//!
//! ```text
//! attach 1 keyboard        # or: mouse, generic
//! report 1 00 00 1e 00 00 00 00 00
//! error 1                  # transfer error
//! detach 1
//! sleep 50                 # milliseconds
//! quit                     # raise the cancellation marker
//! ```

use anyhow::{bail, Context, Result};
use event_dispatch::{DispatchError, DriverSender, IsrSender};
use hid_input::{
    DeviceHandle, DeviceParams, DriverEvent, KeySnapshot, KeyboardReport, MockHost, Protocol,
    SubClass,
};
use std::fs;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Attach(DeviceHandle, DeviceParams),
    Report(DeviceHandle, Vec<u8>),
    Error(DeviceHandle),
    Detach(DeviceHandle),
    Sleep(Duration),
    Quit,
}

pub fn parse_script(raw: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (no, line) in raw.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let step = parse_step(line).with_context(|| format!("line {}: '{line}'", no + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

pub fn load_script(path: impl AsRef<Path>) -> Result<Vec<Step>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading script: {}", path.display()))?;
    parse_script(&raw).with_context(|| format!("parsing script: {}", path.display()))
}

fn parse_step(line: &str) -> Result<Step> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let step = match verb {
        "attach" => {
            let dev = device(words.next())?;
            let params = match words.next().unwrap_or("keyboard") {
                "keyboard" => DeviceParams::boot_keyboard(),
                "mouse" => DeviceParams::boot_mouse(),
                "generic" => DeviceParams {
                    sub_class: SubClass::None,
                    protocol: Protocol::None,
                },
                other => bail!("unknown device type '{other}'"),
            };
            Step::Attach(dev, params)
        }
        "report" => {
            let dev = device(words.next())?;
            let bytes = words
                .map(|w| u8::from_str_radix(w.trim_start_matches("0x"), 16))
                .collect::<Result<Vec<u8>, _>>()
                .context("report bytes must be hex")?;
            Step::Report(dev, bytes)
        }
        "error" => Step::Error(device(words.next())?),
        "detach" => Step::Detach(device(words.next())?),
        "sleep" => {
            let ms: u64 = words
                .next()
                .context("sleep needs milliseconds")?
                .parse()
                .context("sleep needs milliseconds")?;
            Step::Sleep(Duration::from_millis(ms))
        }
        "quit" => Step::Quit,
        other => bail!("unknown step '{other}'"),
    };
    Ok(step)
}

fn device(word: Option<&str>) -> Result<DeviceHandle> {
    let n = word
        .context("missing device number")?
        .parse()
        .context("device number must be an integer")?;
    Ok(DeviceHandle(n))
}

/// Press each soft key in turn, chord two, tap an unbound key, then quit.
pub fn demo_script() -> Vec<Step> {
    const KBD: DeviceHandle = DeviceHandle(1);
    let report = |keys: &[u8]| {
        let snap = KeySnapshot::from_keys(keys, 0).unwrap_or_default();
        Step::Report(KBD, KeyboardReport::from(snap).to_bytes().to_vec())
    };
    let mut steps = vec![Step::Attach(KBD, DeviceParams::boot_keyboard())];
    for key in 0x1E..=0x21u8 {
        steps.push(report(&[key]));
        steps.push(Step::Sleep(Duration::from_millis(20)));
        steps.push(report(&[]));
    }
    steps.push(report(&[0x1E, 0x1F]));
    steps.push(report(&[0x1F]));
    steps.push(report(&[]));
    steps.push(report(&[0x04]));
    steps.push(report(&[]));
    steps.push(Step::Detach(KBD));
    steps.push(Step::Quit);
    steps
}

/// Play `steps` on a plain thread, the way a host driver task would post.
///
/// The thread ends early once the event loop has gone away.
pub fn spawn_driver(
    host: MockHost,
    driver: DriverSender,
    isr: IsrSender,
    steps: Vec<Step>,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || match play(&host, &driver, &isr, &steps) {
        Err(DispatchError::Closed) => {
            debug!("event loop gone, driver stopping");
            Ok(())
        }
        other => other.map_err(anyhow::Error::from),
    })
}

fn play(
    host: &MockHost,
    driver: &DriverSender,
    isr: &IsrSender,
    steps: &[Step],
) -> Result<(), DispatchError> {
    for step in steps {
        match step {
            Step::Attach(dev, params) => {
                host.attach(*dev, *params);
                driver.blocking_post(*dev, DriverEvent::Connected)?;
            }
            Step::Report(dev, data) => {
                host.push_report(*dev, data);
                driver.blocking_post(*dev, DriverEvent::InputReport)?;
            }
            Step::Error(dev) => driver.blocking_post(*dev, DriverEvent::TransferError)?,
            Step::Detach(dev) => driver.blocking_post(*dev, DriverEvent::Disconnected)?,
            Step::Sleep(d) => thread::sleep(*d),
            Step::Quit => {
                info!("script requested quit");
                // an interrupt keeps firing until the marker fits
                while !isr.raise_cancel() {
                    if driver.is_closed() {
                        return Err(DispatchError::Closed);
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                return Ok(());
            }
        }
    }
    Ok(())
}
