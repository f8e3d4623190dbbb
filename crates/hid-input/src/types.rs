use crate::usage;
use crate::{InputError, Result};
use core::fmt;
use core::ops::Deref;

/// Number of key-code slots in a boot keyboard report.
pub const KEY_SLOTS: usize = 6;

/// Boot keyboard report length: modifier, reserved, 6 key codes.
pub const BOOT_REPORT_LEN: usize = 2 + KEY_SLOTS;

/// Upper bound of edges one report step can produce.
pub const MAX_EDGES: usize = 2 * KEY_SLOTS;

/// HID keyboard usage code
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// Codes up to `ERROR_UNDEFINED` are status values, not keys.
    pub fn is_real(&self) -> bool {
        self.0 > usage::ERROR_UNDEFINED
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match usage::key_name(*self) {
            Some(name) => write!(f, "0x{:02X} ({name})", self.0),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum KeyState {
    Pressed,
    Released,
}

/// A single press or release
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EdgeEvent {
    pub key: KeyCode,
    pub state: KeyState,
    pub modifiers: u8,
}

impl EdgeEvent {
    pub fn pressed(key: KeyCode, modifiers: u8) -> Self {
        Self {
            key,
            state: KeyState::Pressed,
            modifiers,
        }
    }

    pub fn released(key: KeyCode) -> Self {
        Self {
            key,
            state: KeyState::Released,
            modifiers: 0,
        }
    }
}

impl fmt::Display for EdgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            KeyState::Pressed => write!(f, "{} pressed (mod 0x{:02X})", self.key, self.modifiers),
            KeyState::Released => write!(f, "{} released", self.key),
        }
    }
}

/// Inline list of edges from one report step. No heap allocation.
#[derive(Clone, Copy, Debug)]
pub struct EdgeBatch {
    events: [EdgeEvent; MAX_EDGES],
    len: usize,
}

impl EdgeBatch {
    pub fn new() -> Self {
        Self {
            events: [EdgeEvent::released(KeyCode(0)); MAX_EDGES],
            len: 0,
        }
    }

    /// Returns false if the batch is already full.
    pub fn push(&mut self, event: EdgeEvent) -> bool {
        match self.events.get_mut(self.len) {
            Some(slot) => {
                *slot = event;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[EdgeEvent] {
        &self.events[..self.len]
    }
}

impl Default for EdgeBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for EdgeBatch {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for EdgeBatch {}

impl Deref for EdgeBatch {
    type Target = [EdgeEvent];

    fn deref(&self) -> &[EdgeEvent] {
        self.as_slice()
    }
}

impl<'a> IntoIterator for &'a EdgeBatch {
    type Item = &'a EdgeEvent;
    type IntoIter = core::slice::Iter<'a, EdgeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

/// Keys held at one instant, as carried by a boot report.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct KeySnapshot {
    pub keys: [u8; KEY_SLOTS],
    pub modifiers: u8,
}

impl KeySnapshot {
    /// All keys released.
    pub const fn empty() -> Self {
        Self {
            keys: [0; KEY_SLOTS],
            modifiers: 0,
        }
    }

    /// Build from up to six key codes; `None` if more are given.
    pub fn from_keys(keys: &[u8], modifiers: u8) -> Option<Self> {
        if keys.len() > KEY_SLOTS {
            return None;
        }
        let mut slots = [0u8; KEY_SLOTS];
        slots[..keys.len()].copy_from_slice(keys);
        Some(Self {
            keys: slots,
            modifiers,
        })
    }

    pub fn contains(&self, key: KeyCode) -> bool {
        key.is_real() && self.keys.contains(&key.0)
    }

    /// Distinct real keys, in slot order.
    pub fn pressed(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keys.iter().enumerate().filter_map(move |(i, &k)| {
            let code = KeyCode(k);
            if code.is_real() && !self.keys[..i].contains(&k) {
                Some(code)
            } else {
                None
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pressed().next().is_none()
    }
}

/// Boot-protocol keyboard input report.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct KeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keys: [u8; KEY_SLOTS],
}

impl KeyboardReport {
    /// Parse the leading 8 bytes; anything after them is ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BOOT_REPORT_LEN {
            return Err(InputError::ShortReport { len: data.len() });
        }
        let mut keys = [0u8; KEY_SLOTS];
        keys.copy_from_slice(&data[2..BOOT_REPORT_LEN]);
        Ok(Self {
            modifier: data[0],
            reserved: data[1],
            keys,
        })
    }

    pub fn to_bytes(&self) -> [u8; BOOT_REPORT_LEN] {
        let mut out = [0u8; BOOT_REPORT_LEN];
        out[0] = self.modifier;
        out[1] = self.reserved;
        out[2..].copy_from_slice(&self.keys);
        out
    }

    pub fn snapshot(&self) -> KeySnapshot {
        KeySnapshot {
            keys: self.keys,
            modifiers: self.modifier,
        }
    }
}

impl From<KeySnapshot> for KeyboardReport {
    fn from(s: KeySnapshot) -> Self {
        Self {
            modifier: s.modifiers,
            reserved: 0,
            keys: s.keys,
        }
    }
}

/// Opaque device id handed out by the host driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub u32);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hid{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SubClass {
    #[default]
    None,
    Boot,
}

impl fmt::Display for SubClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubClass::None => "NO_SUBCLASS",
            SubClass::Boot => "BOOT_INTERFACE",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Protocol {
    #[default]
    None,
    Keyboard,
    Mouse,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::None => "NONE",
            Protocol::Keyboard => "KEYBOARD",
            Protocol::Mouse => "MOUSE",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeviceParams {
    pub sub_class: SubClass,
    pub protocol: Protocol,
}

impl DeviceParams {
    pub fn boot_keyboard() -> Self {
        Self {
            sub_class: SubClass::Boot,
            protocol: Protocol::Keyboard,
        }
    }

    pub fn boot_mouse() -> Self {
        Self {
            sub_class: SubClass::Boot,
            protocol: Protocol::Mouse,
        }
    }

    pub fn is_boot_keyboard(&self) -> bool {
        self.sub_class == SubClass::Boot && self.protocol == Protocol::Keyboard
    }
}

/// Notification from the host driver about one device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DriverEvent {
    Connected,
    Disconnected,
    TransferError,
    InputReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boot_report() {
        let raw = [0x02, 0x00, 0x1E, 0x00, 0x00, 0x00, 0x00, 0x00, 0xAA];
        let report = KeyboardReport::parse(&raw).unwrap();
        assert_eq!(report.modifier, 0x02);
        assert_eq!(report.keys[0], 0x1E);
        assert_eq!(report.to_bytes(), raw[..8]);

        let snap = report.snapshot();
        assert!(snap.contains(KeyCode(0x1E)));
        assert_eq!(snap.modifiers, 0x02);
    }

    #[test]
    fn test_short_report_rejected() {
        assert!(matches!(
            KeyboardReport::parse(&[0, 0, 0x1E]),
            Err(InputError::ShortReport { len: 3 })
        ));
    }

    #[test]
    fn test_snapshot_skips_reserved_and_duplicates() {
        let snap = KeySnapshot::from_keys(&[0x01, 0x1E, 0x1E, 0x00, 0x03, 0x20], 0).unwrap();
        let keys: Vec<_> = snap.pressed().collect();
        assert_eq!(keys, vec![KeyCode(0x1E), KeyCode(0x20)]);
        assert!(!snap.contains(KeyCode(0x01)));
        assert!(!snap.contains(KeyCode(0x00)));
        assert!(KeySnapshot::from_keys(&[1, 2, 3, 4, 5, 6, 7], 0).is_none());
        assert!(KeySnapshot::from_keys(&[0x01], 0).unwrap().is_empty());
    }

    #[test]
    fn test_edge_batch_capacity() {
        let mut batch = EdgeBatch::new();
        for i in 0..MAX_EDGES {
            assert!(batch.push(EdgeEvent::released(KeyCode(0x04 + i as u8))));
        }
        assert!(!batch.push(EdgeEvent::released(KeyCode(0x30))));
        assert_eq!(batch.len(), MAX_EDGES);
        assert_eq!(batch.iter().count(), MAX_EDGES);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(KeyCode(0x1E).to_string(), "0x1E (1)");
        assert_eq!(DeviceHandle(3).to_string(), "hid3");
    }
}
