//! HID keyboard/keypad usage page (0x07) codes used by the bridge.

use crate::KeyCode;

pub const RESERVED: u8 = 0x00;
pub const ERROR_ROLLOVER: u8 = 0x01;
pub const POST_FAIL: u8 = 0x02;
pub const ERROR_UNDEFINED: u8 = 0x03;

pub const KEY_A: u8 = 0x04;
pub const KEY_1: u8 = 0x1E;
pub const KEY_2: u8 = 0x1F;
pub const KEY_3: u8 = 0x20;
pub const KEY_4: u8 = 0x21;
pub const KEY_0: u8 = 0x27;
pub const KEY_ENTER: u8 = 0x28;
pub const KEY_ESCAPE: u8 = 0x29;
pub const KEY_BACKSPACE: u8 = 0x2A;
pub const KEY_TAB: u8 = 0x2B;
pub const KEY_SPACE: u8 = 0x2C;
pub const KEY_F1: u8 = 0x3A;

// Modifier byte bits
pub const MOD_LEFT_CTRL: u8 = 1 << 0;
pub const MOD_LEFT_SHIFT: u8 = 1 << 1;
pub const MOD_LEFT_ALT: u8 = 1 << 2;
pub const MOD_LEFT_GUI: u8 = 1 << 3;
pub const MOD_RIGHT_CTRL: u8 = 1 << 4;
pub const MOD_RIGHT_SHIFT: u8 = 1 << 5;
pub const MOD_RIGHT_ALT: u8 = 1 << 6;
pub const MOD_RIGHT_GUI: u8 = 1 << 7;

const NAMED: &[(&str, u8)] = &[
    ("a", 0x04),
    ("b", 0x05),
    ("c", 0x06),
    ("d", 0x07),
    ("e", 0x08),
    ("f", 0x09),
    ("g", 0x0A),
    ("h", 0x0B),
    ("i", 0x0C),
    ("j", 0x0D),
    ("k", 0x0E),
    ("l", 0x0F),
    ("m", 0x10),
    ("n", 0x11),
    ("o", 0x12),
    ("p", 0x13),
    ("q", 0x14),
    ("r", 0x15),
    ("s", 0x16),
    ("t", 0x17),
    ("u", 0x18),
    ("v", 0x19),
    ("w", 0x1A),
    ("x", 0x1B),
    ("y", 0x1C),
    ("z", 0x1D),
    ("1", KEY_1),
    ("2", KEY_2),
    ("3", KEY_3),
    ("4", KEY_4),
    ("5", 0x22),
    ("6", 0x23),
    ("7", 0x24),
    ("8", 0x25),
    ("9", 0x26),
    ("0", KEY_0),
    ("enter", KEY_ENTER),
    ("escape", KEY_ESCAPE),
    ("backspace", KEY_BACKSPACE),
    ("tab", KEY_TAB),
    ("space", KEY_SPACE),
    ("f1", KEY_F1),
    ("f2", 0x3B),
    ("f3", 0x3C),
    ("f4", 0x3D),
    ("f5", 0x3E),
    ("f6", 0x3F),
    ("f7", 0x40),
    ("f8", 0x41),
    ("f9", 0x42),
    ("f10", 0x43),
    ("f11", 0x44),
    ("f12", 0x45),
];

/// Look up a key by name (case-insensitive) or by `0x..` hex literal.
pub fn key_from_name(name: &str) -> Option<KeyCode> {
    let t = name.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).ok().map(KeyCode);
    }
    let lower = t.to_ascii_lowercase();
    match lower.as_str() {
        "esc" => return Some(KeyCode(KEY_ESCAPE)),
        "return" => return Some(KeyCode(KEY_ENTER)),
        _ => {}
    }
    NAMED
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|&(_, code)| KeyCode(code))
}

pub fn key_name(key: KeyCode) -> Option<&'static str> {
    NAMED.iter().find(|&&(_, c)| c == key.0).map(|&(n, _)| n)
}

/// All named keys, in usage order.
pub fn named_keys() -> impl Iterator<Item = (&'static str, KeyCode)> {
    NAMED.iter().map(|&(n, c)| (n, KeyCode(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(key_from_name("1"), Some(KeyCode(KEY_1)));
        assert_eq!(key_from_name("F12"), Some(KeyCode(0x45)));
        assert_eq!(key_from_name("esc"), Some(KeyCode(KEY_ESCAPE)));
        assert_eq!(key_from_name("0x1f"), Some(KeyCode(KEY_2)));
        assert_eq!(key_from_name("hyper"), None);
    }

    #[test]
    fn test_names_round_trip() {
        for (name, code) in named_keys() {
            assert_eq!(key_name(code), Some(name));
            assert!(code.is_real());
        }
        assert_eq!(key_name(KeyCode(ERROR_ROLLOVER)), None);
    }
}
