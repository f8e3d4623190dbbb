use core::fmt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// Closed set of value kinds a signal can carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Bit,
    Float,
    S32,
    U32,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Bit => "bit",
            SignalKind::Float => "float",
            SignalKind::S32 => "s32",
            SignalKind::U32 => "u32",
        };
        f.write_str(s)
    }
}

/// Advisory data direction. Never enforced by the registry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Input to the registry (from hardware).
    #[default]
    In,
    /// Output from the registry (to hardware/LEDs).
    Out,
    InOut,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "io",
        };
        f.write_str(s)
    }
}

/// A decoded signal value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum SignalValue {
    Bit(bool),
    S32(i32),
    U32(u32),
    Float(f32),
}

impl SignalValue {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalValue::Bit(_) => SignalKind::Bit,
            SignalValue::Float(_) => SignalKind::Float,
            SignalValue::S32(_) => SignalKind::S32,
            SignalValue::U32(_) => SignalKind::U32,
        }
    }

    /// Zero value for a kind.
    pub fn default_for(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Bit => SignalValue::Bit(false),
            SignalKind::Float => SignalValue::Float(0.0),
            SignalKind::S32 => SignalValue::S32(0),
            SignalKind::U32 => SignalValue::U32(0),
        }
    }

    /// Coerce a value parsed from configuration into `kind`.
    ///
    /// YAML numbers come back untyped, so `1` may need to become a float or a bit.
    pub fn coerce(self, kind: SignalKind) -> Option<Self> {
        match (self, kind) {
            (v, k) if v.kind() == k => Some(v),
            (SignalValue::S32(i), SignalKind::Float) => Some(SignalValue::Float(i as f32)),
            (SignalValue::U32(u), SignalKind::Float) => Some(SignalValue::Float(u as f32)),
            (SignalValue::S32(i), SignalKind::U32) => u32::try_from(i).ok().map(SignalValue::U32),
            (SignalValue::U32(u), SignalKind::S32) => i32::try_from(u).ok().map(SignalValue::S32),
            (SignalValue::S32(i), SignalKind::Bit) if i == 0 || i == 1 => {
                Some(SignalValue::Bit(i == 1))
            }
            (SignalValue::U32(u), SignalKind::Bit) if u <= 1 => Some(SignalValue::Bit(u == 1)),
            _ => None,
        }
    }

    fn to_bits(self) -> u32 {
        match self {
            SignalValue::Bit(b) => u32::from(b),
            SignalValue::Float(f) => f.to_bits(),
            SignalValue::S32(i) => i as u32,
            SignalValue::U32(u) => u,
        }
    }

    fn from_bits(kind: SignalKind, raw: u32) -> Self {
        match kind {
            SignalKind::Bit => SignalValue::Bit(raw != 0),
            SignalKind::Float => SignalValue::Float(f32::from_bits(raw)),
            SignalKind::S32 => SignalValue::S32(raw as i32),
            SignalKind::U32 => SignalValue::U32(raw),
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Bit(true) => f.write_str("TRUE"),
            SignalValue::Bit(false) => f.write_str("false"),
            SignalValue::Float(v) => write!(f, "{v:.3}"),
            SignalValue::S32(v) => write!(f, "{v}"),
            SignalValue::U32(v) => write!(f, "{v}"),
        }
    }
}

/// Caller-owned storage for one signal.
///
/// A single 32-bit atomic word, so every accessor is one load or store and is
/// safe to use from an interrupt-like context. The cell itself is untyped; the
/// registered [`SignalKind`] decides how the bits are read.
#[derive(Debug, Default)]
pub struct SignalCell(AtomicU32);

impl SignalCell {
    pub fn new(value: SignalValue) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn bit(value: bool) -> Self {
        Self::new(SignalValue::Bit(value))
    }

    pub fn float(value: f32) -> Self {
        Self::new(SignalValue::Float(value))
    }

    pub fn s32(value: i32) -> Self {
        Self::new(SignalValue::S32(value))
    }

    pub fn u32(value: u32) -> Self {
        Self::new(SignalValue::U32(value))
    }

    pub fn load(&self, kind: SignalKind) -> SignalValue {
        SignalValue::from_bits(kind, self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, value: SignalValue) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    pub fn load_bit(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }

    pub fn load_float(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn load_s32(&self) -> i32 {
        self.0.load(Ordering::Acquire) as i32
    }

    pub fn load_u32(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Raw stored word, independent of kind.
    pub fn raw(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

/// Stable reference to a registered signal.
///
/// `registry` identifies the issuing registry and `generation` is its epoch at
/// registration time. A handle used on another registry, or issued before
/// `initialize()`, no longer matches and every access through it is a no-op.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SignalHandle {
    pub(crate) registry: u32,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl SignalHandle {
    pub fn registry_id(&self) -> u32 {
        self.registry
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SignalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}#{}@{}", self.registry, self.index, self.generation)
    }
}

/// Read-only view of one registry entry, used for dumps and diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct SignalInfo {
    pub name: String,
    pub kind: SignalKind,
    pub direction: Direction,
    /// `None` when the caller already dropped the storage.
    pub value: Option<SignalValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_encodings() {
        let cell = SignalCell::float(1.5);
        assert_eq!(cell.load_float(), 1.5);
        assert_eq!(cell.load(SignalKind::Float), SignalValue::Float(1.5));

        let cell = SignalCell::s32(-7);
        assert_eq!(cell.load_s32(), -7);
        assert_eq!(cell.load(SignalKind::U32), SignalValue::U32(-7i32 as u32));

        let cell = SignalCell::bit(true);
        assert!(cell.load_bit());
        assert_eq!(cell.raw(), 1);
    }

    #[test]
    fn test_coerce_from_yaml_numbers() {
        assert_eq!(
            SignalValue::S32(2).coerce(SignalKind::Float),
            Some(SignalValue::Float(2.0))
        );
        assert_eq!(
            SignalValue::S32(1).coerce(SignalKind::Bit),
            Some(SignalValue::Bit(true))
        );
        assert_eq!(SignalValue::S32(-1).coerce(SignalKind::U32), None);
        assert_eq!(SignalValue::Bit(true).coerce(SignalKind::Float), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(SignalValue::Bit(true).to_string(), "TRUE");
        assert_eq!(SignalValue::Bit(false).to_string(), "false");
        assert_eq!(SignalValue::Float(0.25).to_string(), "0.250");
        assert_eq!(SignalValue::S32(-3).to_string(), "-3");
    }
}
