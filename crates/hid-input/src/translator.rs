use crate::usage;
use crate::{EdgeEvent, KeyCode, KeyState, TranslatorError};
use serde::{Deserialize, Serialize};
use signal_registry::{SignalHandle, SignalKind, SignalRegistry};
use std::collections::HashMap;

/// A key given either as a raw usage code or by name ("1", "f5", "0x1E").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    Code(u8),
    Name(String),
}

impl KeySpec {
    pub fn resolve(&self) -> Result<KeyCode, TranslatorError> {
        let code = match self {
            KeySpec::Code(c) => Some(KeyCode(*c)),
            KeySpec::Name(n) => usage::key_from_name(n),
        };
        match code {
            Some(k) if k.is_real() => Ok(k),
            _ => Err(TranslatorError::UnknownKey(match self {
                KeySpec::Code(c) => format!("0x{c:02X}"),
                KeySpec::Name(n) => n.clone(),
            })),
        }
    }
}

/// Key to signal binding as it appears in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: KeySpec,
    pub signal: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Translation {
    Mapped(SignalHandle),
    Unmapped,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TranslationStats {
    pub pressed: u32,
    pub released: u32,
    pub mapped: u32,
    pub unmapped: u32,
}

impl TranslationStats {
    pub fn edges(&self) -> u32 {
        self.pressed + self.released
    }
}

#[derive(Clone, Debug)]
struct Target {
    handle: SignalHandle,
    name: String,
}

/// Maps key edges onto Bit signals.
///
/// The table is fixed once built. Unmapped keys are normal and only logged at
/// debug level.
#[derive(Clone, Debug, Default)]
pub struct InputTranslator {
    table: HashMap<KeyCode, Target>,
    last_keycode: Option<SignalHandle>,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to a Bit signal. Rebinding a key replaces the old target.
    pub fn bind(&mut self, key: KeyCode, handle: SignalHandle, name: impl Into<String>) {
        self.table.insert(
            key,
            Target {
                handle,
                name: name.into(),
            },
        );
    }

    /// Record every edge's raw key code into an S32 signal.
    pub fn with_last_keycode(mut self, handle: SignalHandle) -> Self {
        self.last_keycode = Some(handle);
        self
    }

    /// Resolve configured bindings against `registry`.
    pub fn from_bindings(
        registry: &SignalRegistry,
        bindings: &[KeyBinding],
        last_keycode: Option<&str>,
    ) -> Result<Self, TranslatorError> {
        let mut tr = Self::new();
        for b in bindings {
            let key = b.key.resolve()?;
            let handle = lookup(registry, &b.signal, SignalKind::Bit)?;
            tr.bind(key, handle, b.signal.clone());
        }
        if let Some(name) = last_keycode {
            tr = tr.with_last_keycode(lookup(registry, name, SignalKind::S32)?);
        }
        Ok(tr)
    }

    pub fn target(&self, key: KeyCode) -> Option<SignalHandle> {
        self.table.get(&key).map(|t| t.handle)
    }

    /// Bindings sorted by key code.
    pub fn bindings(&self) -> Vec<(KeyCode, &str)> {
        let mut out: Vec<_> = self
            .table
            .iter()
            .map(|(k, t)| (*k, t.name.as_str()))
            .collect();
        out.sort_by_key(|(k, _)| *k);
        out
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn apply(&self, registry: &SignalRegistry, event: &EdgeEvent) -> Translation {
        if let Some(h) = self.last_keycode {
            registry.set_s32(h, i32::from(event.key.0));
        }
        let Some(target) = self.table.get(&event.key) else {
            tracing::debug!(key = %event.key, state = ?event.state, "unmapped key");
            return Translation::Unmapped;
        };
        let on = event.state == KeyState::Pressed;
        registry.set_bit(target.handle, on);
        tracing::info!(
            key = %event.key,
            signal = %target.name,
            "{}",
            if on { "ON" } else { "OFF" }
        );
        Translation::Mapped(target.handle)
    }

    pub fn apply_all<'a>(
        &self,
        registry: &SignalRegistry,
        events: impl IntoIterator<Item = &'a EdgeEvent>,
    ) -> TranslationStats {
        let mut stats = TranslationStats::default();
        for e in events {
            match e.state {
                KeyState::Pressed => stats.pressed += 1,
                KeyState::Released => stats.released += 1,
            }
            match self.apply(registry, e) {
                Translation::Mapped(_) => stats.mapped += 1,
                Translation::Unmapped => stats.unmapped += 1,
            }
        }
        stats
    }
}

fn lookup(
    registry: &SignalRegistry,
    name: &str,
    expected: SignalKind,
) -> Result<SignalHandle, TranslatorError> {
    let handle = registry
        .find(name)
        .ok_or_else(|| TranslatorError::UnknownSignal(name.to_string()))?;
    match registry.kind(handle) {
        Some(actual) if actual == expected => Ok(handle),
        Some(actual) => Err(TranslatorError::WrongKind {
            name: name.to_string(),
            expected,
            actual,
        }),
        None => Err(TranslatorError::UnknownSignal(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{KEY_1, KEY_2, KEY_A};
    use signal_registry::{Direction, SignalCell};
    use std::sync::Arc;

    struct Fixture {
        reg: SignalRegistry,
        soft1: Arc<SignalCell>,
        soft2: Arc<SignalCell>,
        last: Arc<SignalCell>,
        feed: Arc<SignalCell>,
    }

    fn fixture() -> Fixture {
        let mut reg = SignalRegistry::new();
        let soft1 = Arc::new(SignalCell::bit(false));
        let soft2 = Arc::new(SignalCell::bit(false));
        let last = Arc::new(SignalCell::s32(0));
        let feed = Arc::new(SignalCell::float(0.5));
        reg.register("pendant.softkey.1", SignalKind::Bit, Arc::downgrade(&soft1), Direction::InOut)
            .unwrap();
        reg.register("pendant.softkey.2", SignalKind::Bit, Arc::downgrade(&soft2), Direction::InOut)
            .unwrap();
        reg.register("hw.kb.last_keycode", SignalKind::S32, Arc::downgrade(&last), Direction::In)
            .unwrap();
        reg.register("feed.override", SignalKind::Float, Arc::downgrade(&feed), Direction::In)
            .unwrap();
        Fixture {
            reg,
            soft1,
            soft2,
            last,
            feed,
        }
    }

    fn bindings() -> Vec<KeyBinding> {
        vec![
            KeyBinding {
                key: KeySpec::Name("1".into()),
                signal: "pendant.softkey.1".into(),
            },
            KeyBinding {
                key: KeySpec::Code(KEY_2),
                signal: "pendant.softkey.2".into(),
            },
        ]
    }

    #[test]
    fn test_press_and_release_toggle_bit() {
        let f = fixture();
        let tr =
            InputTranslator::from_bindings(&f.reg, &bindings(), Some("hw.kb.last_keycode"))
                .unwrap();
        assert_eq!(tr.len(), 2);

        let t = tr.apply(&f.reg, &EdgeEvent::pressed(KeyCode(KEY_1), 0));
        assert!(matches!(t, Translation::Mapped(_)));
        assert!(f.soft1.load_bit());
        assert!(!f.soft2.load_bit());
        assert_eq!(f.last.load_s32(), i32::from(KEY_1));

        tr.apply(&f.reg, &EdgeEvent::released(KeyCode(KEY_1)));
        assert!(!f.soft1.load_bit());
    }

    #[test]
    fn test_unmapped_key_mutates_nothing() {
        let f = fixture();
        let tr = InputTranslator::from_bindings(&f.reg, &bindings(), None).unwrap();
        let before = f.reg.dump();
        let t = tr.apply(&f.reg, &EdgeEvent::pressed(KeyCode(KEY_A), 0));
        assert_eq!(t, Translation::Unmapped);
        assert_eq!(f.reg.dump(), before);
    }

    #[test]
    fn test_last_keycode_tracks_unmapped_keys_too() {
        let f = fixture();
        let tr =
            InputTranslator::from_bindings(&f.reg, &bindings(), Some("hw.kb.last_keycode"))
                .unwrap();
        tr.apply(&f.reg, &EdgeEvent::pressed(KeyCode(KEY_A), 0));
        assert_eq!(f.last.load_s32(), i32::from(KEY_A));
        assert!(!f.soft1.load_bit());
    }

    #[test]
    fn test_apply_all_counts() {
        let f = fixture();
        let tr = InputTranslator::from_bindings(&f.reg, &bindings(), None).unwrap();
        let events = [
            EdgeEvent::released(KeyCode(KEY_A)),
            EdgeEvent::pressed(KeyCode(KEY_1), 0),
            EdgeEvent::pressed(KeyCode(KEY_2), 0),
        ];
        let stats = tr.apply_all(&f.reg, &events);
        assert_eq!(
            stats,
            TranslationStats {
                pressed: 2,
                released: 1,
                mapped: 2,
                unmapped: 1,
            }
        );
        assert!(f.soft1.load_bit() && f.soft2.load_bit());
    }

    #[test]
    fn test_binding_errors() {
        let f = fixture();
        let missing = vec![KeyBinding {
            key: KeySpec::Name("3".into()),
            signal: "pendant.softkey.3".into(),
        }];
        assert_eq!(
            InputTranslator::from_bindings(&f.reg, &missing, None).unwrap_err(),
            TranslatorError::UnknownSignal("pendant.softkey.3".into())
        );

        let wrong = vec![KeyBinding {
            key: KeySpec::Name("3".into()),
            signal: "feed.override".into(),
        }];
        assert!(matches!(
            InputTranslator::from_bindings(&f.reg, &wrong, None),
            Err(TranslatorError::WrongKind { .. })
        ));
        assert_eq!(f.feed.load_float(), 0.5);

        assert!(matches!(
            InputTranslator::from_bindings(&f.reg, &[], Some("pendant.softkey.1")),
            Err(TranslatorError::WrongKind { .. })
        ));

        let status = vec![KeyBinding {
            key: KeySpec::Code(1),
            signal: "pendant.softkey.1".into(),
        }];
        assert_eq!(
            InputTranslator::from_bindings(&f.reg, &status, None).unwrap_err(),
            TranslatorError::UnknownKey("0x01".into())
        );
    }

    #[test]
    fn test_bindings_from_yaml() -> anyhow::Result<()> {
        let yaml = "- { key: \"1\", signal: a }\n- { key: 0x1F, signal: b }\n- { key: f5, signal: c }\n";
        let parsed: Vec<KeyBinding> = serde_yaml::from_str(yaml)?;
        assert_eq!(parsed[0].key.resolve()?, KeyCode(KEY_1));
        assert_eq!(parsed[1].key.resolve()?, KeyCode(KEY_2));
        assert_eq!(parsed[2].key.resolve()?, KeyCode(0x3E));
        Ok(())
    }
}
