use anyhow::{ensure, Context, Result};
use event_dispatch::DEFAULT_QUEUE_CAPACITY;
use hid_input::{InputTranslator, KeyBinding, KeySpec};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use signal_registry::{Direction, SignalBank, SignalKind, SignalRegistry, SignalSpec, SignalValue};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub last_keycode: Option<String>,
    #[serde(default)]
    pub signals: Vec<SignalSpec>,
    #[serde(default)]
    pub keymap: Vec<KeyBinding>,
}

fn default_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for BridgeConfig {
    /// The four-softkey pendant layout.
    fn default() -> Self {
        let mut signals: Vec<SignalSpec> = (1..=4)
            .map(|i| SignalSpec {
                name: format!("pendant.softkey.{i}"),
                kind: SignalKind::Bit,
                direction: Direction::InOut,
                initial: None,
            })
            .collect();
        signals.push(SignalSpec {
            name: "hw.kb.last_keycode".to_string(),
            kind: SignalKind::S32,
            direction: Direction::In,
            initial: Some(SignalValue::S32(0)),
        });
        let keymap = (1..=4)
            .map(|i| KeyBinding {
                key: KeySpec::Name(i.to_string()),
                signal: format!("pendant.softkey.{i}"),
            })
            .collect();
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            last_keycode: Some("hw.kb.last_keycode".to_string()),
            signals,
            keymap,
        }
    }
}

/// Everything `run` and `dump` need, built from one config.
///
/// `bank` owns the signal storage and must outlive any reader of `registry`.
pub struct Bridge {
    pub registry: SignalRegistry,
    pub bank: SignalBank,
    pub translator: InputTranslator,
}

impl BridgeConfig {
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let val: Value = serde_yaml::from_str(raw).context("parsing yaml")?;
        let cfg: Self = serde_yaml::from_value(val).context("decoding bridge config")?;
        ensure!(cfg.queue_capacity > 0, "queue_capacity must be at least 1");
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("loading config: {}", path.display()))
    }

    /// `path` if given, otherwise the built-in layout.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                tracing::debug!("no config given, using built-in pendant layout");
                Ok(Self::default())
            }
        }
    }

    pub fn build(&self) -> Result<Bridge> {
        let mut registry = SignalRegistry::new();
        let mut bank = SignalBank::new();
        bank.declare_all(&mut registry, &self.signals)?;
        let translator =
            InputTranslator::from_bindings(&registry, &self.keymap, self.last_keycode.as_deref())
                .context("building keymap")?;
        tracing::info!(
            signals = registry.len(),
            bindings = translator.len(),
            "bridge configured"
        );
        Ok(Bridge {
            registry,
            bank,
            translator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hid_input::usage::{KEY_1, KEY_4};
    use hid_input::KeyCode;

    const SHIPPED: &str = include_str!("../../../configs/pendant.yaml");

    #[test]
    fn test_builtin_layout_builds() {
        let bridge = BridgeConfig::default().build().unwrap();
        assert_eq!(bridge.registry.len(), 5);
        assert_eq!(bridge.bank.len(), 5);
        assert_eq!(bridge.translator.len(), 4);
        assert_eq!(
            bridge.translator.target(KeyCode(KEY_1)),
            bridge.registry.find("pendant.softkey.1")
        );
    }

    #[test]
    fn test_shipped_config_matches_builtin() {
        let cfg = BridgeConfig::from_yaml(SHIPPED).unwrap();
        assert_eq!(cfg.queue_capacity, 10);
        let shipped = cfg.build().unwrap();
        let builtin = BridgeConfig::default().build().unwrap();
        assert_eq!(shipped.registry.dump(), builtin.registry.dump());
        assert_eq!(shipped.translator.bindings(), builtin.translator.bindings());
        assert_eq!(
            shipped.translator.target(KeyCode(KEY_4)),
            shipped.registry.find("pendant.softkey.4")
        );
    }

    #[test]
    fn test_defaults_and_rejections() {
        let cfg = BridgeConfig::from_yaml("signals: []\n").unwrap();
        assert_eq!(cfg.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(cfg.keymap.is_empty());

        assert!(BridgeConfig::from_yaml("queue_capacity: 0\n").is_err());

        let unbound = r#"
signals:
  - { name: a.float, kind: float }
keymap:
  - { key: "1", signal: a.float }
"#;
        let err = BridgeConfig::from_yaml(unbound).unwrap().build().err().unwrap();
        assert!(format!("{err:#}").contains("a.float"));
    }

    #[test]
    fn test_duplicate_signal_is_fatal() {
        let dup = r#"
signals:
  - { name: x, kind: bit }
  - { name: x, kind: s32 }
"#;
        let cfg = BridgeConfig::from_yaml(dup).unwrap();
        assert!(cfg.build().is_err());
    }
}
