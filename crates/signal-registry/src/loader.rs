use crate::{Direction, SignalCell, SignalHandle, SignalKind, SignalRegistry, SignalValue};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// One signal declaration from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct SignalSpec {
    pub name: String,
    pub kind: SignalKind,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub initial: Option<SignalValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SignalFile {
    #[serde(default)]
    signals: Vec<SignalSpec>,
}

/// Owner of the storage cells behind declared signals.
///
/// The registry only keeps weak references, so the bank has to live at least
/// as long as anything reading the registry; keep it next to the registry in
/// `main`.
#[derive(Debug, Default)]
pub struct SignalBank {
    cells: Vec<(String, Arc<SignalCell>)>,
}

impl SignalBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a cell for `spec` and register it.
    pub fn declare(
        &mut self,
        registry: &mut SignalRegistry,
        spec: &SignalSpec,
    ) -> anyhow::Result<SignalHandle> {
        let initial = match spec.initial {
            Some(v) => v.coerce(spec.kind).with_context(|| {
                format!(
                    "initial value {v} does not fit {} signal '{}'",
                    spec.kind, spec.name
                )
            })?,
            None => SignalValue::default_for(spec.kind),
        };
        let cell = Arc::new(SignalCell::new(initial));
        let handle = registry
            .register(&spec.name, spec.kind, Arc::downgrade(&cell), spec.direction)
            .with_context(|| format!("registering signal '{}'", spec.name))?;
        self.cells.push((spec.name.clone(), cell));
        Ok(handle)
    }

    pub fn declare_all(
        &mut self,
        registry: &mut SignalRegistry,
        specs: &[SignalSpec],
    ) -> anyhow::Result<Vec<SignalHandle>> {
        specs.iter().map(|s| self.declare(registry, s)).collect()
    }

    pub fn cell(&self, name: &str) -> Option<&Arc<SignalCell>> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Parse the `signals:` section of a YAML document. Other keys are ignored.
pub fn parse_signal_specs(raw: &str) -> anyhow::Result<Vec<SignalSpec>> {
    let val: Value = serde_yaml::from_str(raw).context("parsing yaml")?;
    if val.is_null() {
        return Ok(Vec::new());
    }
    let file: SignalFile = serde_yaml::from_value(val).context("decoding signal list")?;
    Ok(file.signals)
}

pub fn load_signal_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<SignalSpec>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading signal file: {}", path.display()))?;
    parse_signal_specs(&raw).with_context(|| format!("loading signals: {}", path.display()))
}

/// JSON schema for a list of signal declarations, for editor tooling.
#[cfg(feature = "schema")]
pub fn signal_spec_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Vec<SignalSpec>)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
queue_capacity: 10
signals:
  - name: pendant.softkey.1
    kind: bit
    direction: in_out
  - name: hw.kb.last_keycode
    kind: s32
    direction: in
    initial: -1
  - name: spindle.override
    kind: float
    initial: 1
"#;

    #[test]
    fn test_parse_and_declare() {
        let specs = parse_signal_specs(YAML).unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].direction, Direction::InOut);
        assert_eq!(specs[2].direction, Direction::In);

        let mut reg = SignalRegistry::new();
        let mut bank = SignalBank::new();
        let handles = bank.declare_all(&mut reg, &specs).unwrap();
        assert_eq!(handles.len(), 3);
        assert_eq!(bank.len(), 3);

        assert_eq!(reg.get_s32(handles[1]), -1);
        assert_eq!(reg.get_float(handles[2]), 1.0);
        assert_eq!(bank.cell("hw.kb.last_keycode").unwrap().load_s32(), -1);
    }

    #[test]
    fn test_duplicate_declaration_fails() {
        let yaml = r#"
signals:
  - { name: a, kind: bit }
  - { name: a, kind: float }
"#;
        let specs = parse_signal_specs(yaml).unwrap();
        let mut reg = SignalRegistry::new();
        let mut bank = SignalBank::new();
        let err = bank.declare_all(&mut reg, &specs).unwrap_err();
        assert!(format!("{err:#}").contains("already exists"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_bad_initial_value() {
        let yaml = "signals:\n  - { name: b, kind: bit, initial: 3 }\n";
        let specs = parse_signal_specs(yaml).unwrap();
        let mut reg = SignalRegistry::new();
        let mut bank = SignalBank::new();
        assert!(bank.declare(&mut reg, &specs[0]).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_load_signal_file() {
        let path = std::env::temp_dir().join(format!("signals-{}.yaml", std::process::id()));
        fs::write(&path, YAML).unwrap();
        let specs = load_signal_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[1].name, "hw.kb.last_keycode");

        let err = load_signal_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("reading signal file"));
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_schema_describes_specs() {
        let json = serde_json::to_string(&signal_spec_schema()).unwrap();
        assert!(json.contains("\"name\""));
        assert!(json.contains("\"direction\""));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_signal_specs("").unwrap().is_empty());
    }

    #[test]
    fn test_info_serializes() {
        let specs = parse_signal_specs(YAML).unwrap();
        let mut reg = SignalRegistry::new();
        let mut bank = SignalBank::new();
        bank.declare_all(&mut reg, &specs).unwrap();
        let infos: Vec<_> = reg.iter().collect();
        let json = serde_json::to_string(&infos).unwrap();
        assert!(json.contains("\"kind\":\"s32\""));
        assert!(json.contains("\"value\":-1"));
    }
}
