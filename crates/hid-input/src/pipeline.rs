use crate::{
    InputTranslator, KeySnapshot, KeyboardReport, ReportDifferencer, Result, TranslationStats,
};
use signal_registry::SignalRegistry;
use std::sync::Arc;

/// Per-keyboard report handler: parse, diff against the last report, translate.
///
/// Runs synchronously in whatever context delivers the report and never
/// blocks; the only shared state it touches is signal storage.
#[derive(Clone, Debug)]
pub struct KeyboardPipeline {
    differencer: ReportDifferencer,
    translator: Arc<InputTranslator>,
}

impl KeyboardPipeline {
    pub fn new(translator: Arc<InputTranslator>) -> Self {
        Self {
            differencer: ReportDifferencer::new(),
            translator,
        }
    }

    pub fn on_report(&mut self, registry: &SignalRegistry, data: &[u8]) -> Result<TranslationStats> {
        let report = KeyboardReport::parse(data)?;
        let edges = self.differencer.update(report.snapshot());
        Ok(self.translator.apply_all(registry, &edges))
    }

    pub fn differencer(&self) -> &ReportDifferencer {
        &self.differencer
    }

    /// Release every key still held from the last report. Called when the
    /// device goes away so no bound signal stays asserted.
    pub fn release_all(&mut self, registry: &SignalRegistry) -> TranslationStats {
        let edges = self.differencer.update(KeySnapshot::empty());
        self.translator.apply_all(registry, &edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{KEY_1, KEY_2, KEY_A, MOD_LEFT_SHIFT};
    use crate::KeyCode;
    use signal_registry::{Direction, SignalCell, SignalKind};

    #[test]
    fn test_reports_drive_signals() {
        let mut reg = SignalRegistry::new();
        let s1 = Arc::new(SignalCell::bit(false));
        let s2 = Arc::new(SignalCell::bit(false));
        let h1 = reg
            .register("pendant.softkey.1", SignalKind::Bit, Arc::downgrade(&s1), Direction::InOut)
            .unwrap();
        let h2 = reg
            .register("pendant.softkey.2", SignalKind::Bit, Arc::downgrade(&s2), Direction::InOut)
            .unwrap();
        let mut tr = InputTranslator::new();
        tr.bind(KeyCode(KEY_1), h1, "pendant.softkey.1");
        tr.bind(KeyCode(KEY_2), h2, "pendant.softkey.2");
        let mut pipe = KeyboardPipeline::new(Arc::new(tr));

        let stats = pipe
            .on_report(&reg, &[MOD_LEFT_SHIFT, 0, KEY_1, KEY_A, 0, 0, 0, 0])
            .unwrap();
        assert_eq!(stats.pressed, 2);
        assert_eq!(stats.mapped, 1);
        assert!(s1.load_bit());

        let stats = pipe.on_report(&reg, &[0, 0, KEY_2, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(stats.released, 2);
        assert_eq!(stats.pressed, 1);
        assert!(!s1.load_bit());
        assert!(s2.load_bit());

        // Repeating a report changes nothing.
        let stats = pipe.on_report(&reg, &[0, 0, KEY_2, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(stats.edges(), 0);
        assert!(s2.load_bit());
    }

    #[test]
    fn test_release_all_clears_held_keys() {
        let mut reg = SignalRegistry::new();
        let s1 = Arc::new(SignalCell::bit(false));
        let h1 = reg
            .register("pendant.softkey.1", SignalKind::Bit, Arc::downgrade(&s1), Direction::InOut)
            .unwrap();
        let mut tr = InputTranslator::new();
        tr.bind(KeyCode(KEY_1), h1, "pendant.softkey.1");
        let mut pipe = KeyboardPipeline::new(Arc::new(tr));

        pipe.on_report(&reg, &[0, 0, KEY_1, KEY_A, 0, 0, 0, 0]).unwrap();
        assert!(s1.load_bit());

        let stats = pipe.release_all(&reg);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.pressed, 0);
        assert!(!s1.load_bit());
        assert!(pipe.differencer().previous().is_empty());

        // nothing left to release
        assert_eq!(pipe.release_all(&reg).edges(), 0);
    }

    #[test]
    fn test_short_report_keeps_history() {
        let reg = SignalRegistry::new();
        let mut pipe = KeyboardPipeline::new(Arc::new(InputTranslator::new()));
        pipe.on_report(&reg, &[0, 0, KEY_1, 0, 0, 0, 0, 0]).unwrap();
        assert!(pipe.on_report(&reg, &[0, 0]).is_err());
        assert!(pipe.differencer().previous().contains(KeyCode(KEY_1)));
    }
}
