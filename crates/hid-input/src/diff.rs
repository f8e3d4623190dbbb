use crate::{EdgeBatch, EdgeEvent, KeySnapshot};

/// Compute the edges between two snapshots.
///
/// All releases come before all presses. Releases carry no modifiers; presses
/// carry the modifier byte of `current`. Status codes (no-event, roll-over,
/// POST fail, undefined) are never reported.
pub fn diff(previous: &KeySnapshot, current: &KeySnapshot) -> EdgeBatch {
    let mut out = EdgeBatch::new();
    for key in previous.pressed() {
        if !current.contains(key) {
            out.push(EdgeEvent::released(key));
        }
    }
    for key in current.pressed() {
        if !previous.contains(key) {
            out.push(EdgeEvent::pressed(key, current.modifiers));
        }
    }
    out
}

/// Keeps exactly one snapshot of history between reports.
#[derive(Clone, Debug, Default)]
pub struct ReportDifferencer {
    previous: KeySnapshot,
}

impl ReportDifferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `current` against the stored snapshot, then store `current`.
    pub fn update(&mut self, current: KeySnapshot) -> EdgeBatch {
        let edges = diff(&self.previous, &current);
        self.previous = current;
        edges
    }

    pub fn previous(&self) -> &KeySnapshot {
        &self.previous
    }

    /// Forget history; the next report is diffed against "nothing held".
    pub fn reset(&mut self) {
        self.previous = KeySnapshot::empty();
    }
}
