//! Effective-item table
//!
//! The table is the derived answer to "what is on each source layer at each
//! line". It is keyed by line, and each line holds one entry per registered
//! source layer (`None` when nothing is in effect). Entries are only written
//! by the continuity resolver; everyone else reads published snapshots.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::{InfiniteMode, Item, ItemId, LineId, SourceLayerId};

/// Duration window of an effective item on one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectiveWindow {
    /// How long the origin item has already been on air when the line starts
    pub elapsed_ms: u64,
    /// Span inside the line; `None` means the item fills the rest of the line
    pub duration_ms: Option<i64>,
}

/// The item in effect for one line and source layer
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectiveItem {
    /// The item that is actually on air
    pub origin: ItemId,
    /// Line that declares the origin item
    pub origin_line: LineId,
    /// Infinite mode of the origin when this entry was computed
    pub mode: InfiniteMode,
    /// True when the origin was declared on an earlier line
    pub is_continuation: bool,
    pub window: EffectiveWindow,
}

impl EffectiveItem {
    /// Entry for an item declared on the line itself
    pub fn explicit(item: &Item, line: &LineId) -> Self {
        let duration_ms = if item.is_infinite() && item.expected_duration_ms == 0 {
            None
        } else {
            Some(item.expected_duration_ms)
        };
        Self {
            origin: item.id.clone(),
            origin_line: line.clone(),
            mode: item.infinite_mode,
            is_continuation: false,
            window: EffectiveWindow {
                elapsed_ms: 0,
                duration_ms,
            },
        }
    }
}

/// Per-layer entries for one line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEffects {
    layers: BTreeMap<SourceLayerId, Option<EffectiveItem>>,
}

impl LineEffects {
    /// Creates an empty set of entries
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the entry for a layer, replacing any previous one
    pub fn insert(&mut self, layer: SourceLayerId, effect: Option<EffectiveItem>) {
        self.layers.insert(layer, effect);
    }

    /// The item in effect on a layer, if any
    pub fn get(&self, layer: &SourceLayerId) -> Option<&EffectiveItem> {
        self.layers.get(layer).and_then(Option::as_ref)
    }

    /// The raw entry for a layer; the outer `None` means the layer was never computed
    pub fn entry(&self, layer: &SourceLayerId) -> Option<&Option<EffectiveItem>> {
        self.layers.get(layer)
    }

    /// Iterates over all entries in layer id order
    pub fn iter(&self) -> impl Iterator<Item = (&SourceLayerId, Option<&EffectiveItem>)> {
        self.layers.iter().map(|(layer, effect)| (layer, effect.as_ref()))
    }

    /// Number of layers with an entry
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if no layer has an entry
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of layers with an item in effect
    pub fn active_count(&self) -> usize {
        self.layers.values().filter(|e| e.is_some()).count()
    }
}

/// Versioned side table of effective items, keyed by line
///
/// Lines are stored behind `Arc` so that a new version can be staged by
/// cloning the map without copying unchanged lines.
#[derive(Debug, Clone, Default)]
pub struct EffectiveTable {
    pub(crate) version: u64,
    pub(crate) lines: HashMap<LineId, Arc<LineEffects>>,
}

impl EffectiveTable {
    /// Creates an empty table at version 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Version of the table; incremented on every published change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Advances the version by one
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Entries for a line
    pub fn line(&self, id: &LineId) -> Option<&Arc<LineEffects>> {
        self.lines.get(id)
    }

    /// The item in effect on a line and layer
    pub fn effective(&self, line: &LineId, layer: &SourceLayerId) -> Option<&EffectiveItem> {
        self.lines.get(line).and_then(|effects| effects.get(layer))
    }

    /// Replaces all entries of a line
    pub fn set_line(&mut self, id: LineId, effects: LineEffects) {
        self.lines.insert(id, Arc::new(effects));
    }

    /// Drops the entries of a line
    pub fn remove_line(&mut self, id: &LineId) -> Option<Arc<LineEffects>> {
        self.lines.remove(id)
    }

    /// Keeps only the lines for which `keep` returns true; returns how many were dropped
    pub fn retain_lines(&mut self, mut keep: impl FnMut(&LineId) -> bool) -> usize {
        let before = self.lines.len();
        self.lines.retain(|id, _| keep(id));
        before - self.lines.len()
    }

    /// Number of lines in the table
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the table has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line ids in sorted order
    pub fn line_ids(&self) -> Vec<&LineId> {
        let mut ids: Vec<_> = self.lines.keys().collect();
        ids.sort();
        ids
    }

    /// Compares entries with another table, ignoring versions
    pub fn same_effects(&self, other: &Self) -> bool {
        self.lines.len() == other.lines.len()
            && self
                .lines
                .iter()
                .all(|(id, effects)| other.lines.get(id).is_some_and(|o| o == effects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_window() {
        let finite = Item::new("B", "graphics", 3000);
        let effect = EffectiveItem::explicit(&finite, &"L4".into());
        assert!(!effect.is_continuation);
        assert_eq!(effect.window.duration_ms, Some(3000));

        let open = Item::new("A", "graphics", 0).with_infinite_mode(InfiniteMode::ToEndOfRundown);
        let effect = EffectiveItem::explicit(&open, &"L1".into());
        assert_eq!(effect.window.duration_ms, None);
        assert_eq!(effect.mode, InfiniteMode::ToEndOfRundown);

        // Negative finite durations pass through unchanged
        let scrambled = Item::new("C", "graphics", -40);
        let effect = EffectiveItem::explicit(&scrambled, &"L2".into());
        assert_eq!(effect.window.duration_ms, Some(-40));
    }

    #[test]
    fn test_table_lookup_and_compare() {
        let graphics = SourceLayerId::from("graphics");
        let audio = SourceLayerId::from("audio");
        let mut effects = LineEffects::new();
        effects.insert(
            graphics.clone(),
            Some(EffectiveItem::explicit(&Item::new("A", "graphics", 5), &"L1".into())),
        );
        effects.insert(audio.clone(), None);
        assert_eq!(effects.len(), 2);
        assert_eq!(effects.active_count(), 1);
        assert_eq!(effects.entry(&audio), Some(&None));
        assert!(effects.entry(&"video".into()).is_none());

        let mut table = EffectiveTable::new();
        table.set_line("L1".into(), effects);
        assert_eq!(table.effective(&"L1".into(), &graphics).unwrap().origin.as_str(), "A");
        assert!(table.effective(&"L1".into(), &audio).is_none());

        let mut other = table.clone();
        other.bump_version();
        assert!(table.same_effects(&other));
        other.remove_line(&"L1".into());
        assert!(!table.same_effects(&other));
    }
}
