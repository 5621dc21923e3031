//! Per-layer "active origin" cursors used while walking a rundown

use std::collections::HashMap;

use rundown_core::{EffectiveItem, EffectiveWindow, InfiniteMode, Item, ItemId, LineId, SegmentId, SourceLayerId};

/// An infinite item that may still be in effect on later lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveOrigin {
    pub item: ItemId,
    pub line: LineId,
    pub segment: SegmentId,
    pub mode: InfiniteMode,
    /// Time the origin has been on air at the start of the next line
    pub elapsed_ms: u64,
}

impl ActiveOrigin {
    /// Starts tracking an infinite item declared on `line`
    pub fn start(item: &Item, line: &LineId, segment: &SegmentId, line_duration_ms: u64) -> Self {
        Self {
            item: item.id.clone(),
            line: line.clone(),
            segment: segment.clone(),
            mode: item.infinite_mode,
            elapsed_ms: line_duration_ms,
        }
    }

    /// Whether the origin may continue into a line of `segment`
    pub fn in_scope(&self, segment: &SegmentId) -> bool {
        self.mode.crosses_segments() || &self.segment == segment
    }

    /// Continuation entry for the current line; advances past it
    pub fn continue_through(&mut self, line_duration_ms: u64) -> EffectiveItem {
        let effect = EffectiveItem {
            origin: self.item.clone(),
            origin_line: self.line.clone(),
            mode: self.mode,
            is_continuation: true,
            window: EffectiveWindow {
                elapsed_ms: self.elapsed_ms,
                duration_ms: None,
            },
        };
        self.elapsed_ms = self.elapsed_ms.saturating_add(line_duration_ms);
        effect
    }
}

/// Cursor state for every source layer
#[derive(Debug, Clone, Default)]
pub(crate) struct LayerCursors {
    active: HashMap<SourceLayerId, ActiveOrigin>,
}

impl LayerCursors {
    pub fn set(&mut self, layer: SourceLayerId, origin: ActiveOrigin) {
        self.active.insert(layer, origin);
    }

    pub fn clear(&mut self, layer: &SourceLayerId) {
        self.active.remove(layer);
    }

    /// Drops every origin that cannot cross into `segment`
    pub fn enter_segment(&mut self, segment: &SegmentId) {
        self.active.retain(|_, origin| origin.in_scope(segment));
    }

    /// Produces the continuation for a layer without an explicit item, if any
    pub fn continue_layer(&mut self, layer: &SourceLayerId, line_duration_ms: u64) -> Option<EffectiveItem> {
        self.active
            .get_mut(layer)
            .map(|origin| origin.continue_through(line_duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_scoped_origin_is_dropped_on_boundary() {
        let seg = SegmentId::from("S1");
        let layer = SourceLayerId::from("graphics");
        let item = Item::new("A", "graphics", 5).with_infinite_mode(InfiniteMode::ToEndOfSegment);

        let mut cursors = LayerCursors::default();
        cursors.set(layer.clone(), ActiveOrigin::start(&item, &"L1".into(), &seg, 1000));

        let effect = cursors.continue_layer(&layer, 500).unwrap();
        assert!(effect.is_continuation);
        assert_eq!(effect.window.elapsed_ms, 1000);
        assert_eq!(cursors.continue_layer(&layer, 0).unwrap().window.elapsed_ms, 1500);

        cursors.enter_segment(&seg);
        assert!(cursors.continue_layer(&layer, 0).is_some());
        cursors.enter_segment(&"S2".into());
        assert!(cursors.continue_layer(&layer, 0).is_none());
    }

    #[test]
    fn test_rundown_scoped_origin_survives_boundary() {
        let layer = SourceLayerId::from("audio");
        let item = Item::new("M", "audio", 0).with_infinite_mode(InfiniteMode::ToEndOfRundown);

        let mut cursors = LayerCursors::default();
        cursors.set(layer.clone(), ActiveOrigin::start(&item, &"L1".into(), &"S1".into(), 0));
        cursors.enter_segment(&"S2".into());
        assert_eq!(cursors.continue_layer(&layer, 0).unwrap().origin.as_str(), "M");

        cursors.clear(&layer);
        assert!(cursors.continue_layer(&layer, 0).is_none());
    }
}
