//! Rundown-wide line ordering
//!
//! [`LineOrder`] flattens the segment/line nesting into a single indexable
//! sequence and builds lookup tables for lines and items. Building the order
//! also checks the structural invariants the resolver relies on: source layer,
//! segment, line and item ids are unique across the rundown.

use std::collections::{HashMap, HashSet};

use crate::{Error, Item, ItemId, Line, LineId, Result, Rundown, Segment, SegmentId, SourceLayerId};

/// A line together with its segment and rundown-wide index
#[derive(Debug, Clone, Copy)]
pub struct LinePosition<'a> {
    pub index: usize,
    pub segment: &'a Segment,
    pub line: &'a Line,
}

/// Flattened, indexed view of a rundown's lines
#[derive(Debug)]
pub struct LineOrder<'a> {
    positions: Vec<LinePosition<'a>>,
    lines: HashMap<&'a LineId, usize>,
    items: HashMap<&'a ItemId, (usize, &'a Item)>,
}

impl<'a> LineOrder<'a> {
    /// Builds the order for a rundown
    pub fn build(rundown: &'a Rundown) -> Result<Self> {
        let count = rundown.line_count();
        let mut positions = Vec::with_capacity(count);
        let mut lines = HashMap::with_capacity(count);
        let mut items = HashMap::new();
        let mut segments: HashSet<&SegmentId> = HashSet::with_capacity(rundown.segments.len());

        let mut layers: HashSet<&SourceLayerId> = HashSet::with_capacity(rundown.source_layers.len());
        for layer in &rundown.source_layers {
            if !layers.insert(&layer.id) {
                return Err(Error::InvalidState(format!("duplicate source layer id {}", layer.id)));
            }
        }

        for segment in &rundown.segments {
            if !segments.insert(&segment.id) {
                return Err(Error::InvalidState(format!("duplicate segment id {}", segment.id)));
            }
            for line in &segment.lines {
                let index = positions.len();
                if lines.insert(&line.id, index).is_some() {
                    return Err(Error::InvalidState(format!("duplicate line id {}", line.id)));
                }
                for item in &line.items {
                    if items.insert(&item.id, (index, item)).is_some() {
                        return Err(Error::InvalidState(format!("duplicate item id {}", item.id)));
                    }
                }
                positions.push(LinePosition {
                    index,
                    segment,
                    line,
                });
            }
        }

        Ok(Self {
            positions,
            lines,
            items,
        })
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the rundown has no lines
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Gets the line at a rundown-wide index
    pub fn get(&self, index: usize) -> Option<LinePosition<'a>> {
        self.positions.get(index).copied()
    }

    /// Rundown-wide index of a line
    pub fn position(&self, id: &LineId) -> Option<usize> {
        self.lines.get(id).copied()
    }

    /// Finds an item and the index of its line
    pub fn item(&self, id: &ItemId) -> Option<(LinePosition<'a>, &'a Item)> {
        let (index, item) = self.items.get(id).copied()?;
        Some((self.positions[index], item))
    }

    /// Iterates over the lines from `start` to the end of the rundown
    pub fn from_index(&self, start: usize) -> impl Iterator<Item = LinePosition<'a>> + '_ {
        self.positions.iter().skip(start).copied()
    }

    /// Iterates over all line ids in order
    pub fn line_ids(&self) -> impl Iterator<Item = &'a LineId> + '_ {
        self.positions.iter().map(|p| &p.line.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, Line, Segment, SourceLayer, SourceLayerKind};

    #[test]
    fn test_flattened_positions() {
        let rundown = Rundown::new("r")
            .with_segment(Segment::new("S1").with_line(Line::new("L1", 0)).with_line(
                Line::new("L2", 0).with_item(Item::new("A", "graphics", 1)),
            ))
            .with_segment(Segment::new("S2").with_line(Line::new("L3", 0)));
        let order = LineOrder::build(&rundown).unwrap();

        assert_eq!(order.len(), 3);
        assert_eq!(order.position(&"L3".into()), Some(2));
        assert_eq!(order.get(2).unwrap().segment.id.as_str(), "S2");

        let (pos, item) = order.item(&"A".into()).unwrap();
        assert_eq!(pos.index, 1);
        assert_eq!(item.expected_duration_ms, 1);

        let tail: Vec<_> = order.from_index(1).map(|p| p.line.id.as_str()).collect();
        assert_eq!(tail, ["L2", "L3"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let rundown = Rundown::new("r").with_segment(
            Segment::new("S1")
                .with_line(Line::new("L1", 0).with_item(Item::new("A", "graphics", 1)))
                .with_line(Line::new("L2", 0).with_item(Item::new("A", "audio", 1))),
        );
        let err = LineOrder::build(&rundown).unwrap_err();
        assert!(matches!(err, Error::InvalidState(msg) if msg.contains("item")));
    }

    #[test]
    fn test_duplicate_source_layer_rejected() {
        let rundown = Rundown::new("r")
            .with_layer(SourceLayer::new("graphics", SourceLayerKind::Graphics))
            .with_layer(SourceLayer::new("graphics", SourceLayerKind::Other))
            .with_segment(Segment::new("S1").with_line(Line::new("L1", 0)));
        let err = LineOrder::build(&rundown).unwrap_err();
        assert!(matches!(err, Error::InvalidState(msg) if msg.contains("source layer")));
    }
}
