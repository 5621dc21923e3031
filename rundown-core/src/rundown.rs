//! Rundown, segment and line structures
//!
//! A rundown owns its segments, segments own their lines and lines own their
//! items. The rundown-wide line order is segment order, then line order within
//! the segment (see [`crate::LineOrder`]).

use crate::{Error, Item, ItemId, LineId, Result, RundownId, SegmentId, SourceLayer, SourceLayerId};

/// A single step in the show
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line {
    pub id: LineId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: String,
    /// Planned on-air time of the line in milliseconds
    #[cfg_attr(feature = "serde", serde(default))]
    pub expected_duration_ms: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub items: Vec<Item>,
}

impl Line {
    /// Creates an empty line
    pub fn new(id: impl Into<LineId>, expected_duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            expected_duration_ms,
            items: Vec::new(),
        }
    }

    /// Appends an item
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Items on the given layer, in declaration order
    pub fn items_on<'a>(&'a self, layer: &'a SourceLayerId) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |item| &item.layer == layer)
    }
}

/// An ordered group of lines
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub id: SegmentId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lines: Vec<Line>,
}

impl Segment {
    /// Creates an empty segment
    pub fn new(id: impl Into<SegmentId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            lines: Vec::new(),
        }
    }

    /// Appends a line
    pub fn with_line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }
}

/// The full ordered show plan
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rundown {
    pub id: RundownId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// Whether the rundown is currently on air
    #[cfg_attr(feature = "serde", serde(default))]
    pub active: bool,
    /// Layers items may be placed on
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_layers: Vec<SourceLayer>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub segments: Vec<Segment>,
}

impl Rundown {
    /// Creates an empty, inactive rundown
    pub fn new(id: impl Into<RundownId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            active: false,
            source_layers: Vec::new(),
            segments: Vec::new(),
        }
    }

    /// Registers a source layer
    pub fn with_layer(mut self, layer: SourceLayer) -> Self {
        self.source_layers.push(layer);
        self
    }

    /// Appends a segment
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Parses a rundown from JSON
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the rundown as pretty-printed JSON
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Gets a source layer by id
    pub fn layer(&self, id: &SourceLayerId) -> Option<&SourceLayer> {
        self.source_layers.iter().find(|l| &l.id == id)
    }

    /// Iterates over all lines in rundown order together with their segment
    pub fn lines(&self) -> impl Iterator<Item = (&Segment, &Line)> {
        self.segments
            .iter()
            .flat_map(|segment| segment.lines.iter().map(move |line| (segment, line)))
    }

    /// Total number of lines across all segments
    pub fn line_count(&self) -> usize {
        self.segments.iter().map(|s| s.lines.len()).sum()
    }

    /// Gets a segment by id
    pub fn segment(&self, id: &SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| &s.id == id)
    }

    /// Gets a line by id
    pub fn line(&self, id: &LineId) -> Option<&Line> {
        self.lines().map(|(_, line)| line).find(|line| &line.id == id)
    }

    /// Gets a mutable line by id
    pub fn line_mut(&mut self, id: &LineId) -> Option<&mut Line> {
        self.segments
            .iter_mut()
            .flat_map(|segment| segment.lines.iter_mut())
            .find(|line| &line.id == id)
    }

    /// Finds an item and the line that owns it
    pub fn find_item(&self, id: &ItemId) -> Option<(&Line, &Item)> {
        self.lines()
            .find_map(|(_, line)| line.items.iter().find(|i| &i.id == id).map(|item| (line, item)))
    }

    /// Finds a mutable item; also returns the id of the owning line
    pub fn item_mut(&mut self, id: &ItemId) -> Option<(LineId, &mut Item)> {
        self.segments
            .iter_mut()
            .flat_map(|segment| segment.lines.iter_mut())
            .find_map(|line| {
                let line_id = line.id.clone();
                line.items.iter_mut().find(|i| &i.id == id).map(|item| (line_id, item))
            })
    }

    /// Inserts a line into a segment at `index` (clamped to the segment length)
    pub fn insert_line(&mut self, segment: &SegmentId, index: usize, line: Line) -> Result<()> {
        if self.line(&line.id).is_some() {
            return Err(Error::InvalidState(format!("duplicate line id {}", line.id)));
        }
        let segment = self
            .segments
            .iter_mut()
            .find(|s| &s.id == segment)
            .ok_or_else(|| Error::not_found("segment", segment))?;
        let index = index.min(segment.lines.len());
        segment.lines.insert(index, line);
        Ok(())
    }

    /// Removes a line, returning it
    pub fn remove_line(&mut self, id: &LineId) -> Result<Line> {
        for segment in &mut self.segments {
            if let Some(pos) = segment.lines.iter().position(|l| &l.id == id) {
                return Ok(segment.lines.remove(pos));
            }
        }
        Err(Error::not_found("line", id))
    }

    /// Moves a line to `index` within `segment` (clamped to the segment length)
    pub fn move_line(&mut self, id: &LineId, segment: &SegmentId, index: usize) -> Result<()> {
        if self.segment(segment).is_none() {
            return Err(Error::not_found("segment", segment));
        }
        let line = self.remove_line(id)?;
        self.insert_line(segment, index, line)
    }

    /// Removes an item, returning it together with the id of its former line
    pub fn remove_item(&mut self, id: &ItemId) -> Result<(LineId, Item)> {
        for line in self.segments.iter_mut().flat_map(|s| s.lines.iter_mut()) {
            if let Some(pos) = line.items.iter().position(|i| &i.id == id) {
                return Ok((line.id.clone(), line.items.remove(pos)));
            }
        }
        Err(Error::not_found("item", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InfiniteMode, SourceLayerKind};

    fn sample() -> Rundown {
        Rundown::new("show")
            .with_layer(SourceLayer::new("graphics", SourceLayerKind::Graphics))
            .with_segment(
                Segment::new("S1")
                    .with_line(Line::new("L1", 1000).with_item(
                        Item::new("A", "graphics", 5).with_infinite_mode(InfiniteMode::ToEndOfSegment),
                    ))
                    .with_line(Line::new("L2", 1000)),
            )
            .with_segment(Segment::new("S2").with_line(Line::new("L3", 1000)))
    }

    #[test]
    fn test_lines_in_rundown_order() {
        let rundown = sample();
        let ids: Vec<_> = rundown.lines().map(|(_, l)| l.id.as_str()).collect();
        assert_eq!(ids, ["L1", "L2", "L3"]);
        assert_eq!(rundown.line_count(), 3);
    }

    #[test]
    fn test_move_line_across_segments() {
        let mut rundown = sample();
        rundown.move_line(&"L1".into(), &"S2".into(), 99).unwrap();
        let ids: Vec<_> = rundown.lines().map(|(s, l)| (s.id.as_str(), l.id.as_str())).collect();
        assert_eq!(ids, [("S1", "L2"), ("S2", "L3"), ("S2", "L1")]);
    }

    #[test]
    fn test_move_to_unknown_segment_leaves_rundown_intact() {
        let mut rundown = sample();
        let err = rundown.move_line(&"L1".into(), &"S9".into(), 0).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "segment", .. }));
        assert_eq!(rundown, sample());
    }

    #[test]
    fn test_duplicate_line_rejected() {
        let mut rundown = sample();
        let err = rundown.insert_line(&"S2".into(), 0, Line::new("L2", 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_item_lookup_and_removal() {
        let mut rundown = sample();
        let (line, item) = rundown.find_item(&"A".into()).unwrap();
        assert_eq!(line.id.as_str(), "L1");
        assert_eq!(item.expected_duration_ms, 5);

        let (line_id, item) = rundown.item_mut(&"A".into()).unwrap();
        item.expected_duration_ms = 8;
        assert_eq!(line_id.as_str(), "L1");

        let (line_id, removed) = rundown.remove_item(&"A".into()).unwrap();
        assert_eq!(line_id.as_str(), "L1");
        assert_eq!(removed.expected_duration_ms, 8);
        assert!(rundown.find_item(&"A".into()).is_none());
    }
}
