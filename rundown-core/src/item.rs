//! Item data structures

use crate::{Error, ItemId, Result, SourceLayerId};

/// How far an item stays in effect past its own line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InfiniteMode {
    /// Ends with its own line
    #[default]
    None,
    /// Continues until the next item on the same layer
    ToNextLine,
    /// Continues until the end of its segment
    ToEndOfSegment,
    /// Continues across segments until overridden
    ToEndOfRundown,
}

impl InfiniteMode {
    /// Returns true for every mode except [`InfiniteMode::None`]
    pub fn is_infinite(self) -> bool {
        self != Self::None
    }

    /// Whether a continuation of this mode survives a segment boundary
    pub fn crosses_segments(self) -> bool {
        matches!(self, Self::ToNextLine | Self::ToEndOfRundown)
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::ToNextLine => 1,
            Self::ToEndOfSegment => 2,
            Self::ToEndOfRundown => 3,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::ToNextLine),
            2 => Some(Self::ToEndOfSegment),
            3 => Some(Self::ToEndOfRundown),
            _ => None,
        }
    }
}

/// Opaque item payload; never interpreted by the resolver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value", rename_all = "snake_case"))]
pub enum Content {
    #[default]
    Empty,
    /// Reference into an external media or template store
    Reference(String),
    /// Inline payload bytes
    Inline(Vec<u8>),
}

/// A piece of content placed on one line and one source layer
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    /// Unique identifier for this item
    pub id: ItemId,
    /// Source layer the item plays on
    pub layer: SourceLayerId,
    /// Expected duration in milliseconds (negative only in scrambled debug data)
    pub expected_duration_ms: i64,
    /// How far the item stays in effect past its own line
    #[cfg_attr(feature = "serde", serde(default))]
    pub infinite_mode: InfiniteMode,
    /// Opaque payload
    #[cfg_attr(feature = "serde", serde(default))]
    pub content: Content,
}

impl Item {
    /// Creates a new finite item with empty content
    pub fn new(id: impl Into<ItemId>, layer: impl Into<SourceLayerId>, expected_duration_ms: i64) -> Self {
        Self {
            id: id.into(),
            layer: layer.into(),
            expected_duration_ms,
            infinite_mode: InfiniteMode::None,
            content: Content::Empty,
        }
    }

    /// Sets the infinite mode
    pub fn with_infinite_mode(mut self, mode: InfiniteMode) -> Self {
        self.infinite_mode = mode;
        self
    }

    /// Sets the content payload
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    /// Returns true if the item outlives its own line
    pub fn is_infinite(&self) -> bool {
        self.infinite_mode.is_infinite()
    }

    /// Rejects infinite items with a negative expected duration
    pub fn validate(&self) -> Result<()> {
        check_duration(&self.id, self.infinite_mode, self.expected_duration_ms)
    }
}

/// Checks a prospective (mode, duration) pair for an item before it is applied
pub fn check_duration(id: &ItemId, mode: InfiniteMode, expected_duration_ms: i64) -> Result<()> {
    if mode.is_infinite() && expected_duration_ms < 0 {
        return Err(Error::InvalidState(format!(
            "infinite item {id} has negative expected duration {expected_duration_ms}ms"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_infinite_item_is_rejected() {
        let item = Item::new("A", "graphics", -5).with_infinite_mode(InfiniteMode::ToEndOfSegment);
        assert!(matches!(item.validate(), Err(Error::InvalidState(_))));

        // Scrambled finite items are tolerated
        let finite = Item::new("B", "graphics", -5);
        assert!(finite.validate().is_ok());
    }

    #[test]
    fn test_mode_scope() {
        assert!(!InfiniteMode::ToEndOfSegment.crosses_segments());
        assert!(InfiniteMode::ToEndOfRundown.crosses_segments());
        assert!(InfiniteMode::ToNextLine.crosses_segments());
        assert!(!InfiniteMode::None.is_infinite());
        for mode in [
            InfiniteMode::None,
            InfiniteMode::ToNextLine,
            InfiniteMode::ToEndOfSegment,
            InfiniteMode::ToEndOfRundown,
        ] {
            assert_eq!(InfiniteMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(InfiniteMode::from_code(9), None);
    }
}
