//! Source layer definitions

use crate::SourceLayerId;

/// Broad category of a source layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SourceLayerKind {
    Graphics,
    Camera,
    Vt,
    Audio,
    Script,
    Lights,
    #[default]
    Other,
}

/// A logical channel against which items are classified
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceLayer {
    pub id: SourceLayerId,
    /// Human readable name
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: SourceLayerKind,
}

impl SourceLayer {
    /// Creates a new source layer named after its id
    pub fn new(id: impl Into<SourceLayerId>, kind: SourceLayerKind) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            kind,
        }
    }
}
