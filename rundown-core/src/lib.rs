//! Rundown Core Library
//!
//! This library provides the timeline model of a broadcast rundown (segments,
//! lines, items and source layers), the derived effective-item table written by
//! the continuity resolver, and a compact binary snapshot of that table.

pub mod effective;
pub mod ids;
pub mod item;
pub mod layer;
pub mod order;
pub mod rundown;
pub mod snapshot;

pub use effective::{EffectiveItem, EffectiveTable, EffectiveWindow, LineEffects};
pub use ids::{ItemId, LineId, RundownId, SegmentId, SourceLayerId};
pub use item::{Content, InfiniteMode, Item};
pub use layer::{SourceLayer, SourceLayerKind};
pub use order::{LineOrder, LinePosition};
pub use rundown::{Line, Rundown, Segment};
pub use snapshot::{Snapshot, SnapshotHeader};

/// Result type for rundown-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for rundown-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes, expected 'RDNS'")]
    InvalidMagic,

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid snapshot entry: {0}")]
    InvalidSnapshotEntry(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
