//! Rundown Continuity Resolver
//!
//! This library computes, for every line and source layer of a rundown, which
//! item is actually in effect, including continuations of infinite items
//! declared on earlier lines. [`RundownSession`] wraps the resolver with the
//! edit-trigger adapter that serializes mutations and recomputes after each.

pub mod adapter;
pub mod cancel;
mod cursor;
pub mod resolver;

pub use adapter::{Edit, RundownSession};
pub use cancel::CancelToken;
pub use resolver::{ContinuityResolver, RecomputeReport};

/// Result type for rundown-resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for rundown-resolver operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Recompute cancelled")]
    Cancelled,

    #[error("Rundown core error: {0}")]
    Core(rundown_core::Error),
}

impl From<rundown_core::Error> for Error {
    fn from(err: rundown_core::Error) -> Self {
        match err {
            rundown_core::Error::NotFound { kind, id } => Self::NotFound { kind, id },
            rundown_core::Error::InvalidState(msg) => Self::InvalidState(msg),
            other => Self::Core(other),
        }
    }
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// How far a recompute walks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    /// Stop each layer once it converges with the stored state
    #[default]
    Suffix,
    /// Always walk to the last line
    RunToEnd,
}

impl Mode {
    /// Maps the operator-facing `run_to_end` flag onto a mode
    pub fn from_run_to_end(run_to_end: bool) -> Self {
        if run_to_end {
            Self::RunToEnd
        } else {
            Self::Suffix
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Number of lines walked between cancellation checks
    pub cancel_check_interval: usize,
    /// Drop entries of lines no longer in the rundown after a full pass
    pub prune_orphans: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cancel_check_interval: 16,
            prune_orphans: true,
        }
    }
}
