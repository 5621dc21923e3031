//! Cooperative cancellation for long recomputes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(test)]
use std::sync::atomic::AtomicUsize;

/// Shared flag a caller sets to abandon a running recompute
///
/// Clones share the same flag. The resolver polls it between lines and, once
/// set, discards the pass without publishing anything.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    /// Polls still answered before the token cancels itself
    #[cfg(test)]
    trip_after: Option<Arc<AtomicUsize>>,
}

impl CancelToken {
    /// Creates a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that reports cancellation from its `polls + 1`th poll on
    #[cfg(test)]
    pub(crate) fn cancel_after_polls(polls: usize) -> Self {
        Self {
            trip_after: Some(Arc::new(AtomicUsize::new(polls))),
            ..Self::default()
        }
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        #[cfg(test)]
        {
            if let Some(left) = &self.trip_after {
                if left
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                    .is_err()
                {
                    self.cancel();
                }
            }
        }
        self.cancelled.load(Ordering::Relaxed)
    }
}
