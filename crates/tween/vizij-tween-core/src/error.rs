//! Error types for tween handle and scheduling operations

use serde::{Deserialize, Serialize};

/// Errors reported by handle-based operations.
///
/// Failures raised by user callbacks are not represented here; they are
/// `anyhow::Error` values routed to the engine's error hook.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TweenError {
    /// The handle's generation no longer matches its entry (completed, canceled or freed)
    #[error("Stale tween handle: index {index}, generation {generation}")]
    StaleHandle { index: u32, generation: u32 },

    /// A completion callback tried to complete or cancel its own tween
    #[error("Recursive completion of tween {index} while its callbacks are running")]
    Recursion { index: u32 },

    /// `complete()` on a tween with infinite loops
    #[error("Cannot complete tween {index}: it loops forever")]
    InvalidLoopCompletion { index: u32 },

    /// Negative step passed to the manual clock
    #[error("Invalid delta time: {dt}")]
    InvalidDeltaTime { dt: f64 },

    /// An entry pointed at a storage that does not exist
    #[error("Unknown storage id: {storage_id}")]
    InvalidStorage { storage_id: u32 },
}

pub type Result<T> = core::result::Result<T, TweenError>;

impl TweenError {
    /// Warnings leave the tween untouched and may be ignored by callers.
    #[inline]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::InvalidLoopCompletion { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::StaleHandle { .. } => "handle",
            Self::Recursion { .. } => "callback",
            Self::InvalidLoopCompletion { .. } => "loop",
            Self::InvalidDeltaTime { .. } => "clock",
            Self::InvalidStorage { .. } => "storage",
        }
    }
}
