//! Value plugin contract.
//!
//! A plugin knows how to interpolate one value type. Storages are generic over
//! `(T, P)`, so each pair is monomorphized into its own dense array.

use serde::{Deserialize, Serialize};

/// How the end value combines with the start value when a tween is scheduled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RelativeMode {
    #[default]
    AbsoluteValue,
    /// `end = start + end`
    RelativeValue,
    AbsoluteScale,
    /// `end = start * end`
    RelativeScale,
}

impl RelativeMode {
    /// Flip between the absolute and relative form of the same family.
    pub fn with_relative(self, relative: bool) -> Self {
        match (self, relative) {
            (Self::AbsoluteValue, true) => Self::RelativeValue,
            (Self::RelativeValue, false) => Self::AbsoluteValue,
            (Self::AbsoluteScale, true) => Self::RelativeScale,
            (Self::RelativeScale, false) => Self::AbsoluteScale,
            // already relative; toggling on must not fall back to AbsoluteScale
            (Self::RelativeScale, true) => Self::RelativeScale,
            (mode, _) => mode,
        }
    }
}

pub trait TweenPlugin<T>: Clone + Default + Send + Sync + 'static {
    /// Storages only call [`TweenPlugin::dispose`] when this is set.
    const NEEDS_DISPOSE: bool = false;

    /// Called once when a row is initialized in the deferred buffer.
    fn init(&mut self) {}

    /// Must be free of side effects; rows are evaluated in parallel.
    fn evaluate(&self, start: &T, end: &T, progress: f32) -> T;

    fn dispose(&mut self, _start: &mut T, _end: &mut T) {}

    /// Combine `start` and `end` at schedule time.
    fn apply_relative(&self, _mode: RelativeMode, _start: &T, end: T) -> T {
        end
    }
}

/// Value types with a default plugin, used by `Engine::to`.
pub trait Tweenable: Clone + Send + Sync + 'static {
    type Plugin: TweenPlugin<Self>;
}
