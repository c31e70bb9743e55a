//! Tween rows as stored in the dense arrays.

use serde::{Deserialize, Serialize};

use crate::ids::{DelayType, LoopType, TimeKind, TweenStatus};
use crate::interp::Ease;
use crate::plugin::TweenPlugin;

/// Timing parameters of a tween. Everything the batch math needs besides the clock.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TweenParams {
    pub duration: f32,
    pub ease: Ease,
    pub time_kind: TimeKind,
    pub delay: f32,
    /// Negative means loop forever.
    pub loops: i32,
    pub delay_type: DelayType,
    pub loop_type: LoopType,
    /// Multiplies elapsed time.
    pub speed: f32,
}

impl TweenParams {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            ease: Ease::Linear,
            time_kind: TimeKind::Time,
            delay: 0.0,
            loops: 1,
            delay_type: DelayType::FirstLoop,
            loop_type: LoopType::Restart,
            speed: 1.0,
        }
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.loops < 0
    }

    /// Elapsed tween time at which a finite tween completes.
    pub fn total_duration(&self) -> f64 {
        let duration = self.duration as f64;
        let delay = self.delay as f64;
        let loops = self.loops as f64;
        match self.delay_type {
            DelayType::FirstLoop => delay + duration * loops,
            DelayType::EveryLoop => (delay + duration) * loops,
        }
    }
}

impl Default for TweenParams {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[derive(Clone, Debug)]
pub struct TweenRow<T, P> {
    pub status: TweenStatus,
    /// Clock value captured when the row was scheduled.
    pub start_time: f64,
    pub params: TweenParams,
    pub start_value: T,
    pub end_value: T,
    pub plugin: P,
}

impl<T, P: TweenPlugin<T>> TweenRow<T, P> {
    pub fn new(start_value: T, end_value: T, duration: f32, plugin: P) -> Self {
        Self {
            status: TweenStatus::Idle,
            start_time: 0.0,
            params: TweenParams::new(duration),
            start_value,
            end_value,
            plugin,
        }
    }

    #[inline]
    pub fn evaluate(&self, progress: f32) -> T {
        self.plugin
            .evaluate(&self.start_value, &self.end_value, progress)
    }

    pub(crate) fn dispose_values(&mut self) {
        if P::NEEDS_DISPOSE {
            self.plugin
                .dispose(&mut self.start_value, &mut self.end_value);
        }
    }
}
