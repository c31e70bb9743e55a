//! Schedulers pick the update group a tween runs in and the clock it reads.

use serde::{Deserialize, Serialize};

use crate::buffer::TypeSlot;
use crate::callback::CallbackSet;
use crate::engine::Engine;
use crate::ids::{TimeKind, TweenHandle, UpdateTiming};
use crate::plugin::TweenPlugin;
use crate::row::TweenRow;

/// Clock values supplied by the host for one tick of one update group.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTime {
    pub time: f64,
    pub unscaled_time: f64,
    pub realtime: f64,
}

impl FrameTime {
    pub fn new(time: f64, unscaled_time: f64, realtime: f64) -> Self {
        Self {
            time,
            unscaled_time,
            realtime,
        }
    }

    /// Same value for all three clocks.
    pub fn uniform(t: f64) -> Self {
        Self::new(t, t, t)
    }

    #[inline]
    pub fn get(&self, kind: TimeKind) -> f64 {
        match kind {
            TimeKind::Time => self.time,
            TimeKind::UnscaledTime => self.unscaled_time,
            TimeKind::Realtime => self.realtime,
        }
    }
}

/// One `(update group, time kind)` combination.
///
/// All schedulers share the same runner machinery; each group owns separate
/// storages so tweens of different cadences never share a dense array.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Scheduler {
    pub timing: UpdateTiming,
    pub time_kind: TimeKind,
}

impl Scheduler {
    pub const fn new(timing: UpdateTiming, time_kind: TimeKind) -> Self {
        Self { timing, time_kind }
    }

    pub const INITIALIZATION: Self = Self::new(UpdateTiming::Initialization, TimeKind::Time);
    pub const EARLY_UPDATE: Self = Self::new(UpdateTiming::EarlyUpdate, TimeKind::Time);
    pub const EARLY_UPDATE_UNSCALED: Self =
        Self::new(UpdateTiming::EarlyUpdate, TimeKind::UnscaledTime);
    pub const FIXED_UPDATE: Self = Self::new(UpdateTiming::FixedUpdate, TimeKind::Time);
    pub const FIXED_UPDATE_UNSCALED: Self =
        Self::new(UpdateTiming::FixedUpdate, TimeKind::UnscaledTime);
    pub const PRE_UPDATE: Self = Self::new(UpdateTiming::PreUpdate, TimeKind::Time);
    pub const UPDATE: Self = Self::new(UpdateTiming::Update, TimeKind::Time);
    pub const UPDATE_UNSCALED: Self = Self::new(UpdateTiming::Update, TimeKind::UnscaledTime);
    pub const UPDATE_REALTIME: Self = Self::new(UpdateTiming::Update, TimeKind::Realtime);
    pub const PRE_LATE_UPDATE: Self = Self::new(UpdateTiming::PreLateUpdate, TimeKind::Time);
    pub const POST_LATE_UPDATE: Self = Self::new(UpdateTiming::PostLateUpdate, TimeKind::Time);
    pub const POST_LATE_UPDATE_UNSCALED: Self =
        Self::new(UpdateTiming::PostLateUpdate, TimeKind::UnscaledTime);
    pub const TIME_UPDATE: Self = Self::new(UpdateTiming::TimeUpdate, TimeKind::Time);
    pub const MANUAL: Self = Self::new(UpdateTiming::Manual, TimeKind::Time);

    #[inline]
    pub fn update_timing_group(&self) -> UpdateTiming {
        self.timing
    }

    /// Latest clock value this scheduler's group has seen.
    pub fn current_time(&self, engine: &Engine) -> f64 {
        engine.frame_time(self.timing).get(self.time_kind)
    }

    /// Stamp the start time and append the row to this group's storage for `(T, P)`.
    /// Returns the storage id.
    pub(crate) fn schedule<T, P>(
        &self,
        engine: &Engine,
        slot: &TypeSlot<T, P>,
        handle: TweenHandle,
        mut row: TweenRow<T, P>,
        callbacks: CallbackSet<T>,
    ) -> u32
    where
        T: Clone + Send + Sync + 'static,
        P: TweenPlugin<T>,
    {
        row.start_time = engine.frame_time(self.timing).get(row.params.time_kind);
        let runner = slot.runner_for(engine, self.timing);
        runner.append(engine, handle, row, callbacks)
    }
}
