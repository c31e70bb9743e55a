//! Tween handles and the enumerations shared by every layer of the core.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Opaque reference to a tween.
///
/// `type_id` names the `(value, plugin)` registry slot the tween was created
/// through; identity is `(index, generation)` only.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct TweenHandle {
    pub type_id: u32,
    pub index: u32,
    pub generation: u32,
}

impl PartialEq for TweenHandle {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl Eq for TweenHandle {}

impl Hash for TweenHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TweenStatus {
    /// Slot is logically empty.
    #[default]
    None,
    /// Still staged in the deferred buffer.
    Idle,
    Scheduled,
    Delayed,
    Playing,
    Completed,
    Canceled,
}

impl TweenStatus {
    /// Rows in these states are evaluated every tick.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Scheduled | Self::Delayed | Self::Playing)
    }

    #[inline]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LoopType {
    #[default]
    Restart,
    /// Odd loops run the eased curve backwards in time.
    Yoyo,
    /// Each loop starts where the previous one ended.
    Incremental,
    /// Odd loops invert the eased output.
    Flip,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DelayType {
    #[default]
    FirstLoop,
    EveryLoop,
}

/// Which host clock a tween reads.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TimeKind {
    /// Scaled, pausable game time.
    #[default]
    Time,
    UnscaledTime,
    Realtime,
}

/// Named phases of the host frame. Every phase owns its own storages.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum UpdateTiming {
    Initialization,
    EarlyUpdate,
    FixedUpdate,
    PreUpdate,
    #[default]
    Update,
    PreLateUpdate,
    PostLateUpdate,
    TimeUpdate,
    /// Pull mode driven by the manual clock.
    Manual,
}

impl UpdateTiming {
    pub const COUNT: usize = 9;

    pub const ALL: [UpdateTiming; Self::COUNT] = [
        Self::Initialization,
        Self::EarlyUpdate,
        Self::FixedUpdate,
        Self::PreUpdate,
        Self::Update,
        Self::PreLateUpdate,
        Self::PostLateUpdate,
        Self::TimeUpdate,
        Self::Manual,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}
