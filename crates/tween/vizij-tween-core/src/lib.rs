//! Vizij Tween Core (engine-agnostic)
//!
//! Handle-based tween scheduler: tweens are created into a per-type deferred
//! buffer, configured fluently, then committed to dense typed storages that are
//! batch-evaluated once per tick of their update group. Rows are addressed
//! through generation-checked handles so stale references are detected after
//! a tween completes or is canceled.

mod buffer;
pub mod builder;
pub mod callback;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod entry;
pub mod error;
pub mod ids;
pub mod interp;
mod link;
mod manual;
pub mod plugin;
pub mod plugins;
pub mod row;
mod runner;
pub mod sampling;
pub mod scheduler;
pub mod scratch;
pub mod storage;

// Re-exports for hosts and adapters
pub use builder::TweenBuilder;
pub use callback::{CallbackResult, DisposeAction, Target, TweenResult, UpdateAction};
pub use config::Config;
pub use diagnostics::{EngineStats, StorageStats};
pub use engine::Engine;
pub use error::{Result, TweenError};
pub use ids::{DelayType, LoopType, TimeKind, TweenHandle, TweenStatus, UpdateTiming};
pub use interp::{Ease, RoundingMode};
pub use plugin::{RelativeMode, TweenPlugin, Tweenable};
pub use plugins::{F32Plugin, F64Plugin, I32Plugin, I64Plugin, Vec2Plugin, Vec3Plugin, Vec4Plugin};
pub use row::{TweenParams, TweenRow};
pub use sampling::{evaluate_progress, terminal_progress};
pub use scheduler::{FrameTime, Scheduler};
