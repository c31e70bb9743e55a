//! Pull-mode clock for tweens scheduled with [`Scheduler::MANUAL`](crate::Scheduler::MANUAL).
//!
//! The host advances a logical clock and triggers the batch update itself; the
//! same value is used for all three time kinds.

use crate::engine::Engine;
use crate::error::{Result, TweenError};
use crate::ids::UpdateTiming;
use crate::scheduler::FrameTime;

impl Engine {
    pub fn manual_time(&self) -> f64 {
        self.frame_time(UpdateTiming::Manual).time
    }

    /// Set the manual clock without ticking.
    pub fn set_manual_time(&self, time: f64) {
        self.set_frame_time(UpdateTiming::Manual, FrameTime::uniform(time));
    }

    /// Advance the manual clock by `dt` seconds and tick the manual group.
    pub fn manual_advance(&self, dt: f64) -> Result<()> {
        if dt.is_nan() || dt < 0.0 {
            return Err(TweenError::InvalidDeltaTime { dt });
        }
        let now = self.manual_time() + dt;
        self.update(UpdateTiming::Manual, FrameTime::uniform(now));
        Ok(())
    }

    /// Tick the manual group at the current manual time.
    pub fn manual_update(&self) {
        self.update(UpdateTiming::Manual, FrameTime::uniform(self.manual_time()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_nan_steps() {
        let engine = Engine::default();
        engine.set_manual_time(2.0);
        assert!(matches!(
            engine.manual_advance(-0.1),
            Err(TweenError::InvalidDeltaTime { .. })
        ));
        assert!(engine.manual_advance(f64::NAN).is_err());
        assert_eq!(engine.manual_time(), 2.0);
        engine.manual_advance(0.5).expect("forward step");
        assert_eq!(engine.manual_time(), 2.5);
    }
}
