//! Fluent configuration of an idling tween.
//!
//! Every setter edits the deferred buffer in place, but only while the
//! builder's handle is still the one idling there. Once the tween has been
//! scheduled (explicitly, by a tick of its group, or by another `tween()` call
//! for the same value/plugin pair) setters are silent no-ops.

use std::rc::Rc;

use crate::buffer::{ErasedSlot, TweenBuffer, TypeSlot};
use crate::callback::{CallbackResult, DisposeAction, TweenResult, UpdateAction};
use crate::engine::Engine;
use crate::ids::{DelayType, LoopType, TimeKind, TweenHandle};
use crate::interp::Ease;
use crate::plugin::{RelativeMode, TweenPlugin};
use crate::row::TweenParams;
use crate::scheduler::Scheduler;

#[must_use = "an unscheduled tween still runs on its group's next tick; call schedule() or handle()"]
pub struct TweenBuilder<T, P> {
    engine: Engine,
    slot: Rc<TypeSlot<T, P>>,
    handle: TweenHandle,
}

impl<T, P> TweenBuilder<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: TweenPlugin<T>,
{
    pub(crate) fn new(engine: Engine, slot: Rc<TypeSlot<T, P>>, handle: TweenHandle) -> Self {
        Self {
            engine,
            slot,
            handle,
        }
    }

    fn edit(self, what: &str, f: impl FnOnce(&Engine, &mut TweenBuffer<T, P>)) -> Self {
        {
            let mut buffer = self.slot.buffer.borrow_mut();
            if buffer.holds(self.handle) {
                f(&self.engine, &mut buffer);
            } else if self.engine.config().log_ignored_setters {
                log::warn!(
                    "{what} ignored: tween {} is no longer idling",
                    self.handle.index
                );
            }
        }
        self
    }

    fn params(self, what: &str, f: impl FnOnce(&mut TweenParams)) -> Self {
        self.edit(what, |_, buffer| {
            if let Some(row) = buffer.row.as_mut() {
                f(&mut row.params);
            }
        })
    }

    fn dispose_action(self, what: &str, action: DisposeAction) -> Self {
        self.edit(what, |engine, buffer| {
            engine
                .pool()
                .borrow_mut()
                .append(&mut buffer.callbacks.dispose, action);
        })
    }

    pub fn ease(self, ease: Ease) -> Self {
        self.params("ease", |p| p.ease = ease)
    }

    /// Negative loops repeat forever.
    pub fn loops(self, loops: i32) -> Self {
        self.params("loops", |p| p.loops = loops)
    }

    pub fn loops_with(self, loops: i32, loop_type: LoopType) -> Self {
        self.params("loops_with", |p| {
            p.loops = loops;
            p.loop_type = loop_type;
        })
    }

    pub fn loop_type(self, loop_type: LoopType) -> Self {
        self.params("loop_type", |p| p.loop_type = loop_type)
    }

    pub fn delay(self, delay: f32) -> Self {
        self.params("delay", |p| p.delay = delay.max(0.0))
    }

    pub fn delay_type(self, delay_type: DelayType) -> Self {
        self.params("delay_type", |p| p.delay_type = delay_type)
    }

    /// Clock the tween reads inside its update group.
    pub fn time_kind(self, kind: TimeKind) -> Self {
        self.edit("time_kind", |_, buffer| {
            buffer.scheduler.time_kind = kind;
            if let Some(row) = buffer.row.as_mut() {
                row.params.time_kind = kind;
            }
        })
    }

    pub fn speed(self, speed: f32) -> Self {
        self.params("speed", |p| p.speed = speed)
    }

    /// Replace the start value.
    pub fn from_value(self, start: T) -> Self {
        self.edit("from_value", |_, buffer| {
            if let Some(row) = buffer.row.as_mut() {
                row.start_value = start;
            }
        })
    }

    /// Play from `end` to `start` instead.
    pub fn reversed(self, is_from: bool) -> Self {
        self.edit("reversed", |_, buffer| buffer.is_from = is_from)
    }

    /// Toggle between the absolute and relative form of the current mode.
    pub fn relative(self, relative: bool) -> Self {
        self.edit("relative", |_, buffer| {
            buffer.relative_mode = buffer.relative_mode.with_relative(relative);
        })
    }

    pub fn relative_mode(self, mode: RelativeMode) -> Self {
        self.edit("relative_mode", |_, buffer| buffer.relative_mode = mode)
    }

    /// Replace the plugin instance (for plugins carrying options).
    pub fn with_plugin(self, mut plugin: P) -> Self {
        self.edit("with_plugin", |_, buffer| {
            if let Some(row) = buffer.row.as_mut() {
                plugin.init();
                row.plugin = plugin;
            }
        })
    }

    pub fn scheduler(self, scheduler: Scheduler) -> Self {
        self.edit("scheduler", |_, buffer| {
            buffer.scheduler = scheduler;
            if let Some(row) = buffer.row.as_mut() {
                row.params.time_kind = scheduler.time_kind;
            }
        })
    }

    /// Receive the evaluated value every tick.
    pub fn bind(self, f: impl FnMut(&T) -> CallbackResult + 'static) -> Self {
        let action = UpdateAction::unbound(f);
        self.edit("bind", |_, buffer| buffer.callbacks.update = action)
    }

    pub fn bind_to<O: 'static>(
        self,
        target: Rc<O>,
        f: impl FnMut(&O, &T) -> CallbackResult + 'static,
    ) -> Self {
        let action = UpdateAction::bound(target, f);
        self.edit("bind_to", |_, buffer| buffer.callbacks.update = action)
    }

    pub fn bind_to2<O1: 'static, O2: 'static>(
        self,
        first: Rc<O1>,
        second: Rc<O2>,
        f: impl FnMut(&O1, &O2, &T) -> CallbackResult + 'static,
    ) -> Self {
        let action = UpdateAction::bound2(first, second, f);
        self.edit("bind_to2", |_, buffer| buffer.callbacks.update = action)
    }

    pub fn on_complete(self, f: impl FnOnce() -> CallbackResult + 'static) -> Self {
        self.dispose_action("on_complete", DisposeAction::on_complete(f))
    }

    pub fn on_complete_with<O: 'static>(
        self,
        target: Rc<O>,
        f: impl FnOnce(&O) -> CallbackResult + 'static,
    ) -> Self {
        self.dispose_action("on_complete_with", DisposeAction::on_complete_with(target, f))
    }

    pub fn on_cancel(self, f: impl FnOnce() -> CallbackResult + 'static) -> Self {
        self.dispose_action("on_cancel", DisposeAction::on_cancel(f))
    }

    pub fn on_cancel_with<O: 'static>(
        self,
        target: Rc<O>,
        f: impl FnOnce(&O) -> CallbackResult + 'static,
    ) -> Self {
        self.dispose_action("on_cancel_with", DisposeAction::on_cancel_with(target, f))
    }

    /// Runs on completion and cancellation alike.
    pub fn on_dispose(self, f: impl FnOnce(&TweenResult) -> CallbackResult + 'static) -> Self {
        self.dispose_action("on_dispose", DisposeAction::on_dispose(f))
    }

    pub fn on_dispose_with<O: 'static>(
        self,
        target: Rc<O>,
        f: impl FnOnce(&O, &TweenResult) -> CallbackResult + 'static,
    ) -> Self {
        self.dispose_action("on_dispose_with", DisposeAction::on_dispose_with(target, f))
    }

    /// Cancel the tween when one of its callbacks fails.
    pub fn cancel_on_error(self, enabled: bool) -> Self {
        self.edit("cancel_on_error", |_, buffer| {
            buffer.callbacks.cancel_on_error = enabled
        })
    }

    /// Do not call the update delegate while the tween sits in a delay window.
    pub fn skip_values_during_delay(self, enabled: bool) -> Self {
        self.edit("skip_values_during_delay", |_, buffer| {
            buffer.callbacks.skip_values_during_delay = enabled
        })
    }

    /// Commit the tween to its scheduler's storage now.
    pub fn schedule(self) -> TweenHandle {
        let idling = self.slot.buffer.borrow().holds(self.handle);
        if idling {
            self.slot.flush(&self.engine);
        }
        self.handle
    }

    /// Leave the tween idling; it is committed by the next tick of its group.
    pub fn handle(&self) -> TweenHandle {
        self.handle
    }

    pub fn into_handle(self) -> TweenHandle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{TweenStatus, UpdateTiming};
    use crate::plugins::F32Plugin;

    #[test]
    fn setters_edit_the_buffered_row() {
        let engine = Engine::default();
        let builder = engine
            .tween::<f32, F32Plugin>(0.0, 1.0, 2.0)
            .ease(Ease::InQuad)
            .loops_with(3, LoopType::Yoyo)
            .delay(-1.0)
            .scheduler(Scheduler::FIXED_UPDATE_UNSCALED);
        {
            let buffer = builder.slot.buffer.borrow();
            let row = buffer.row.as_ref().expect("idling row");
            assert_eq!(row.params.ease, Ease::InQuad);
            assert_eq!(row.params.loops, 3);
            assert_eq!(row.params.loop_type, LoopType::Yoyo);
            assert_eq!(row.params.delay, 0.0);
            assert_eq!(row.params.time_kind, TimeKind::UnscaledTime);
            assert_eq!(buffer.scheduler.timing, UpdateTiming::FixedUpdate);
        }
        let handle = builder.schedule();
        assert_eq!(engine.status(handle), Some(TweenStatus::Scheduled));
    }

    #[test]
    fn setters_after_schedule_are_ignored() {
        let engine = Engine::default();
        let first = engine.tween::<f32, F32Plugin>(0.0, 1.0, 1.0);
        let handle = first.handle();
        // creating a second tween of the same pair flushes the first
        let second = engine.tween::<f32, F32Plugin>(5.0, 6.0, 1.0);
        assert!(!engine.is_idling(handle));
        assert!(engine.is_idling(second.handle()));

        let first = first.loops(7);
        let buffer = first.slot.buffer.borrow();
        let row = buffer.row.as_ref().expect("second tween idles");
        assert_eq!(row.params.loops, 1);
        assert_eq!(row.start_value, 5.0);
    }
}
