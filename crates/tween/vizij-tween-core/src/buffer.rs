//! Deferred buffer: the staging area for a freshly created tween.
//!
//! Each `(T, P)` pair has exactly one [`TypeSlot`] in the engine registry.
//! The slot's buffer holds at most one idling tween; it is flushed into a
//! storage when the caller schedules it, when another tween of the same pair
//! is created, or when its scheduler's update group ticks.

use std::cell::RefCell;
use std::rc::Rc;

use crate::callback::{CallbackSet, DisposeAction, Target, TweenResult};
use crate::engine::Engine;
use crate::error::{Result, TweenError};
use crate::ids::{TweenHandle, TweenStatus, UpdateTiming};
use crate::plugin::{RelativeMode, TweenPlugin};
use crate::row::TweenRow;
use crate::runner::UpdateRunner;
use crate::sampling::terminal_progress;
use crate::scheduler::Scheduler;

pub(crate) struct TweenBuffer<T, P> {
    pub(crate) handle: Option<TweenHandle>,
    pub(crate) row: Option<TweenRow<T, P>>,
    pub(crate) callbacks: CallbackSet<T>,
    pub(crate) scheduler: Scheduler,
    pub(crate) relative_mode: RelativeMode,
    /// Swap start and end on schedule.
    pub(crate) is_from: bool,
}

/// Contents of the buffer handed to a scheduler.
pub(crate) struct Staged<T, P> {
    pub(crate) handle: TweenHandle,
    pub(crate) row: TweenRow<T, P>,
    pub(crate) callbacks: CallbackSet<T>,
    pub(crate) scheduler: Scheduler,
}

impl<T: Clone, P: TweenPlugin<T>> TweenBuffer<T, P> {
    fn new() -> Self {
        Self {
            handle: None,
            row: None,
            callbacks: CallbackSet::default(),
            scheduler: Scheduler::UPDATE,
            relative_mode: RelativeMode::AbsoluteValue,
            is_from: false,
        }
    }

    #[inline]
    pub(crate) fn holds(&self, handle: TweenHandle) -> bool {
        self.handle == Some(handle)
    }

    pub(crate) fn init(&mut self, handle: TweenHandle, row: TweenRow<T, P>) {
        self.handle = Some(handle);
        self.row = Some(row);
        self.callbacks = CallbackSet::default();
        self.scheduler = Scheduler::UPDATE;
        self.relative_mode = RelativeMode::AbsoluteValue;
        self.is_from = false;
    }

    /// Empty the buffer without committing anything.
    fn take_all(&mut self) -> Option<Staged<T, P>> {
        let handle = self.handle.take()?;
        let row = self.row.take()?;
        let staged = Staged {
            handle,
            row,
            callbacks: std::mem::take(&mut self.callbacks),
            scheduler: self.scheduler,
        };
        self.relative_mode = RelativeMode::AbsoluteValue;
        self.is_from = false;
        Some(staged)
    }

    /// Empty the buffer and finalize the row for scheduling: apply from-mode
    /// and the relative combination, then mark it `Scheduled`.
    pub(crate) fn take_staged(&mut self) -> Option<Staged<T, P>> {
        let is_from = self.is_from;
        let mode = self.relative_mode;
        let mut staged = self.take_all()?;
        let row = &mut staged.row;
        if is_from {
            std::mem::swap(&mut row.start_value, &mut row.end_value);
        }
        let end = row.end_value.clone();
        row.end_value = row.plugin.apply_relative(mode, &row.start_value, end);
        row.status = TweenStatus::Scheduled;
        Some(staged)
    }
}

/// Per-`(T, P)` registry record: the deferred buffer plus one runner per
/// update group, created on first use.
pub(crate) struct TypeSlot<T, P> {
    pub(crate) type_id: u32,
    pub(crate) buffer: RefCell<TweenBuffer<T, P>>,
    runners: RefCell<[Option<Rc<UpdateRunner<T, P>>>; UpdateTiming::COUNT]>,
}

impl<T, P> TypeSlot<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: TweenPlugin<T>,
{
    pub(crate) fn new(type_id: u32) -> Self {
        Self {
            type_id,
            buffer: RefCell::new(TweenBuffer::new()),
            runners: RefCell::new(std::array::from_fn(|_| None)),
        }
    }

    pub(crate) fn runner_for(&self, engine: &Engine, timing: UpdateTiming) -> Rc<UpdateRunner<T, P>> {
        if let Some(runner) = &self.runners.borrow()[timing.index()] {
            return runner.clone();
        }
        let runner = engine.register_runner(|id| UpdateRunner::<T, P>::new(id, timing, engine.config()));
        self.runners.borrow_mut()[timing.index()] = Some(runner.clone());
        log::debug!(
            "created storage for {} / {} in {timing:?}",
            std::any::type_name::<T>(),
            std::any::type_name::<P>()
        );
        runner
    }

    /// Remove the idling tween `handle` from the buffer and free its entry.
    fn evict(&self, engine: &Engine, handle: TweenHandle) -> Result<Staged<T, P>> {
        let staged = {
            let mut buffer = self.buffer.borrow_mut();
            if !buffer.holds(handle) {
                return Err(TweenError::StaleHandle {
                    index: handle.index,
                    generation: handle.generation,
                });
            }
            buffer.take_all()
        };
        let mut staged = staged.ok_or(TweenError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        })?;
        staged.row.dispose_values();
        engine
            .entries()
            .borrow_mut()
            .free(handle.index, handle.generation, true)?;
        Ok(staged)
    }
}

/// Type-erased slot operations used by the engine for handle lookups and ticks.
pub(crate) trait ErasedSlot {
    fn idle_handle(&self) -> Option<TweenHandle>;
    fn idle_timing(&self) -> Option<UpdateTiming>;
    fn flush(&self, engine: &Engine);
    fn cancel_idle(&self, engine: &Engine, handle: TweenHandle) -> Result<()>;
    fn complete_idle(&self, engine: &Engine, handle: TweenHandle) -> Result<()>;
    fn remove_idle_target(&self, engine: &Engine, handle: TweenHandle, target: &Target) -> usize;
    fn append_idle(&self, engine: &Engine, handle: TweenHandle, action: DisposeAction) -> Result<()>;
}

impl<T, P> ErasedSlot for TypeSlot<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: TweenPlugin<T>,
{
    fn idle_handle(&self) -> Option<TweenHandle> {
        self.buffer.borrow().handle
    }

    fn idle_timing(&self) -> Option<UpdateTiming> {
        let buffer = self.buffer.borrow();
        buffer.handle.map(|_| buffer.scheduler.timing)
    }

    fn flush(&self, engine: &Engine) {
        let staged = self.buffer.borrow_mut().take_staged();
        if let Some(Staged {
            handle,
            row,
            callbacks,
            scheduler,
        }) = staged
        {
            scheduler.schedule(engine, self, handle, row, callbacks);
        }
    }

    fn cancel_idle(&self, engine: &Engine, handle: TweenHandle) -> Result<()> {
        let staged = self.evict(engine, handle)?;
        engine.invoke_dispose(staged.callbacks.dispose, &TweenResult::Canceled);
        Ok(())
    }

    fn complete_idle(&self, engine: &Engine, handle: TweenHandle) -> Result<()> {
        let loops_forever = {
            let buffer = self.buffer.borrow();
            buffer.holds(handle)
                && buffer.row.as_ref().is_some_and(|row| row.params.is_infinite())
        };
        if loops_forever {
            log::warn!("tween {} loops forever; complete() ignored", handle.index);
            return Err(TweenError::InvalidLoopCompletion {
                index: handle.index,
            });
        }
        let mut staged = self.evict(engine, handle)?;
        let value = staged.row.evaluate(terminal_progress(&staged.row.params));
        let result = match staged.callbacks.update.invoke(&value) {
            Ok(()) => TweenResult::Completed,
            Err(err) => {
                engine.report_error(&err);
                if staged.callbacks.cancel_on_error {
                    TweenResult::CanceledWithError(Rc::new(err))
                } else {
                    TweenResult::Completed
                }
            }
        };
        engine.invoke_dispose(staged.callbacks.dispose, &result);
        Ok(())
    }

    fn remove_idle_target(&self, engine: &Engine, handle: TweenHandle, target: &Target) -> usize {
        let mut buffer = self.buffer.borrow_mut();
        if !buffer.holds(handle) {
            return 0;
        }
        engine
            .pool()
            .borrow_mut()
            .remove_target(&mut buffer.callbacks.dispose, target)
    }

    fn append_idle(&self, engine: &Engine, handle: TweenHandle, action: DisposeAction) -> Result<()> {
        let mut buffer = self.buffer.borrow_mut();
        if !buffer.holds(handle) {
            return Err(TweenError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            });
        }
        engine
            .pool()
            .borrow_mut()
            .append(&mut buffer.callbacks.dispose, action);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{F32Plugin, Vec3Plugin};

    fn handle(index: u32) -> TweenHandle {
        TweenHandle {
            type_id: 0,
            index,
            generation: 1,
        }
    }

    #[test]
    fn staging_applies_relative_and_empties_buffer() {
        let mut buffer: TweenBuffer<[f32; 3], Vec3Plugin> = TweenBuffer::new();
        buffer.init(
            handle(0),
            TweenRow::new([1.0; 3], [2.0; 3], 1.0, Vec3Plugin::default()),
        );
        buffer.relative_mode = RelativeMode::RelativeValue;
        assert!(buffer.holds(handle(0)));

        let staged = buffer.take_staged().expect("buffer was populated");
        assert_eq!(staged.row.end_value, [3.0; 3]);
        assert_eq!(staged.row.status, TweenStatus::Scheduled);
        assert!(!buffer.holds(handle(0)));
        assert!(buffer.take_staged().is_none());
        assert_eq!(buffer.relative_mode, RelativeMode::AbsoluteValue);
    }

    #[test]
    fn from_mode_swaps_before_relative() {
        let mut buffer: TweenBuffer<f32, F32Plugin> = TweenBuffer::new();
        buffer.init(handle(1), TweenRow::new(10.0, 2.0, 1.0, F32Plugin));
        buffer.is_from = true;
        buffer.relative_mode = RelativeMode::RelativeValue;
        let staged = buffer.take_staged().expect("populated");
        assert_eq!(staged.row.start_value, 2.0);
        assert_eq!(staged.row.end_value, 12.0);
    }
}
