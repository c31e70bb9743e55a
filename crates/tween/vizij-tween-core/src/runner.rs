//! Update runner: drives one typed storage through a tick.
//!
//! A tick has three phases:
//! 1. evaluate every active row into scratch (pure, parallel above the threshold)
//! 2. dispatch update/completion callbacks sequentially in dense order
//! 3. compact finished rows out of the storage
//!
//! No `RefCell` borrow is held while user code runs, so callbacks may create,
//! cancel or complete other tweens, including ones in this storage.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::callback::{CallbackSet, DisposeAction, Target, TweenResult};
use crate::config::Config;
use crate::diagnostics::StorageStats;
use crate::engine::Engine;
use crate::error::{Result, TweenError};
use crate::ids::{TweenHandle, TweenStatus, UpdateTiming};
use crate::plugin::TweenPlugin;
use crate::row::TweenRow;
use crate::sampling::{sample_rows, terminal_progress, Sample};
use crate::scratch::Scratch;
use crate::storage::TweenStorage;

/// Type-erased view the engine uses to reach any runner by storage id.
pub(crate) trait ErasedRunner {
    fn storage_id(&self) -> u32;
    fn timing(&self) -> UpdateTiming;
    fn update(&self, engine: &Engine);
    fn cancel(&self, engine: &Engine, dense: usize) -> Result<()>;
    fn complete(&self, engine: &Engine, dense: usize) -> Result<()>;
    fn status(&self, dense: usize) -> TweenStatus;
    fn cancel_all(&self, engine: &Engine);
    fn remove_target(&self, engine: &Engine, dense: usize, target: &Target) -> usize;
    fn append_dispose(&self, engine: &Engine, dense: usize, action: DisposeAction) -> Result<()>;
    fn stats(&self) -> StorageStats;
}

struct UpdatingGuard<'a>(&'a Cell<bool>);

impl<'a> UpdatingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub(crate) struct UpdateRunner<T, P> {
    timing: UpdateTiming,
    storage: RefCell<TweenStorage<T, P>>,
    scratch: RefCell<Scratch<T>>,
    updating: Cell<bool>,
}

impl<T, P> UpdateRunner<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: TweenPlugin<T>,
{
    pub(crate) fn new(storage_id: u32, timing: UpdateTiming, cfg: &Config) -> Self {
        Self {
            timing,
            storage: RefCell::new(TweenStorage::new(storage_id, cfg.initial_storage_capacity)),
            scratch: RefCell::new(Scratch::new(cfg)),
            updating: Cell::new(false),
        }
    }

    pub(crate) fn append(
        &self,
        engine: &Engine,
        handle: TweenHandle,
        row: TweenRow<T, P>,
        callbacks: CallbackSet<T>,
    ) -> u32 {
        let mut storage = self.storage.borrow_mut();
        let dense = storage.append(&mut engine.entries().borrow_mut(), handle.index, row, callbacks);
        log::debug!(
            "scheduled tween {} (gen {}) into storage {} at {dense}",
            handle.index,
            handle.generation,
            storage.id()
        );
        storage.id()
    }

    pub(crate) fn ensure_capacity(&self, capacity: usize) {
        self.storage.borrow_mut().ensure_capacity(capacity);
    }

    /// Current dense index of `entry` if it still lives in this storage.
    fn relocate(&self, engine: &Engine, entry: u32) -> Option<usize> {
        let id = self.storage.borrow().id();
        engine
            .entries()
            .borrow()
            .location_of(entry)
            .filter(|loc| loc.storage_id == id)
            .map(|loc| loc.dense_index)
    }

    fn dispatch(&self, engine: &Engine, dense: usize, sample: Sample<T>) {
        let (entry, skip_delay) = {
            let mut storage = self.storage.borrow_mut();
            let Some(entry) = storage.entry_at(dense) else {
                return;
            };
            let Some(row) = storage.row_mut(dense) else {
                return;
            };
            // canceled or completed by an earlier callback this tick
            if !row.status.is_active() {
                return;
            }
            row.status = sample.status;
            let skip = storage
                .callbacks(dense)
                .is_some_and(|cb| cb.skip_values_during_delay);
            (entry, skip)
        };

        match sample.status {
            TweenStatus::Playing => {
                self.deliver(engine, entry, &sample.value);
            }
            TweenStatus::Delayed if !skip_delay => {
                self.deliver(engine, entry, &sample.value);
            }
            TweenStatus::Completed => {
                if self.deliver(engine, entry, &sample.value) {
                    self.finish(engine, entry, TweenResult::Completed);
                }
            }
            _ => {}
        }
    }

    /// Run the update delegate. Returns `false` when the row was canceled
    /// because the delegate failed.
    fn deliver(&self, engine: &Engine, entry: u32, value: &T) -> bool {
        let Some(dense) = self.relocate(engine, entry) else {
            return false;
        };
        let mut action = match self.storage.borrow_mut().callbacks_mut(dense) {
            Some(cb) => std::mem::take(&mut cb.update),
            None => return false,
        };
        if action.is_none() {
            return true;
        }
        let outcome = action.invoke(value);
        if let Some(dense) = self.relocate(engine, entry) {
            if let Some(cb) = self.storage.borrow_mut().callbacks_mut(dense) {
                cb.update = action;
            }
        }
        match outcome {
            Ok(()) => true,
            Err(err) => self.fail(engine, entry, err),
        }
    }

    /// Route a delegate error to the hook and apply cancel-on-error.
    fn fail(&self, engine: &Engine, entry: u32, err: anyhow::Error) -> bool {
        engine.report_error(&err);
        let Some(dense) = self.relocate(engine, entry) else {
            return false;
        };
        {
            let mut storage = self.storage.borrow_mut();
            let (cancel_on_error, finished) = storage
                .callbacks(dense)
                .map_or((false, true), |cb| (cb.cancel_on_error, cb.finished));
            if !cancel_on_error {
                return true;
            }
            if finished {
                return false;
            }
            if let Some(row) = storage.row_mut(dense) {
                row.status = TweenStatus::Canceled;
            }
        }
        self.finish(engine, entry, TweenResult::CanceledWithError(Rc::new(err)));
        false
    }

    /// Invoke the dispose list exactly once with `result`.
    ///
    /// Errors raised inside the list are already inside the running section:
    /// with cancel-on-error they mark the row canceled but do not re-invoke
    /// the list.
    fn finish(&self, engine: &Engine, entry: u32, result: TweenResult) {
        let Some(dense) = self.relocate(engine, entry) else {
            return;
        };
        let list = {
            let mut storage = self.storage.borrow_mut();
            let Some(cb) = storage.callbacks_mut(dense) else {
                return;
            };
            if cb.finished {
                return;
            }
            cb.finished = true;
            cb.running = true;
            std::mem::take(&mut cb.dispose)
        };

        let failures = engine.invoke_dispose(list, &result);

        let Some(dense) = self.relocate(engine, entry) else {
            return;
        };
        let mut storage = self.storage.borrow_mut();
        let cancel_on_error = match storage.callbacks_mut(dense) {
            Some(cb) => {
                cb.running = false;
                cb.cancel_on_error
            }
            None => false,
        };
        if failures > 0 && cancel_on_error {
            if let Some(row) = storage.row_mut(dense) {
                row.status = TweenStatus::Canceled;
            }
        }
    }

    fn compact(&self, engine: &Engine) {
        let mut scratch = self.scratch.borrow_mut();
        let mut storage = self.storage.borrow_mut();
        scratch.removals.clear();
        storage.collect_finished(&mut scratch.removals);
        if scratch.removals.is_empty() {
            return;
        }
        storage.remove_all(
            &mut engine.entries().borrow_mut(),
            &mut engine.pool().borrow_mut(),
            &scratch.removals,
        );
    }

    /// Entry owning `dense`, rejecting rows whose dispose list is running.
    fn guard(&self, dense: usize) -> Result<(u32, bool)> {
        let storage = self.storage.borrow();
        let entry = storage.entry_at(dense).ok_or(TweenError::InvalidStorage {
            storage_id: storage.id(),
        })?;
        if storage.callbacks(dense).is_some_and(|cb| cb.running) {
            return Err(TweenError::Recursion { index: entry });
        }
        Ok((entry, storage.is_active(dense)))
    }
}

impl<T, P> ErasedRunner for UpdateRunner<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: TweenPlugin<T>,
{
    fn storage_id(&self) -> u32 {
        self.storage.borrow().id()
    }

    fn timing(&self) -> UpdateTiming {
        self.timing
    }

    fn update(&self, engine: &Engine) {
        let Some(_guard) = UpdatingGuard::enter(&self.updating) else {
            log::warn!(
                "storage {} is already updating; nested tick ignored",
                self.storage_id()
            );
            return;
        };
        let clock = engine.frame_time(self.timing);

        let count = {
            let storage = self.storage.borrow();
            let mut scratch = self.scratch.borrow_mut();
            scratch.begin_frame();
            sample_rows(storage.rows(), &clock, engine.config(), &mut scratch.samples);
            storage.len()
        };

        for dense in 0..count {
            let sample = self
                .scratch
                .borrow_mut()
                .samples
                .get_mut(dense)
                .and_then(Option::take);
            if let Some(sample) = sample {
                self.dispatch(engine, dense, sample);
            }
        }

        self.compact(engine);
    }

    fn cancel(&self, engine: &Engine, dense: usize) -> Result<()> {
        let (entry, active) = self.guard(dense)?;
        if !active {
            return Ok(());
        }
        if let Some(row) = self.storage.borrow_mut().row_mut(dense) {
            row.status = TweenStatus::Canceled;
        }
        self.finish(engine, entry, TweenResult::Canceled);
        Ok(())
    }

    fn complete(&self, engine: &Engine, dense: usize) -> Result<()> {
        let (entry, active) = self.guard(dense)?;
        if !active {
            return Ok(());
        }
        let value = {
            let mut storage = self.storage.borrow_mut();
            let Some(row) = storage.row_mut(dense) else {
                return Ok(());
            };
            if row.params.is_infinite() {
                log::warn!("tween {entry} loops forever; complete() ignored");
                return Err(TweenError::InvalidLoopCompletion { index: entry });
            }
            // not active any more, so the next tick leaves it to compaction
            row.status = TweenStatus::Canceled;
            let value = row.evaluate(terminal_progress(&row.params));
            // held until the dispose list is handed out, so a delegate that
            // ticks or clears this group cannot compact the row first
            if let Some(cb) = storage.callbacks_mut(dense) {
                cb.running = true;
            }
            value
        };
        let delivered = self.deliver(engine, entry, &value);
        if let Some(dense) = self.relocate(engine, entry) {
            if let Some(cb) = self.storage.borrow_mut().callbacks_mut(dense) {
                cb.running = false;
            }
        }
        if delivered {
            self.finish(engine, entry, TweenResult::Completed);
        }
        Ok(())
    }

    fn status(&self, dense: usize) -> TweenStatus {
        self.storage.borrow().status(dense)
    }

    fn cancel_all(&self, engine: &Engine) {
        let owners: Vec<u32> = {
            let storage = self.storage.borrow();
            (0..storage.len()).filter_map(|d| storage.entry_at(d)).collect()
        };
        for entry in owners {
            let Some(dense) = self.relocate(engine, entry) else {
                continue;
            };
            if let Err(err) = ErasedRunner::cancel(self, engine, dense) {
                log::debug!("cancel of tween {entry} skipped: {err}");
            }
        }
        if !self.updating.get() {
            self.compact(engine);
        }
    }

    fn remove_target(&self, engine: &Engine, dense: usize, target: &Target) -> usize {
        let mut storage = self.storage.borrow_mut();
        match storage.callbacks_mut(dense) {
            Some(cb) => engine.pool().borrow_mut().remove_target(&mut cb.dispose, target),
            None => 0,
        }
    }

    fn append_dispose(&self, engine: &Engine, dense: usize, action: DisposeAction) -> Result<()> {
        let (entry, _) = self.guard(dense)?;
        let mut storage = self.storage.borrow_mut();
        let Some(cb) = storage.callbacks_mut(dense) else {
            return Ok(());
        };
        if cb.finished {
            // the list was already handed out; the new node would never run
            return Err(TweenError::StaleHandle {
                index: entry,
                generation: engine.entries().borrow().generation_of(entry),
            });
        }
        engine.pool().borrow_mut().append(&mut cb.dispose, action);
        Ok(())
    }

    fn stats(&self) -> StorageStats {
        let storage = self.storage.borrow();
        StorageStats {
            storage_id: storage.id(),
            timing: self.timing,
            value_type: std::any::type_name::<T>().to_string(),
            plugin_type: std::any::type_name::<P>().to_string(),
            len: storage.len(),
            active: storage.rows().iter().filter(|r| r.status.is_active()).count(),
            capacity: storage.capacity(),
        }
    }
}
