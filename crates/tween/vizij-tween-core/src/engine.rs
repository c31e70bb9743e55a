//! Engine: shared ownership of the entry table, callback pool, per-type
//! registry and update runners, plus the handle-level public API.
//!
//! Methods:
//! - tween / tween_with_plugin / to (create into the deferred buffer)
//! - is_idling / is_active / status / cancel / complete / remove_target
//! - update (per update group), manual clock in `manual.rs`
//! - link / link_with (lifetime links in `link.rs`)
//! - ensure_capacity / clear / clear_timing / stats

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hashbrown::HashMap;

use crate::buffer::{ErasedSlot, TypeSlot};
use crate::builder::TweenBuilder;
use crate::callback::{CallbackList, CallbackPool, DisposeAction, Target, TweenResult};
use crate::config::Config;
use crate::diagnostics::EngineStats;
use crate::entry::EntryTable;
use crate::error::{Result, TweenError};
use crate::ids::{TweenHandle, TweenStatus, UpdateTiming};
use crate::link::LinkTable;
use crate::plugin::{TweenPlugin, Tweenable};
use crate::row::TweenRow;
use crate::runner::ErasedRunner;
use crate::scheduler::FrameTime;

type ErrorHook = Rc<dyn Fn(&anyhow::Error)>;

fn log_unhandled(err: &anyhow::Error) {
    log::error!("unhandled tween callback error: {err:#}");
}

/// Type slots keyed by `(T, P)`, plus the same slots in creation order so a
/// handle's `type_id` indexes them directly.
#[derive(Default)]
struct Registry {
    typed: HashMap<TypeId, Box<dyn Any>>,
    slots: Vec<Rc<dyn ErasedSlot>>,
}

struct Shared {
    cfg: Config,
    entries: RefCell<EntryTable>,
    pool: RefCell<CallbackPool>,
    registry: RefCell<Registry>,
    /// Indexed by storage id.
    runners: RefCell<Vec<Rc<dyn ErasedRunner>>>,
    clocks: [Cell<FrameTime>; UpdateTiming::COUNT],
    error_hook: RefCell<ErrorHook>,
    links: RefCell<LinkTable>,
}

/// Where a live handle currently resolves to.
enum Resolved {
    Idle(Rc<dyn ErasedSlot>),
    Committed(Rc<dyn ErasedRunner>, usize),
}

/// Tween engine (single-threaded). Clones share the same state, so callbacks
/// may capture a clone and create or cancel tweens while a tick is running.
#[derive(Clone)]
pub struct Engine {
    shared: Rc<Shared>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    pub fn new(cfg: Config) -> Self {
        let entries = EntryTable::new(cfg.initial_entry_capacity);
        Self {
            shared: Rc::new(Shared {
                entries: RefCell::new(entries),
                pool: RefCell::new(CallbackPool::new()),
                registry: RefCell::new(Registry::default()),
                runners: RefCell::new(Vec::new()),
                clocks: std::array::from_fn(|_| Cell::new(FrameTime::default())),
                error_hook: RefCell::new(Rc::new(log_unhandled)),
                links: RefCell::new(LinkTable::default()),
                cfg,
            }),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    #[inline]
    pub(crate) fn entries(&self) -> &RefCell<EntryTable> {
        &self.shared.entries
    }

    #[inline]
    pub(crate) fn links(&self) -> &RefCell<LinkTable> {
        &self.shared.links
    }

    #[inline]
    pub(crate) fn pool(&self) -> &RefCell<CallbackPool> {
        &self.shared.pool
    }

    /// Clock most recently supplied to `timing`'s group.
    pub fn frame_time(&self, timing: UpdateTiming) -> FrameTime {
        self.shared.clocks[timing.index()].get()
    }

    pub(crate) fn set_frame_time(&self, timing: UpdateTiming, frame: FrameTime) {
        self.shared.clocks[timing.index()].set(frame);
    }

    /// Replace the hook receiving callback failures. The default logs at `error!`.
    pub fn set_error_hook(&self, hook: impl Fn(&anyhow::Error) + 'static) {
        *self.shared.error_hook.borrow_mut() = Rc::new(hook);
    }

    pub(crate) fn report_error(&self, err: &anyhow::Error) {
        let hook = self.shared.error_hook.borrow().clone();
        hook(err);
    }

    /// Run a detached dispose list, routing failures to the hook. Returns the failure count.
    pub(crate) fn invoke_dispose(&self, list: CallbackList, result: &TweenResult) -> usize {
        CallbackPool::invoke_and_dispose(&self.shared.pool, list, result, |e| {
            self.report_error(e)
        })
    }

    pub(crate) fn register_runner<R: ErasedRunner + 'static>(
        &self,
        make: impl FnOnce(u32) -> R,
    ) -> Rc<R> {
        let mut runners = self.shared.runners.borrow_mut();
        let runner = Rc::new(make(runners.len() as u32));
        runners.push(runner.clone());
        runner
    }

    /// Registry slot for `(T, P)`, created on first use.
    pub(crate) fn slot<T, P>(&self) -> Rc<TypeSlot<T, P>>
    where
        T: Clone + Send + Sync + 'static,
        P: TweenPlugin<T>,
    {
        let key = TypeId::of::<(T, P)>();
        let mut registry = self.shared.registry.borrow_mut();
        if let Some(slot) = registry
            .typed
            .get(&key)
            .and_then(|b| b.downcast_ref::<Rc<TypeSlot<T, P>>>())
        {
            return slot.clone();
        }
        let slot = Rc::new(TypeSlot::<T, P>::new(registry.slots.len() as u32));
        registry.typed.insert(key, Box::new(slot.clone()));
        registry.slots.push(slot.clone());
        slot
    }

    fn slots(&self) -> Vec<Rc<dyn ErasedSlot>> {
        self.shared.registry.borrow().slots.clone()
    }

    fn runners_in(&self, timing: UpdateTiming) -> Vec<Rc<dyn ErasedRunner>> {
        self.shared
            .runners
            .borrow()
            .iter()
            .filter(|r| r.timing() == timing)
            .cloned()
            .collect()
    }

    /// Create a tween with a default-constructed plugin. The tween idles in
    /// its type's deferred buffer until scheduled.
    pub fn tween<T, P>(&self, start: T, end: T, duration: f32) -> TweenBuilder<T, P>
    where
        T: Clone + Send + Sync + 'static,
        P: TweenPlugin<T>,
    {
        self.tween_with_plugin(start, end, duration, P::default())
    }

    pub fn tween_with_plugin<T, P>(
        &self,
        start: T,
        end: T,
        duration: f32,
        mut plugin: P,
    ) -> TweenBuilder<T, P>
    where
        T: Clone + Send + Sync + 'static,
        P: TweenPlugin<T>,
    {
        let slot = self.slot::<T, P>();
        // one idling tween per type
        slot.flush(self);

        let (index, generation) = self.shared.entries.borrow_mut().alloc();
        let handle = TweenHandle {
            type_id: slot.type_id,
            index,
            generation,
        };
        plugin.init();
        slot.buffer
            .borrow_mut()
            .init(handle, TweenRow::new(start, end, duration, plugin));
        TweenBuilder::new(self.clone(), slot, handle)
    }

    /// Create a tween using the value type's default plugin.
    pub fn to<T: Tweenable>(&self, start: T, end: T, duration: f32) -> TweenBuilder<T, T::Plugin> {
        self.tween(start, end, duration)
    }

    fn resolve(&self, handle: TweenHandle) -> Result<Resolved> {
        let stale = TweenError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        };
        let location = {
            let entries = self.shared.entries.borrow();
            if !entries.valid(handle) {
                return Err(stale);
            }
            entries.valid_with_location(handle)
        };
        match location {
            Some(loc) => {
                let runner = self
                    .shared
                    .runners
                    .borrow()
                    .get(loc.storage_id as usize)
                    .cloned()
                    .ok_or(TweenError::InvalidStorage {
                        storage_id: loc.storage_id,
                    })?;
                Ok(Resolved::Committed(runner, loc.dense_index))
            }
            None => {
                let slot = self
                    .shared
                    .registry
                    .borrow()
                    .slots
                    .get(handle.type_id as usize)
                    .cloned();
                match slot {
                    Some(slot) if slot.idle_handle() == Some(handle) => Ok(Resolved::Idle(slot)),
                    _ => Err(stale),
                }
            }
        }
    }

    /// `true` while the tween sits in its deferred buffer.
    pub fn is_idling(&self, handle: TweenHandle) -> bool {
        matches!(self.resolve(handle), Ok(Resolved::Idle(_)))
    }

    /// `true` for idling tweens and rows that are still evaluated every tick.
    pub fn is_active(&self, handle: TweenHandle) -> bool {
        self.status(handle)
            .is_some_and(|s| s == TweenStatus::Idle || s.is_active())
    }

    /// `None` once the handle is stale.
    pub fn status(&self, handle: TweenHandle) -> Option<TweenStatus> {
        match self.resolve(handle).ok()? {
            Resolved::Idle(_) => Some(TweenStatus::Idle),
            Resolved::Committed(runner, dense) => Some(runner.status(dense)),
        }
    }

    /// Cancel immediately, running cancel and dispose callbacks in this call.
    ///
    /// Canceling a finished row that has not been compacted yet is a no-op.
    pub fn cancel(&self, handle: TweenHandle) -> Result<()> {
        match self.resolve(handle)? {
            Resolved::Idle(slot) => slot.cancel_idle(self, handle),
            Resolved::Committed(runner, dense) => runner.cancel(self, dense),
        }
    }

    /// Jump to the terminal value and run completion callbacks.
    ///
    /// Infinite tweens reject this with [`TweenError::InvalidLoopCompletion`]
    /// and keep running.
    pub fn complete(&self, handle: TweenHandle) -> Result<()> {
        match self.resolve(handle)? {
            Resolved::Idle(slot) => slot.complete_idle(self, handle),
            Resolved::Committed(runner, dense) => runner.complete(self, dense),
        }
    }

    /// Register a dispose-time action on an idling or running tween.
    pub fn add_dispose_action(&self, handle: TweenHandle, action: DisposeAction) -> Result<()> {
        match self.resolve(handle)? {
            Resolved::Idle(slot) => slot.append_idle(self, handle, action),
            Resolved::Committed(runner, dense) => runner.append_dispose(self, dense, action),
        }
    }

    /// Drop every dispose action bound to `target`. Returns the number removed.
    pub fn remove_target(&self, handle: TweenHandle, target: &Target) -> usize {
        match self.resolve(handle) {
            Ok(Resolved::Idle(slot)) => slot.remove_idle_target(self, handle, target),
            Ok(Resolved::Committed(runner, dense)) => runner.remove_target(self, dense, target),
            Err(_) => 0,
        }
    }

    /// Tick one update group: cancel tweens whose link failed, record the
    /// group clock, flush deferred buffers bound to it, then run every
    /// storage of the group.
    pub fn update(&self, timing: UpdateTiming, frame: FrameTime) {
        self.check_links();
        self.set_frame_time(timing, frame);
        for slot in self.slots() {
            if slot.idle_timing() == Some(timing) {
                slot.flush(self);
            }
        }
        for runner in self.runners_in(timing) {
            runner.update(self);
        }
    }

    /// Pre-size the storage for `(T, P)` in `timing`'s group.
    pub fn ensure_capacity<T, P>(&self, capacity: usize, timing: UpdateTiming)
    where
        T: Clone + Send + Sync + 'static,
        P: TweenPlugin<T>,
    {
        self.slot::<T, P>()
            .runner_for(self, timing)
            .ensure_capacity(capacity);
    }

    /// Cancel every tween in every group, idling ones included.
    pub fn clear(&self) {
        for timing in UpdateTiming::ALL {
            self.clear_timing(timing);
        }
    }

    /// Cancel every tween bound to `timing`'s group.
    pub fn clear_timing(&self, timing: UpdateTiming) {
        for slot in self.slots() {
            if slot.idle_timing() != Some(timing) {
                continue;
            }
            if let Some(handle) = slot.idle_handle() {
                if let Err(err) = slot.cancel_idle(self, handle) {
                    log::debug!("clear skipped idling tween {}: {err}", handle.index);
                }
            }
        }
        for runner in self.runners_in(timing) {
            runner.cancel_all(self);
        }
    }

    pub fn stats(&self) -> EngineStats {
        let (live_entries, entry_capacity) = {
            let entries = self.shared.entries.borrow();
            (entries.live_count(), entries.capacity())
        };
        let idling = self
            .slots()
            .iter()
            .filter(|s| s.idle_handle().is_some())
            .count();
        let runners = self.shared.runners.borrow().clone();
        EngineStats {
            live_entries,
            entry_capacity,
            idling,
            pooled_callbacks: self.shared.pool.borrow().in_use(),
            storages: runners.iter().map(|r| r.stats()).collect(),
        }
    }
}
