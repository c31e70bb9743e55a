//! Lifetime links: cancel tweens once the state they animate goes away.
//!
//! A link pairs a state object (held weakly) with a validator. Handles that
//! share the same state and validator type are grouped under one key, so the
//! validator runs once per group. Every `Engine::update` checks all groups
//! first and cancels the handles of groups whose validator fails.

use std::any::TypeId;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;

use crate::engine::Engine;
use crate::error::{Result, TweenError};
use crate::ids::TweenHandle;

/// State address plus validator type.
type LinkKey = (usize, TypeId);

type Validator = Rc<dyn Fn() -> bool>;

struct LinkGroup {
    validate: Validator,
    handles: Vec<TweenHandle>,
}

#[derive(Default)]
pub(crate) struct LinkTable {
    groups: HashMap<LinkKey, LinkGroup>,
}

impl LinkTable {
    fn insert(&mut self, key: LinkKey, validate: impl FnOnce() -> Validator, handle: TweenHandle) {
        let group = self.groups.entry(key).or_insert_with(|| LinkGroup {
            validate: validate(),
            handles: Vec::new(),
        });
        if !group.handles.contains(&handle) {
            group.handles.push(handle);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.values().map(|g| g.handles.len()).sum()
    }
}

/// Marker keying plain liveness links apart from predicate links on the same state.
struct Alive;

fn address<O>(state: &Weak<O>) -> usize {
    state.as_ptr() as *const () as usize
}

impl Engine {
    /// Cancel `handle` once every strong reference to `state` is dropped.
    pub fn link<O: 'static>(&self, handle: TweenHandle, state: Weak<O>) -> Result<()> {
        self.require_live(handle)?;
        let key = (address(&state), TypeId::of::<Alive>());
        self.links().borrow_mut().insert(
            key,
            move || Rc::new(move || state.strong_count() > 0) as Validator,
            handle,
        );
        Ok(())
    }

    /// Cancel `handle` once `validate` returns `false` for `state`, or once
    /// `state` is dropped. The engine only keeps a weak reference.
    ///
    /// Links registered on the same state with the same validator type share
    /// one check; the first registered validator is the one that runs.
    pub fn link_with<O, F>(&self, handle: TweenHandle, state: &Rc<O>, validate: F) -> Result<()>
    where
        O: 'static,
        F: Fn(&O) -> bool + 'static,
    {
        self.require_live(handle)?;
        let weak = Rc::downgrade(state);
        let key = (address(&weak), TypeId::of::<F>());
        self.links().borrow_mut().insert(
            key,
            move || Rc::new(move || weak.upgrade().is_some_and(|o| validate(&o))) as Validator,
            handle,
        );
        Ok(())
    }

    /// Number of handles currently linked to a state object.
    pub fn linked_count(&self) -> usize {
        self.links().borrow().len()
    }

    fn require_live(&self, handle: TweenHandle) -> Result<()> {
        if self.status(handle).is_some_and(|s| !s.is_finished()) {
            Ok(())
        } else {
            Err(TweenError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            })
        }
    }

    /// Run every validator and cancel the handles of failed groups. Dead
    /// handles are pruned so groups of finished tweens do not pile up.
    pub(crate) fn check_links(&self) {
        let validators: Vec<(LinkKey, Validator)> = self
            .links()
            .borrow()
            .groups
            .iter()
            .map(|(key, group)| (*key, group.validate.clone()))
            .collect();
        if validators.is_empty() {
            return;
        }

        // validators are user code; no borrow is held while they run
        let failed: Vec<LinkKey> = validators
            .into_iter()
            .filter(|(_, validate)| !validate())
            .map(|(key, _)| key)
            .collect();

        let mut doomed = Vec::new();
        {
            let mut links = self.links().borrow_mut();
            for key in &failed {
                if let Some(group) = links.groups.remove(key) {
                    doomed.extend(group.handles);
                }
            }
        }
        for handle in doomed {
            match self.cancel(handle) {
                Ok(()) => log::debug!("link lost; canceled tween {}", handle.index),
                Err(err) => log::debug!("link lost for tween {}: {err}", handle.index),
            }
        }

        let snapshot: Vec<(LinkKey, Vec<TweenHandle>)> = self
            .links()
            .borrow()
            .groups
            .iter()
            .map(|(key, group)| (*key, group.handles.clone()))
            .collect();
        for (key, handles) in snapshot {
            let kept: Vec<TweenHandle> = handles
                .into_iter()
                .filter(|h| self.status(*h).is_some_and(|s| !s.is_finished()))
                .collect();
            let mut links = self.links().borrow_mut();
            if kept.is_empty() {
                links.groups.remove(&key);
            } else if let Some(group) = links.groups.get_mut(&key) {
                group.handles.retain(|h| kept.contains(h));
            }
        }
    }
}
