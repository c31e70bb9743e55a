//! Per-tween callbacks.
//!
//! Every row carries one [`CallbackSet`]: an update delegate fed with the
//! freshly evaluated value each tick, and a [`CallbackList`] of dispose-time
//! actions that runs exactly once when the tween completes or is canceled.
//! List nodes live in a shared [`CallbackPool`] and are recycled through its
//! free list.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Return type of every user callback.
pub type CallbackResult = anyhow::Result<()>;

/// Object a callback is bound to. Compared by address in [`CallbackPool::remove_target`].
pub type Target = Rc<dyn Any>;

/// How a tween ended.
#[derive(Clone, Debug)]
pub enum TweenResult {
    Completed,
    Canceled,
    /// Canceled because a callback failed and the tween opted into cancel-on-error.
    CanceledWithError(Rc<anyhow::Error>),
}

impl TweenResult {
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::CanceledWithError(err) => Some(err),
            _ => None,
        }
    }
}

type ResultFn = Box<dyn FnOnce(&TweenResult) -> CallbackResult>;
type TargetResultFn = Box<dyn FnOnce(&dyn Any, &TweenResult) -> CallbackResult>;
type OnceFn = Box<dyn FnOnce() -> CallbackResult>;
type TargetOnceFn = Box<dyn FnOnce(&dyn Any) -> CallbackResult>;

/// One node of a dispose list.
pub enum DisposeAction {
    OnDispose(ResultFn),
    OnDisposeWithTarget(Target, TargetResultFn),
    OnCancel(OnceFn),
    OnCancelWithTarget(Target, TargetOnceFn),
    OnComplete(OnceFn),
    OnCompleteWithTarget(Target, TargetOnceFn),
}

fn downcast_once<O: 'static>(f: impl FnOnce(&O) -> CallbackResult + 'static) -> TargetOnceFn {
    Box::new(move |target: &dyn Any| match target.downcast_ref::<O>() {
        Some(o) => f(o),
        None => Ok(()),
    })
}

impl DisposeAction {
    pub fn on_dispose(f: impl FnOnce(&TweenResult) -> CallbackResult + 'static) -> Self {
        Self::OnDispose(Box::new(f))
    }

    pub fn on_dispose_with<O: 'static>(
        target: Rc<O>,
        f: impl FnOnce(&O, &TweenResult) -> CallbackResult + 'static,
    ) -> Self {
        let target: Target = target;
        Self::OnDisposeWithTarget(
            target,
            Box::new(move |t: &dyn Any, result: &TweenResult| match t.downcast_ref::<O>() {
                Some(o) => f(o, result),
                None => Ok(()),
            }),
        )
    }

    pub fn on_cancel(f: impl FnOnce() -> CallbackResult + 'static) -> Self {
        Self::OnCancel(Box::new(f))
    }

    pub fn on_cancel_with<O: 'static>(
        target: Rc<O>,
        f: impl FnOnce(&O) -> CallbackResult + 'static,
    ) -> Self {
        Self::OnCancelWithTarget(target, downcast_once(f))
    }

    pub fn on_complete(f: impl FnOnce() -> CallbackResult + 'static) -> Self {
        Self::OnComplete(Box::new(f))
    }

    pub fn on_complete_with<O: 'static>(
        target: Rc<O>,
        f: impl FnOnce(&O) -> CallbackResult + 'static,
    ) -> Self {
        Self::OnCompleteWithTarget(target, downcast_once(f))
    }

    fn target(&self) -> Option<&Target> {
        match self {
            Self::OnDisposeWithTarget(t, _)
            | Self::OnCancelWithTarget(t, _)
            | Self::OnCompleteWithTarget(t, _) => Some(t),
            _ => None,
        }
    }

    /// Run the action if it applies to `result`.
    pub fn invoke(self, result: &TweenResult) -> CallbackResult {
        match self {
            Self::OnDispose(f) => f(result),
            Self::OnDisposeWithTarget(t, f) => f(t.as_ref(), result),
            Self::OnCancel(f) if !result.is_completed() => f(),
            Self::OnCancelWithTarget(t, f) if !result.is_completed() => f(t.as_ref()),
            Self::OnComplete(f) if result.is_completed() => f(),
            Self::OnCompleteWithTarget(t, f) if result.is_completed() => f(t.as_ref()),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for DisposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::OnDispose(_) => "OnDispose",
            Self::OnDisposeWithTarget(..) => "OnDisposeWithTarget",
            Self::OnCancel(_) => "OnCancel",
            Self::OnCancelWithTarget(..) => "OnCancelWithTarget",
            Self::OnComplete(_) => "OnComplete",
            Self::OnCompleteWithTarget(..) => "OnCompleteWithTarget",
        };
        f.write_str(tag)
    }
}

/// Head/tail of a singly-linked list of pooled nodes.
///
/// Owned by exactly one callback set. Must be drained through the pool that
/// issued its nodes, either by invoking it or by [`CallbackPool::release`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallbackList {
    head: Option<u32>,
    tail: Option<u32>,
}

impl CallbackList {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

#[derive(Debug)]
struct Node {
    action: Option<DisposeAction>,
    next: Option<u32>,
}

/// Arena of dispose-list nodes with a free list.
#[derive(Debug, Default)]
pub struct CallbackPool {
    nodes: Vec<Node>,
    free: Option<u32>,
    in_use: usize,
}

impl CallbackPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&mut self, action: DisposeAction) -> u32 {
        self.in_use += 1;
        match self.free {
            Some(idx) => {
                let node = &mut self.nodes[idx as usize];
                self.free = node.next.take();
                node.action = Some(action);
                idx
            }
            None => {
                self.nodes.push(Node {
                    action: Some(action),
                    next: None,
                });
                (self.nodes.len() - 1) as u32
            }
        }
    }

    fn recycle(&mut self, idx: u32) {
        let node = &mut self.nodes[idx as usize];
        node.action = None;
        node.next = self.free;
        self.free = Some(idx);
        self.in_use -= 1;
    }

    /// Append at the tail; registration order is invocation order.
    pub fn append(&mut self, list: &mut CallbackList, action: DisposeAction) {
        let idx = self.acquire(action);
        match list.tail {
            Some(tail) => self.nodes[tail as usize].next = Some(idx),
            None => list.head = Some(idx),
        }
        list.tail = Some(idx);
    }

    /// Detach the head node, returning its action and recycling the node.
    pub fn pop_front(&mut self, list: &mut CallbackList) -> Option<DisposeAction> {
        while let Some(head) = list.head {
            let node = &mut self.nodes[head as usize];
            let action = node.action.take();
            list.head = node.next.take();
            if list.head.is_none() {
                list.tail = None;
            }
            self.recycle(head);
            if action.is_some() {
                return action;
            }
        }
        None
    }

    /// Drop every node without invoking it.
    pub fn release(&mut self, list: &mut CallbackList) {
        while self.pop_front(list).is_some() {}
    }

    /// Unlink every node bound to `target`. Returns the number removed.
    pub fn remove_target(&mut self, list: &mut CallbackList, target: &Target) -> usize {
        let wanted = Rc::as_ptr(target) as *const ();
        let mut removed = 0;
        let mut prev: Option<u32> = None;
        let mut cursor = list.head;
        while let Some(idx) = cursor {
            let node = &self.nodes[idx as usize];
            let next = node.next;
            let bound = node
                .action
                .as_ref()
                .and_then(DisposeAction::target)
                .is_some_and(|t| Rc::as_ptr(t) as *const () == wanted);
            if bound {
                match prev {
                    Some(p) => self.nodes[p as usize].next = next,
                    None => list.head = next,
                }
                if list.tail == Some(idx) {
                    list.tail = prev;
                }
                self.nodes[idx as usize].next = None;
                self.recycle(idx);
                removed += 1;
            } else {
                prev = Some(idx);
            }
            cursor = next;
        }
        removed
    }

    pub fn len_of(&self, list: &CallbackList) -> usize {
        let mut count = 0;
        let mut cursor = list.head;
        while let Some(idx) = cursor {
            count += 1;
            cursor = self.nodes[idx as usize].next;
        }
        count
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Invoke every node once in order, then leave `list` empty.
    ///
    /// The pool is not borrowed while an action runs, so actions may register
    /// callbacks on other tweens. Each failure goes to `on_error` and does not
    /// stop the remaining nodes. Returns the number of failed actions.
    pub fn invoke_and_dispose(
        pool: &RefCell<CallbackPool>,
        mut list: CallbackList,
        result: &TweenResult,
        mut on_error: impl FnMut(&anyhow::Error),
    ) -> usize {
        let mut failures = 0;
        loop {
            let action = pool.borrow_mut().pop_front(&mut list);
            let Some(action) = action else {
                break;
            };
            if let Err(err) = action.invoke(result) {
                on_error(&err);
                failures += 1;
            }
        }
        failures
    }
}

type UnboundFn<T> = Box<dyn FnMut(&T) -> CallbackResult>;
type Bound1Fn<T> = Box<dyn FnMut(&dyn Any, &T) -> CallbackResult>;
type Bound2Fn<T> = Box<dyn FnMut(&dyn Any, &dyn Any, &T) -> CallbackResult>;

/// Update delegate with zero, one or two bound targets.
pub enum UpdateAction<T> {
    None,
    Unbound(UnboundFn<T>),
    Bound1(Target, Bound1Fn<T>),
    Bound2(Target, Target, Bound2Fn<T>),
}

impl<T> Default for UpdateAction<T> {
    fn default() -> Self {
        Self::None
    }
}

impl<T: 'static> UpdateAction<T> {
    pub fn unbound(f: impl FnMut(&T) -> CallbackResult + 'static) -> Self {
        Self::Unbound(Box::new(f))
    }

    pub fn bound<O: 'static>(
        target: Rc<O>,
        mut f: impl FnMut(&O, &T) -> CallbackResult + 'static,
    ) -> Self {
        Self::Bound1(
            target,
            Box::new(move |t: &dyn Any, value: &T| match t.downcast_ref::<O>() {
                Some(o) => f(o, value),
                None => Ok(()),
            }),
        )
    }

    pub fn bound2<O1: 'static, O2: 'static>(
        first: Rc<O1>,
        second: Rc<O2>,
        mut f: impl FnMut(&O1, &O2, &T) -> CallbackResult + 'static,
    ) -> Self {
        Self::Bound2(
            first,
            second,
            Box::new(move |a: &dyn Any, b: &dyn Any, value: &T| {
                match (a.downcast_ref::<O1>(), b.downcast_ref::<O2>()) {
                    (Some(a), Some(b)) => f(a, b, value),
                    _ => Ok(()),
                }
            }),
        )
    }
}

impl<T> UpdateAction<T> {
    pub fn invoke(&mut self, value: &T) -> CallbackResult {
        match self {
            Self::None => Ok(()),
            Self::Unbound(f) => f(value),
            Self::Bound1(t, f) => f(t.as_ref(), value),
            Self::Bound2(a, b, f) => f(a.as_ref(), b.as_ref(), value),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl<T> fmt::Debug for UpdateAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::None => "None",
            Self::Unbound(_) => "Unbound",
            Self::Bound1(..) => "Bound1",
            Self::Bound2(..) => "Bound2",
        };
        f.write_str(tag)
    }
}

/// Callback state stored next to each row.
#[derive(Debug)]
pub struct CallbackSet<T> {
    pub update: UpdateAction<T>,
    pub dispose: CallbackList,
    /// Set while the dispose list is being invoked.
    pub running: bool,
    /// Set once the dispose list has been handed out for invocation.
    pub finished: bool,
    pub cancel_on_error: bool,
    pub skip_values_during_delay: bool,
}

impl<T> Default for CallbackSet<T> {
    fn default() -> Self {
        Self {
            update: UpdateAction::None,
            dispose: CallbackList::default(),
            running: false,
            finished: false,
            cancel_on_error: false,
            skip_values_during_delay: false,
        }
    }
}
