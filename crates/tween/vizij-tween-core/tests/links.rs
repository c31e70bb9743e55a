use std::cell::Cell;
use std::rc::Rc;

use vizij_tween_core::{Engine, FrameTime, TweenError, TweenHandle, TweenStatus, UpdateTiming};

fn tick(engine: &Engine, t: f64) {
    engine.update(UpdateTiming::Update, FrameTime::uniform(t));
}

fn counted_tween(engine: &Engine, canceled: &Rc<Cell<u32>>) -> TweenHandle {
    let c = canceled.clone();
    engine
        .to(0.0f32, 1.0, 1.0)
        .on_cancel(move || {
            c.set(c.get() + 1);
            Ok(())
        })
        .schedule()
}

fn visible(flag: &Cell<bool>) -> bool {
    flag.get()
}

#[test]
fn dropping_linked_state_cancels_tween() {
    let engine = Engine::default();
    let canceled = Rc::new(Cell::new(0));
    let handle = counted_tween(&engine, &canceled);
    let state = Rc::new(String::from("sprite"));
    engine.link(handle, Rc::downgrade(&state)).expect("live handle");

    tick(&engine, 0.1);
    assert_eq!(engine.status(handle), Some(TweenStatus::Playing));

    drop(state);
    tick(&engine, 0.2);
    assert_eq!(canceled.get(), 1);
    assert_eq!(engine.status(handle), None);
    assert_eq!(engine.linked_count(), 0);
}

#[test]
fn failed_predicate_cancels_every_handle_in_the_group() {
    let engine = Engine::default();
    let canceled = Rc::new(Cell::new(0));
    let state = Rc::new(Cell::new(true));
    let a = counted_tween(&engine, &canceled);
    let b = counted_tween(&engine, &canceled);
    engine.link_with(a, &state, visible).expect("live handle");
    engine.link_with(b, &state, visible).expect("live handle");
    assert_eq!(engine.linked_count(), 2);

    tick(&engine, 0.1);
    assert!(engine.is_active(a) && engine.is_active(b));

    state.set(false);
    tick(&engine, 0.2);
    assert_eq!(canceled.get(), 2);
    assert_eq!(engine.status(a), None);
    assert_eq!(engine.status(b), None);
}

#[test]
fn predicate_link_also_fails_when_state_is_dropped() {
    let engine = Engine::default();
    let canceled = Rc::new(Cell::new(0));
    let handle = counted_tween(&engine, &canceled);
    let state = Rc::new(Cell::new(true));
    engine.link_with(handle, &state, visible).expect("live handle");

    drop(state);
    tick(&engine, 0.1);
    assert_eq!(canceled.get(), 1);
}

#[test]
fn idling_tween_is_canceled_before_it_is_flushed() {
    let engine = Engine::default();
    let canceled = Rc::new(Cell::new(0));
    let c = canceled.clone();
    let handle = engine
        .to(0.0f32, 1.0, 1.0)
        .on_cancel(move || {
            c.set(c.get() + 1);
            Ok(())
        })
        .into_handle();
    let state = Rc::new(0u8);
    engine.link(handle, Rc::downgrade(&state)).expect("idling handle");
    drop(state);

    tick(&engine, 0.0);
    assert_eq!(canceled.get(), 1);
    assert_eq!(engine.status(handle), None);
}

#[test]
fn linking_a_stale_handle_is_rejected() {
    let engine = Engine::default();
    let handle = engine.to(0.0f32, 1.0, 1.0).schedule();
    tick(&engine, 1.0);
    let state = Rc::new(0u8);
    assert!(matches!(
        engine.link(handle, Rc::downgrade(&state)),
        Err(TweenError::StaleHandle { .. })
    ));
    assert_eq!(engine.linked_count(), 0);
}

#[test]
fn completed_tweens_are_pruned_from_links() {
    let engine = Engine::default();
    let canceled = Rc::new(Cell::new(0));
    let handle = counted_tween(&engine, &canceled);
    let state = Rc::new(0u8);
    engine.link(handle, Rc::downgrade(&state)).expect("live handle");

    tick(&engine, 1.0);
    assert_eq!(engine.status(handle), None);
    tick(&engine, 1.5);
    assert_eq!(engine.linked_count(), 0);

    // the state outliving its tween never cancels anything
    drop(state);
    tick(&engine, 2.0);
    assert_eq!(canceled.get(), 0);
}
