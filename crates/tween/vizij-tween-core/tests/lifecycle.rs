use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use vizij_tween_core::{
    Config, DelayType, Engine, F32Plugin, FrameTime, TweenHandle, TweenStatus, UpdateTiming,
    Vec3Plugin,
};

fn tick(engine: &Engine, t: f64) {
    engine.update(UpdateTiming::Update, FrameTime::uniform(t));
}

#[test]
fn basic_float_tween_runs_to_completion() {
    let engine = Engine::new(Config::default());
    let seen: Rc<RefCell<Vec<(f32, Option<TweenStatus>)>>> = Rc::new(RefCell::new(Vec::new()));
    let me: Rc<Cell<Option<TweenHandle>>> = Rc::new(Cell::new(None));

    let (sink, own, e) = (seen.clone(), me.clone(), engine.clone());
    let handle = engine
        .tween::<f32, F32Plugin>(0.0, 10.0, 1.0)
        .bind(move |v| {
            let status = own.get().and_then(|h| e.status(h));
            sink.borrow_mut().push((*v, status));
            Ok(())
        })
        .schedule();
    me.set(Some(handle));

    tick(&engine, 0.0);
    tick(&engine, 0.5);
    assert_eq!(engine.status(handle), Some(TweenStatus::Playing));
    tick(&engine, 1.0);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_abs_diff_eq!(seen[0].0, 0.0);
    assert_abs_diff_eq!(seen[1].0, 5.0);
    assert_abs_diff_eq!(seen[2].0, 10.0);
    assert_eq!(seen[0].1, Some(TweenStatus::Playing));
    assert_eq!(seen[1].1, Some(TweenStatus::Playing));
    assert_eq!(seen[2].1, Some(TweenStatus::Completed));

    // compacted at the end of the completing tick
    assert_eq!(engine.status(handle), None);
    assert!(!engine.is_active(handle));
    assert_eq!(engine.stats().live_entries, 0);
}

#[test]
fn every_loop_delay_scenario() {
    let engine = Engine::default();
    let last = Rc::new(Cell::new(f32::NAN));
    let sink = last.clone();
    let handle = engine
        .tween::<f32, F32Plugin>(0.0, 1.0, 1.0)
        .delay(0.5)
        .loops(2)
        .delay_type(DelayType::EveryLoop)
        .bind(move |v| {
            sink.set(*v);
            Ok(())
        })
        .schedule();

    tick(&engine, 0.3);
    assert_eq!(engine.status(handle), Some(TweenStatus::Delayed));
    tick(&engine, 1.0);
    assert_eq!(engine.status(handle), Some(TweenStatus::Playing));
    assert_abs_diff_eq!(last.get(), 0.5, epsilon = 1e-6);
    tick(&engine, 2.9);
    assert_eq!(engine.status(handle), Some(TweenStatus::Playing));
    tick(&engine, 3.0);
    assert_eq!(engine.status(handle), None);
    assert_abs_diff_eq!(last.get(), 1.0);
}

#[test]
fn skip_values_during_delay_suppresses_updates() {
    let engine = Engine::default();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    engine
        .tween::<f32, F32Plugin>(0.0, 1.0, 1.0)
        .delay(1.0)
        .skip_values_during_delay(true)
        .bind(move |_| {
            c.set(c.get() + 1);
            Ok(())
        })
        .schedule();

    tick(&engine, 0.5);
    assert_eq!(calls.get(), 0);
    tick(&engine, 1.5);
    assert_eq!(calls.get(), 1);
}

#[test]
fn relative_vector_adds_start_to_end() {
    let engine = Engine::default();
    let last = Rc::new(Cell::new([0.0f32; 3]));
    let sink = last.clone();
    engine
        .tween::<[f32; 3], Vec3Plugin>([1.0; 3], [2.0; 3], 1.0)
        .relative(true)
        .bind(move |v| {
            sink.set(*v);
            Ok(())
        })
        .schedule();

    tick(&engine, 1.0);
    for c in last.get() {
        assert_abs_diff_eq!(c, 3.0);
    }
}

#[test]
fn reversed_tween_plays_end_to_start() {
    let engine = Engine::default();
    let values = Rc::new(RefCell::new(Vec::new()));
    let sink = values.clone();
    engine
        .to(2.0f32, 8.0, 1.0)
        .reversed(true)
        .bind(move |v| {
            sink.borrow_mut().push(*v);
            Ok(())
        })
        .schedule();

    tick(&engine, 0.0);
    tick(&engine, 1.0);
    assert_eq!(*values.borrow(), vec![8.0, 2.0]);
}

#[test]
fn speed_scales_elapsed_time() {
    let engine = Engine::default();
    let last = Rc::new(Cell::new(0.0f32));
    let sink = last.clone();
    let handle = engine
        .to(0.0f32, 1.0, 1.0)
        .speed(2.0)
        .bind(move |v| {
            sink.set(*v);
            Ok(())
        })
        .schedule();

    tick(&engine, 0.25);
    assert_abs_diff_eq!(last.get(), 0.5, epsilon = 1e-6);
    tick(&engine, 0.5);
    assert_eq!(engine.status(handle), None);
}

#[test]
fn start_time_is_taken_from_the_group_clock() {
    let engine = Engine::default();
    tick(&engine, 10.0);
    let last = Rc::new(Cell::new(-1.0f32));
    let sink = last.clone();
    engine
        .to(0.0f32, 4.0, 2.0)
        .bind(move |v| {
            sink.set(*v);
            Ok(())
        })
        .schedule();
    tick(&engine, 11.0);
    assert_abs_diff_eq!(last.get(), 2.0, epsilon = 1e-6);
}

#[test]
fn complete_jumps_to_terminal_value() {
    let engine = Engine::default();
    let last = Rc::new(Cell::new(0.0f32));
    let done = Rc::new(Cell::new(false));
    let (sink, flag) = (last.clone(), done.clone());
    let handle = engine
        .to(0.0f32, 10.0, 5.0)
        .bind(move |v| {
            sink.set(*v);
            Ok(())
        })
        .on_complete(move || {
            flag.set(true);
            Ok(())
        })
        .schedule();

    tick(&engine, 1.0);
    engine.complete(handle).expect("finite tween completes");
    assert_abs_diff_eq!(last.get(), 10.0);
    assert!(done.get());
    assert!(!engine.is_active(handle));

    // the next tick leaves the value alone and compacts the row
    tick(&engine, 2.0);
    assert_abs_diff_eq!(last.get(), 10.0);
    assert_eq!(engine.status(handle), None);
}

#[test]
fn complete_on_idling_tween_delivers_end_value() {
    let engine = Engine::default();
    let last = Rc::new(Cell::new(0.0f32));
    let sink = last.clone();
    let handle = engine
        .to(1.0f32, 3.0, 1.0)
        .bind(move |v| {
            sink.set(*v);
            Ok(())
        })
        .handle();
    assert!(engine.is_idling(handle));
    engine.complete(handle).expect("idle completion");
    assert_abs_diff_eq!(last.get(), 3.0);
    assert_eq!(engine.status(handle), None);
    assert_eq!(engine.stats().idling, 0);
}

#[test]
fn infinite_loop_rejects_complete() {
    let engine = Engine::default();
    let handle = engine.to(0.0f32, 1.0, 1.0).loops(-1).schedule();
    tick(&engine, 0.5);

    let err = engine.complete(handle).expect_err("infinite loops cannot complete");
    assert!(err.is_warning());
    assert_eq!(engine.status(handle), Some(TweenStatus::Playing));
    assert!(engine.is_active(handle));

    tick(&engine, 100.25);
    assert_eq!(engine.status(handle), Some(TweenStatus::Playing));
}

#[test]
fn zero_duration_tween_completes_on_first_tick() {
    let engine = Engine::default();
    let last = Rc::new(Cell::new(0.0f32));
    let sink = last.clone();
    let handle = engine
        .to(0.0f32, 7.0, 0.0)
        .bind(move |v| {
            sink.set(*v);
            Ok(())
        })
        .schedule();
    tick(&engine, 0.0);
    assert_abs_diff_eq!(last.get(), 7.0);
    assert_eq!(engine.status(handle), None);
}

#[test]
fn clear_cancels_idle_and_scheduled_tweens() {
    let engine = Engine::default();
    let canceled = Rc::new(Cell::new(0));
    let c1 = canceled.clone();
    let c2 = canceled.clone();
    let scheduled = engine
        .to(0.0f32, 1.0, 1.0)
        .on_cancel(move || {
            c1.set(c1.get() + 1);
            Ok(())
        })
        .schedule();
    let idle = engine
        .to([0.0f32; 2], [1.0; 2], 1.0)
        .on_cancel(move || {
            c2.set(c2.get() + 1);
            Ok(())
        })
        .handle();

    engine.clear();
    assert_eq!(canceled.get(), 2);
    assert_eq!(engine.status(scheduled), None);
    assert_eq!(engine.status(idle), None);
    let stats = engine.stats();
    assert_eq!(stats.live_entries, 0);
    assert_eq!(stats.total_rows(), 0);
}
