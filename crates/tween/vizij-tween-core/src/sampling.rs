//! Per-row batch math: elapsed time -> loop count, eased progress and status.
//!
//! Everything here is pure so the evaluation pass can run on the rayon pool.
//! Callbacks are never touched from this module.

use rayon::prelude::*;

use crate::config::Config;
use crate::ids::{DelayType, LoopType, TweenStatus};
use crate::plugin::TweenPlugin;
use crate::row::{TweenParams, TweenRow};
use crate::scheduler::FrameTime;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Progress {
    /// Eased progress after the loop-type transform. May exceed 1 for
    /// `Incremental` loops and overshooting eases.
    pub eased: f32,
    pub completed_loops: i32,
    pub status: TweenStatus,
}

/// Staged result of one row for the sequential callback pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample<T> {
    pub value: T,
    pub status: TweenStatus,
}

#[inline]
fn clamp_loops(completed: i32, loops: i32) -> i32 {
    if loops < 0 {
        completed.max(0)
    } else {
        completed.clamp(0, loops)
    }
}

/// Raw progress `t` in `[0, 1]`, clamped loop count and whether the row sits
/// in a delay window, for `tween_time` seconds after the start.
fn raw_progress(params: &TweenParams, tween_time: f64) -> (f64, i32, bool) {
    let duration = params.duration as f64;
    let delay = params.delay as f64;
    let loops = params.loops;

    if duration <= 0.0 {
        if params.delay_type == DelayType::FirstLoop || delay == 0.0 {
            let time = tween_time - delay;
            let done = loops >= 0 && time >= 0.0;
            let completed = if done {
                loops
            } else if time < 0.0 {
                -1
            } else {
                0
            };
            let t = if done { 1.0 } else { 0.0 };
            (t, clamp_loops(completed, loops), time < 0.0)
        } else {
            let completed = (tween_time / delay).floor() as i32;
            let clamped = clamp_loops(completed, loops);
            let done = loops >= 0 && clamped > loops - 1;
            (if done { 1.0 } else { 0.0 }, clamped, !done)
        }
    } else if params.delay_type == DelayType::FirstLoop {
        let time = tween_time - delay;
        let completed = (time / duration).floor() as i32;
        let clamped = clamp_loops(completed, loops);
        let done = loops >= 0 && clamped > loops - 1;
        let t = if done {
            1.0
        } else {
            ((time - duration * clamped as f64) / duration).clamp(0.0, 1.0)
        };
        (t, clamped, time < 0.0)
    } else {
        let cycle = duration + delay;
        let loop_time = tween_time % cycle - delay;
        let completed = (tween_time / cycle).floor() as i32;
        let clamped = clamp_loops(completed, loops);
        let done = loops >= 0 && clamped > loops - 1;
        let t = if done {
            1.0
        } else {
            (loop_time / duration).clamp(0.0, 1.0)
        };
        (t, clamped, loop_time < 0.0)
    }
}

/// Apply the loop-type transform and the ease to raw progress `t`.
fn shape(params: &TweenParams, t: f64, completed_loops: i32) -> f32 {
    let ease = params.ease;
    let tf = t as f32;
    let odd = (completed_loops as i64 + t as i64) % 2 == 1;
    match params.loop_type {
        LoopType::Restart => ease.evaluate(tf),
        LoopType::Yoyo => {
            if odd {
                ease.evaluate(1.0 - tf)
            } else {
                ease.evaluate(tf)
            }
        }
        LoopType::Incremental => {
            ease.evaluate(1.0) * completed_loops as f32 + ease.evaluate((t % 1.0) as f32)
        }
        LoopType::Flip => {
            let p = ease.evaluate(tf);
            if odd {
                1.0 - p
            } else {
                p
            }
        }
    }
}

/// Progress and status `tween_time` seconds after the row started (speed already applied).
pub fn evaluate_progress(params: &TweenParams, tween_time: f64) -> Progress {
    let (mut t, mut completed_loops, delayed) = raw_progress(params, tween_time);

    let status = if params.loops >= 0 && tween_time >= params.total_duration() {
        t = 1.0;
        completed_loops = params.loops;
        TweenStatus::Completed
    } else if delayed {
        TweenStatus::Delayed
    } else {
        TweenStatus::Playing
    };

    Progress {
        eased: shape(params, t, completed_loops),
        completed_loops,
        status,
    }
}

/// Progress used by an explicit `complete()` call on a finite tween.
pub fn terminal_progress(params: &TweenParams) -> f32 {
    match params.loop_type {
        LoopType::Restart | LoopType::Flip => 1.0,
        LoopType::Yoyo => {
            if params.loops % 2 == 0 {
                0.0
            } else {
                1.0
            }
        }
        LoopType::Incremental => params.loops as f32,
    }
}

/// Evaluate one row against the clock. `None` for rows that are not active.
pub fn sample_row<T, P: TweenPlugin<T>>(row: &TweenRow<T, P>, clock: &FrameTime) -> Option<Sample<T>> {
    if !row.status.is_active() {
        return None;
    }
    let now = clock.get(row.params.time_kind);
    let tween_time = ((now - row.start_time) * row.params.speed as f64).max(0.0);
    let progress = evaluate_progress(&row.params, tween_time);
    Some(Sample {
        value: row.evaluate(progress.eased),
        status: progress.status,
    })
}

/// Evaluate every row into `out` (same length as `rows`), in parallel above
/// the configured threshold.
pub fn sample_rows<T, P>(
    rows: &[TweenRow<T, P>],
    clock: &FrameTime,
    cfg: &Config,
    out: &mut Vec<Option<Sample<T>>>,
) where
    T: Send + Sync,
    P: TweenPlugin<T>,
{
    if cfg.use_parallel(rows.len()) {
        rows.par_iter()
            .with_min_len(cfg.parallel_min_chunk.max(1))
            .map(|row| sample_row(row, clock))
            .collect_into_vec(out);
    } else {
        out.clear();
        out.extend(rows.iter().map(|row| sample_row(row, clock)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Ease;
    use approx::assert_abs_diff_eq;

    fn params(duration: f32, loops: i32) -> TweenParams {
        TweenParams {
            loops,
            ..TweenParams::new(duration)
        }
    }

    #[test]
    fn basic_linear_run() {
        let p = params(1.0, 1);
        let a = evaluate_progress(&p, 0.0);
        let b = evaluate_progress(&p, 0.5);
        let c = evaluate_progress(&p, 1.0);
        assert_eq!(a.status, TweenStatus::Playing);
        assert_eq!(b.status, TweenStatus::Playing);
        assert_eq!(c.status, TweenStatus::Completed);
        assert_abs_diff_eq!(a.eased, 0.0);
        assert_abs_diff_eq!(b.eased, 0.5);
        assert_abs_diff_eq!(c.eased, 1.0);
    }

    #[test]
    fn first_loop_delay_applies_once() {
        let p = TweenParams {
            delay: 0.5,
            loops: 2,
            ..TweenParams::new(1.0)
        };
        assert_eq!(evaluate_progress(&p, 0.25).status, TweenStatus::Delayed);
        let mid_second = evaluate_progress(&p, 2.0);
        assert_eq!(mid_second.status, TweenStatus::Playing);
        assert_eq!(mid_second.completed_loops, 1);
        assert_abs_diff_eq!(mid_second.eased, 0.5, epsilon = 1e-6);
        assert_eq!(evaluate_progress(&p, 2.5).status, TweenStatus::Completed);
    }

    #[test]
    fn every_loop_delay_repeats() {
        let p = TweenParams {
            delay: 0.5,
            loops: 2,
            delay_type: DelayType::EveryLoop,
            ..TweenParams::new(1.0)
        };
        assert_eq!(evaluate_progress(&p, 0.3).status, TweenStatus::Delayed);
        let at_one = evaluate_progress(&p, 1.0);
        assert_eq!(at_one.status, TweenStatus::Playing);
        assert_abs_diff_eq!(at_one.eased, 0.5, epsilon = 1e-6);
        // second cycle starts at 1.5 with another half second of delay
        assert_eq!(evaluate_progress(&p, 1.7).status, TweenStatus::Delayed);
        assert_eq!(evaluate_progress(&p, 2.9).status, TweenStatus::Playing);
        assert_eq!(p.total_duration(), 3.0);
        assert_eq!(evaluate_progress(&p, 3.0).status, TweenStatus::Completed);
    }

    #[test]
    fn restart_linear_is_monotonic_within_loop() {
        let p = params(2.0, 3);
        let mut last = -1.0f32;
        for i in 0..200 {
            let tt = i as f64 * 0.01;
            let progress = evaluate_progress(&p, tt).eased;
            assert!((0.0..=1.0).contains(&progress));
            assert!(progress >= last);
            last = progress;
        }
    }

    #[test]
    fn yoyo_reflects_odd_loops() {
        let p = TweenParams {
            loop_type: LoopType::Yoyo,
            ..params(1.0, 2)
        };
        let forward = evaluate_progress(&p, 0.25).eased;
        let backward = evaluate_progress(&p, 1.75).eased;
        assert_abs_diff_eq!(forward, backward, epsilon = 1e-6);
        assert_abs_diff_eq!(evaluate_progress(&p, 2.0).eased, 0.0);
    }

    #[test]
    fn yoyo_and_flip_differ_with_asymmetric_ease() {
        let base = TweenParams {
            ease: Ease::InQuad,
            ..params(1.0, 2)
        };
        let yoyo = TweenParams {
            loop_type: LoopType::Yoyo,
            ..base
        };
        let flip = TweenParams {
            loop_type: LoopType::Flip,
            ..base
        };
        // loop 1 at t = 0.25
        let y = evaluate_progress(&yoyo, 1.25).eased;
        let f = evaluate_progress(&flip, 1.25).eased;
        assert_abs_diff_eq!(y, 0.5625, epsilon = 1e-6);
        assert_abs_diff_eq!(f, 0.9375, epsilon = 1e-6);
    }

    #[test]
    fn incremental_accumulates() {
        let p = TweenParams {
            loop_type: LoopType::Incremental,
            ..params(1.0, 3)
        };
        assert_abs_diff_eq!(evaluate_progress(&p, 1.5).eased, 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(evaluate_progress(&p, 2.25).eased, 2.25, epsilon = 1e-6);
        assert_abs_diff_eq!(evaluate_progress(&p, 5.0).eased, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn infinite_loops_never_complete() {
        let p = params(1.0, -1);
        let late = evaluate_progress(&p, 1000.25);
        assert_eq!(late.status, TweenStatus::Playing);
        assert_eq!(late.completed_loops, 1000);
        assert_abs_diff_eq!(late.eased, 0.25, epsilon = 1e-3);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let p = params(0.0, 1);
        let first = evaluate_progress(&p, 0.0);
        assert_eq!(first.status, TweenStatus::Completed);
        assert_abs_diff_eq!(first.eased, 1.0);

        let delayed = TweenParams {
            delay: 1.0,
            ..p
        };
        assert_eq!(evaluate_progress(&delayed, 0.5).status, TweenStatus::Delayed);
        assert_eq!(evaluate_progress(&delayed, 1.0).status, TweenStatus::Completed);
    }

    #[test]
    fn zero_loops_complete_on_first_sample() {
        let p = params(1.0, 0);
        assert_eq!(evaluate_progress(&p, 0.0).status, TweenStatus::Completed);
    }

    #[test]
    fn terminal_progress_by_loop_type() {
        let mut p = params(1.0, 2);
        assert_eq!(terminal_progress(&p), 1.0);
        p.loop_type = LoopType::Yoyo;
        assert_eq!(terminal_progress(&p), 0.0);
        p.loops = 3;
        assert_eq!(terminal_progress(&p), 1.0);
        p.loop_type = LoopType::Incremental;
        assert_eq!(terminal_progress(&p), 3.0);
        p.loop_type = LoopType::Flip;
        assert_eq!(terminal_progress(&p), 1.0);
    }
}
