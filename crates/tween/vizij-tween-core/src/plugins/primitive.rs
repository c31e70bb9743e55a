use serde::{Deserialize, Serialize};

use crate::interp::functions::{lerp_f32, lerp_f64, round_with, RoundingMode};
use crate::plugin::{RelativeMode, TweenPlugin, Tweenable};

macro_rules! relative_arith {
    ($mode:expr, $start:expr, $end:expr) => {
        match $mode {
            RelativeMode::RelativeValue => *$start + $end,
            RelativeMode::RelativeScale => *$start * $end,
            _ => $end,
        }
    };
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct F32Plugin;

impl TweenPlugin<f32> for F32Plugin {
    #[inline]
    fn evaluate(&self, start: &f32, end: &f32, progress: f32) -> f32 {
        lerp_f32(*start, *end, progress)
    }

    fn apply_relative(&self, mode: RelativeMode, start: &f32, end: f32) -> f32 {
        relative_arith!(mode, start, end)
    }
}

impl Tweenable for f32 {
    type Plugin = F32Plugin;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct F64Plugin;

impl TweenPlugin<f64> for F64Plugin {
    #[inline]
    fn evaluate(&self, start: &f64, end: &f64, progress: f32) -> f64 {
        lerp_f64(*start, *end, progress)
    }

    fn apply_relative(&self, mode: RelativeMode, start: &f64, end: f64) -> f64 {
        relative_arith!(mode, start, end)
    }
}

impl Tweenable for f64 {
    type Plugin = F64Plugin;
}

/// Interpolates in `f64` and rounds back with `rounding`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct I32Plugin {
    pub rounding: RoundingMode,
}

impl I32Plugin {
    pub fn with_rounding(rounding: RoundingMode) -> Self {
        Self { rounding }
    }
}

impl TweenPlugin<i32> for I32Plugin {
    fn evaluate(&self, start: &i32, end: &i32, progress: f32) -> i32 {
        let value = lerp_f64(*start as f64, *end as f64, progress);
        round_with(self.rounding, value) as i32
    }

    fn apply_relative(&self, mode: RelativeMode, start: &i32, end: i32) -> i32 {
        match mode {
            RelativeMode::RelativeValue => start.saturating_add(end),
            RelativeMode::RelativeScale => start.saturating_mul(end),
            _ => end,
        }
    }
}

impl Tweenable for i32 {
    type Plugin = I32Plugin;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct I64Plugin {
    pub rounding: RoundingMode,
}

impl I64Plugin {
    pub fn with_rounding(rounding: RoundingMode) -> Self {
        Self { rounding }
    }
}

impl TweenPlugin<i64> for I64Plugin {
    fn evaluate(&self, start: &i64, end: &i64, progress: f32) -> i64 {
        let value = lerp_f64(*start as f64, *end as f64, progress);
        round_with(self.rounding, value) as i64
    }

    fn apply_relative(&self, mode: RelativeMode, start: &i64, end: i64) -> i64 {
        match mode {
            RelativeMode::RelativeValue => start.saturating_add(end),
            RelativeMode::RelativeScale => start.saturating_mul(end),
            _ => end,
        }
    }
}

impl Tweenable for i64 {
    type Plugin = I64Plugin;
}
