//! Easing curves. `Ease::evaluate` reshapes linear progress in `[0, 1]`.

pub mod functions;

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub use functions::RoundingMode;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Ease {
    #[default]
    Linear,
    InSine,
    OutSine,
    InOutSine,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InBack,
    OutBack,
    InOutBack,
    InElastic,
    OutElastic,
    InOutElastic,
    InBounce,
    OutBounce,
    InOutBounce,
}

const BACK_C1: f32 = 1.70158;
const BACK_C2: f32 = BACK_C1 * 1.525;
const BACK_C3: f32 = BACK_C1 + 1.0;
const ELASTIC_C4: f32 = 2.0 * PI / 3.0;
const ELASTIC_C5: f32 = 2.0 * PI / 4.5;

#[inline]
fn ease_in_pow(x: f32, n: i32) -> f32 {
    x.powi(n)
}

#[inline]
fn ease_out_pow(x: f32, n: i32) -> f32 {
    1.0 - (1.0 - x).powi(n)
}

#[inline]
fn ease_in_out_pow(x: f32, n: i32) -> f32 {
    if x < 0.5 {
        2f32.powi(n - 1) * x.powi(n)
    } else {
        1.0 - (-2.0 * x + 2.0).powi(n) / 2.0
    }
}

fn out_bounce(mut x: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if x < 1.0 / D1 {
        N1 * x * x
    } else if x < 2.0 / D1 {
        x -= 1.5 / D1;
        N1 * x * x + 0.75
    } else if x < 2.5 / D1 {
        x -= 2.25 / D1;
        N1 * x * x + 0.9375
    } else {
        x -= 2.625 / D1;
        N1 * x * x + 0.984375
    }
}

impl Ease {
    pub fn evaluate(self, x: f32) -> f32 {
        match self {
            Ease::Linear => x,
            Ease::InSine => 1.0 - (x * PI / 2.0).cos(),
            Ease::OutSine => (x * PI / 2.0).sin(),
            Ease::InOutSine => -((PI * x).cos() - 1.0) / 2.0,
            Ease::InQuad => ease_in_pow(x, 2),
            Ease::OutQuad => ease_out_pow(x, 2),
            Ease::InOutQuad => ease_in_out_pow(x, 2),
            Ease::InCubic => ease_in_pow(x, 3),
            Ease::OutCubic => ease_out_pow(x, 3),
            Ease::InOutCubic => ease_in_out_pow(x, 3),
            Ease::InQuart => ease_in_pow(x, 4),
            Ease::OutQuart => ease_out_pow(x, 4),
            Ease::InOutQuart => ease_in_out_pow(x, 4),
            Ease::InQuint => ease_in_pow(x, 5),
            Ease::OutQuint => ease_out_pow(x, 5),
            Ease::InOutQuint => ease_in_out_pow(x, 5),
            Ease::InExpo => {
                if x == 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * x - 10.0)
                }
            }
            Ease::OutExpo => {
                if x == 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * x)
                }
            }
            Ease::InOutExpo => {
                if x == 0.0 || x == 1.0 {
                    x
                } else if x < 0.5 {
                    2f32.powf(20.0 * x - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * x + 10.0)) / 2.0
                }
            }
            Ease::InCirc => 1.0 - (1.0 - x * x).max(0.0).sqrt(),
            Ease::OutCirc => (1.0 - (x - 1.0) * (x - 1.0)).max(0.0).sqrt(),
            Ease::InOutCirc => {
                if x < 0.5 {
                    (1.0 - (1.0 - (2.0 * x).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * x + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Ease::InBack => BACK_C3 * x * x * x - BACK_C1 * x * x,
            Ease::OutBack => {
                1.0 + BACK_C3 * (x - 1.0).powi(3) + BACK_C1 * (x - 1.0).powi(2)
            }
            Ease::InOutBack => {
                if x < 0.5 {
                    ((2.0 * x).powi(2) * ((BACK_C2 + 1.0) * 2.0 * x - BACK_C2)) / 2.0
                } else {
                    ((2.0 * x - 2.0).powi(2) * ((BACK_C2 + 1.0) * (x * 2.0 - 2.0) + BACK_C2)
                        + 2.0)
                        / 2.0
                }
            }
            Ease::InElastic => {
                if x == 0.0 || x == 1.0 {
                    x
                } else {
                    -(2f32.powf(10.0 * x - 10.0)) * ((x * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            Ease::OutElastic => {
                if x == 0.0 || x == 1.0 {
                    x
                } else {
                    2f32.powf(-10.0 * x) * ((x * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            Ease::InOutElastic => {
                if x == 0.0 || x == 1.0 {
                    x
                } else if x < 0.5 {
                    -(2f32.powf(20.0 * x - 10.0) * ((20.0 * x - 11.125) * ELASTIC_C5).sin())
                        / 2.0
                } else {
                    (2f32.powf(-20.0 * x + 10.0) * ((20.0 * x - 11.125) * ELASTIC_C5).sin())
                        / 2.0
                        + 1.0
                }
            }
            Ease::InBounce => 1.0 - out_bounce(1.0 - x),
            Ease::OutBounce => out_bounce(x),
            Ease::InOutBounce => {
                if x < 0.5 {
                    (1.0 - out_bounce(1.0 - 2.0 * x)) / 2.0
                } else {
                    (1.0 + out_bounce(2.0 * x - 1.0)) / 2.0
                }
            }
        }
    }

    pub const ALL: [Ease; 31] = [
        Ease::Linear,
        Ease::InSine,
        Ease::OutSine,
        Ease::InOutSine,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
        Ease::InQuart,
        Ease::OutQuart,
        Ease::InOutQuart,
        Ease::InQuint,
        Ease::OutQuint,
        Ease::InOutQuint,
        Ease::InExpo,
        Ease::OutExpo,
        Ease::InOutExpo,
        Ease::InCirc,
        Ease::OutCirc,
        Ease::InOutCirc,
        Ease::InBack,
        Ease::OutBack,
        Ease::InOutBack,
        Ease::InElastic,
        Ease::OutElastic,
        Ease::InOutElastic,
        Ease::InBounce,
        Ease::OutBounce,
        Ease::InOutBounce,
    ];
}
