use serde::{Deserialize, Serialize};

use crate::interp::functions::{add_vec, lerp_vec, mul_vec};
use crate::plugin::{RelativeMode, TweenPlugin, Tweenable};

/// Component-wise plugin for `[f32; N]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VecPlugin<const N: usize>;

pub type Vec2Plugin = VecPlugin<2>;
pub type Vec3Plugin = VecPlugin<3>;
pub type Vec4Plugin = VecPlugin<4>;

impl<const N: usize> TweenPlugin<[f32; N]> for VecPlugin<N> {
    #[inline]
    fn evaluate(&self, start: &[f32; N], end: &[f32; N], progress: f32) -> [f32; N] {
        lerp_vec(start, end, progress)
    }

    fn apply_relative(&self, mode: RelativeMode, start: &[f32; N], end: [f32; N]) -> [f32; N] {
        match mode {
            RelativeMode::RelativeValue => add_vec(start, &end),
            RelativeMode::RelativeScale => mul_vec(start, &end),
            _ => end,
        }
    }
}

impl Tweenable for [f32; 2] {
    type Plugin = Vec2Plugin;
}

impl Tweenable for [f32; 3] {
    type Plugin = Vec3Plugin;
}

impl Tweenable for [f32; 4] {
    type Plugin = Vec4Plugin;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_scale_is_componentwise() {
        let p = Vec3Plugin::default();
        assert_eq!(
            p.apply_relative(RelativeMode::RelativeScale, &[1.0, 2.0, 3.0], [2.0, 2.0, 0.5]),
            [2.0, 4.0, 1.5]
        );
    }
}
