//! Interpolation helpers:
//! - lerp for scalars and fixed-size vectors
//! - integer rounding after a float lerp

use serde::{Deserialize, Serialize};

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_f64(a: f64, b: f64, t: f32) -> f64 {
    a + (b - a) * t as f64
}

#[inline]
pub fn lerp_vec<const N: usize>(a: &[f32; N], b: &[f32; N], t: f32) -> [f32; N] {
    std::array::from_fn(|i| lerp_f32(a[i], b[i], t))
}

#[inline]
pub fn add_vec<const N: usize>(a: &[f32; N], b: &[f32; N]) -> [f32; N] {
    std::array::from_fn(|i| a[i] + b[i])
}

#[inline]
pub fn mul_vec<const N: usize>(a: &[f32; N], b: &[f32; N]) -> [f32; N] {
    std::array::from_fn(|i| a[i] * b[i])
}

/// How integer plugins turn an interpolated float back into an integer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RoundingMode {
    /// Ties go to the even neighbour.
    #[default]
    ToEven,
    /// Ties go away from zero.
    AwayFromZero,
    ToZero,
    ToPositiveInfinity,
    ToNegativeInfinity,
}

#[inline]
pub fn round_with(mode: RoundingMode, value: f64) -> f64 {
    match mode {
        RoundingMode::ToEven => value.round_ties_even(),
        RoundingMode::AwayFromZero => value.round(),
        RoundingMode::ToZero => value.trunc(),
        RoundingMode::ToPositiveInfinity => value.ceil(),
        RoundingMode::ToNegativeInfinity => value.floor(),
    }
}
