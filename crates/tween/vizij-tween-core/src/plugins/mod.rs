//! Built-in plugins for primitive and vector values.

mod primitive;
mod vector;

pub use primitive::{F32Plugin, F64Plugin, I32Plugin, I64Plugin};
pub use vector::{Vec2Plugin, Vec3Plugin, Vec4Plugin, VecPlugin};
