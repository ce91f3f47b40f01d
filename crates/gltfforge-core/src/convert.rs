//! Coordinate-space conversion
//!
//! The scene representation is left-handed; glTF is right-handed. The
//! conversion negates X, which also requires flipping triangle winding,
//! negating the tangent W handedness, and mirroring quaternion rotations.
//! UVs flip V because the conventions disagree on the texture origin.
//!
//! Every function here is its own inverse, so the exporter and importer call
//! the same helpers. Conversion happens only at the buffer boundary, never
//! ad hoc in the middle of a traversal.

use crate::math::{Quat, Vec2, Vec3, Vec4};

pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;

pub fn convert_position(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

pub fn convert_direction(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

pub fn convert_tangent(t: Vec4) -> Vec4 {
    Vec4::new(-t.x, t.y, t.z, -t.w)
}

pub fn convert_rotation(q: Quat) -> Quat {
    Quat::new(q.x, -q.y, -q.z, q.w)
}

pub fn convert_uv(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// Reverse the winding of every triangle in place
pub fn flip_triangle_winding(indices: &mut [u32]) {
    for tri in indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}
