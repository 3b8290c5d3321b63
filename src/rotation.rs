//! Euler rotation helpers.
//!
//! Rotations are extrinsic Euler angles in ZXY order (by Z, then X, then Y),
//! each angle in units of `F` per full turn, in a left-handed frame (x right,
//! y up, z forward). Some helpers instead take an "about axis" rotation: the
//! vector's direction is the axis and its length is the angle.

use crate::math::{self, Unit, F};
use crate::vec::Vec3;

/// Rotates the 2D point `(x, y)` counter-clockwise by `angle`.
pub fn vec2_rotate(x: &mut Unit, y: &mut Unit, angle: Unit) {
    let tmp = *x as i64;
    let s = math::sin(angle) as i64;
    let c = math::cos(angle) as i64;
    let f = F as i64;

    *x = ((c * *x as i64 - s * *y as i64) / f) as Unit;
    *y = ((s * tmp + c * *y as i64) / f) as Unit;
}

/// Rotates a point by an Euler rotation.
pub fn point_rotate(point: Vec3, rotation: Vec3) -> Vec3 {
    let mut p = point;

    vec2_rotate(&mut p.y, &mut p.x, rotation.z);
    vec2_rotate(&mut p.z, &mut p.y, rotation.x);
    vec2_rotate(&mut p.x, &mut p.z, rotation.y);

    p
}

/// Recovers an Euler rotation from a forward and a right vector.
///
/// The vectors should be roughly perpendicular; they need not be normalized.
pub fn rotation_from_vecs(forward: Vec3, right: Vec3) -> Vec3 {
    let mut forward = forward;
    let mut right = right;
    let mut result = Vec3::ZERO;

    result.y = math::vec2_angle(forward.z, -forward.x);

    // align with the x = 0 plane
    vec2_rotate(&mut forward.z, &mut forward.x, result.y);
    vec2_rotate(&mut right.z, &mut right.x, result.y);

    result.x = math::vec2_angle(forward.z, forward.y);

    vec2_rotate(&mut right.z, &mut right.y, -result.x);

    result.z = math::vec2_angle(right.x, -right.y);

    result
}

/// Inverse of an Euler rotation.
///
/// `(-X, -Y, -Z)` applied in reverse axis order undoes `(X, Y, Z)`, so the
/// forward/right basis is rotated that way and converted back.
pub fn rotation_inverse(rotation: Vec3) -> Vec3 {
    let mut f = Vec3::new(0, 0, F);
    let mut r = Vec3::new(F, 0, 0);
    let rotation = -rotation;

    vec2_rotate(&mut f.x, &mut f.z, rotation.y);
    vec2_rotate(&mut f.z, &mut f.y, rotation.x);
    vec2_rotate(&mut f.y, &mut f.x, rotation.z);

    vec2_rotate(&mut r.x, &mut r.z, rotation.y);
    vec2_rotate(&mut r.z, &mut r.y, rotation.x);
    vec2_rotate(&mut r.y, &mut r.x, rotation.z);

    rotation_from_vecs(f, r)
}

/// Rotates `p` about a normalized axis by `angle`.
pub fn rotate_by_axis(p: Vec3, axis_normalized: Vec3, angle: Unit) -> Vec3 {
    let projected = p.project_normalized(axis_normalized);
    let a = p - projected;

    if a.is_zero() {
        return p;
    }

    let b = a.cross(axis_normalized);

    projected + a.times(math::cos(angle)) + b.times(math::sin(angle))
}

/// Applies an about-axis rotation on top of an Euler rotation.
pub fn rotation_rotate_by_axis(rotation: Vec3, rotation_by_axis: Vec3) -> Vec3 {
    let f = point_rotate(Vec3::new(0, 0, F), rotation);
    let r = point_rotate(Vec3::new(F, 0, 0), rotation);

    let angle = rotation_by_axis.length();
    let axis = rotation_by_axis.normalized();

    rotation_from_vecs(rotate_by_axis(f, axis, angle), rotate_by_axis(r, axis, angle))
}

/// Fakes the rolling of a sphere that moved from `position1` to
/// `position2`, returning an about-axis rotation.
///
/// A single-joint body never rotates, but a renderer can spin its mesh by
/// this amount to make it look like it rolls.
pub fn fake_sphere_rotation(position1: Vec3, position2: Vec3, radius: Unit) -> Vec3 {
    let mut m = Vec3::new(position1.z - position2.z, 0, position2.x - position1.x);

    let l = Vec3::new(m.x, 0, m.z).length();

    if l == 0 {
        return Vec3::ZERO;
    }

    let d = math::mul_div(position1.distance(position2), F, math::non_zero(radius * 4));

    m.x = math::mul_div(m.x, d, l);
    m.z = math::mul_div(m.z, d, l);

    m
}
