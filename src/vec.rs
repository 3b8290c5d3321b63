//! 3D fixed-point vectors and length strategies.

use crate::math::{self, Unit, F, INFINITY};
use core::ops::{Add, Neg, Sub};

/// 3D vector of [`Unit`]s.
///
/// Addition and subtraction wrap like the 32-bit hardware they model, so the
/// [`Vec3::INFINITY`] sentinel can be passed through arithmetic without
/// trapping. Scaling operations use 64-bit intermediates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec3 {
    pub x: Unit,
    pub y: Unit,
    pub z: Unit,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0, y: 0, z: 0 };

    /// All components set to [`INFINITY`].
    pub const INFINITY: Vec3 = Vec3 { x: INFINITY, y: INFINITY, z: INFINITY };

    pub const fn new(x: Unit, y: Unit, z: Unit) -> Self {
        Vec3 { x, y, z }
    }

    pub const fn splat(value: Unit) -> Self {
        Vec3 { x: value, y: value, z: value }
    }

    /// Dot product, rescaled by `F`.
    pub fn dot(self, other: Self) -> Unit {
        (self.dot_plain(other) / F as i64) as Unit
    }

    /// Dot product without rescaling, in 64 bits.
    pub fn dot_plain(self, other: Self) -> i64 {
        (self.x as i64 * other.x as i64)
            .wrapping_add(self.y as i64 * other.y as i64)
            .wrapping_add(self.z as i64 * other.z as i64)
    }

    /// Cross product, rescaled by `F`.
    pub fn cross(self, other: Self) -> Self {
        let (ax, ay, az) = (self.x as i64, self.y as i64, self.z as i64);
        let (bx, by, bz) = (other.x as i64, other.y as i64, other.z as i64);
        let f = F as i64;

        Vec3 {
            x: ((ay * bz - az * by) / f) as Unit,
            y: ((az * bx - ax * bz) / f) as Unit,
            z: ((ax * by - ay * bx) / f) as Unit,
        }
    }

    /// Multiplies by a fixed-point scalar (`units / F`).
    pub fn times(self, units: Unit) -> Self {
        Vec3 {
            x: math::mul(self.x, units),
            y: math::mul(self.y, units),
            z: math::mul(self.z, units),
        }
    }

    /// Multiplies by a plain integer.
    pub fn times_plain(self, q: Unit) -> Self {
        Vec3 {
            x: self.x.wrapping_mul(q),
            y: self.y.wrapping_mul(q),
            z: self.z.wrapping_mul(q),
        }
    }

    /// Divides every component by a plain integer (truncating toward zero).
    pub fn div_plain(self, q: Unit) -> Self {
        Vec3 { x: self.x / q, y: self.y / q, z: self.z / q }
    }

    /// Scales by `num / den`. `den` must not be zero.
    pub fn scale_ratio(self, num: Unit, den: Unit) -> Self {
        Vec3 {
            x: math::mul_div(self.x, num, den),
            y: math::mul_div(self.y, num, den),
            z: math::mul_div(self.z, num, den),
        }
    }

    /// Component-wise midpoint.
    pub fn midpoint(self, other: Self) -> Self {
        (self + other).div_plain(2)
    }

    /// Exact Euclidean length (floor), computed in 64 bits.
    pub fn length(self) -> Unit {
        let sq = |c: Unit| {
            let a = c.unsigned_abs() as u64;
            a * a
        };

        math::sqrt_u64(sq(self.x) + sq(self.y) + sq(self.z)).min(INFINITY as u64) as Unit
    }

    /// Polyhedral length approximation, never more than the exact length.
    ///
    /// Sorts the absolute components and weighs them `893, 446, 223` / 1024.
    /// The result stays within `[0.872, 1.0]` of [`Vec3::length`].
    pub fn length_approx(self) -> Unit {
        let mut a = [
            (self.x as i64).abs(),
            (self.y as i64).abs(),
            (self.z as i64).abs(),
        ];

        if a[0] < a[1] {
            a.swap(0, 1);
        }
        if a[1] < a[2] {
            a.swap(1, 2);
        }
        if a[0] < a[1] {
            a.swap(0, 1);
        }

        ((893 * a[0] + 446 * a[1] + 223 * a[2]) / 1024) as Unit
    }

    pub fn distance(self, other: Self) -> Unit {
        (self - other).length()
    }

    pub fn distance_approx(self, other: Self) -> Unit {
        (self - other).length_approx()
    }

    /// Normalizes to length `F` using the exact length.
    pub fn normalized(self) -> Self {
        ExactLength::normalize(self)
    }

    /// Projects onto a vector already normalized to length `F`.
    pub fn project_normalized(self, base_normalized: Self) -> Self {
        let p = self.dot(base_normalized) as i64;
        let f = F as i64;

        Vec3 {
            x: ((p * base_normalized.x as i64) / f) as Unit,
            y: ((p * base_normalized.y as i64) / f) as Unit,
            z: ((p * base_normalized.z as i64) / f) as Unit,
        }
    }

    /// Projects onto an arbitrary (non-normalized) vector.
    pub fn project(self, base: Self) -> Self {
        ExactLength::project(self, base)
    }

    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0 && self.z == 0
    }

    /// Keeps `self` within the axis-aligned box `center ± max_vect`.
    ///
    /// Useful for smoothing the rendered position of a jittering body.
    pub fn keep_within_box(self, center: Self, max_vect: Self) -> Self {
        Vec3 {
            x: math::keep_in_range(self.x, center.x - max_vect.x, center.x + max_vect.x),
            y: math::keep_in_range(self.y, center.y - max_vect.y, center.y + max_vect.y),
            z: math::keep_in_range(self.z, center.z - max_vect.z, center.z + max_vect.z),
        }
    }

    /// Keeps `self` at a distance from `center` within `[min, max]`.
    pub fn keep_within_distance_band(self, center: Self, min_distance: Unit, max_distance: Unit) -> Self {
        let to_point = self - center;
        let l = to_point.length();

        let l = if l <= max_distance {
            if l >= min_distance {
                return self;
            }
            min_distance
        } else {
            max_distance
        };

        center + to_point.normalized().times(l)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Vec3 {
            x: self.x.wrapping_add(rhs.x),
            y: self.y.wrapping_add(rhs.y),
            z: self.z.wrapping_add(rhs.z),
        }
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Vec3 {
            x: self.x.wrapping_sub(rhs.x),
            y: self.y.wrapping_sub(rhs.y),
            z: self.z.wrapping_sub(rhs.z),
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Vec3 { x: self.x.wrapping_neg(), y: self.y.wrapping_neg(), z: self.z.wrapping_neg() }
    }
}

impl From<[Unit; 3]> for Vec3 {
    fn from(v: [Unit; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

// --------------------------------------------------------------------------
// Length strategies
// --------------------------------------------------------------------------

/// How the simulation measures lengths and distances.
///
/// Chosen once, as a type parameter of the world, so the hot paths are
/// monomorphized with no per-call branch.
pub trait Metric {
    /// Length of `v`.
    fn length(v: Vec3) -> Unit;

    fn distance(a: Vec3, b: Vec3) -> Unit {
        Self::length(a - b)
    }

    /// Rescales `v` to length `F`. A zero vector becomes `(F, 0, 0)`.
    fn normalize(v: Vec3) -> Vec3 {
        let mut v = v;
        let mut l = Self::length(v);

        if l == 0 {
            return Vec3::new(F, 0, 0);
        }

        // very short vectors normalize badly, so lengthen them first
        if l < 16 {
            v = v.times_plain(8);
            l = Self::length(v);
        }

        v.scale_ratio(F, math::non_zero(l))
    }

    /// Projects `v` onto the direction of `base`.
    fn project(v: Vec3, base: Vec3) -> Vec3 {
        v.project_normalized(Self::normalize(base))
    }
}

/// Exact integer Euclidean length.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExactLength;

/// Fast polyhedral approximation, see [`Vec3::length_approx`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApproxLength;

impl Metric for ExactLength {
    #[inline]
    fn length(v: Vec3) -> Unit {
        v.length()
    }
}

impl Metric for ApproxLength {
    #[inline]
    fn length(v: Vec3) -> Unit {
        v.length_approx()
    }
}
