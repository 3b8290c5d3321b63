//! The static environment: closest-point functions and helpers to compose
//! and validate them.

use crate::math::{self, Unit, UnitReduced, INFINITY};
use crate::vec::Vec3;

/// A static solid described by its closest-point function.
///
/// `closest_point(p, max_distance)` must return `p` itself when `p` is inside
/// the solid, and otherwise the closest point of the solid to `p`. When that
/// point is farther than `max_distance`, any point farther than
/// `max_distance` may be returned instead, which lets implementations skip
/// distant parts.
///
/// Closures `Fn(Vec3, Unit) -> Vec3` implement this trait.
pub trait Environment {
    fn closest_point(&self, point: Vec3, max_distance: Unit) -> Vec3;
}

impl<T> Environment for T
where
    T: Fn(Vec3, Unit) -> Vec3 + ?Sized,
{
    #[inline]
    fn closest_point(&self, point: Vec3, max_distance: Unit) -> Vec3 {
        self(point, max_distance)
    }
}

/// Union of several shapes, keeping the candidate closest to the query point.
///
/// ```
/// use fixbody::environment::{bcube_test, Union};
/// use fixbody::primitives::{ground, sphere};
/// use fixbody::vec::Vec3;
///
/// let env = |p: Vec3, max_d: i32| {
///     let ball = Vec3::new(0, 1024, 0);
///
///     Union::new(p, ground(p, 0))
///         .add_if(bcube_test(p, max_d, ball, 512), || sphere(p, ball, 512))
///         .finish()
/// };
///
/// assert_eq!(env(Vec3::new(0, 1024, 0), 100), Vec3::new(0, 1024, 0));
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Union {
    point: Vec3,
    best: Vec3,
    best_distance: Unit,
}

impl Union {
    /// Starts the union with the first shape's result for `point`.
    pub fn new(point: Vec3, first: Vec3) -> Self {
        Union {
            point,
            best: first,
            best_distance: first.distance(point),
        }
    }

    /// True once some shape contained the query point.
    pub fn is_inside(&self) -> bool {
        self.best == self.point
    }

    /// Evaluates another shape, unless the point is already known to be
    /// inside.
    pub fn add<S: FnOnce() -> Vec3>(mut self, shape: S) -> Self {
        if self.is_inside() {
            return self;
        }

        let candidate = shape();
        let d = candidate.distance(self.point);

        if d < self.best_distance {
            self.best = candidate;
            self.best_distance = d;
        }

        self
    }

    /// [`add`](Self::add) guarded by a bounding volume test.
    pub fn add_if<S: FnOnce() -> Vec3>(self, condition: bool, shape: S) -> Self {
        if condition {
            self.add(shape)
        } else {
            self
        }
    }

    pub fn finish(self) -> Vec3 {
        self.best
    }
}

/// Overlap test of two axis-aligned bounding cubes given by centers and
/// half-sizes.
pub fn bcube_test(body_center: Vec3, body_radius: Unit, env_center: Vec3, env_radius: Unit) -> bool {
    let r = body_radius as i64 + env_radius as i64;
    let near = |a: Unit, b: Unit| (a as i64 - b as i64).abs() <= r;

    near(env_center.x, body_center.x) && near(env_center.y, body_center.y) && near(env_center.z, body_center.z)
}

/// Overlap test of two bounding spheres.
pub fn bsphere_test(body_center: Vec3, body_radius: Unit, env_center: Vec3, env_radius: Unit) -> bool {
    body_center.distance(env_center) as i64 <= body_radius as i64 + env_radius as i64
}

/// Checks that `env` behaves like a closest-point function inside the box
/// spanned by two corners.
///
/// For a grid of `grid_resolution`³ points outside the solid it checks that
/// walking toward the reported closest point keeps reporting it (within a
/// taxicab `allowed_error`), and that no point within the free ball around
/// the sample reports a closer surface. Returns the first failing sample.
/// Slow; meant for tests of custom shapes.
pub fn test_closest_point_function<E: Environment + ?Sized>(
    env: &E,
    corner_from: Vec3,
    corner_to: Vec3,
    grid_resolution: u8,
    allowed_error: UnitReduced,
) -> Result<(), Vec3> {
    let span = corner_to - corner_from;
    let res = math::non_zero(grid_resolution as Unit) as i64;
    let allowed = allowed_error as Unit;

    let along = |from: Unit, span: Unit, i: i64| from + ((i * span as i64) / res) as Unit;
    let half = |a: Unit, b: Unit| ((a as i64 + b as i64) / 2) as Unit;

    for z in 0..res {
        for y in 0..res {
            for x in 0..res {
                let p = Vec3::new(
                    along(corner_from.x, span.x, x),
                    along(corner_from.y, span.y, y),
                    along(corner_from.z, span.z, z),
                );

                let closest = env.closest_point(p, INFINITY);

                if closest == p {
                    continue;
                }

                // approaching the closest point must keep it the closest
                let mut p3 = p;

                for _ in 0..3 {
                    p3 = Vec3::new(half(p3.x, closest.x), half(p3.y, closest.y), half(p3.z, closest.z));

                    let c = env.closest_point(p3, INFINITY);
                    let err = math::abs(c.x - closest.x) + math::abs(c.y - closest.y) + math::abs(c.z - closest.z);

                    if err > allowed {
                        return Err(p);
                    }
                }

                // nothing within the free ball may report a closer surface
                let d = p.distance(closest);

                for corner in 0..8 {
                    let offset = |bit: i32| if corner & bit != 0 { d / 2 } else { -(d / 2) };
                    let p3 = p + Vec3::new(offset(1), offset(2), offset(4));

                    if p.distance(env.closest_point(p3, INFINITY)) + allowed < d {
                        return Err(p);
                    }
                }
            }
        }
    }

    Ok(())
}
