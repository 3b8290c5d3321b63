//! Ray casts against the environment and against bodies.

use crate::body::BodyRef;
use crate::environment::Environment;
use crate::math::{self, Unit};
use crate::vec::{Metric, Vec3};

/// Upper bound on bisection steps when localizing a surface.
const BISECTION_STEPS: u32 = 128;

/// Small probe distance for inside/outside tests during bisection.
const PROBE_DISTANCE: Unit = 16;

/// A joint struck by a ray.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BodyHit {
    pub point: Vec3,
    pub body: usize,
    pub joint: usize,
}

/// Finds where a ray enters (or, starting inside, leaves) the environment.
///
/// Outside the solid the ray is marched by the reported surface distance,
/// clamped to `march_max_step`. Inside, it advances by `inside_step_size`; a
/// step of 0 gives up right away. Once two samples on opposite sides are
/// found the surface is localized by bisection and the sample on the free
/// side is returned. `None` if nothing is found within `max_steps`.
pub fn cast_environment_ray<M: Metric, E: Environment + ?Sized>(
    env: &E,
    ray_pos: Vec3,
    ray_dir: Vec3,
    inside_step_size: Unit,
    march_max_step: Unit,
    max_steps: u32,
) -> Option<Vec3> {
    let dir = M::normalize(ray_dir);
    let along = |t: Unit| ray_pos + dir.times(t);

    let mut p = ray_pos;
    let mut p2 = env.closest_point(ray_pos, march_max_step);
    let mut travelled: Unit = 0;

    // (free sample, solid sample) once the surface is bracketed
    let mut bracket = None;

    if p2 != p {
        for _ in 0..max_steps {
            let d = math::min(M::distance(p, p2), march_max_step);

            travelled = travelled.saturating_add(d);
            p2 = along(travelled);

            if d == 0 || p2 == p {
                // touching the surface from outside
                return Some(p2);
            }

            let probe = env.closest_point(p2, march_max_step);

            if probe == p2 {
                bracket = Some((p, p2));
                break;
            }

            p = p2;
            p2 = probe;
        }
    } else if inside_step_size != 0 {
        for _ in 0..max_steps {
            travelled = travelled.saturating_add(inside_step_size);
            p2 = along(travelled);

            if env.closest_point(p2, PROBE_DISTANCE) != p2 {
                bracket = Some((p2, p));
                break;
            }

            p = p2;
        }
    }

    let (mut free, mut solid) = bracket?;

    for _ in 0..BISECTION_STEPS {
        let middle = free.midpoint(solid);

        if middle == free || middle == solid {
            break;
        }

        if env.closest_point(middle, PROBE_DISTANCE) == middle {
            solid = middle;
        } else {
            free = middle;
        }
    }

    Some(free)
}

/// Finds the closest joint hit by a ray among `bodies`, skipping the body at
/// index `exclude`.
///
/// Bodies are culled with their fast bounding sphere; joints are then
/// intersected exactly as spheres.
pub fn cast_body_ray<'b, M, I>(bodies: I, ray_pos: Vec3, ray_dir: Vec3, exclude: Option<usize>) -> Option<BodyHit>
where
    M: Metric + 'b,
    I: IntoIterator<Item = BodyRef<'b, M>>,
{
    let dir = M::normalize(ray_dir);
    let mut best: Option<(Unit, BodyHit)> = None;

    for (i, body) in bodies.into_iter().enumerate() {
        if exclude == Some(i) {
            continue;
        }

        let (center, radius) = body.fast_bsphere();
        let c = center - ray_pos;
        let p = c.project_normalized(dir);

        if p.dot(dir) < 0 || M::distance(p, c) > radius {
            continue;
        }

        for (j, joint) in body.joints.iter().enumerate() {
            let c = joint.position - ray_pos;
            let p = c.project_normalized(dir);

            if p.dot(dir) < 0 {
                continue;
            }

            let d = M::distance(p, c) as i64;
            let js = joint.size() as i64;

            if d > js {
                continue;
            }

            // half chord
            let offset = dir.times(math::sqrt_u64((js * js - d * d) as u64) as Unit);
            let p = p + ray_pos;

            let (near, far) = (p - offset, p + offset);
            let (d_near, d_far) = (M::distance(ray_pos, near), M::distance(ray_pos, far));
            let (point, d) = if d_far < d_near { (far, d_far) } else { (near, d_near) };

            if best.map_or(true, |(best_d, _)| d < best_d) {
                best = Some((d, BodyHit { point, body: i, joint: j }));
            }
        }
    }

    best.map(|(_, hit)| hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, Joint};
    use crate::math::F;
    use crate::primitives::{ground, sphere};
    use crate::vec::ExactLength;

    fn floor(p: Vec3, _: Unit) -> Vec3 {
        ground(p, 0)
    }

    #[test]
    fn ray_down_hits_ground() {
        let hit = cast_environment_ray::<ExactLength, _>(&floor, Vec3::new(7, 5 * F, -3), Vec3::new(0, -1, 0), 0, 4 * F, 64)
            .unwrap();

        assert_eq!((hit.x, hit.z), (7, -3));
        assert!((0..=1).contains(&hit.y), "{:?}", hit);
    }

    #[test]
    fn ray_away_from_ground_misses() {
        let hit = cast_environment_ray::<ExactLength, _>(&floor, Vec3::new(0, F, 0), Vec3::new(0, 1, 0), 0, 4 * F, 64);
        assert_eq!(hit, None);
    }

    #[test]
    fn ray_from_inside_finds_the_exit() {
        let hit = cast_environment_ray::<ExactLength, _>(&floor, Vec3::new(0, -3 * F, 0), Vec3::new(0, 1, 0), F / 4, F, 64)
            .unwrap();

        assert!((1..=2).contains(&hit.y), "{:?}", hit);
    }

    #[test]
    fn inside_ray_without_step_gives_up() {
        let hit = cast_environment_ray::<ExactLength, _>(&floor, Vec3::new(0, -F, 0), Vec3::new(0, 1, 0), 0, F, 64);
        assert_eq!(hit, None);
    }

    #[test]
    fn slanted_ray_hits_sphere() {
        let env = |p: Vec3, _: Unit| sphere(p, Vec3::ZERO, F);
        let hit = cast_environment_ray::<ExactLength, _>(&env, Vec3::new(-4 * F, 0, 4 * F), Vec3::new(F, 0, -F), 0, F, 128)
            .unwrap();

        assert!(math::abs(hit.length() - F) <= 2, "{:?}", hit);
    }

    #[test]
    fn body_ray_returns_closest_joint() {
        let near = [Joint::new(Vec3::new(0, 0, 4 * F), F / 2)];
        let far = [Joint::new(Vec3::new(0, 0, 8 * F), F / 2), Joint::new(Vec3::new(F, 0, 8 * F), F / 2)];
        let p = Body::new(1, 0, F);
        let q = Body::new(2, 0, F);

        let bodies = || [BodyRef::new(&q, &far, &[]), BodyRef::new(&p, &near, &[])];

        let hit = cast_body_ray(bodies(), Vec3::ZERO, Vec3::new(0, 0, 1), None).unwrap();
        assert_eq!((hit.body, hit.joint), (1, 0));
        assert!(math::abs(hit.point.z - (4 * F - F / 2)) <= 1, "{:?}", hit);

        let hit = cast_body_ray(bodies(), Vec3::ZERO, Vec3::new(0, 0, 1), Some(1)).unwrap();
        assert_eq!((hit.body, hit.joint), (0, 0));
    }

    #[test]
    fn body_ray_ignores_bodies_behind() {
        let joints = [Joint::new(Vec3::new(0, 0, -4 * F), F / 2)];
        let p = Body::new(1, 0, F);

        assert_eq!(cast_body_ray([BodyRef::new(&p, &joints, &[])], Vec3::ZERO, Vec3::new(0, 0, 1), None), None);
    }
}
