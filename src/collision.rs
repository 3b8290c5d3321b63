//! Collision detection and response.
//!
//! Every routine runs on a [`ContactContext`], which carries the collision
//! filter, the step observer, the tuning constants, and the indices of the
//! bodies and joints currently being tested so contacts can be reported.

use core::marker::PhantomData;

use crate::body::{BodyFlags, BodyMut, Joint};
use crate::config::Config;
use crate::environment::Environment;
use crate::math::{self, Unit, F};
use crate::observer::StepObserver;
use crate::vec::{ExactLength, Metric, Vec3};

/// A contact about to be resolved.
///
/// For environment contacts `body1 == body2` and `joint1 == joint2`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub body1: usize,
    pub joint1: usize,
    pub body2: usize,
    pub joint2: usize,
    /// World-space point of the hit.
    pub point: Vec3,
}

impl Contact {
    pub fn is_environment(&self) -> bool {
        self.body1 == self.body2 && self.joint1 == self.joint2
    }
}

/// Decides whether a contact gets resolved. Returning `false` lets the
/// joints pass through each other (or through the environment) untouched.
pub trait CollisionFilter {
    fn allow(&mut self, contact: &Contact) -> bool;
}

/// Resolves every contact.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllowAll;

impl CollisionFilter for AllowAll {
    #[inline]
    fn allow(&mut self, _contact: &Contact) -> bool {
        true
    }
}

/// Adapts a closure into a [`CollisionFilter`].
///
/// ```
/// use fixbody::collision::{CollisionFilter, Contact, FilterFn};
///
/// // environment only, bodies pass through each other
/// let mut filter = FilterFn(|c: &Contact| c.is_environment());
/// # let _ = filter.allow(&Contact { body1: 0, joint1: 0, body2: 0, joint2: 0, point: Default::default() });
/// ```
pub struct FilterFn<F>(pub F);

impl<F: FnMut(&Contact) -> bool> CollisionFilter for FilterFn<F> {
    #[inline]
    fn allow(&mut self, contact: &Contact) -> bool {
        (self.0)(contact)
    }
}

/// Outcome of resolving one joint against the environment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnvCollision {
    /// No contact, or the filter vetoed it.
    None,
    /// The joint was pushed out and its velocity reflected.
    Resolved,
    /// Neither push-out strategy worked; the joint was put back where it was
    /// and stopped.
    Unresolved,
}

/// New speeds along a line for two colliding masses.
///
/// `elasticity` is `F` for a perfectly elastic bounce and 0 for a perfectly
/// inelastic one. Momentum is kept up to rounding.
pub fn velocities_after_collision(v1: Unit, v2: Unit, m1: Unit, m2: Unit, elasticity: Unit) -> (Unit, Unit) {
    let m = math::non_zero(m1.saturating_add(m2)) as i64;
    let dv = math::non_zero(v2 - v1) as i64;
    let momentum = m1 as i64 * v1 as i64 + m2 as i64 * v2 as i64;

    let e = elasticity as i64;
    let f = F as i64;

    let v1 = ((e * m2 as i64 / f) * dv + momentum) / m;
    let v2 = ((e * m1 as i64 / f) * -dv + momentum) / m;

    (v1 as Unit, v2 as Unit)
}

/// Separating-axis test of two axis-aligned boxes given as `(min, max)`.
pub fn aabb_overlap(min1: Vec3, max1: Vec3, min2: Vec3, max2: Vec3) -> bool {
    let axis = |min1: Unit, max1: Unit, min2: Unit, max2: Unit| {
        let (min1, max1, min2, max2) = (min1 as i64, max1 as i64, min2 as i64, max2 as i64);
        (min1 + max1 - max2 - min2).abs() <= (max1 - min1) + (max2 - min2)
    };

    axis(min1.x, max1.x, min2.x, max2.x)
        && axis(min1.y, max1.y, min2.y, max2.y)
        && axis(min1.z, max1.z, min2.z, max2.z)
}

/// Per-step state shared by the collision routines.
pub struct ContactContext<'a, C: ?Sized, O: ?Sized, M = ExactLength> {
    filter: &'a mut C,
    observer: &'a mut O,
    config: &'a Config,
    pub body1: usize,
    pub joint1: usize,
    pub body2: usize,
    pub joint2: usize,
    metric: PhantomData<M>,
}

impl<'a, C, O> ContactContext<'a, C, O, ExactLength>
where
    C: CollisionFilter + ?Sized,
    O: StepObserver + ?Sized,
{
    pub fn new(filter: &'a mut C, observer: &'a mut O, config: &'a Config) -> Self {
        ContactContext {
            filter,
            observer,
            config,
            body1: 0,
            joint1: 0,
            body2: 0,
            joint2: 0,
            metric: PhantomData,
        }
    }
}

impl<'a, C, O, M> ContactContext<'a, C, O, M>
where
    C: CollisionFilter + ?Sized,
    O: StepObserver + ?Sized,
    M: Metric,
{
    /// Switches the length strategy used for contact normals and distances.
    pub fn with_metric<M2: Metric>(self) -> ContactContext<'a, C, O, M2> {
        ContactContext {
            filter: self.filter,
            observer: self.observer,
            config: self.config,
            body1: self.body1,
            joint1: self.joint1,
            body2: self.body2,
            joint2: self.joint2,
            metric: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn observer(&mut self) -> &mut O {
        self.observer
    }

    /// Sets the body pair being tested.
    pub fn set_bodies(&mut self, body1: usize, body2: usize) {
        self.body1 = body1;
        self.body2 = body2;
    }

    /// Separates two overlapping joints and exchanges momentum along the
    /// contact normal, with friction pulling their tangential velocities
    /// toward the mass-weighted average.
    ///
    /// The shift is split in inverse proportion to mass. If `env` is given,
    /// both joints are then resolved against it and a joint that cannot be
    /// freed goes back to where it was before the shift.
    ///
    /// Returns whether the joints were in contact and it was resolved.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_joints<E: Environment + ?Sized>(
        &mut self,
        j1: &mut Joint,
        j2: &mut Joint,
        mass1: Unit,
        mass2: Unit,
        elasticity: Unit,
        friction: Unit,
        env: Option<&E>,
    ) -> bool {
        let dir = j2.position - j1.position;
        let d = M::length(dir) - j1.size() - j2.size();

        if d >= 0 {
            return false;
        }

        let dir = M::normalize(dir);

        let contact = Contact {
            body1: self.body1,
            joint1: self.joint1,
            body2: self.body2,
            joint2: self.joint2,
            point: j1.position + dir.times(j1.size()),
        };

        if !self.filter.allow(&contact) {
            return false;
        }

        let backup1 = j1.position;
        let backup2 = j2.position;

        let d = -d + self.config.collision_resolution_margin;

        let ratio = math::mul_div(mass2, F, math::non_zero(mass1.saturating_add(mass2)));
        let shift1 = math::mul(ratio, d);

        j1.position = j1.position - dir.times(shift1);
        j2.position = j2.position + dir.times(d - shift1);

        // split both velocities into normal and tangential parts
        let v = j1.velocity();
        let normal1 = M::project(v, dir);
        let tangent1 = v - normal1;

        let v = j2.velocity();
        let normal2 = M::project(v, dir);
        let tangent2 = v - normal2;

        let friction_vec = tangent2 - tangent1;

        let (v1, v2) = velocities_after_collision(normal1.dot(dir), normal2.dot(dir), mass1, mass2, elasticity);

        j1.set_velocity(tangent1 + dir.times(v1) + friction_vec.times(ratio).times(friction));

        let ratio = F - ratio;
        j2.set_velocity(tangent2 + dir.times(v2) - friction_vec.times(ratio).times(friction));

        if let Some(env) = env {
            let (body1, joint1) = (self.body1, self.joint1);

            self.body2 = body1;
            self.joint2 = joint1;

            if self.resolve_joint_environment(j1, elasticity, friction, env) == EnvCollision::Unresolved {
                j1.position = backup1;
            }

            self.body1 = contact.body2;
            self.joint1 = contact.joint2;
            self.body2 = contact.body2;
            self.joint2 = contact.joint2;

            if self.resolve_joint_environment(j2, elasticity, friction, env) == EnvCollision::Unresolved {
                j2.position = backup2;
            }

            self.body1 = contact.body1;
            self.joint1 = contact.joint1;
        }

        true
    }

    /// Pushes a joint out of the environment.
    ///
    /// First along the surface normal, re-querying after each push since the
    /// normal changes near corners; if the joint center is on or inside the
    /// surface, by walking back along its velocity with a halving step. The
    /// normal part of the velocity is reflected with `elasticity` and the
    /// tangential part damped by `friction`.
    pub fn resolve_joint_environment<E: Environment + ?Sized>(
        &mut self,
        joint: &mut Joint,
        elasticity: Unit,
        friction: Unit,
        env: &E,
    ) -> EnvCollision {
        let size = joint.size();
        let surface = env.closest_point(joint.position, size);
        let mut to_joint = joint.position - surface;
        let mut len = M::length(to_joint);

        if len > size {
            return EnvCollision::None;
        }

        let contact = Contact {
            body1: self.body1,
            joint1: self.joint1,
            body2: self.body1,
            joint2: self.joint1,
            point: surface,
        };

        if !self.filter.allow(&contact) {
            return EnvCollision::None;
        }

        let backup = joint.position;
        let iterations = self.config.collision_resolution_iterations;
        let margin = self.config.collision_resolution_margin;

        let mut shift = Vec3::ZERO;
        let mut success = false;

        if len > 0 {
            for _ in 0..iterations {
                shift = M::normalize(to_joint).times(size - len + margin);
                joint.position = joint.position + shift;

                to_joint = joint.position - env.closest_point(joint.position, size);
                len = M::length(to_joint);

                if len >= size {
                    success = true;
                    break;
                }
            }
        }

        if !success {
            shift = -joint.velocity();

            for _ in 0..iterations {
                joint.position = joint.position + shift;

                len = M::distance(joint.position, env.closest_point(joint.position, size));

                if len >= size {
                    success = true;
                    break;
                }

                shift = shift.div_plain(2);
            }
        }

        if !success {
            log::warn!(
                "joint {} of body {} could not be pushed out of the environment",
                self.joint1,
                self.body1
            );

            joint.pin(backup);
            self.observer.on_unresolved(self.body1, self.joint1, backup);

            return EnvCollision::Unresolved;
        }

        let v = joint.velocity();
        let normal = M::project(v, shift);
        let tangent = (v - normal).times(friction);
        let normal = normal.times(F + elasticity);

        joint.set_velocity(v - (normal + tangent));

        EnvCollision::Resolved
    }

    /// Resolves every joint of the body against the environment, after a
    /// bounding sphere rejection test. Non-rotating bodies drag their other
    /// joints along with each resolved one.
    ///
    /// Uses `body1` as the body index. Returns whether anything collided.
    pub fn resolve_body_environment<E: Environment + ?Sized>(&mut self, body: &mut BodyMut<'_, M>, env: &E) -> bool {
        let (center, radius) = body.view().fast_bsphere();

        if M::distance(center, env.closest_point(center, radius)) > radius {
            return false;
        }

        let elasticity = body.props.elasticity as Unit;
        let friction = body.props.friction as Unit;
        let nonrotating = body.props.flags.contains(BodyFlags::NONROTATING);

        let mut collided = false;

        for i in 0..body.joints.len() {
            let previous = body.joints[i].position;
            self.joint1 = i;

            let r = self.resolve_joint_environment(&mut body.joints[i], elasticity, friction, env);

            if r != EnvCollision::None {
                collided = true;

                if nonrotating {
                    body.nonrotating_joint_collided(i, previous, r == EnvCollision::Resolved);
                }
            }
        }

        collided
    }

    /// Tests every joint of `b1` against every joint of `b2` with the
    /// averaged elasticity and friction of both bodies.
    ///
    /// Uses `body1` / `body2` as the body indices. Returns whether any pair
    /// touched.
    pub fn resolve_bodies<E: Environment + ?Sized>(
        &mut self,
        b1: &mut BodyMut<'_, M>,
        b2: &mut BodyMut<'_, M>,
        env: Option<&E>,
    ) -> bool {
        let elasticity = (b1.props.elasticity as Unit + b2.props.elasticity as Unit) / 2;
        let friction = (b1.props.friction as Unit + b2.props.friction as Unit) / 2;
        let (mass1, mass2) = (b1.props.joint_mass as Unit, b2.props.joint_mass as Unit);
        let nonrotating1 = b1.props.flags.contains(BodyFlags::NONROTATING);
        let nonrotating2 = b2.props.flags.contains(BodyFlags::NONROTATING);

        let mut collided = false;

        for i in 0..b1.joints.len() {
            for j in 0..b2.joints.len() {
                let previous1 = b1.joints[i].position;
                let previous2 = b2.joints[j].position;

                self.joint1 = i;
                self.joint2 = j;

                if self.resolve_joints(&mut b1.joints[i], &mut b2.joints[j], mass1, mass2, elasticity, friction, env)
                {
                    collided = true;

                    if nonrotating1 {
                        b1.nonrotating_joint_collided(i, previous1, true);
                    }

                    if nonrotating2 {
                        b2.nonrotating_joint_collided(j, previous2, true);
                    }
                }
            }
        }

        collided
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{measure_connections, Body, Connection};
    use crate::observer::NoOpStepObserver;
    use crate::primitives::ground;

    type NoEnv = fn(Vec3, Unit) -> Vec3;

    #[derive(Default)]
    struct Unresolved(usize);

    impl StepObserver for Unresolved {
        fn on_unresolved(&mut self, _body: usize, _joint: usize, _position: Vec3) {
            self.0 += 1;
        }
    }

    fn floor(p: Vec3, _: Unit) -> Vec3 {
        ground(p, 0)
    }

    fn joint(x: Unit, y: Unit, v: [i16; 3]) -> Joint {
        let mut j = Joint::new(Vec3::new(x, y, 0), F / 2);
        j.velocity = v;
        j
    }

    #[test]
    fn elastic_equal_masses_exchange_speeds() {
        assert_eq!(velocities_after_collision(10, -10, 100, 100, F), (-10, 10));
        assert_eq!(velocities_after_collision(30, 0, 7, 7, F), (0, 30));
    }

    #[test]
    fn inelastic_collision_meets_in_the_middle() {
        assert_eq!(velocities_after_collision(20, -10, 50, 50, 0), (5, 5));
    }

    #[test]
    fn momentum_is_kept() {
        let (m1, m2) = (300, 100);
        let (v1, v2) = (40, -25);
        let (a, b) = velocities_after_collision(v1, v2, m1, m2, F / 2);

        let before = m1 * v1 + m2 * v2;
        let after = m1 * a + m2 * b;
        assert!(math::abs(before - after) <= m1 + m2, "{} vs {}", before, after);
    }

    #[test]
    fn aabb_overlap_cases() {
        let a = (Vec3::splat(0), Vec3::splat(10));

        assert!(aabb_overlap(a.0, a.1, Vec3::splat(10), Vec3::splat(20)));
        assert!(aabb_overlap(a.0, a.1, Vec3::splat(2), Vec3::splat(4)));
        assert!(!aabb_overlap(a.0, a.1, Vec3::new(11, 0, 0), Vec3::new(20, 10, 10)));
        assert!(!aabb_overlap(a.0, a.1, Vec3::new(0, -20, 0), Vec3::new(10, -1, 10)));
    }

    #[test]
    fn head_on_joints_swap_velocities() {
        let config = Config::default();
        let mut filter = AllowAll;
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut a = joint(0, 0, [10, 0, 0]);
        let mut b = joint(500, 0, [-10, 0, 0]);

        assert!(ctx.resolve_joints(&mut a, &mut b, 100, 100, F, 0, None::<&NoEnv>));

        assert_eq!(a.velocity, [-10, 0, 0]);
        assert_eq!(b.velocity, [10, 0, 0]);
        assert!(a.position.distance(b.position) >= a.size() + b.size());
    }

    #[test]
    fn heavier_joint_moves_less() {
        let config = Config::default();
        let mut filter = AllowAll;
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut light = joint(0, 0, [0; 3]);
        let mut heavy = joint(400, 0, [0; 3]);

        assert!(ctx.resolve_joints(&mut light, &mut heavy, 100, 300, F / 2, F / 2, None::<&NoEnv>));

        assert!(math::abs(light.position.x) > math::abs(heavy.position.x - 400));
    }

    #[test]
    fn separated_joints_are_left_alone() {
        let config = Config::default();
        let mut filter = AllowAll;
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut a = joint(0, 0, [5, 0, 0]);
        let mut b = joint(F + 1, 0, [0; 3]);
        let (before_a, before_b) = (a, b);

        assert!(!ctx.resolve_joints(&mut a, &mut b, 1, 1, F, F, None::<&NoEnv>));
        assert_eq!((a, b), (before_a, before_b));
    }

    #[test]
    fn filter_veto_changes_nothing() {
        let config = Config::default();
        let mut seen = None;
        let mut filter = FilterFn(|c: &Contact| {
            seen = Some(*c);
            false
        });
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);
        ctx.set_bodies(3, 7);
        ctx.joint1 = 1;
        ctx.joint2 = 2;

        let mut a = joint(0, 0, [10, 0, 0]);
        let mut b = joint(300, 0, [-10, 0, 0]);
        let (before_a, before_b) = (a, b);

        assert!(!ctx.resolve_joints(&mut a, &mut b, 1, 1, F, F, None::<&NoEnv>));
        assert_eq!((a, b), (before_a, before_b));

        let seen = seen.unwrap();
        assert_eq!((seen.body1, seen.joint1, seen.body2, seen.joint2), (3, 1, 7, 2));
        assert!(!seen.is_environment());
    }

    #[test]
    fn joint_bounces_off_ground() {
        let config = Config::default();
        let mut filter = AllowAll;
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut j = joint(0, 200, [0, -40, 0]);

        assert_eq!(ctx.resolve_joint_environment(&mut j, F, 0, &floor), EnvCollision::Resolved);
        assert!(j.position.y >= j.size());
        assert!(j.velocity[1] > 0, "{:?}", j.velocity);
    }

    #[test]
    fn environment_contacts_name_one_joint() {
        let config = Config::default();
        let mut contacts = 0;
        let mut filter = FilterFn(|c: &Contact| {
            assert!(c.is_environment());
            assert_eq!(c.point.y, 0);
            contacts += 1;
            true
        });
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);
        ctx.set_bodies(2, 2);

        let mut j = joint(0, 100, [0; 3]);
        ctx.resolve_joint_environment(&mut j, 0, 0, &floor);
        assert_eq!(contacts, 1);
    }

    #[test]
    fn free_joint_has_no_environment_contact() {
        let config = Config::default();
        let mut filter = AllowAll;
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut j = joint(0, F, [0, -5, 0]);
        let before = j;

        assert_eq!(ctx.resolve_joint_environment(&mut j, F, F, &floor), EnvCollision::None);
        assert_eq!(j, before);
    }

    #[test]
    fn unresolvable_contact_rolls_back_and_stops() {
        let config = Config::default();
        let mut observer = Unresolved::default();
        let mut filter = AllowAll;
        let mut ctx = ContactContext::new(&mut filter, &mut observer, &config);

        // solid everywhere
        let solid = |p: Vec3, _: Unit| p;
        let mut j = joint(10, 20, [3, 4, 5]);

        assert_eq!(ctx.resolve_joint_environment(&mut j, F, F, &solid), EnvCollision::Unresolved);
        assert_eq!(j.position, Vec3::new(10, 20, 0));
        assert_eq!(j.velocity, [0; 3]);
        assert_eq!(observer.0, 1);
    }

    #[test]
    fn nonrotating_body_moves_rigidly_out_of_ground() {
        let config = Config::default();
        let mut filter = AllowAll;
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut joints = [
            Joint::new(Vec3::new(0, 100, 0), F / 2),
            Joint::new(Vec3::new(F, 2 * F, 0), F / 2),
        ];
        let mut connections = [Connection::new(0, 1)];
        measure_connections::<ExactLength>(&joints, &mut connections);
        let offset = joints[1].position - joints[0].position;

        let mut props = Body::new(2, 1, F);
        props.flags = BodyFlags::NONROTATING;
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        assert!(ctx.resolve_body_environment(&mut body, &floor));
        assert_eq!(body.joints[1].position - body.joints[0].position, offset);
        assert!(body.joints[0].position.y >= F / 2);
    }

    #[test]
    fn far_body_skips_joint_tests() {
        let config = Config::default();
        let mut filter = FilterFn(|_: &Contact| -> bool { panic!("no contact expected") });
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut joints = [Joint::new(Vec3::new(0, 10 * F, 0), F / 2)];
        let mut props = Body::new(1, 0, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &[]);

        assert!(!ctx.resolve_body_environment(&mut body, &floor));
    }

    #[test]
    fn bodies_collide_through_joint_pairs() {
        let config = Config::default();
        let mut filter = AllowAll;
        let mut obs = NoOpStepObserver;
        let mut ctx = ContactContext::new(&mut filter, &mut obs, &config);

        let mut ja = [Joint::new(Vec3::ZERO, F / 2)];
        let mut jb = [Joint::new(Vec3::new(F - 20, 0, 0), F / 2)];
        let mut pa = Body::new(1, 0, F);
        let mut pb = Body::new(1, 0, F);
        let mut a = BodyMut::new(&mut pa, &mut ja, &[]);
        let mut b = BodyMut::new(&mut pb, &mut jb, &[]);

        ctx.set_bodies(0, 1);
        assert!(ctx.resolve_bodies(&mut a, &mut b, None::<&NoEnv>));
        assert!(a.joints[0].position.distance(b.joints[0].position) >= F);
    }
}
