//! Joints, connections and bodies.
//!
//! Bodies do not own their joints. A [`Body`] records index ranges into the
//! joint and connection arenas of a [`World`](crate::world::World), and the
//! per-body operations run on [`BodyRef`] / [`BodyMut`] views that pair those
//! properties with the slices they index.

use core::marker::PhantomData;
use core::ops::{BitOr, BitOrAssign, Range};

use crate::config::Config;
use crate::environment::Environment;
use crate::math::{self, Unit, UnitReduced, F, INFINITY, JOINT_SIZE_MULTIPLIER};
use crate::rotation;
use crate::vec::{ExactLength, Metric, Vec3};

/// A sphere with a position and a velocity; the simulated point mass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Joint {
    pub position: Vec3,
    /// Velocity per tick. Narrower than positions to save space.
    pub velocity: [UnitReduced; 3],
    /// Radius divided by [`JOINT_SIZE_MULTIPLIER`].
    pub size_divided: u8,
}

impl Joint {
    /// Creates a resting joint. Radii above `255 * 32` don't fit the stored
    /// code and are truncated with a warning.
    pub fn new(position: Vec3, size: Unit) -> Self {
        let size = size / JOINT_SIZE_MULTIPLIER;

        if size > u8::MAX as Unit {
            log::warn!("joint size {} too big, truncating", size * JOINT_SIZE_MULTIPLIER);
        }

        Joint {
            position,
            velocity: [0; 3],
            size_divided: size as u8,
        }
    }

    /// Radius.
    #[inline]
    pub fn size(&self) -> Unit {
        self.size_divided as Unit * JOINT_SIZE_MULTIPLIER
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        Vec3::new(
            self.velocity[0] as Unit,
            self.velocity[1] as Unit,
            self.velocity[2] as Unit,
        )
    }

    /// Sets the velocity, saturating each component to the stored width.
    #[inline]
    pub fn set_velocity(&mut self, v: Vec3) {
        self.velocity = [math::reduce(v.x), math::reduce(v.y), math::reduce(v.z)];
    }

    #[inline]
    pub fn add_velocity(&mut self, dv: Vec3) {
        self.set_velocity(self.velocity() + dv);
    }

    /// Places the joint at `position` and stops it.
    pub fn pin(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = [0; 3];
    }
}

/// Elastic link between two joints of the same body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Connection {
    pub joint1: u8,
    pub joint2: u8,
    /// Rest length, computed once when the body is bound.
    pub length: u16,
}

impl Connection {
    /// A connection whose rest length is still to be measured.
    pub const fn new(joint1: u8, joint2: u8) -> Self {
        Connection { joint1, joint2, length: 0 }
    }
}

/// Body state flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BodyFlags(pub u8);

impl BodyFlags {
    pub const NONE: BodyFlags = BodyFlags(0);
    /// Sleeping, woken by collisions or impulses.
    pub const DEACTIVATED: BodyFlags = BodyFlags(1);
    /// Moves linearly only; joint 0's velocity is the body's velocity.
    pub const NONROTATING: BodyFlags = BodyFlags(2);
    /// Takes no part in the simulation.
    pub const DISABLED: BodyFlags = BodyFlags(4);
    /// No effort is made to keep the body's shape.
    pub const SOFT: BodyFlags = BodyFlags(8);
    /// Connections don't cancel out opposing velocities.
    pub const SIMPLE_CONN: BodyFlags = BodyFlags(16);
    /// Never deactivates on low energy.
    pub const ALWAYS_ACTIVE: BodyFlags = BodyFlags(32);

    #[inline]
    pub const fn contains(self, other: BodyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: BodyFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: BodyFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: BodyFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for BodyFlags {
    type Output = BodyFlags;
    fn bitor(self, rhs: BodyFlags) -> BodyFlags {
        BodyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for BodyFlags {
    fn bitor_assign(&mut self, rhs: BodyFlags) {
        self.0 |= rhs.0;
    }
}

/// Per-body properties plus the arena ranges holding its joints and
/// connections.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Body {
    pub(crate) first_joint: u16,
    pub(crate) joint_count: u8,
    pub(crate) first_connection: u16,
    pub(crate) connection_count: u8,
    /// Mass of every single joint.
    pub joint_mass: UnitReduced,
    pub friction: UnitReduced,
    pub elasticity: UnitReduced,
    pub flags: BodyFlags,
    pub deactivate_count: u8,
}

impl Body {
    /// Properties of a fresh body: total `mass` split over `joint_count`
    /// joints (never below 1), half friction and half elasticity.
    pub fn new(joint_count: u8, connection_count: u8, mass: Unit) -> Self {
        Body {
            first_joint: 0,
            joint_count,
            first_connection: 0,
            connection_count,
            joint_mass: math::reduce(math::non_zero(mass / math::non_zero(joint_count as Unit))),
            friction: (F / 2) as UnitReduced,
            elasticity: (F / 2) as UnitReduced,
            flags: BodyFlags::NONE,
            deactivate_count: 0,
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count as usize
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count as usize
    }

    /// Joint range inside the world's joint arena.
    pub fn joint_range(&self) -> Range<usize> {
        let start = self.first_joint as usize;
        start..start + self.joint_count as usize
    }

    /// Connection range inside the world's connection arena.
    pub fn connection_range(&self) -> Range<usize> {
        let start = self.first_connection as usize;
        start..start + self.connection_count as usize
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.flags.contains(BodyFlags::DEACTIVATED)
    }

    /// Puts the body to sleep without touching its velocities.
    #[inline]
    pub fn deactivate(&mut self) {
        self.flags.insert(BodyFlags::DEACTIVATED);
    }
}

/// Measures rest lengths of `connections` from the current joint positions.
///
/// Lengths are at least 1 and clamped to `u16::MAX` with a warning.
pub fn measure_connections<M: Metric>(joints: &[Joint], connections: &mut [Connection]) {
    for c in connections.iter_mut() {
        let d = M::distance(
            joints[c.joint1 as usize].position,
            joints[c.joint2 as usize].position,
        );

        if d > u16::MAX as Unit {
            log::warn!("connection {}-{} too long ({}), clamping", c.joint1, c.joint2, d);
        }

        c.length = math::max(d, 1).min(u16::MAX as Unit) as u16;
    }
}

/// Read-only view of a body.
pub struct BodyRef<'a, M = ExactLength> {
    pub props: &'a Body,
    pub joints: &'a [Joint],
    pub connections: &'a [Connection],
    metric: PhantomData<M>,
}

/// Mutable view of a body. Connections stay immutable once measured.
pub struct BodyMut<'a, M = ExactLength> {
    pub props: &'a mut Body,
    pub joints: &'a mut [Joint],
    pub connections: &'a [Connection],
    metric: PhantomData<M>,
}

impl<'a> BodyRef<'a, ExactLength> {
    pub fn new(props: &'a Body, joints: &'a [Joint], connections: &'a [Connection]) -> Self {
        BodyRef { props, joints, connections, metric: PhantomData }
    }
}

impl<'a> BodyMut<'a, ExactLength> {
    pub fn new(props: &'a mut Body, joints: &'a mut [Joint], connections: &'a [Connection]) -> Self {
        BodyMut { props, joints, connections, metric: PhantomData }
    }
}

impl<'a, M: Metric> BodyRef<'a, M> {
    pub(crate) fn with_metric_of(props: &'a Body, joints: &'a [Joint], connections: &'a [Connection]) -> Self {
        BodyRef { props, joints, connections, metric: PhantomData }
    }

    /// Switches the length strategy used by the view.
    pub fn with_metric<M2: Metric>(self) -> BodyRef<'a, M2> {
        BodyRef::with_metric_of(self.props, self.joints, self.connections)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.props.is_active()
    }

    fn joint_divisor(&self) -> Unit {
        math::non_zero(self.joints.len() as Unit)
    }

    /// Average joint position. All joints weigh the same regardless of size.
    pub fn center_of_mass(&self) -> Vec3 {
        let sum = self.joints.iter().fold(Vec3::ZERO, |acc, j| acc + j.position);
        sum.div_plain(self.joint_divisor())
    }

    /// Average joint velocity.
    pub fn linear_velocity(&self) -> Vec3 {
        let sum = self.joints.iter().fold(Vec3::ZERO, |acc, j| acc + j.velocity());
        sum.div_plain(self.joint_divisor())
    }

    /// Orientation from three joints: `joint2 - joint1` is forward,
    /// `joint3 - joint1` is right.
    pub fn rotation(&self, joint1: usize, joint2: usize, joint3: usize) -> Vec3 {
        let origin = self.joints[joint1].position;

        rotation::rotation_from_vecs(
            self.joints[joint2].position - origin,
            self.joints[joint3].position - origin,
        )
    }

    /// Axis-aligned bounding box `(min, max)` including joint radii.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        let Some(first) = self.joints.first() else {
            return (Vec3::ZERO, Vec3::ZERO);
        };

        let js = first.size();
        let mut v_min = first.position - Vec3::splat(js);
        let mut v_max = first.position + Vec3::splat(js);

        for joint in &self.joints[1..] {
            let js = joint.size();
            let lo = joint.position - Vec3::splat(js);
            let hi = joint.position + Vec3::splat(js);

            v_min = Vec3::new(math::min(v_min.x, lo.x), math::min(v_min.y, lo.y), math::min(v_min.z, lo.z));
            v_max = Vec3::new(math::max(v_max.x, hi.x), math::max(v_max.y, hi.y), math::max(v_max.z, hi.z));
        }

        (v_min, v_max)
    }

    /// Bounding sphere `(center, radius)` around the bounding box.
    ///
    /// Not minimal, but cheap; used for culling.
    pub fn fast_bsphere(&self) -> (Vec3, Unit) {
        let (v_min, v_max) = self.aabb();
        let center = v_min.midpoint(v_max);

        (center, M::distance(center, v_max))
    }

    /// Bounding sphere centered at the center of mass, tighter than
    /// [`fast_bsphere`](Self::fast_bsphere) but more expensive.
    pub fn bsphere(&self) -> (Vec3, Unit) {
        let center = self.center_of_mass();
        let mut radius_squared: u64 = 0;

        for j in self.joints {
            let js = j.size() as i64;
            let d = |a: Unit, b: Unit| ((a as i64 - b as i64).abs() + js) as u64;

            let dx = d(center.x, j.position.x);
            let dy = d(center.y, j.position.y);
            let dz = d(center.z, j.position.z);

            radius_squared = radius_squared.max(dx * dx + dy * dy + dz * dz);
        }

        (center, math::sqrt_u64(radius_squared).min(INFINITY as u64) as Unit)
    }

    /// Sum of joint speeds.
    ///
    /// With `approximate`, the summed absolute velocity components are
    /// measured once with the polyhedral length instead.
    pub fn net_speed(&self, approximate: bool) -> Unit {
        if approximate {
            let net = self.joints.iter().fold(Vec3::ZERO, |acc, j| {
                let v = j.velocity();
                acc + Vec3::new(math::abs(v.x), math::abs(v.y), math::abs(v.z))
            });

            net.length_approx()
        } else {
            self.joints
                .iter()
                .fold(0, |acc: Unit, j| acc.saturating_add(M::length(j.velocity())))
        }
    }

    pub fn average_speed(&self, approximate: bool) -> Unit {
        self.net_speed(approximate) / self.joint_divisor()
    }

    /// True if any joint touches or penetrates the environment.
    pub fn collides_with_environment<E: Environment + ?Sized>(&self, env: &E) -> bool {
        self.joints.iter().any(|j| {
            let size = j.size();
            M::distance(j.position, env.closest_point(j.position, size)) <= size
        })
    }
}

impl<'a, M: Metric> BodyMut<'a, M> {
    pub(crate) fn with_metric_of(
        props: &'a mut Body,
        joints: &'a mut [Joint],
        connections: &'a [Connection],
    ) -> Self {
        BodyMut { props, joints, connections, metric: PhantomData }
    }

    /// Switches the length strategy used by the view.
    pub fn with_metric<M2: Metric>(self) -> BodyMut<'a, M2> {
        BodyMut::with_metric_of(self.props, self.joints, self.connections)
    }

    /// Reborrows as a read-only view.
    pub fn view(&self) -> BodyRef<'_, M> {
        BodyRef::with_metric_of(self.props, self.joints, self.connections)
    }

    pub fn center_of_mass(&self) -> Vec3 {
        self.view().center_of_mass()
    }

    pub fn aabb(&self) -> (Vec3, Vec3) {
        self.view().aabb()
    }

    pub fn average_speed(&self, approximate: bool) -> Unit {
        self.view().average_speed(approximate)
    }

    pub fn move_by(&mut self, offset: Vec3) {
        for j in self.joints.iter_mut() {
            j.position = j.position + offset;
        }
    }

    /// Moves the body so that its center of mass lands at `position`.
    pub fn move_to(&mut self, position: Vec3) {
        let offset = position - self.center_of_mass();
        self.move_by(offset);
    }

    /// Zeroes all joint velocities.
    pub fn stop(&mut self) {
        for j in self.joints.iter_mut() {
            j.velocity = [0; 3];
        }
    }

    /// Wakes a sleeping body; it starts from rest with a zero counter.
    pub fn activate(&mut self) {
        if self.props.flags.contains(BodyFlags::DEACTIVATED) {
            self.stop();
            self.props.flags.remove(BodyFlags::DEACTIVATED);
            self.props.deactivate_count = 0;
        }
    }

    pub fn deactivate(&mut self) {
        self.props.deactivate();
    }

    /// Adds `velocity` to every joint, waking the body first.
    pub fn accelerate(&mut self, velocity: Vec3) {
        self.activate();

        for j in self.joints.iter_mut() {
            j.add_velocity(velocity);
        }
    }

    /// Pulls every joint down by `downwards_accel`; sleeping and disabled
    /// bodies are left alone.
    pub fn apply_gravity(&mut self, downwards_accel: Unit) {
        if self.props.flags.intersects(BodyFlags::DEACTIVATED | BodyFlags::DISABLED) {
            return;
        }

        for j in self.joints.iter_mut() {
            j.add_velocity(Vec3::new(0, -downwards_accel, 0));
        }
    }

    /// Adds angular velocity about `center`. The direction of `rotation` is
    /// the axis, its length the speed.
    pub fn spin_with_center(&mut self, rotation: Vec3, center: Vec3) {
        for j in self.joints.iter_mut() {
            let to_point = j.position - center;
            let on_axis = center + M::project(to_point, rotation);
            let dv = (j.position - on_axis).cross(rotation);

            j.add_velocity(dv);
        }
    }

    pub fn spin(&mut self, rotation: Vec3) {
        let center = self.center_of_mass();
        self.spin_with_center(rotation, center);
    }

    /// Instantly rotates joint positions about the center of mass by an
    /// about-axis rotation.
    pub fn rotate_by_axis(&mut self, rotation: Vec3) {
        let center = self.center_of_mass();
        let angle = M::length(rotation);
        let axis = M::normalize(rotation);

        for j in self.joints.iter_mut() {
            let to_point = j.position - center;
            j.position = center + rotation::rotate_by_axis(to_point, axis, angle);
        }
    }

    /// Scales all velocities by `factor / F`.
    pub fn multiply_net_speed(&mut self, factor: Unit) {
        for j in self.joints.iter_mut() {
            j.set_velocity(j.velocity().times(factor));
        }
    }

    /// Rescales velocities until the average speed falls inside
    /// `[speed_min, speed_max]`, giving up after 16 tries.
    pub fn limit_average_speed(&mut self, speed_min: Unit, speed_max: Unit, approximate: bool) {
        for _ in 0..16 {
            let speed = self.average_speed(approximate);

            if speed >= speed_min && speed <= speed_max {
                return;
            }

            let fraction = math::mul_div((speed_max + speed_min) / 2, F, math::non_zero(speed));
            self.multiply_net_speed(fraction);
        }
    }

    /// Accelerates connected joints toward their rest distance. Returns the
    /// summed absolute tension of all connections.
    pub fn apply_connection_tension(&mut self, config: &Config) -> Unit {
        let mut body_tension: Unit = 0;

        for c in self.connections {
            let (i1, i2) = (c.joint1 as usize, c.joint2 as usize);
            let mut dir = self.joints[i2].position - self.joints[i1].position;

            let tension = math::connection_tension(M::length(dir), c.length as Unit);

            body_tension = body_tension.saturating_add(math::abs(tension));

            if math::abs(tension) > config.tension_acceleration_threshold {
                dir = M::normalize(dir);

                // resists thin obstacles poking between joints
                if math::abs(tension) > config.tension_greater_acceleration_threshold {
                    dir = dir.times_plain(2);
                }

                dir = dir.div_plain(math::non_zero(config.tension_acceleration_divider));

                if tension < 0 {
                    dir = -dir;
                }

                self.joints[i1].add_velocity(dir);
                self.joints[i2].add_velocity(-dir);
            }
        }

        body_tension
    }

    /// Cancels opposing velocity components along each connection.
    ///
    /// `strong` fully averages the two projected velocities, but only on
    /// connections with tension inside `±tension_threshold`. Weak
    /// cancellation applies a quarter of the averaging everywhere.
    pub fn cancel_out_velocities(&mut self, strong: bool, tension_threshold: Unit) {
        for c in self.connections {
            let (i1, i2) = (c.joint1 as usize, c.joint2 as usize);
            let dir = self.joints[i2].position - self.joints[i1].position;
            let len = math::non_zero(M::length(dir));

            if strong && math::abs(math::connection_tension(len, c.length as Unit)) > tension_threshold {
                continue;
            }

            let dir = dir.scale_ratio(F, len);

            let v1 = self.joints[i1].velocity();
            let v2 = self.joints[i2].velocity();
            let p1 = v1.project_normalized(dir);
            let p2 = v2.project_normalized(dir);
            let avg = (p1 + p2).div_plain(2);

            if strong {
                self.joints[i1].set_velocity(v1 - p1 + avg);
                self.joints[i2].set_velocity(v2 - p2 + avg);
            } else {
                self.joints[i1].set_velocity(v1 - p1 + (p1.times_plain(3) + avg).div_plain(4));
                self.joints[i2].set_velocity(v2 - p2 + (p2.times_plain(3) + avg).div_plain(4));
            }
        }
    }

    /// One relaxation pass moving each connection's joints symmetrically to
    /// its rest length. A move that would put a joint inside the environment
    /// is reverted.
    pub fn reshape<E: Environment + ?Sized>(&mut self, env: Option<&E>) {
        let blocked = |p: Vec3, size: Unit| match env {
            Some(env) => M::length(p - env.closest_point(p, size)) < size,
            None => false,
        };

        for c in self.connections {
            let (i1, i2) = (c.joint1 as usize, c.joint2 as usize);
            let p1 = self.joints[i1].position;
            let p2 = self.joints[i2].position;

            let middle = p1.midpoint(p2);
            let dir = M::normalize(p2 - p1).scale_ratio(c.length as Unit, F);

            let candidate = middle - dir.div_plain(2);

            if !blocked(candidate, self.joints[i1].size()) {
                self.joints[i1].position = candidate;
            }

            let candidate = self.joints[i1].position + dir;

            if !blocked(candidate, self.joints[i2].size()) {
                self.joints[i2].position = candidate;
            }
        }
    }

    /// Carries the displacement of joint `index` since `previous` over to
    /// every other joint; on success their velocities follow it too.
    pub(crate) fn nonrotating_joint_collided(&mut self, index: usize, previous: Vec3, success: bool) {
        let offset = self.joints[index].position - previous;
        let velocity = self.joints[index].velocity;

        for (i, j) in self.joints.iter_mut().enumerate() {
            if i != index {
                j.position = j.position + offset;

                if success {
                    j.velocity = velocity;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stick() -> ([Joint; 2], [Connection; 1]) {
        let mut joints = [
            Joint::new(Vec3::new(-F, 0, 0), F / 4),
            Joint::new(Vec3::new(F, 0, 0), F / 4),
        ];
        let mut connections = [Connection::new(0, 1)];
        measure_connections::<ExactLength>(&joints, &mut connections);
        joints[0].velocity = [0; 3];
        (joints, connections)
    }

    #[test]
    fn joint_size_is_stored_divided() {
        let j = Joint::new(Vec3::ZERO, 100);
        assert_eq!(j.size_divided, 3);
        assert_eq!(j.size(), 96);
    }

    #[test]
    fn oversized_joint_truncates() {
        let j = Joint::new(Vec3::ZERO, 300 * JOINT_SIZE_MULTIPLIER);
        assert_eq!(j.size_divided, (300u32 & 0xff) as u8);
    }

    #[test]
    fn velocity_saturates() {
        let mut j = Joint::new(Vec3::ZERO, F);
        j.set_velocity(Vec3::new(100_000, -100_000, 5));
        assert_eq!(j.velocity, [i16::MAX, i16::MIN, 5]);
    }

    #[test]
    fn body_mass_is_split_with_floor() {
        assert_eq!(Body::new(4, 0, 1000).joint_mass, 250);
        assert_eq!(Body::new(8, 0, 3).joint_mass, 1);
        assert_eq!(Body::new(2, 1, F).friction, (F / 2) as i16);
    }

    #[test]
    fn rest_length_never_zero() {
        let joints = [Joint::new(Vec3::ZERO, F), Joint::new(Vec3::ZERO, F)];
        let mut connections = [Connection::new(0, 1)];
        measure_connections::<ExactLength>(&joints, &mut connections);
        assert_eq!(connections[0].length, 1);
    }

    #[test]
    fn rest_length_clamps() {
        let joints = [Joint::new(Vec3::ZERO, F), Joint::new(Vec3::new(200_000, 0, 0), F)];
        let mut connections = [Connection::new(0, 1)];
        measure_connections::<ExactLength>(&joints, &mut connections);
        assert_eq!(connections[0].length, u16::MAX);
    }

    #[test]
    fn flags_combine() {
        let mut flags = BodyFlags::SOFT | BodyFlags::NONROTATING;
        assert!(flags.contains(BodyFlags::SOFT));
        assert!(!flags.contains(BodyFlags::DISABLED));
        flags.remove(BodyFlags::SOFT);
        assert_eq!(flags, BodyFlags::NONROTATING);
    }

    #[test]
    fn center_and_move_to() {
        let (mut joints, connections) = stick();
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        assert_eq!(body.center_of_mass(), Vec3::ZERO);
        body.move_to(Vec3::new(10, 20, 30));
        assert_eq!(body.center_of_mass(), Vec3::new(10, 20, 30));
        assert_eq!(body.joints[0].position, Vec3::new(10 - F, 20, 30));
    }

    #[test]
    fn aabb_includes_radius() {
        let (joints, connections) = stick();
        let props = Body::new(2, 1, F);
        let body = BodyRef::new(&props, &joints, &connections);
        let (lo, hi) = body.aabb();

        assert_eq!(lo, Vec3::new(-F - 128, -128, -128));
        assert_eq!(hi, Vec3::new(F + 128, 128, 128));
    }

    #[test]
    fn bspheres_contain_every_joint() {
        let (joints, connections) = stick();
        let props = Body::new(2, 1, F);
        let body = BodyRef::new(&props, &joints, &connections);

        for (center, radius) in [body.fast_bsphere(), body.bsphere()] {
            for j in &joints {
                assert!(center.distance(j.position) + j.size() <= radius + 1);
            }
        }
    }

    #[test]
    fn accelerate_wakes_and_sleeping_ignores_gravity() {
        let (mut joints, connections) = stick();
        let mut props = Body::new(2, 1, F);
        props.deactivate();

        let mut body = BodyMut::new(&mut props, &mut joints, &connections);
        body.apply_gravity(5);
        assert_eq!(body.joints[0].velocity, [0; 3]);

        body.accelerate(Vec3::new(1, 2, 3));
        assert!(body.props.is_active());
        assert_eq!(body.joints[1].velocity, [1, 2, 3]);

        body.apply_gravity(5);
        assert_eq!(body.joints[1].velocity, [1, -3, 3]);
    }

    #[test]
    fn reshape_at_rest_is_idempotent() {
        let (mut joints, connections) = stick();
        let before = joints;
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        body.reshape(None::<&fn(Vec3, Unit) -> Vec3>);

        assert_eq!(joints, before);
    }

    #[test]
    fn reshape_restores_stretched_connection() {
        let (mut joints, connections) = stick();
        joints[1].position.x = 2 * F;
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        body.reshape(None::<&fn(Vec3, Unit) -> Vec3>);

        let d = joints[0].position.distance(joints[1].position);
        assert!(math::abs(d - 2 * F) <= 2, "{}", d);
    }

    #[test]
    fn tension_pulls_stretched_joints_together() {
        let (mut joints, connections) = stick();
        joints[1].position.x = 3 * F;
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        let tension = body.apply_connection_tension(&Config::default());

        assert_eq!(tension, F);
        assert!(body.joints[0].velocity[0] > 0);
        assert_eq!(body.joints[0].velocity[0], -body.joints[1].velocity[0]);
    }

    #[test]
    fn strong_cancel_averages_along_connection() {
        let (mut joints, connections) = stick();
        joints[0].velocity = [10, 7, 0];
        joints[1].velocity = [-10, 0, 0];
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        body.cancel_out_velocities(true, 5);

        assert_eq!(body.joints[0].velocity, [0, 7, 0]);
        assert_eq!(body.joints[1].velocity, [0, 0, 0]);
    }

    #[test]
    fn weak_cancel_only_nudges_toward_average() {
        let (mut joints, connections) = stick();
        joints[0].velocity = [20, 7, 0];
        joints[1].velocity = [-20, 0, 0];
        let mut props = Body::new(2, 1, F);
        props.flags.insert(BodyFlags::SOFT);
        let strong = !props.flags.contains(BodyFlags::SOFT);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        body.cancel_out_velocities(strong, 5);

        // a quarter of the way to the common speed of 0
        assert_eq!(body.joints[0].velocity, [15, 7, 0]);
        assert_eq!(body.joints[1].velocity, [-15, 0, 0]);
    }

    #[test]
    fn only_strong_cancel_skips_stretched_connection() {
        let (mut joints, connections) = stick();
        joints[1].position.x = 2 * F;
        joints[0].velocity = [20, 0, 0];
        joints[1].velocity = [-20, 0, 0];
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        body.cancel_out_velocities(true, 5);
        assert_eq!(body.joints[0].velocity, [20, 0, 0]);

        body.cancel_out_velocities(false, 5);
        assert_eq!(body.joints[0].velocity, [15, 0, 0]);
        assert_eq!(body.joints[1].velocity, [-15, 0, 0]);
    }

    #[test]
    fn simple_conn_stick_holds_shape_by_tension_alone() {
        let (mut joints, connections) = stick();
        joints[0].velocity = [-20, 0, 0];
        let mut props = Body::new(2, 1, F);
        props.flags.insert(BodyFlags::SIMPLE_CONN);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);
        let config = Config::default();

        for tick in 0..200 {
            for j in body.joints.iter_mut() {
                j.position = j.position + j.velocity();
            }

            body.apply_connection_tension(&config);

            let d = body.joints[0].position.distance(body.joints[1].position);
            assert!(math::abs(d - 2 * F) <= F / 8, "tick {}: {}", tick, d);
        }

        // nothing averaged the joints: they still move apart and together
        assert_ne!(body.joints[0].velocity, body.joints[1].velocity);
    }

    #[test]
    fn limit_average_speed_scales_down() {
        let (mut joints, connections) = stick();
        joints[0].velocity = [400, 0, 0];
        joints[1].velocity = [400, 0, 0];
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        body.limit_average_speed(90, 110, false);

        let speed = body.average_speed(false);
        assert!((90..=110).contains(&speed), "{}", speed);
    }

    #[test]
    fn spin_about_vertical_axis_is_tangential() {
        let (mut joints, connections) = stick();
        let mut props = Body::new(2, 1, F);
        let mut body = BodyMut::new(&mut props, &mut joints, &connections);

        body.spin(Vec3::new(0, 8, 0));

        assert_eq!(body.joints[0].velocity[0], 0);
        assert_eq!(body.joints[0].velocity[2], -body.joints[1].velocity[2]);
        assert_ne!(body.joints[0].velocity[2], 0);
    }
}
