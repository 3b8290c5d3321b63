//! The world: arenas of joints, connections and bodies plus the step.

use core::marker::PhantomData;

use crate::body::{measure_connections, Body, BodyFlags, BodyMut, BodyRef, Connection, Joint};
use crate::collision::{aabb_overlap, AllowAll, CollisionFilter, ContactContext};
use crate::config::Config;
use crate::debug::{self, Camera, DebugDraw, EnvironmentGrid};
use crate::environment::Environment;
use crate::error::PhysicsError;
use crate::hash;
use crate::math::Unit;
use crate::observer::StepObserver;
use crate::raycast::{self, BodyHit};
use crate::template::Template;
use crate::vec::{ExactLength, Metric, Vec3};

/// Arena slots addressable by the 16-bit offsets stored in [`Body`].
const ARENA_LIMIT: usize = u16::MAX as usize + 1;

/// A simulated world over caller-provided storage.
///
/// Joints, connections and bodies live in slices the host allocates once;
/// bodies are appended with [`add_body`](Self::add_body) and the world never
/// allocates. `E` is the static environment, `C` the collision filter and `M`
/// the length strategy, fixed for the lifetime of the world.
///
/// ```
/// use fixbody::body::{Body, Connection, Joint};
/// use fixbody::observer::NoOpStepObserver;
/// use fixbody::primitives::ground;
/// use fixbody::template::Template;
/// use fixbody::vec::Vec3;
///
/// let mut joints = [Joint::default(); 8];
/// let mut connections = [Connection::default(); 16];
/// let mut bodies = [Body::default(); 1];
///
/// let mut world = fixbody::World::new(&mut joints, &mut connections, &mut bodies, |p: Vec3, _: i32| ground(p, 0));
/// let ball = world.add_body(&Template::Ball { joint_size: 256 }, 512).unwrap();
/// world.body_mut(ball).unwrap().move_to(Vec3::new(0, 2048, 0));
///
/// for _ in 0..100 {
///     world.body_mut(ball).unwrap().apply_gravity(5);
///     world.step(&mut NoOpStepObserver);
/// }
///
/// assert!(world.body(ball).unwrap().joints[0].position.y >= 256 - 8);
/// ```
pub struct World<'a, E, C = AllowAll, M = ExactLength> {
    joints: &'a mut [Joint],
    connections: &'a mut [Connection],
    bodies: &'a mut [Body],
    joint_count: usize,
    connection_count: usize,
    body_count: usize,
    environment: E,
    filter: C,
    config: Config,
    metric: PhantomData<M>,
}

impl<'a, E: Environment> World<'a, E> {
    /// An empty world using the whole of each slice as its arena.
    pub fn new(
        joints: &'a mut [Joint],
        connections: &'a mut [Connection],
        bodies: &'a mut [Body],
        environment: E,
    ) -> Self {
        World {
            joints,
            connections,
            bodies,
            joint_count: 0,
            connection_count: 0,
            body_count: 0,
            environment,
            filter: AllowAll,
            config: Config::default(),
            metric: PhantomData,
        }
    }
}

impl<'a, E, C, M> World<'a, E, C, M>
where
    E: Environment,
    C: CollisionFilter,
    M: Metric,
{
    /// Replaces the collision filter.
    pub fn with_filter<C2: CollisionFilter>(self, filter: C2) -> World<'a, E, C2, M> {
        World {
            joints: self.joints,
            connections: self.connections,
            bodies: self.bodies,
            joint_count: self.joint_count,
            connection_count: self.connection_count,
            body_count: self.body_count,
            environment: self.environment,
            filter,
            config: self.config,
            metric: PhantomData,
        }
    }

    /// Switches the length strategy. Pick it before adding bodies, since rest
    /// lengths are measured with it.
    pub fn with_metric<M2: Metric>(self) -> World<'a, E, C, M2> {
        World {
            joints: self.joints,
            connections: self.connections,
            bodies: self.bodies,
            joint_count: self.joint_count,
            connection_count: self.connection_count,
            body_count: self.body_count,
            environment: self.environment,
            filter: self.filter,
            config: self.config,
            metric: PhantomData,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn filter_mut(&mut self) -> &mut C {
        &mut self.filter
    }

    pub fn body_count(&self) -> usize {
        self.body_count
    }

    /// Builds `template` directly in the arenas and binds it as a new body
    /// of total `mass`. Returns the body index.
    pub fn add_body(&mut self, template: &Template, mass: Unit) -> Result<usize, PhysicsError> {
        let joint_count = template.joint_count();
        let connection_count = template.connection_count();

        self.reserve(joint_count, connection_count)?;

        let (j0, c0) = (self.joint_count, self.connection_count);

        template.build(
            &mut self.joints[j0..j0 + joint_count],
            &mut self.connections[c0..c0 + connection_count],
        )?;

        self.bind(joint_count, connection_count, mass)
    }

    /// Copies a custom shape into the arenas and binds it as a new body of
    /// total `mass`. Connection indices are relative to `joints`.
    pub fn add_body_from(
        &mut self,
        joints: &[Joint],
        connections: &[Connection],
        mass: Unit,
    ) -> Result<usize, PhysicsError> {
        if joints.is_empty() {
            return Err(PhysicsError::EmptyBody);
        }

        if joints.len() > u8::MAX as usize || connections.len() > u8::MAX as usize {
            return Err(PhysicsError::TooManyJoints { count: joints.len().max(connections.len()) });
        }

        for (index, c) in connections.iter().enumerate() {
            for joint in [c.joint1, c.joint2] {
                if joint as usize >= joints.len() {
                    return Err(PhysicsError::InvalidConnection { index, joint, joint_count: joints.len() });
                }
            }
        }

        self.reserve(joints.len(), connections.len())?;

        let (j0, c0) = (self.joint_count, self.connection_count);

        self.joints[j0..j0 + joints.len()].copy_from_slice(joints);
        self.connections[c0..c0 + connections.len()].copy_from_slice(connections);

        self.bind(joints.len(), connections.len(), mass)
    }

    fn reserve(&self, joints: usize, connections: usize) -> Result<(), PhysicsError> {
        let checks = [
            (1, self.bodies.len() - self.body_count),
            (joints, self.joints.len().min(ARENA_LIMIT).saturating_sub(self.joint_count)),
            (connections, self.connections.len().min(ARENA_LIMIT).saturating_sub(self.connection_count)),
        ];

        for (needed, available) in checks {
            if needed > available {
                log::warn!("arena exhausted: need {}, {} left", needed, available);
                return Err(PhysicsError::ArenaExhausted { needed, available });
            }
        }

        Ok(())
    }

    /// Turns the arena entries past the cursors into a body.
    fn bind(&mut self, joint_count: usize, connection_count: usize, mass: Unit) -> Result<usize, PhysicsError> {
        let (j0, c0) = (self.joint_count, self.connection_count);

        measure_connections::<M>(
            &self.joints[j0..j0 + joint_count],
            &mut self.connections[c0..c0 + connection_count],
        );

        let mut body = Body::new(joint_count as u8, connection_count as u8, mass);
        body.first_joint = j0 as u16;
        body.first_connection = c0 as u16;

        let index = self.body_count;
        self.bodies[index] = body;

        self.joint_count += joint_count;
        self.connection_count += connection_count;
        self.body_count += 1;

        log::debug!("bound body {} with {} joints, {} connections", index, joint_count, connection_count);

        Ok(index)
    }

    /// Drops all bodies. The storage is reused by following
    /// [`add_body`](Self::add_body) calls.
    pub fn reset(&mut self) {
        self.joint_count = 0;
        self.connection_count = 0;
        self.body_count = 0;
    }

    fn check_index(&self, index: usize) -> Result<(), PhysicsError> {
        if index < self.body_count {
            Ok(())
        } else {
            Err(PhysicsError::BodyOutOfBounds { index, count: self.body_count })
        }
    }

    pub fn body(&self, index: usize) -> Result<BodyRef<'_, M>, PhysicsError> {
        self.check_index(index)?;
        Ok(view_at(&*self.bodies, &*self.joints, &*self.connections, index))
    }

    pub fn body_mut(&mut self, index: usize) -> Result<BodyMut<'_, M>, PhysicsError> {
        self.check_index(index)?;
        Ok(body_at(self.bodies, self.joints, self.connections, index))
    }

    /// Mutable views of two distinct bodies at once.
    pub fn body_pair_mut(&mut self, a: usize, b: usize) -> Result<(BodyMut<'_, M>, BodyMut<'_, M>), PhysicsError> {
        self.check_index(a)?;
        self.check_index(b)?;

        if a == b {
            return Err(PhysicsError::SameBody { index: a });
        }

        Ok(pair_at(self.bodies, self.joints, self.connections, a, b))
    }

    /// All bodies in index order.
    pub fn bodies(&self) -> impl Iterator<Item = BodyRef<'_, M>> + '_ {
        (0..self.body_count).map(move |i| view_at(&*self.bodies, &*self.joints, &*self.connections, i))
    }

    pub fn activate_all(&mut self) {
        for i in 0..self.body_count {
            body_at::<M>(self.bodies, self.joints, self.connections, i).activate();
        }
    }

    pub fn deactivate_all(&mut self) {
        for body in self.bodies[..self.body_count].iter_mut() {
            body.deactivate();
        }
    }

    /// Summed net speed of all bodies.
    pub fn net_speed(&self) -> Unit {
        let approximate = self.config.approximate_net_speed;
        self.bodies().fold(0, |acc: Unit, b| acc.saturating_add(b.net_speed(approximate)))
    }

    /// Hash of the whole simulation state.
    pub fn hash(&self) -> u32 {
        hash::hash_bodies(self.bodies())
    }

    /// Closest hit of a ray with the environment, see
    /// [`raycast::cast_environment_ray`].
    pub fn cast_environment_ray(
        &self,
        ray_pos: Vec3,
        ray_dir: Vec3,
        inside_step_size: Unit,
        march_max_step: Unit,
        max_steps: u32,
    ) -> Option<Vec3> {
        raycast::cast_environment_ray::<M, _>(
            &self.environment,
            ray_pos,
            ray_dir,
            inside_step_size,
            march_max_step,
            max_steps,
        )
    }

    /// Closest joint hit by a ray, optionally ignoring one body.
    pub fn cast_body_ray(&self, ray_pos: Vec3, ray_dir: Vec3, exclude: Option<usize>) -> Option<BodyHit> {
        raycast::cast_body_ray(self.bodies(), ray_pos, ray_dir, exclude)
    }

    /// Renders the world through `draw`, see [`debug::debug_draw`].
    pub fn debug_draw<D: DebugDraw + ?Sized>(&self, draw: &mut D, camera: &Camera, grid: EnvironmentGrid) {
        debug::debug_draw(draw, camera, &self.environment, grid, self.bodies());
    }

    /// Advances the simulation by one tick.
    ///
    /// Bodies are processed in index order: integrate, resolve against the
    /// environment, keep the shape, collide with every later or sleeping
    /// body, then update the sleep counter.
    pub fn step<O: StepObserver>(&mut self, observer: &mut O) {
        let World { joints, connections, bodies, body_count, environment, filter, config, .. } = self;

        let joints = &mut **joints;
        let connections = &**connections;
        let bodies = &mut **bodies;
        let body_count = *body_count;
        let env = &*environment;
        let config = &*config;

        let mut ctx = ContactContext::new(filter, observer, config).with_metric::<M>();

        for i in 0..body_count {
            if bodies[i].flags.intersects(BodyFlags::DEACTIVATED | BodyFlags::DISABLED) {
                continue;
            }

            ctx.set_bodies(i, i);

            let (aabb_min, aabb_max) = {
                let mut body = body_at::<M>(bodies, joints, connections, i);
                let flags = body.props.flags;
                let nonrotating = flags.contains(BodyFlags::NONROTATING);
                let origin = body.joints[0].position;
                let lead_velocity = body.joints[0].velocity;

                for joint in body.joints.iter_mut() {
                    if nonrotating {
                        joint.velocity = lead_velocity;
                    }

                    joint.position = joint.position + joint.velocity();
                }

                ctx.observer().on_integrate(i);

                let aabb = body.aabb();
                let mut collided = ctx.resolve_body_environment(&mut body, env);

                if nonrotating {
                    for _ in 0..config.nonrotating_resolve_attempts {
                        if !collided {
                            break;
                        }

                        collided = ctx.resolve_body_environment(&mut body, env);
                    }

                    // never leave a rigid body stuck halfway in the environment
                    if collided && body.view().collides_with_environment(env) {
                        let back = origin - body.joints[0].position;
                        body.move_by(back);
                    }
                } else {
                    let mut tension = body.apply_connection_tension(config);
                    ctx.observer().on_body_tension(i, tension);

                    let count = body.connections.len() as Unit;

                    if count > 0 {
                        let hard = !flags.contains(BodyFlags::SOFT);

                        if hard {
                            body.reshape(Some(env));

                            tension /= count;

                            if tension > config.reshape_tension_limit {
                                for _ in 0..config.reshape_iterations {
                                    body.reshape(Some(env));
                                }
                            }
                        }

                        if !flags.contains(BodyFlags::SIMPLE_CONN) {
                            body.cancel_out_velocities(hard, config.tension_acceleration_threshold);
                        }
                    }
                }

                ctx.observer().on_environment_collision(i, collided);

                aabb
            };

            for j in 0..body_count {
                let other = &bodies[j];

                if other.flags.contains(BodyFlags::DISABLED) || !(j > i || !other.is_active()) {
                    continue;
                }

                let (min2, max2) = view_at::<M>(bodies, joints, connections, j).aabb();

                if !aabb_overlap(aabb_min, aabb_max, min2, max2) {
                    continue;
                }

                ctx.set_bodies(i, j);

                let (mut a, mut b) = pair_at::<M>(bodies, joints, connections, i, j);

                if ctx.resolve_bodies(&mut a, &mut b, Some(env)) {
                    a.activate();
                    a.props.deactivate_count = config.light_deactivation;
                    b.activate();
                    b.props.deactivate_count = config.light_deactivation;

                    ctx.observer().on_body_collision(i, j);
                }
            }

            let mut body = body_at::<M>(bodies, joints, connections, i);

            if body.props.flags.contains(BodyFlags::ALWAYS_ACTIVE) {
                continue;
            }

            if body.props.deactivate_count >= config.deactivate_after {
                body.stop();
                body.props.deactivate_count = 0;
                body.deactivate();

                ctx.observer().on_deactivate(i);
            } else if body.average_speed(config.approximate_net_speed) <= config.low_speed {
                body.props.deactivate_count = body.props.deactivate_count.saturating_add(1);
            } else {
                body.props.deactivate_count = 0;
            }
        }

        ctx.observer().on_step_complete();
    }
}

fn view_at<'b, M: Metric>(bodies: &'b [Body], joints: &'b [Joint], connections: &'b [Connection], i: usize) -> BodyRef<'b, M> {
    let props = &bodies[i];
    BodyRef::with_metric_of(props, &joints[props.joint_range()], &connections[props.connection_range()])
}

fn body_at<'b, M: Metric>(
    bodies: &'b mut [Body],
    joints: &'b mut [Joint],
    connections: &'b [Connection],
    i: usize,
) -> BodyMut<'b, M> {
    let props = &mut bodies[i];
    let (jr, cr) = (props.joint_range(), props.connection_range());

    BodyMut::with_metric_of(props, &mut joints[jr], &connections[cr])
}

/// Splits the arenas into views of two distinct bodies. Bodies are bound in
/// order, so the joints of the lower index come first.
fn pair_at<'b, M: Metric>(
    bodies: &'b mut [Body],
    joints: &'b mut [Joint],
    connections: &'b [Connection],
    i: usize,
    j: usize,
) -> (BodyMut<'b, M>, BodyMut<'b, M>) {
    let (lo, hi) = if i < j { (i, j) } else { (j, i) };

    let (bodies_lo, bodies_hi) = bodies.split_at_mut(hi);
    let props_lo = &mut bodies_lo[lo];
    let props_hi = &mut bodies_hi[0];

    let (jr_lo, cr_lo) = (props_lo.joint_range(), props_lo.connection_range());
    let (jr_hi, cr_hi) = (props_hi.joint_range(), props_hi.connection_range());

    debug_assert!(jr_lo.end <= jr_hi.start);

    let (joints_lo, joints_hi) = joints.split_at_mut(jr_hi.start);
    let count_hi = jr_hi.len();

    let body_lo = BodyMut::with_metric_of(props_lo, &mut joints_lo[jr_lo], &connections[cr_lo]);
    let body_hi = BodyMut::with_metric_of(props_hi, &mut joints_hi[..count_hi], &connections[cr_hi]);

    if i < j {
        (body_lo, body_hi)
    } else {
        (body_hi, body_lo)
    }
}
