//! Wireframe rendering of a world through a pixel callback, for debugging.

use crate::body::{BodyFlags, BodyRef};
use crate::environment::Environment;
use crate::math::{self, Unit, F};
use crate::rotation::vec2_rotate;
use crate::vec::Vec3;

/// Points closer to the camera than this are not drawn.
const Z_LIMIT: Unit = 250;

/// Dots per connection.
const CONNECTION_SEGMENTS: Unit = 16;

/// Steps per octant of a joint circle.
const CIRCLE_SEGMENTS: Unit = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DebugColor {
    Connection = 0,
    Joint = 1,
    Environment = 2,
    /// Joints and connections of sleeping bodies.
    Inactive = 3,
}

/// Pixel sink. Only called with coordinates inside the camera resolution.
pub trait DebugDraw {
    fn draw_pixel(&mut self, x: Unit, y: Unit, color: DebugColor);
}

impl<T: FnMut(Unit, Unit, DebugColor)> DebugDraw for T {
    #[inline]
    fn draw_pixel(&mut self, x: Unit, y: Unit, color: DebugColor) {
        self(x, y, color)
    }
}

/// A pinhole (or orthographic) camera.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Camera {
    pub position: Vec3,
    /// Euler angles, see [`rotation`](crate::rotation).
    pub rotation: Vec3,
    pub width: Unit,
    pub height: Unit,
    /// Focal length in units of `F`; 0 selects orthographic projection.
    pub focal_length: Unit,
}

impl Camera {
    pub fn new(position: Vec3, rotation: Vec3, width: Unit, height: Unit, focal_length: Unit) -> Self {
        Camera { position, rotation, width, height, focal_length }
    }

    /// Projects a world point to `(screen x, screen y, depth)`. Points behind
    /// the camera come back in camera space with depth `<= 0`.
    pub fn project(&self, point: Vec3) -> Vec3 {
        let mut p = point - self.position;

        vec2_rotate(&mut p.z, &mut p.x, self.rotation.y);
        vec2_rotate(&mut p.z, &mut p.y, -self.rotation.x);
        vec2_rotate(&mut p.y, &mut p.x, -self.rotation.z);

        if p.z <= 0 {
            return p;
        }

        if self.focal_length != 0 {
            let x = math::mul_div(p.x, self.focal_length, p.z);
            let y = math::mul_div(p.y, self.focal_length, p.z);

            // both axes scale with the width to keep pixels square
            p.x = self.width / 2 + math::mul_div(x, self.width, 2 * F);
            p.y = self.height / 2 - math::mul_div(y, self.width, 2 * F);
        } else {
            p.x = self.width / 2 + p.x;
            p.y = self.height / 2 - p.y;
        }

        p
    }

    fn put<D: DebugDraw + ?Sized>(&self, draw: &mut D, x: Unit, y: Unit, color: DebugColor) {
        if x >= 0 && x < self.width && y >= 0 && y < self.height {
            draw.draw_pixel(x, y, color);
        }
    }
}

/// Probe grid of the environment drawn around the camera's view direction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentGrid {
    /// Samples per axis; 0 draws no environment.
    pub resolution: u8,
    /// Distance between samples.
    pub spacing: Unit,
}

/// Draws the environment surface as a cloud of probed points, then every
/// body: connections as dotted lines and joints as circles.
pub fn debug_draw<'b, M, E, D, I>(draw: &mut D, camera: &Camera, env: &E, grid: EnvironmentGrid, bodies: I)
where
    M: 'b,
    E: Environment + ?Sized,
    D: DebugDraw + ?Sized,
    I: IntoIterator<Item = BodyRef<'b, M>>,
{
    draw_environment(draw, camera, env, grid);

    for body in bodies {
        draw_body(draw, camera, &body);
    }
}

fn draw_environment<E, D>(draw: &mut D, camera: &Camera, env: &E, grid: EnvironmentGrid)
where
    E: Environment + ?Sized,
    D: DebugDraw + ?Sized,
{
    if grid.resolution == 0 {
        return;
    }

    let spacing = math::non_zero(grid.spacing);
    let half = math::mul_div(spacing, grid.resolution as Unit, 2);

    // grid centered half its size ahead of the camera, snapped to the spacing
    let mut center = Vec3::new(0, math::sin(camera.rotation.x), math::cos(camera.rotation.x));
    vec2_rotate(&mut center.x, &mut center.z, camera.rotation.y);

    let center = camera.position + center.times(half);
    let snap = |v: Unit| (v / spacing) * spacing;
    let center = Vec3::new(snap(center.x), snap(center.y), snap(center.z));

    let start = center - Vec3::splat(half);

    for j in 0..grid.resolution as Unit {
        for k in 0..grid.resolution as Unit {
            for l in 0..grid.resolution as Unit {
                let probe = start + Vec3::new(k * spacing, j * spacing, l * spacing);
                let surface = env.closest_point(probe, spacing);

                if surface == probe {
                    continue;
                }

                let s = camera.project(surface);

                if s.z > Z_LIMIT {
                    camera.put(draw, s.x, s.y, DebugColor::Environment);
                }
            }
        }
    }
}

fn draw_body<M, D: DebugDraw + ?Sized>(draw: &mut D, camera: &Camera, body: &BodyRef<'_, M>) {
    let inactive = body.props.flags.contains(BodyFlags::DEACTIVATED);

    for c in body.connections {
        let p1 = camera.project(body.joints[c.joint1 as usize].position);
        let p2 = camera.project(body.joints[c.joint2 as usize].position);

        if p1.z <= Z_LIMIT || p2.z <= Z_LIMIT {
            continue;
        }

        let color = if inactive { DebugColor::Inactive } else { DebugColor::Connection };
        let diff = p2 - p1;

        for k in 0..CONNECTION_SEGMENTS {
            let x = p1.x + math::mul_div(diff.x, k, CONNECTION_SEGMENTS);
            let y = p1.y + math::mul_div(diff.y, k, CONNECTION_SEGMENTS);

            camera.put(draw, x, y, color);
        }
    }

    for joint in body.joints {
        let p = camera.project(joint.position);

        if p.z <= Z_LIMIT {
            continue;
        }

        let color = if inactive { DebugColor::Inactive } else { DebugColor::Joint };

        camera.put(draw, p.x, p.y, color);

        let mut size = joint.size();

        if camera.focal_length != 0 {
            size = math::mul_div(size / 2, camera.width, F);
            size = math::mul_div(size, camera.focal_length, p.z);
        }

        // one octant, mirrored eight ways
        for k in 0..=CIRCLE_SEGMENTS {
            let angle = F * k / (8 * CIRCLE_SEGMENTS);
            let dx = math::mul(math::sin(angle), size);
            let dy = math::mul(math::cos(angle), size);

            for (ox, oy) in [(dx, dy), (dy, dx)] {
                camera.put(draw, p.x + ox, p.y + oy, color);
                camera.put(draw, p.x + ox, p.y - oy, color);
                camera.put(draw, p.x - ox, p.y + oy, color);
                camera.put(draw, p.x - ox, p.y - oy, color);
            }
        }
    }
}
