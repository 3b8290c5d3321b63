//! Joint/connection layouts for common body shapes.
//!
//! Each factory fills caller-provided buffers and leaves rest lengths at 0;
//! they are measured when the body is bound with
//! [`World::add_body`](crate::world::World::add_body). Shapes are centered
//! at the origin.

use crate::body::{Connection, Joint};
use crate::error::PhysicsError;
use crate::math::{self, Unit};
use crate::vec::Vec3;

fn check(joints: &[Joint], connections: &[Connection], j: usize, c: usize) -> Result<(), PhysicsError> {
    if joints.len() < j {
        return Err(PhysicsError::BufferTooSmall { needed: j, available: joints.len() });
    }

    if connections.len() < c {
        return Err(PhysicsError::BufferTooSmall { needed: c, available: connections.len() });
    }

    Ok(())
}

fn connect(connections: &mut [Connection], pairs: &[(u8, u8)]) {
    for (c, &(a, b)) in connections.iter_mut().zip(pairs) {
        *c = Connection::new(a, b);
    }
}

/// Two joints `length` apart along X with one connection.
pub fn make_stick(
    joints: &mut [Joint],
    connections: &mut [Connection],
    length: Unit,
    joint_size: Unit,
) -> Result<(), PhysicsError> {
    check(joints, connections, 2, 1)?;

    joints[0] = Joint::new(Vec3::new(length / 2, 0, 0), joint_size);
    joints[1] = Joint::new(Vec3::new(length / -2, 0, 0), joint_size);
    connect(connections, &[(0, 1)]);

    Ok(())
}

/// Flat rectangle in the XZ plane, 4 joints with both diagonals.
pub fn make_rect(
    joints: &mut [Joint],
    connections: &mut [Connection],
    width: Unit,
    depth: Unit,
    joint_size: Unit,
) -> Result<(), PhysicsError> {
    check(joints, connections, 4, 6)?;

    let (w, d) = (width / 2, depth / 2);

    for (i, joint) in joints.iter_mut().take(4).enumerate() {
        let x = if i % 2 == 1 { -w } else { w };
        let z = if i / 2 == 1 { -d } else { d };
        *joint = Joint::new(Vec3::new(x, 0, z), joint_size);
    }

    connect(connections, &[(0, 1), (0, 2), (3, 1), (3, 2), (0, 3), (1, 2)]);

    Ok(())
}

/// Rectangle with an extra center joint tied to one diagonal.
pub fn make_center_rect(
    joints: &mut [Joint],
    connections: &mut [Connection],
    width: Unit,
    depth: Unit,
    joint_size: Unit,
) -> Result<(), PhysicsError> {
    check(joints, connections, 5, 8)?;
    make_rect(joints, connections, width, depth, joint_size)?;

    joints[4] = Joint::new(Vec3::ZERO, joint_size);
    connect(&mut connections[6..], &[(0, 4), (3, 4)]);

    Ok(())
}

/// Rectangle with a center joint tied to all four corners.
pub fn make_center_rect_full(
    joints: &mut [Joint],
    connections: &mut [Connection],
    width: Unit,
    depth: Unit,
    joint_size: Unit,
) -> Result<(), PhysicsError> {
    check(joints, connections, 5, 10)?;
    make_center_rect(joints, connections, width, depth, joint_size)?;

    connect(&mut connections[8..], &[(1, 4), (2, 4)]);

    Ok(())
}

/// Triangle in the XZ plane.
pub fn make_triangle(
    joints: &mut [Joint],
    connections: &mut [Connection],
    side_length: Unit,
    joint_size: Unit,
) -> Result<(), PhysicsError> {
    check(joints, connections, 3, 3)?;

    let z = math::sqrt(math::mul_div(side_length, side_length, 2)) / 2;

    joints[0] = Joint::new(Vec3::new(side_length / 2, 0, z), joint_size);
    joints[1] = Joint::new(Vec3::new(-(side_length / 2), 0, z), joint_size);
    joints[2] = Joint::new(Vec3::new(0, 0, -z), joint_size);
    connect(connections, &[(0, 1), (1, 2), (2, 0)]);

    Ok(())
}

/// Box of 8 corner joints, connected along every edge plus four space
/// diagonals.
pub fn make_box(
    joints: &mut [Joint],
    connections: &mut [Connection],
    width: Unit,
    depth: Unit,
    height: Unit,
    joint_size: Unit,
) -> Result<(), PhysicsError> {
    check(joints, connections, 8, 16)?;

    let (w, d, h) = (width / 2, depth / 2, height / 2);

    for (i, joint) in joints.iter_mut().take(8).enumerate() {
        let x = if i % 2 == 1 { w } else { -w };
        let y = if (i >> 2) % 2 == 1 { h } else { -h };
        let z = if (i >> 1) % 2 == 1 { d } else { -d };
        *joint = Joint::new(Vec3::new(x, y, z), joint_size);
    }

    connect(
        connections,
        &[
            // bottom
            (0, 1), (1, 3), (3, 2), (2, 0),
            // top
            (4, 5), (5, 7), (7, 6), (6, 4),
            // sides
            (0, 4), (1, 5), (3, 7), (2, 6),
            // diagonals
            (0, 7), (1, 6), (2, 5), (3, 4),
        ],
    );

    Ok(())
}

/// Box with an extra center joint.
pub fn make_center_box(
    joints: &mut [Joint],
    connections: &mut [Connection],
    width: Unit,
    depth: Unit,
    height: Unit,
    joint_size: Unit,
) -> Result<(), PhysicsError> {
    check(joints, connections, 9, 18)?;
    make_box(joints, connections, width, depth, height, joint_size)?;

    joints[8] = Joint::new(Vec3::ZERO, joint_size);
    connect(&mut connections[16..], &[(0, 8), (7, 8)]);

    Ok(())
}

/// A named body shape with its dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Template {
    /// A single joint, e.g. a ball.
    Ball { joint_size: Unit },
    Stick { length: Unit, joint_size: Unit },
    Triangle { side_length: Unit, joint_size: Unit },
    Rect { width: Unit, depth: Unit, joint_size: Unit },
    CenterRect { width: Unit, depth: Unit, joint_size: Unit },
    CenterRectFull { width: Unit, depth: Unit, joint_size: Unit },
    Box { width: Unit, depth: Unit, height: Unit, joint_size: Unit },
    CenterBox { width: Unit, depth: Unit, height: Unit, joint_size: Unit },
}

impl Template {
    pub fn joint_count(&self) -> usize {
        match self {
            Template::Ball { .. } => 1,
            Template::Stick { .. } => 2,
            Template::Triangle { .. } => 3,
            Template::Rect { .. } => 4,
            Template::CenterRect { .. } | Template::CenterRectFull { .. } => 5,
            Template::Box { .. } => 8,
            Template::CenterBox { .. } => 9,
        }
    }

    pub fn connection_count(&self) -> usize {
        match self {
            Template::Ball { .. } => 0,
            Template::Stick { .. } => 1,
            Template::Triangle { .. } => 3,
            Template::Rect { .. } => 6,
            Template::CenterRect { .. } => 8,
            Template::CenterRectFull { .. } => 10,
            Template::Box { .. } => 16,
            Template::CenterBox { .. } => 18,
        }
    }

    /// Writes the shape into the front of the buffers.
    pub fn build(&self, joints: &mut [Joint], connections: &mut [Connection]) -> Result<(), PhysicsError> {
        match *self {
            Template::Ball { joint_size } => {
                check(joints, connections, 1, 0)?;
                joints[0] = Joint::new(Vec3::ZERO, joint_size);
                Ok(())
            }
            Template::Stick { length, joint_size } => make_stick(joints, connections, length, joint_size),
            Template::Triangle { side_length, joint_size } => {
                make_triangle(joints, connections, side_length, joint_size)
            }
            Template::Rect { width, depth, joint_size } => make_rect(joints, connections, width, depth, joint_size),
            Template::CenterRect { width, depth, joint_size } => {
                make_center_rect(joints, connections, width, depth, joint_size)
            }
            Template::CenterRectFull { width, depth, joint_size } => {
                make_center_rect_full(joints, connections, width, depth, joint_size)
            }
            Template::Box { width, depth, height, joint_size } => {
                make_box(joints, connections, width, depth, height, joint_size)
            }
            Template::CenterBox { width, depth, height, joint_size } => {
                make_center_box(joints, connections, width, depth, height, joint_size)
            }
        }
    }
}
