//! 32-bit hashes of simulation state, for comparing snapshots.
//!
//! Two worlds stepped from the same state produce the same hash; any change
//! in a position, velocity, property or flag almost surely changes it.

use crate::body::{BodyRef, Connection, Joint};

/// Integer mixer; constants from the hash-prospector search.
#[inline]
pub fn mix(n: u32) -> u32 {
    let n = 250_009_959u32.wrapping_mul(n ^ (n >> 17));
    let n = 2_626_308_659u32.wrapping_mul(n ^ (n >> 15));
    n ^ (n >> 16)
}

/// Widens like a C cast of a signed 16-bit value to `u32`.
#[inline]
fn widen(v: i16) -> u32 {
    v as i32 as u32
}

pub fn hash_joint(joint: &Joint) -> u32 {
    let r = mix(joint.position.x as u32);
    let r = mix(r ^ joint.position.y as u32);
    let r = mix(r ^ joint.position.z as u32);
    let r = mix(r ^ (widen(joint.velocity[0]) | (widen(joint.velocity[1]) << 16)));
    mix(r ^ (widen(joint.velocity[2]) | joint.size_divided as u32))
}

pub fn hash_connection(connection: &Connection) -> u32 {
    mix(connection.length as u32 | ((connection.joint1 as u32) << 16) | ((connection.joint2 as u32) << 24))
}

pub fn hash_body<M>(body: &BodyRef<'_, M>) -> u32 {
    let props = body.props;

    let r = mix(
        widen(props.joint_mass) | ((props.flags.0 as u32) << 16) | ((props.deactivate_count as u32) << 24),
    ) ^ mix(widen(props.friction) | (widen(props.elasticity) << 16));

    let r = body.joints.iter().fold(r, |r, j| mix(r ^ hash_joint(j)));
    body.connections.iter().fold(r, |r, c| mix(r ^ hash_connection(c)))
}

/// Hash of a whole set of bodies, order dependent.
pub fn hash_bodies<'b, M: 'b, I>(bodies: I) -> u32
where
    I: IntoIterator<Item = BodyRef<'b, M>>,
{
    bodies.into_iter().fold(0, |r, b| mix(r ^ hash_body(&b)))
}
