//! Error types for setup operations.
//!
//! Stepping never fails; only binding bodies and building templates report
//! errors.

use core::fmt;

/// Errors returned when setting up bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// A template did not fit into the provided buffers.
    BufferTooSmall { needed: usize, available: usize },
    /// The world's joint, connection or body arena is full.
    ArenaExhausted { needed: usize, available: usize },
    /// A body needs at least one joint.
    EmptyBody,
    /// A body has more joints or connections than its 8-bit counts hold.
    TooManyJoints { count: usize },
    /// A connection refers to a joint outside its body.
    InvalidConnection { index: usize, joint: u8, joint_count: usize },
    /// Body index is out of bounds.
    BodyOutOfBounds { index: usize, count: usize },
    /// Two views were requested on the same body.
    SameBody { index: usize },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::BufferTooSmall { needed, available } => {
                write!(f, "buffer too small: need {}, have {}", needed, available)
            }
            PhysicsError::ArenaExhausted { needed, available } => {
                write!(f, "arena exhausted: need {}, {} left", needed, available)
            }
            PhysicsError::EmptyBody => write!(f, "body needs at least one joint"),
            PhysicsError::TooManyJoints { count } => {
                write!(f, "{} joints or connections exceed the per-body limit of 255", count)
            }
            PhysicsError::InvalidConnection { index, joint, joint_count } => write!(
                f,
                "connection {} refers to joint {} but the body has {} joints",
                index, joint, joint_count
            ),
            PhysicsError::BodyOutOfBounds { index, count } => {
                write!(f, "body index {} out of bounds (count: {})", index, count)
            }
            PhysicsError::SameBody { index } => write!(f, "body {} requested twice", index),
        }
    }
}
