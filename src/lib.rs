//! Fixed-point soft and rigid body physics with implicit-surface environments.
//!
//! `fixbody` simulates bodies made of spherical joints tied together by
//! elastic connections, colliding with each other and with a static
//! environment described only by its closest-point function. All arithmetic
//! is integer fixed point ([`math::F`] = 1.0), so a simulation gives
//! bit-identical results on every platform.
//!
//! # Features
//!
//! - **Allocation-free**: the host hands the [`World`] its joint, connection
//!   and body storage once; nothing is allocated afterwards
//! - **Deterministic**: integer math only; [`World::hash`] fingerprints state
//! - **Soft and rigid bodies**: rigid shapes are kept by reshaping connections
//!   every tick, soft ones are left to their springs
//! - **Environment shapes**: boxes, spheres, cylinders, cones, planes, line
//!   segments, prisms and heightmaps, combined with [`environment::Union`]
//! - **Sleeping**: resting bodies deactivate and wake on contact
//! - **Ray casts** against the environment and against bodies
//! - **Observable**: monitor the step via the [`StepObserver`] trait
//! - **`no_std`**: no allocator and no floating point needed
//!
//! ```
//! use fixbody::primitives::ground;
//! use fixbody::{Body, Connection, Joint, NoOpStepObserver, Template, Vec3, World, F};
//!
//! let mut joints = [Joint::default(); 16];
//! let mut connections = [Connection::default(); 32];
//! let mut bodies = [Body::default(); 4];
//!
//! let mut world = World::new(&mut joints, &mut connections, &mut bodies, |p: Vec3, _: i32| ground(p, 0));
//!
//! let cube = world
//!     .add_body(&Template::Box { width: F, depth: F, height: F, joint_size: F / 4 }, F)
//!     .unwrap();
//! world.body_mut(cube).unwrap().move_to(Vec3::new(0, 3 * F, 0));
//!
//! for _ in 0..300 {
//!     world.body_mut(cube).unwrap().apply_gravity(F / 100);
//!     world.step(&mut NoOpStepObserver);
//! }
//!
//! let cube = world.body(cube).unwrap();
//! assert!(cube.joints.iter().all(|j| j.position.y >= j.size() - 8));
//! ```

#![no_std]

pub mod math;
pub mod vec;
pub mod rotation;
pub mod body;
pub mod template;
pub mod environment;
pub mod primitives;
pub mod collision;
pub mod world;
pub mod raycast;
pub mod debug;
pub mod hash;
pub mod observer;
pub mod config;
pub mod error;

// Re-export primary API
pub use body::{Body, BodyFlags, BodyMut, BodyRef, Connection, Joint};
pub use collision::{AllowAll, CollisionFilter, Contact, FilterFn};
pub use config::Config;
pub use environment::Environment;
pub use error::PhysicsError;
pub use math::{Unit, UnitReduced, F};
pub use observer::{NoOpStepObserver, StepObserver};
pub use raycast::BodyHit;
pub use template::Template;
pub use vec::{ApproxLength, ExactLength, Metric, Vec3};
pub use world::World;

