//! Step observer trait for monitoring the world step.

use crate::math::Unit;
use crate::vec::Vec3;

/// Hooks called while [`World::step`](crate::world::World::step) runs.
///
/// Implement this trait to watch the simulation (debug overlays, sound
/// triggers, profiling). All methods have default no-op implementations.
pub trait StepObserver {
    /// Called after the joints of `body` have been moved by their velocities.
    fn on_integrate(&mut self, _body: usize) {}

    /// Called after `body` went through environment collision resolution.
    fn on_environment_collision(&mut self, _body: usize, _collided: bool) {}

    /// Called with the summed absolute connection tension of `body`.
    fn on_body_tension(&mut self, _body: usize, _tension: Unit) {}

    /// Called when bodies `body1` and `body2` touched.
    fn on_body_collision(&mut self, _body1: usize, _body2: usize) {}

    /// Called when a joint could not be pushed out of the environment and
    /// was rolled back and stopped.
    fn on_unresolved(&mut self, _body: usize, _joint: usize, _position: Vec3) {}

    /// Called when `body` falls asleep.
    fn on_deactivate(&mut self, _body: usize) {}

    /// Called when a simulation step is fully complete.
    fn on_step_complete(&mut self) {}
}

/// A no-op observer. Use when no observation is needed.
pub struct NoOpStepObserver;

impl StepObserver for NoOpStepObserver {}
