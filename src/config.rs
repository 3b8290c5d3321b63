//! Tuning constants of the simulation.

use crate::math::{Unit, F};

/// Tuning constants read by the world step and the collision routines.
///
/// # Builder Pattern
/// ```
/// use fixbody::config::Config;
///
/// let config = Config::new()
///     .with_low_speed(20)
///     .with_deactivate_after(200)
///     .with_collision_resolution_iterations(8);
///
/// assert_eq!(config.light_deactivation, 180);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Average joint speed at or below which a body counts as resting.
    /// Default: 30.
    pub low_speed: Unit,
    /// Average connection tension above which extra reshape passes run.
    /// Default: 20.
    pub reshape_tension_limit: Unit,
    /// Extra reshape passes for a body over the tension limit. Default: 3.
    pub reshape_iterations: u8,
    /// Consecutive resting ticks before a body falls asleep. Default: 128.
    pub deactivate_after: u8,
    /// Resting counter given to bodies woken by a collision, so they fall
    /// back asleep sooner. Default: `deactivate_after - deactivate_after / 10`.
    pub light_deactivation: u8,
    /// Divides the tension correction applied to connected joints.
    /// Default: 32.
    pub tension_acceleration_divider: Unit,
    /// Tension dead zone below which no correction is applied. Default: 5.
    pub tension_acceleration_threshold: Unit,
    /// Tension above which the correction is doubled. Default: 15.
    pub tension_greater_acceleration_threshold: Unit,
    /// Attempts per phase when pushing a joint out of the environment.
    /// Default: 16.
    pub collision_resolution_iterations: u8,
    /// Extra distance added when separating colliding joints. Default: 8.
    pub collision_resolution_margin: Unit,
    /// Extra environment passes for non-rotating bodies. Default: 8.
    pub nonrotating_resolve_attempts: u8,
    /// Measure net speed with the summed-component approximation.
    /// Default: true.
    pub approximate_net_speed: bool,
}

impl Config {
    pub fn new() -> Self {
        let deactivate_after = 128;

        Config {
            low_speed: 30,
            reshape_tension_limit: 20,
            reshape_iterations: 3,
            deactivate_after,
            light_deactivation: light_deactivation(deactivate_after),
            tension_acceleration_divider: 32,
            tension_acceleration_threshold: 5,
            tension_greater_acceleration_threshold: 15,
            collision_resolution_iterations: 16,
            collision_resolution_margin: F / 64,
            nonrotating_resolve_attempts: 8,
            approximate_net_speed: true,
        }
    }

    pub fn with_low_speed(mut self, low_speed: Unit) -> Self {
        self.low_speed = low_speed;
        self
    }

    pub fn with_reshape_tension_limit(mut self, limit: Unit) -> Self {
        self.reshape_tension_limit = limit;
        self
    }

    pub fn with_reshape_iterations(mut self, iterations: u8) -> Self {
        self.reshape_iterations = iterations;
        self
    }

    /// Also resets `light_deactivation` to its derived value.
    pub fn with_deactivate_after(mut self, ticks: u8) -> Self {
        self.deactivate_after = ticks;
        self.light_deactivation = light_deactivation(ticks);
        self
    }

    pub fn with_light_deactivation(mut self, ticks: u8) -> Self {
        self.light_deactivation = ticks;
        self
    }

    pub fn with_tension_acceleration_divider(mut self, divider: Unit) -> Self {
        self.tension_acceleration_divider = divider.max(1);
        self
    }

    pub fn with_tension_acceleration_thresholds(mut self, threshold: Unit, greater: Unit) -> Self {
        self.tension_acceleration_threshold = threshold;
        self.tension_greater_acceleration_threshold = greater;
        self
    }

    pub fn with_collision_resolution_iterations(mut self, iterations: u8) -> Self {
        self.collision_resolution_iterations = iterations;
        self
    }

    pub fn with_collision_resolution_margin(mut self, margin: Unit) -> Self {
        self.collision_resolution_margin = margin;
        self
    }

    pub fn with_nonrotating_resolve_attempts(mut self, attempts: u8) -> Self {
        self.nonrotating_resolve_attempts = attempts;
        self
    }

    pub fn with_approximate_net_speed(mut self, approximate: bool) -> Self {
        self.approximate_net_speed = approximate;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn light_deactivation(deactivate_after: u8) -> u8 {
    deactivate_after - deactivate_after / 10
}
