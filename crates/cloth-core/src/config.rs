use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::cloth::Cloth;
use crate::error::ClothResult;

/// User-facing parameters of one cloth, in plain (not log-scaled) units.
///
/// Coefficients in `[0, 1]` are the fraction applied per stiffness period
/// (1 / `stiffness_frequency` seconds).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClothConfig {
    pub gravity: Vec3,
    pub damping: Vec3,
    pub linear_drag: Vec3,
    pub angular_drag: Vec3,
    pub linear_inertia: Vec3,
    pub angular_inertia: Vec3,
    pub centrifugal_inertia: Vec3,
    /// Iterations per second.
    pub solver_frequency: f32,
    pub stiffness_frequency: f32,

    pub tether_stiffness: f32,
    pub tether_scale: f32,

    pub motion_constraint_scale: f32,
    pub motion_constraint_bias: f32,
    pub motion_constraint_stiffness: f32,

    pub wind_velocity: Vec3,
    pub drag_coefficient: f32,
    pub lift_coefficient: f32,
    pub fluid_density: f32,

    pub friction: f32,
    pub collision_mass_scale: f32,
    pub continuous_collision: bool,

    pub self_collision_distance: f32,
    pub self_collision_stiffness: f32,

    /// Particle speed below which a sleep test passes.
    pub sleep_threshold: f32,
    /// Simulated milliseconds between sleep tests.
    pub sleep_test_interval: u32,
    pub sleep_after_count: u32,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::ZERO,
            damping: Vec3::ZERO,
            linear_drag: Vec3::ZERO,
            angular_drag: Vec3::ZERO,
            linear_inertia: Vec3::ONE,
            angular_inertia: Vec3::ONE,
            centrifugal_inertia: Vec3::ONE,
            solver_frequency: 300.0,
            stiffness_frequency: 10.0,

            tether_stiffness: 1.0,
            tether_scale: 1.0,

            motion_constraint_scale: 1.0,
            motion_constraint_bias: 0.0,
            motion_constraint_stiffness: 1.0,

            wind_velocity: Vec3::ZERO,
            drag_coefficient: 0.0,
            lift_coefficient: 0.0,
            fluid_density: 1.0,

            friction: 0.0,
            collision_mass_scale: 0.0,
            continuous_collision: false,

            self_collision_distance: 0.0,
            self_collision_stiffness: 1.0,

            sleep_threshold: 0.0,
            sleep_test_interval: u32::MAX,
            sleep_after_count: u32::MAX,
        }
    }
}

impl ClothConfig {
    /// Light, flowing fabric: little damping, catches the wind.
    pub fn silk() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: Vec3::splat(0.05),
            linear_drag: Vec3::splat(0.05),
            angular_drag: Vec3::splat(0.05),
            drag_coefficient: 0.4,
            lift_coefficient: 0.3,
            friction: 0.1,
            self_collision_distance: 0.01,
            self_collision_stiffness: 0.5,
            sleep_threshold: 0.01,
            sleep_test_interval: 100,
            sleep_after_count: 10,
            ..Self::default()
        }
    }

    /// Heavy, stiff fabric: strongly damped, grips colliders.
    pub fn denim() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: Vec3::splat(0.2),
            linear_drag: Vec3::splat(0.1),
            angular_drag: Vec3::splat(0.1),
            solver_frequency: 240.0,
            drag_coefficient: 0.1,
            lift_coefficient: 0.05,
            friction: 0.5,
            collision_mass_scale: 0.2,
            self_collision_distance: 0.02,
            self_collision_stiffness: 1.0,
            sleep_threshold: 0.02,
            sleep_test_interval: 100,
            sleep_after_count: 5,
            ..Self::default()
        }
    }

    /// Push every value through the cloth's validating setters.
    pub fn apply(&self, cloth: &mut Cloth) -> ClothResult<()> {
        cloth.set_gravity(self.gravity);
        cloth.set_damping(self.damping)?;
        cloth.set_linear_drag(self.linear_drag)?;
        cloth.set_angular_drag(self.angular_drag)?;
        cloth.set_linear_inertia(self.linear_inertia);
        cloth.set_angular_inertia(self.angular_inertia);
        cloth.set_centrifugal_inertia(self.centrifugal_inertia);
        cloth.set_solver_frequency(self.solver_frequency)?;
        cloth.set_stiffness_frequency(self.stiffness_frequency);

        cloth.set_tether_constraint_stiffness(self.tether_stiffness)?;
        cloth.set_tether_constraint_scale(self.tether_scale);

        cloth.set_motion_constraint_scale_bias(self.motion_constraint_scale, self.motion_constraint_bias);
        cloth.set_motion_constraint_stiffness(self.motion_constraint_stiffness)?;

        cloth.set_wind_velocity(self.wind_velocity);
        cloth.set_drag_coefficient(self.drag_coefficient)?;
        cloth.set_lift_coefficient(self.lift_coefficient)?;
        cloth.set_fluid_density(self.fluid_density)?;

        cloth.set_friction(self.friction);
        cloth.set_collision_mass_scale(self.collision_mass_scale);
        cloth.enable_continuous_collision(self.continuous_collision);

        cloth.set_self_collision_distance(self.self_collision_distance);
        cloth.set_self_collision_stiffness(self.self_collision_stiffness)?;

        cloth.set_sleep_threshold(self.sleep_threshold);
        cloth.set_sleep_test_interval(self.sleep_test_interval);
        cloth.set_sleep_after_count(self.sleep_after_count);
        Ok(())
    }
}

/// Collision between particles of different cloths.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterCollisionConfig {
    /// Minimum distance kept between particles of different cloths.
    /// Zero disables inter-collision.
    pub distance: f32,
    pub stiffness: f32,
    pub iterations: u32,
}

impl Default for InterCollisionConfig {
    fn default() -> Self {
        Self {
            distance: 0.0,
            stiffness: 1.0,
            iterations: 1,
        }
    }
}

impl InterCollisionConfig {
    pub fn is_enabled(&self) -> bool {
        self.iterations > 0 && self.distance > 0.0 && self.stiffness > 0.0
    }
}

/// Solver settings for one fabric phase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub phase_index: u16,
    /// Fraction of the constraint error removed per stiffness period.
    pub stiffness: f32,
    /// Extra stiffness applied outside the compression/stretch limits.
    pub stiffness_multiplier: f32,
    /// Relative length below which the multiplier engages (<= 1).
    pub compression_limit: f32,
    /// Relative length above which the multiplier engages (>= 1).
    pub stretch_limit: f32,
}

impl PhaseConfig {
    /// Fully stiff phase with no limits.
    pub fn new(phase_index: u16) -> Self {
        Self {
            phase_index,
            stiffness: 1.0,
            stiffness_multiplier: 1.0,
            compression_limit: 1.0,
            stretch_limit: 1.0,
        }
    }
}
