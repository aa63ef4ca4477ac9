//! Per-frame and per-iteration integration transforms.
//!
//! The factory runs once per frame: it splits the frame into iterations,
//! derives the local frame's linear and angular velocity from the change in
//! rigid motion, and commits the target motion. [`IterationStateFactory::create`]
//! then folds gravity, inertia, damping and drag into a bias vector and a
//! pair of 3x3 matrices applied to the current and previous positions.

use glam::{Mat3, Quat, Vec3};

use crate::cloth::Cloth;
use crate::math::{exp2_vec, quat_exp, quat_log, star};

pub struct IterationStateFactory {
    num_iterations: u32,
    inv_num_iterations: f32,
    iter_dt: f32,
    /// Ratio of this frame's iteration time step to the last one.
    iter_dt_ratio: f32,
    iter_dt_average: f32,
    current_rotation: Quat,
    prev_linear_velocity: Vec3,
    prev_angular_velocity: Vec3,
}

impl IterationStateFactory {
    /// Start a frame of length `frame_dt`, advancing the cloth's motion.
    pub fn new(cloth: &mut Cloth, frame_dt: f32) -> Self {
        let num_iterations = cloth.num_iterations(frame_dt);
        let inv_num_iterations = 1.0 / num_iterations as f32;
        let iter_dt = frame_dt * inv_num_iterations;

        let iter_dt_ratio = if cloth.prev_iter_dt != 0.0 {
            iter_dt / cloth.prev_iter_dt
        } else {
            1.0
        };
        let iter_dt_average = if cloth.iter_dt_average.is_empty() {
            iter_dt
        } else {
            cloth.iter_dt_average.average()
        };

        let current_rotation = cloth.current_motion.rotation;
        let prev_linear_velocity = cloth.linear_velocity;
        let prev_angular_velocity = cloth.angular_velocity;

        if !cloth.ignore_velocity_discontinuity && frame_dt > 0.0 {
            let inv_dt = 1.0 / frame_dt;
            cloth.linear_velocity =
                (cloth.target_motion.translation - cloth.current_motion.translation) * inv_dt;
            let delta = cloth.target_motion.rotation * cloth.current_motion.rotation.conjugate();
            cloth.angular_velocity = quat_log(delta) * inv_dt;
        }

        cloth.ignore_velocity_discontinuity = false;
        cloth.prev_iter_dt = iter_dt;
        cloth.iter_dt_average.push(num_iterations, iter_dt);
        cloth.current_motion = cloth.target_motion;

        Self {
            num_iterations,
            inv_num_iterations,
            iter_dt,
            iter_dt_ratio,
            iter_dt_average,
            current_rotation,
            prev_linear_velocity,
            prev_angular_velocity,
        }
    }

    pub fn num_iterations(&self) -> u32 {
        self.num_iterations
    }

    pub fn inv_num_iterations(&self) -> f32 {
        self.inv_num_iterations
    }

    pub fn iter_dt(&self) -> f32 {
        self.iter_dt
    }

    /// Build the state for the first iteration of the frame.
    pub fn create(&self, cloth: &Cloth) -> IterationState {
        let n = self.num_iterations as f32;
        let inv = self.inv_num_iterations;
        let iter_dt = self.iter_dt;

        let damp_exponent = cloth.stiffness_frequency * iter_dt;
        let translation = cloth.linear_velocity * iter_dt;
        let gravity = cloth.gravity * (self.iter_dt_average * self.iter_dt_average);

        let damp_scale = exp2_vec(cloth.log_damping * damp_exponent);
        let first_damp_scale = damp_scale * self.iter_dt_ratio;

        let linear_drag =
            (Vec3::ONE - exp2_vec(cloth.linear_log_drag * damp_exponent)) * translation;
        let linear_inertia =
            cloth.linear_inertia * iter_dt * (self.prev_linear_velocity - cloth.linear_velocity);
        // Spread the inertia step over the frame so its sum matches.
        let cur_linear_inertia = linear_inertia * ((n + 1.0) * 0.5 * inv);

        let inv_rotation = Mat3::from_quat(self.current_rotation.conjugate());

        let mut state = IterationState {
            cur_bias: inv_rotation * (cur_linear_inertia + gravity - linear_drag),
            prev_bias: inv_rotation * (linear_inertia - cur_linear_inertia),
            wind: inv_rotation * (translation - cloth.wind * iter_dt),
            rotation: Mat3::IDENTITY,
            prev_matrix: Mat3::ZERO,
            cur_matrix: Mat3::ZERO,
            scale: first_damp_scale,
            damp_scale_update: damp_scale - first_damp_scale,
            is_turning: false,
            remaining_iterations: self.num_iterations,
            inv_num_iterations: inv,
            iter_dt,
            num_iterations: self.num_iterations,
        };

        state.is_turning = self.prev_angular_velocity.length_squared()
            + cloth.angular_velocity.length_squared()
            > 0.0;
        if !state.is_turning {
            return state;
        }

        let cur_angular_velocity = inv_rotation * cloth.angular_velocity;
        let prev_angular_velocity = inv_rotation * self.prev_angular_velocity;

        let cur_inv_angle = cur_angular_velocity * -iter_dt;
        let prev_inv_angle = prev_angular_velocity * -iter_dt;

        let cur_rotation = quat_exp(cur_inv_angle);
        let mut cur_matrix = Mat3::from_quat(cur_rotation);
        let mut prev_matrix = Mat3::from_quat(quat_exp(prev_inv_angle) * cur_rotation);
        state.rotation = cur_matrix;

        let angular_drag = Vec3::ONE - exp2_vec(cloth.angular_log_drag * damp_exponent);
        let eps = f32::MIN_POSITIVE.sqrt();
        let velocity_sq = cur_angular_velocity.length_squared() + eps;
        let drag_sq = (cur_angular_velocity * angular_drag).length_squared() + eps;
        let centrifugal_sq = (cur_angular_velocity * cloth.centrifugal_inertia).length_squared() + eps;
        let acceleration = cur_angular_velocity - prev_angular_velocity;
        let acceleration_sq = acceleration.length_squared() + eps;
        let inertia_sq = (acceleration * cloth.angular_inertia).length_squared() + eps;

        let drag_scale = drag_sq / (velocity_sq * drag_sq).sqrt();
        let inertia_scale = inv * inertia_sq / (acceleration_sq * inertia_sq).sqrt();

        // Empirical: part of the centrifugal force is already carried by the
        // inertia term, the remainder scales with (2n - 1) / n.
        let centrifugal_alpha = (2.0 * n - 1.0) * inv;
        let centrifugal_scale =
            centrifugal_alpha * centrifugal_sq / (velocity_sq * centrifugal_sq).sqrt() - inertia_scale;

        let centrifugal_velocity = (prev_inv_angle + cur_inv_angle) * 0.5;
        let centrifugal_sqr_length = centrifugal_velocity.length_squared() * centrifugal_scale;
        let coriolis = star(centrifugal_velocity * centrifugal_scale);

        for j in 0..3 {
            let centrifugal_j = -centrifugal_velocity[j] * centrifugal_scale;
            let damping = first_damp_scale[j];
            for i in 0..3 {
                let cor = coriolis.col(j)[i];
                let cen = centrifugal_velocity[i] * centrifugal_j;
                let cur = cur_matrix.col(j)[i];
                let prev = prev_matrix.col(j)[i];
                prev_matrix.col_mut(j)[i] =
                    cen - cor + cur * (inertia_scale - damping) - prev * inertia_scale;
                cur_matrix.col_mut(j)[i] = cen + cor + cur * (inertia_scale + damping + drag_scale);
            }
            cur_matrix.col_mut(j)[j] += centrifugal_sqr_length - inertia_scale - drag_scale;
            prev_matrix.col_mut(j)[j] += centrifugal_sqr_length;
        }

        state.cur_matrix = cur_matrix;
        state.prev_matrix = prev_matrix;
        state
    }
}

/// Integration transform for one iteration, advanced by [`IterationState::update`].
#[derive(Clone, Debug)]
pub struct IterationState {
    /// Added to the position change each iteration.
    pub cur_bias: Vec3,
    /// Added to the previous position of movable particles.
    pub prev_bias: Vec3,
    /// Frame translation minus wind, in local space, per iteration.
    pub wind: Vec3,
    /// Per-iteration rotation of the local frame.
    pub rotation: Mat3,
    pub prev_matrix: Mat3,
    pub cur_matrix: Mat3,
    /// Damping scale used instead of the matrices when not turning.
    pub scale: Vec3,
    damp_scale_update: Vec3,
    pub is_turning: bool,
    pub remaining_iterations: u32,
    pub num_iterations: u32,
    pub inv_num_iterations: f32,
    pub iter_dt: f32,
}

impl IterationState {
    /// Interpolation factor at the start of the current iteration.
    pub fn previous_alpha(&self) -> f32 {
        1.0 - self.remaining_iterations as f32 * self.inv_num_iterations
    }

    /// Interpolation factor at the end of the current iteration.
    pub fn current_alpha(&self) -> f32 {
        self.previous_alpha() + self.inv_num_iterations
    }

    pub fn is_last_iteration(&self) -> bool {
        self.remaining_iterations == 1
    }

    /// Alpha for start/target blending, `None` meaning "use the target".
    pub(crate) fn blend_alpha(&self) -> Option<f32> {
        if self.is_last_iteration() {
            None
        } else {
            Some(self.current_alpha())
        }
    }

    /// Advance to the next iteration.
    pub fn update(&mut self) {
        if self.is_turning {
            self.cur_bias = self.rotation * self.cur_bias;
            self.prev_bias = self.rotation * self.prev_bias;
            self.wind = self.rotation * self.wind;

            // Only the first iteration carries the time step ratio.
            for i in 0..3 {
                let r = self.rotation.col(i) * self.damp_scale_update;
                *self.prev_matrix.col_mut(i) -= r;
                *self.cur_matrix.col_mut(i) += r;
            }
        } else {
            self.scale += self.damp_scale_update;
        }
        self.damp_scale_update = Vec3::ZERO;
        self.remaining_iterations = self.remaining_iterations.saturating_sub(1);
    }
}
