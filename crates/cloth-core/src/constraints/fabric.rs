use glam::Vec4;

use crate::config::PhaseConfig;
use crate::fabric::Fabric;
use crate::math::{safe_log2, to_log_coefficient, EPSILON};

/// Phase configuration in the form the solver consumes.
///
/// Stiffness and multiplier are stored as base-2 logarithms so they can be
/// compounded to the iteration time step; limits are stored as the relative
/// error at which they engage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverPhaseConfig {
    pub phase: u32,
    pub log_stiffness: f32,
    pub log_stiffness_multiplier: f32,
    pub compression_limit: f32,
    pub stretch_limit: f32,
}

impl SolverPhaseConfig {
    pub fn from_config(config: &PhaseConfig) -> Self {
        Self {
            phase: config.phase_index as u32,
            log_stiffness: to_log_coefficient(config.stiffness),
            log_stiffness_multiplier: safe_log2(config.stiffness_multiplier),
            // negative for compression, positive for stretch
            compression_limit: 1.0 - 1.0 / config.compression_limit,
            stretch_limit: 1.0 - 1.0 / config.stretch_limit,
        }
    }
}

/// Gauss-Seidel relaxation of every configured phase.
///
/// `exponent` is the stiffness frequency times the iteration time step.
pub fn solve_fabric(
    particles: &mut [Vec4],
    fabric: &Fabric,
    configs: &[SolverPhaseConfig],
    exponent: f32,
) {
    let indices = fabric.indices();
    let rest_values = fabric.rest_values();
    let stiffness_values = fabric.stiffness_values();

    for config in configs {
        let stiffness = 1.0 - (config.log_stiffness * exponent).exp2();
        let multiplier = 1.0 - (config.log_stiffness_multiplier * exponent).exp2();
        let compression = config.compression_limit;
        let stretch = config.stretch_limit;
        let use_multiplier = multiplier != 0.0 || compression != 0.0 || stretch != 0.0;

        for k in fabric.phase_range(config.phase as usize) {
            let i = indices[2 * k] as usize;
            let j = indices[2 * k + 1] as usize;
            let pi = particles[i];
            let pj = particles[j];

            let h = (pj - pi).truncate();
            let len_sq = EPSILON + h.length_squared();
            let rest = rest_values[k];
            let mut error = if rest > EPSILON {
                1.0 - rest / len_sq.sqrt()
            } else {
                0.0
            };
            if use_multiplier {
                error -= multiplier * compression.max(error.min(stretch));
            }

            let st = match stiffness_values.get(k) {
                Some(&log) => 1.0 - (exponent * log).exp2(),
                None => stiffness,
            };
            let ex = error * st / (EPSILON + pi.w + pj.w);
            let correction = (h * ex).extend(0.0);

            particles[i] = pi + correction * pi.w;
            particles[j] = pj - correction * pj.w;
        }
    }
}
