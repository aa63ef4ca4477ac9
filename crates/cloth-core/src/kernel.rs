//! One cloth through one frame.
//!
//! Every iteration runs the same fixed pipeline: integrate, wind, motion
//! constraints, tethers, fabric, separation constraints, collision, self
//! collision and the sleep test. The steps are strictly sequential; nothing
//! here fails or allocates beyond the scratch buffers.
//!
//! Inverse mass bookkeeping (`w` of each particle):
//! - integrate restores a zeroed `current.w` from `previous.w`
//! - a motion constraint with non-positive radius zeroes `current.w`
//! - the collision bounds pass restores `current.w` if it is positive
//! - collision with mass scaling shrinks `current.w`
//! - `previous.w` always holds the user's inverse mass

use glam::{Vec3, Vec4};

use crate::cloth::Cloth;
use crate::collision::Collision;
use crate::constraints::fabric::solve_fabric;
use crate::constraints::motion::{constrain_motion, constrain_separation};
use crate::constraints::tether::constrain_tethers;
use crate::forces::wind::{apply_wind, WindParams};
use crate::iteration_state::{IterationState, IterationStateFactory};
use crate::math::compound;
use crate::scratch::Scratch;
use crate::self_collision::self_collide;

/// Run every iteration of the frame described by `factory`.
pub fn simulate_cloth(cloth: &mut Cloth, factory: &IterationStateFactory, scratch: &mut Scratch) {
    scratch.reset(cloth);
    let mut state = factory.create(cloth);
    let mut collision = Collision::new(cloth, &mut scratch.collision);

    while state.remaining_iterations > 0 {
        integrate(cloth, &state);
        apply_wind_forces(cloth, &state);
        constrain_motion_spheres(cloth, &state);
        constrain_tether_lengths(cloth, &state);
        solve_fabric(
            cloth.particles.current_mut(),
            &cloth.fabric,
            &cloth.phase_configs,
            cloth.stiffness_frequency * state.iter_dt,
        );
        constrain_separation(
            cloth.particles.current_mut(),
            cloth.separation_constraints.start(),
            cloth.separation_constraints.target(),
            state.blend_alpha(),
        );
        collision.collide(cloth, &state);
        self_collide(cloth, &state, &mut scratch.sweep);
        update_sleep_state(cloth, &state);

        state.update();
    }
}

/// Verlet step with damping, inertia and gravity folded into the state.
///
/// Immovable particles keep their position but still advance the previous
/// position, so their implied velocity follows the local frame.
pub(crate) fn integrate(cloth: &mut Cloth, state: &IterationState) {
    let accelerations = &cloth.particle_accelerations;
    let sqr_iter_dt = state.iter_dt * state.iter_dt;
    let (cur, prev) = cloth.particles.split_mut();

    for (i, (c, p)) in cur.iter_mut().zip(prev.iter_mut()).enumerate() {
        if c.w <= 0.0 {
            c.w = p.w;
        }
        let finite = p.w > 0.0;

        let mut acceleration = state.cur_bias;
        if let Some(a) = accelerations.get(i) {
            acceleration += a.truncate() * sqr_iter_dt;
        }

        let position = c.truncate();
        let prev_position = p.truncate();
        let delta = if state.is_turning {
            state.cur_matrix * position + state.prev_matrix * prev_position + acceleration
        } else {
            (position - prev_position) * state.scale + acceleration
        };

        let prev_bias = if finite { state.prev_bias } else { Vec3::ZERO };
        *p = (position + prev_bias).extend(p.w);
        if finite {
            *c = (position + delta).extend(c.w);
        }
    }
}

fn apply_wind_forces(cloth: &mut Cloth, state: &IterationState) {
    let exponent = cloth.stiffness_frequency * state.iter_dt;
    let params = WindParams {
        drag: compound(cloth.drag_log_coefficient, exponent),
        lift: compound(cloth.lift_log_coefficient, exponent),
        fluid_density: cloth.fluid_density * 0.5,
        iter_dt: state.iter_dt,
        wind: state.wind,
        rotation: state.is_turning.then_some(state.rotation),
    };
    let triangles = cloth.fabric.triangles();
    let (cur, prev) = cloth.particles.split_mut();
    apply_wind(cur, prev, triangles, &params);
}

fn constrain_motion_spheres(cloth: &mut Cloth, state: &IterationState) {
    if cloth.motion_constraints.is_empty() {
        return;
    }
    let stiffness = compound(
        cloth.motion_log_stiffness,
        cloth.stiffness_frequency * state.iter_dt,
    );
    constrain_motion(
        cloth.particles.current_mut(),
        cloth.motion_constraints.start(),
        cloth.motion_constraints.target(),
        state.blend_alpha(),
        cloth.motion_scale,
        cloth.motion_bias,
        stiffness,
    );
}

fn constrain_tether_lengths(cloth: &mut Cloth, state: &IterationState) {
    let stiffness = compound(
        cloth.tether_log_stiffness,
        cloth.stiffness_frequency * state.iter_dt,
    );
    constrain_tethers(
        cloth.particles.current_mut(),
        cloth.fabric.anchors(),
        cloth.fabric.tether_lengths(),
        cloth.tether_scale,
        stiffness,
    );
}

/// Count consecutive sleep tests in which no particle moved faster than
/// the sleep threshold.
pub(crate) fn update_sleep_state(cloth: &mut Cloth, state: &IterationState) {
    let elapsed_ms = ((state.iter_dt * 1000.0) as u32).max(1);
    cloth.sleep_test_counter = cloth.sleep_test_counter.saturating_add(elapsed_ms);
    if cloth.sleep_test_counter < cloth.sleep_test_interval {
        return;
    }

    let max_delta = max_delta(cloth.particles.previous(), cloth.particles.current());
    cloth.sleep_pass_counter = cloth.sleep_pass_counter.saturating_add(1);
    let threshold = cloth.sleep_threshold * state.iter_dt;
    if max_delta.cmpge(Vec3::splat(threshold)).any() {
        cloth.sleep_pass_counter = 0;
    }
    cloth.sleep_test_counter -= cloth.sleep_test_interval;
}

/// Per-axis upper bound of particle movement over the last iteration.
fn max_delta(prev: &[Vec4], cur: &[Vec4]) -> Vec3 {
    cur.iter()
        .zip(prev)
        .fold(Vec3::ZERO, |m, (c, p)| m.max((*c - *p).truncate().abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_delta_is_per_axis() {
        let prev = [Vec4::ZERO, Vec4::ZERO];
        let cur = [Vec4::new(1.0, -3.0, 0.0, 1.0), Vec4::new(-2.0, 0.5, 0.25, 1.0)];
        assert_eq!(max_delta(&prev, &cur), Vec3::new(2.0, 3.0, 0.25));
    }
}
