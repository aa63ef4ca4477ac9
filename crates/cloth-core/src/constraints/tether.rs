use glam::{Vec3, Vec4};

use crate::math::EPSILON;

/// Pull each particle towards its anchors when farther than the tether
/// length.
///
/// Tether `t` belongs to particle `t % n`; all of a particle's tethers are
/// averaged before `stiffness` is applied.
pub fn constrain_tethers(
    particles: &mut [Vec4],
    anchors: &[u32],
    lengths: &[f32],
    scale: f32,
    stiffness: f32,
) {
    let n = particles.len();
    if stiffness == 0.0 || anchors.is_empty() || n == 0 {
        return;
    }
    let stiffness = n as f32 * stiffness / anchors.len() as f32;

    for i in 0..n {
        let position = particles[i].truncate();
        let mut offset = Vec3::ZERO;
        for t in (i..anchors.len()).step_by(n) {
            let anchor = particles[anchors[t] as usize].truncate();
            let delta = anchor - position;
            let radius = lengths[t] * scale;
            let slack = 1.0 - radius / (EPSILON + delta.length_squared()).sqrt();
            offset += delta * slack.max(0.0);
        }
        particles[i] += (offset * stiffness).extend(0.0);
    }
}
