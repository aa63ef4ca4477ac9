//! Per-particle sphere constraints: motion constraints keep a particle
//! inside its sphere, separation constraints keep it outside.

use glam::Vec4;

use crate::math::{blend, EPSILON};

/// Selects the sphere each particle is tested against this iteration.
///
/// With no target the start spheres are used as is.
#[inline]
fn sphere(start: &[Vec4], target: &[Vec4], i: usize, alpha: Option<f32>) -> Vec4 {
    if target.is_empty() {
        start[i]
    } else {
        blend(start, target, i, alpha)
    }
}

/// Pull particles back inside their (scaled and biased) spheres.
///
/// A sphere with non-positive radius pins the particle for the remainder
/// of the iteration by zeroing its current inverse mass.
pub fn constrain_motion(
    particles: &mut [Vec4],
    start: &[Vec4],
    target: &[Vec4],
    alpha: Option<f32>,
    scale: f32,
    bias: f32,
    stiffness: f32,
) {
    if start.is_empty() {
        return;
    }
    for (i, p) in particles.iter_mut().enumerate() {
        let s = sphere(start, target, i, alpha);
        let d = s.truncate() - p.truncate();
        let radius = (s.w * scale + bias).max(0.0);
        let slack = 1.0 - radius / (EPSILON + d.length_squared()).sqrt();
        if slack > 0.0 {
            if radius <= 0.0 {
                p.w = 0.0;
            }
            *p += (d * (slack * stiffness)).extend(0.0);
        }
    }
}

/// Push particles out of their separation spheres.
pub fn constrain_separation(particles: &mut [Vec4], start: &[Vec4], target: &[Vec4], alpha: Option<f32>) {
    if start.is_empty() {
        return;
    }
    for (i, p) in particles.iter_mut().enumerate() {
        let s = sphere(start, target, i, alpha);
        let d = s.truncate() - p.truncate();
        let slack = 1.0 - s.w / (EPSILON + d.length_squared()).sqrt();
        if slack < 0.0 {
            *p += (d * slack).extend(0.0);
        }
    }
}
