use glam::{Mat3, Vec3, Vec4};

use crate::math::EPSILON;

/// Aerodynamic coefficients for one iteration, already compounded to the
/// iteration time step.
#[derive(Clone, Copy, Debug)]
pub struct WindParams {
    pub drag: f32,
    pub lift: f32,
    /// Half the user density; the triangle normal length is twice the area.
    pub fluid_density: f32,
    pub iter_dt: f32,
    /// Frame translation minus wind over one iteration, in local space.
    pub wind: Vec3,
    /// Local frame rotation over one iteration when turning.
    pub rotation: Option<Mat3>,
}

/// Apply drag and lift to every triangle.
///
/// The impulse scales with the current (not rest) triangle area, so stretched
/// cloth catches more wind.
pub fn apply_wind(current: &mut [Vec4], previous: &[Vec4], triangles: &[u32], params: &WindParams) {
    if params.drag == 0.0 && params.lift == 0.0 {
        return;
    }
    let one_third = 1.0 / 3.0;

    for t in triangles.chunks_exact(3) {
        let (i0, i1, i2) = (t[0] as usize, t[1] as usize, t[2] as usize);
        let c0 = current[i0];
        let c1 = current[i1];
        let c2 = current[i2];

        let center = ((c0 + c1 + c2) * one_third).truncate();
        let prev_center = ((previous[i0] + previous[i1] + previous[i2]) * one_third).truncate();

        let mut delta = center - prev_center + params.wind;
        if let Some(rotation) = params.rotation {
            delta = center + rotation * (delta - center);
        }

        let normal = (c2 - c0).truncate().cross((c1 - c0).truncate());
        let double_area = normal.length();
        let delta_sq = delta.length_squared();
        if delta_sq < EPSILON || double_area == 0.0 {
            continue;
        }
        let normal = normal / double_area;
        let delta_length = delta_sq.sqrt();
        let inv_length = 1.0 / delta_length;

        let cos_theta = normal.dot(delta) * inv_length;
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        // orthogonal to delta, in the delta-normal plane, same length as delta
        let lift_dir = delta.cross(normal).cross(delta * inv_length);

        let lift = lift_dir * (params.lift * cos_theta * sin_theta * delta_length / params.iter_dt);
        let drag = delta * (params.drag * cos_theta.abs() * delta_length / params.iter_dt);
        let impulse = (drag + lift) * (params.fluid_density * double_area);

        for &i in &[i0, i1, i2] {
            let w = current[i].w;
            current[i] -= (impulse * w).extend(0.0);
        }
    }
}
