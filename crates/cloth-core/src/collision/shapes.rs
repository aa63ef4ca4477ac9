//! Per-iteration collision shape data derived from the user's primitives.

use glam::{Vec3, Vec4};

use crate::cloth::Capsule;
use crate::math::lerp4;

/// Tapered capsule between two collision spheres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConeData {
    pub center: Vec3,
    /// Cone radius at `center`.
    pub radius: f32,
    /// Unit axis from the first to the second sphere.
    pub axis: Vec3,
    /// Radius change per unit length along the axis.
    pub slope: f32,
    pub sqr_cosine: f32,
    pub half_length: f32,
    /// Grid bit of the first sphere.
    pub first_mask: u32,
    /// Grid bits of both spheres.
    pub both_mask: u32,
}

/// Collision triangle with the terms of the closest-point solve precomputed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TriangleData {
    pub base: Vec3,
    pub edge0: Vec3,
    pub edge1: Vec3,
    pub normal: Vec3,
    pub edge0_dot_edge1: f32,
    pub edge0_sqr_length: f32,
    pub edge1_sqr_length: f32,
    pub inv_det: f32,
    pub inv_denom: f32,
    pub inv_edge0_sqr_length: f32,
    pub inv_edge1_sqr_length: f32,
}

/// Spheres at `alpha` between start and target, radius clamped to zero.
pub fn generate_spheres(out: &mut Vec<Vec4>, start: &[Vec4], target: &[Vec4], alpha: Option<f32>) {
    out.clear();
    out.extend(start.iter().zip(target).map(|(&s, &t)| {
        let mut sphere = match alpha {
            Some(a) => lerp4(s, t, a),
            None => t,
        };
        sphere.w = sphere.w.max(0.0);
        sphere
    }));
}

/// Derive capsule cones from already generated spheres.
///
/// A capsule whose spheres contain one another has no cone surface and
/// gets a zero radius, which keeps it out of the acceleration grid.
pub fn generate_cones(out: &mut Vec<ConeData>, spheres: &[Vec4], capsules: &[Capsule]) {
    out.clear();
    out.extend(capsules.iter().map(|&[i0, i1]| {
        let first = spheres[i0 as usize];
        let second = spheres[i1 as usize];
        let center = (second + first) * 0.5;
        // w is half the radius difference
        let axis = (second - first) * 0.5;

        let sqr_axis_half_length = axis.truncate().length_squared();
        let sqr_cone_half_length = sqr_axis_half_length - axis.w * axis.w;
        let (inv_axis_half_length, inv_cone_half_length) = if sqr_cone_half_length > 0.0 {
            (sqr_axis_half_length.sqrt().recip(), sqr_cone_half_length.sqrt().recip())
        } else {
            (0.0, 0.0)
        };
        let axis_half_length = sqr_axis_half_length * inv_axis_half_length;
        let sin = axis.w * inv_axis_half_length;
        let first_mask = 1u32 << i0;

        ConeData {
            center: center.truncate(),
            radius: (axis.w + first.w) * inv_cone_half_length * axis_half_length,
            axis: axis.truncate() * inv_axis_half_length,
            slope: axis.w * inv_cone_half_length,
            sqr_cosine: 1.0 - sin * sin,
            half_length: axis_half_length,
            first_mask,
            both_mask: first_mask | 1u32 << i1,
        }
    }));
}

/// Planes at `alpha` between start and target. Plane equations are not
/// renormalised after blending.
pub fn generate_planes(out: &mut Vec<Vec4>, start: &[Vec4], target: &[Vec4], alpha: Option<f32>) {
    out.clear();
    out.extend(start.iter().zip(target).map(|(&s, &t)| match alpha {
        Some(a) => lerp4(s, t, a),
        None => t,
    }));
}

/// Triangles at `alpha` between start and target vertex triples.
pub fn generate_triangles(out: &mut Vec<TriangleData>, start: &[Vec3], target: &[Vec3], alpha: Option<f32>) {
    out.clear();
    let vertex = |i: usize| match alpha {
        Some(a) => start[i].lerp(target[i], a),
        None => target[i],
    };
    let count = start.len().min(target.len()) / 3;
    out.extend((0..count).map(|t| {
        let p0 = vertex(3 * t);
        let p1 = vertex(3 * t + 1);
        let p2 = vertex(3 * t + 2);

        let edge0 = p1 - p0;
        let edge1 = p2 - p0;
        let normal = edge0.cross(edge1);
        let edge0_sqr_length = edge0.length_squared();
        let edge1_sqr_length = edge1.length_squared();
        let edge0_dot_edge1 = edge0.dot(edge1);
        let det = edge0_sqr_length * edge1_sqr_length - edge0_dot_edge1 * edge0_dot_edge1;
        let denom = edge0_sqr_length + edge1_sqr_length - 2.0 * edge0_dot_edge1;

        TriangleData {
            base: p0,
            edge0,
            edge1,
            normal: normal * normal.length().recip(),
            edge0_dot_edge1,
            edge0_sqr_length,
            edge1_sqr_length,
            inv_det: det.recip(),
            inv_denom: denom.recip(),
            inv_edge0_sqr_length: edge0_sqr_length.recip(),
            inv_edge1_sqr_length: edge1_sqr_length.recip(),
        }
    }));
}
