//! Particle collision against spheres, tapered capsules, convexes and
//! triangles.
//!
//! Each iteration runs convexes, then triangles, then refreshes the particle
//! bounds, then resolves spheres and capsules through an 8-cell-per-axis
//! bitmask grid. Continuous collision sweeps each particle from its
//! previous to its current position against the shapes' motion over the
//! iteration. Contacts from all shapes a particle touches are averaged.

pub mod grid;
pub mod shapes;

use glam::{Vec3, Vec4};

use crate::bounds::BoundingBox;
use crate::cloth::{Capsule, Cloth, MAX_COLLISION_SHAPES};
use crate::iteration_state::IterationState;
use crate::math::EPSILON;
use crate::scheduler::Triplet;
use crate::scratch::CollisionBuffers;
use grid::ShapeGrid;
use shapes::{generate_cones, generate_planes, generate_spheres, generate_triangles, ConeData};

/// `(1 - 0.2)^2 - 1`: shapes are treated as if shrunk by 20% when deciding
/// whether a swept contact is tangential enough to ignore.
const SKELETON_WIDTH: f32 = -0.36;

/// Iterate the set bits of `mask`, lowest first.
fn bits(mut mask: u32) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let i = mask.trailing_zeros() as usize;
        mask &= mask - 1;
        Some(i)
    })
}

/// Sum of the corrections from every shape one particle touches.
#[derive(Clone, Copy, Debug)]
struct ImpulseAccumulator {
    delta: Vec3,
    velocity: Vec3,
    num_collisions: f32,
}

impl ImpulseAccumulator {
    fn new() -> Self {
        Self {
            delta: Vec3::ZERO,
            velocity: Vec3::ZERO,
            num_collisions: EPSILON,
        }
    }

    fn add(&mut self, v: Vec3, scale: f32) {
        self.delta += v * scale;
        self.num_collisions += 1.0;
    }

    fn subtract(&mut self, v: Vec3, scale: f32) {
        self.delta -= v * scale;
        self.num_collisions += 1.0;
    }

    fn add_velocity(&mut self, v: Vec3) {
        self.velocity += v;
    }

    fn has_collisions(&self) -> bool {
        self.num_collisions > EPSILON
    }
}

/// Coulomb-style friction impulse opposing the tangential part of the
/// particle's velocity relative to the shapes it touches.
///
/// The result is subtracted from the previous position. Its magnitude is
/// capped at the full tangential velocity so friction never reverses motion.
fn friction_impulse(
    accum: &ImpulseAccumulator,
    cur: Vec3,
    prev: Vec3,
    scale: f32,
    coefficient: f32,
) -> Vec3 {
    let delta_sq = accum.delta.length_squared();
    let rcp_delta = (delta_sq + EPSILON).sqrt().recip();
    let normal = accum.delta * rcp_delta;

    let relative_velocity = cur - prev - accum.velocity * scale;
    let tangential = relative_velocity - normal * relative_velocity.dot(normal);
    let rcp_tangential = (tangential.length_squared() + EPSILON).sqrt().recip();

    let j = (-coefficient * delta_sq * rcp_delta * rcp_tangential).max(-1.0);
    tangential * j
}

/// How an accumulated contact is written back to a particle.
#[derive(Clone, Copy, Debug)]
struct Response {
    friction: f32,
    mass_scale: f32,
}

impl Response {
    const FRICTIONLESS: Self = Self {
        friction: 0.0,
        mass_scale: 0.0,
    };

    /// Move the particle from `pos` by the averaged correction. Particles
    /// without contacts keep their stored position.
    fn apply(&self, accum: &ImpulseAccumulator, pos: Vec3, cur: &mut Vec4, prev: &mut Vec4) {
        if !accum.has_collisions() {
            return;
        }
        let inv_n = accum.num_collisions.recip();

        if self.friction > 0.0 {
            let impulse = friction_impulse(accum, pos, prev.truncate(), inv_n, self.friction);
            *prev -= impulse.extend(0.0);
        }

        if self.mass_scale > 0.0 {
            let delta_sq = inv_n * inv_n * accum.delta.length_squared();
            cur.w *= (1.0 + self.mass_scale * delta_sq).recip();
        }

        let w = cur.w;
        *cur = (pos + accum.delta * inv_n).extend(w);
    }
}

/// Sphere and cone data for one iteration, with the previous iteration's
/// copies when friction or continuous collision needs shape velocities.
struct ShapeSet<'s> {
    spheres: &'s [Vec4],
    prev_spheres: &'s [Vec4],
    cones: &'s [ConeData],
    prev_cones: &'s [ConeData],
    capsules: &'s [Capsule],
    friction: bool,
}

impl ShapeSet<'_> {
    fn sphere_velocity(&self, i: usize) -> Vec3 {
        (self.spheres[i] - self.prev_spheres[i]).truncate()
    }

    /// Velocity of the capsule surface at axial parameter `dot` in `[-1, 1]`.
    fn cone_velocity(&self, cone: usize, dot: f32) -> Vec3 {
        let [s0, s1] = self.capsules[cone];
        let v0 = self.sphere_velocity(s0 as usize);
        let v1 = self.sphere_velocity(s1 as usize);
        v0 + (v1 - v0) * (dot * 0.5 + 0.5)
    }

    fn collide_spheres(&self, mask: u32, p: Vec3, accum: &mut ImpulseAccumulator) {
        for i in bits(mask) {
            let sphere = self.spheres[i];
            let delta = p - sphere.truncate();
            let sqr_distance = EPSILON + delta.length_squared();
            let negative_scale = 1.0 - sphere.w * sqr_distance.sqrt().recip();
            if negative_scale >= 0.0 {
                continue;
            }
            accum.subtract(delta, negative_scale);
            if self.friction {
                accum.add_velocity(self.sphere_velocity(i));
            }
        }
    }

    /// Returns the sphere mask with spheres hidden by a capsule removed.
    fn collide_cones(
        &self,
        cone_mask: u32,
        mut sphere_mask: u32,
        p: Vec3,
        accum: &mut ImpulseAccumulator,
    ) -> u32 {
        for c in bits(cone_mask) {
            let cone = &self.cones[c];
            let delta = p - cone.center;
            let dot = delta.dot(cone.axis);
            let radius = (dot * cone.slope + cone.radius).max(0.0);
            let sqr_distance = delta.length_squared() - dot * dot;

            if radius * radius <= sqr_distance {
                sphere_mask &= !cone.both_mask;
                continue;
            }

            let sqr_distance = sqr_distance.max(EPSILON);
            let inv_distance = sqr_distance.sqrt().recip();
            let base = dot + cone.slope * sqr_distance * inv_distance;

            let left = base < -cone.half_length;
            let right = base > cone.half_length;
            let second_mask = cone.first_mask ^ cone.both_mask;
            if !left {
                sphere_mask &= !cone.first_mask;
            }
            if !right {
                sphere_mask &= !second_mask;
            }
            if left || right {
                continue;
            }

            let scale = radius * inv_distance * cone.sqr_cosine - cone.sqr_cosine;
            accum.add(delta - cone.axis * base, scale);
            if self.friction {
                accum.add_velocity(self.cone_velocity(c, dot));
            }
        }
        sphere_mask
    }

    /// Sweep `p0 -> p1` against the moving spheres, pulling `p1` back to
    /// just inside the first contact before the discrete response.
    fn collide_spheres_continuous(
        &self,
        mask: u32,
        p0: Vec3,
        p1: &mut Vec3,
        accum: &mut ImpulseAccumulator,
    ) {
        for i in bits(mask) {
            let prev_sphere = self.prev_spheres[i];
            let cur_sphere = self.spheres[i];
            let prev_center = prev_sphere.truncate();
            let cur_center = cur_sphere.truncate();

            let prev = p0 - prev_center;
            let mut cur = *p1 - cur_center;
            let mut sqr_distance = EPSILON + cur.length_squared();

            let dot_prev_prev = prev.length_squared() - prev_sphere.w * prev_sphere.w;
            let dot_prev_cur = prev.dot(cur) - prev_sphere.w * cur_sphere.w;
            let dot_cur_cur = sqr_distance - cur_sphere.w * cur_sphere.w;

            let (hit, toi, sqrt_discriminant, minus_a) =
                time_of_impact(dot_prev_prev, dot_prev_cur, dot_cur_cur, prev_sphere.w, cur_sphere.w);

            if hit {
                let omt = contact_weight(toi, sqrt_discriminant, minus_a);
                cur += (prev - cur) * omt;
                *p1 = cur_center + cur;
                sqr_distance = EPSILON + cur.length_squared();
            }

            let negative_scale = 1.0 - cur_sphere.w * sqr_distance.sqrt().recip();
            if negative_scale >= 0.0 {
                continue;
            }
            accum.subtract(cur, negative_scale);
            if self.friction {
                accum.add_velocity(self.sphere_velocity(i));
            }
        }
    }

    fn collide_cones_continuous(
        &self,
        cone_mask: u32,
        mut sphere_mask: u32,
        p0: Vec3,
        p1: &mut Vec3,
        accum: &mut ImpulseAccumulator,
    ) -> u32 {
        for c in bits(cone_mask) {
            let pc = &self.prev_cones[c];
            let cc = &self.cones[c];

            let prev = p0 - pc.center;
            let mut cur = *p1 - cc.center;

            // distances to the axes, as cross products
            let prev_t = prev.cross(pc.axis);
            let cur_t = cur.cross(cc.axis);

            let prev_dot = prev.dot(pc.axis);
            let prev_radius = (prev_dot * pc.slope + pc.radius).max(0.0);
            let mut cur_dot = cur.dot(cc.axis);
            let mut cur_radius = (cur_dot * cc.slope + cc.radius).max(0.0);
            let mut cur_sqr_distance = EPSILON + cur_t.length_squared();

            let dot_prev_prev = prev_t.length_squared() - prev_radius * prev_radius;
            let dot_prev_cur = prev_t.dot(cur_t) - prev_radius * cur_radius;
            let dot_cur_cur = cur_sqr_distance - cur_radius * cur_radius;

            let (hit, toi, sqrt_discriminant, minus_a) =
                time_of_impact(dot_prev_prev, dot_prev_cur, dot_cur_cur, prev_radius, cur_radius);

            if hit {
                let mut delta = prev - cur;
                let pos = prev - delta * toi;

                // interpolated cone at the time of impact
                let cur_scaled_axis = cc.axis * cc.half_length;
                let delta_scaled_axis = cur_scaled_axis - pc.axis * pc.half_length;
                let omt = 1.0 - toi;
                let axis = cur_scaled_axis - delta_scaled_axis * omt;
                let slope = pc.slope * omt + cc.slope * toi;

                let inv_half_length = axis.length().recip();
                let dot = pos.dot(axis) * inv_half_length;
                let sqr_d = pos.length_squared() - dot * dot;
                let inv_d = if sqr_d > 0.0 { sqr_d.sqrt().recip() } else { 0.0 };
                let base = dot + slope * sqr_d * inv_d;
                let scale = base * inv_half_length;

                if scale.abs() < 1.0 {
                    delta += delta_scaled_axis * scale;
                    let omt = contact_weight(toi, sqrt_discriminant, minus_a);
                    cur += delta * omt;

                    cur_dot = cur.dot(cc.axis);
                    cur_radius = (cur_dot * cc.slope + cc.radius).max(0.0);
                    cur_sqr_distance = cur.length_squared() - cur_dot * cur_dot;
                    *p1 = cc.center + cur;
                }
            }

            let contact = cur_radius * cur_radius > cur_sqr_distance;
            if !(hit || contact) {
                sphere_mask &= !cc.both_mask;
            }
            if !contact {
                continue;
            }

            let inv_distance = if cur_sqr_distance > 0.0 {
                cur_sqr_distance.sqrt().recip()
            } else {
                0.0
            };
            let base = cur_dot + cc.slope * cur_sqr_distance * inv_distance;

            let left = base < -cc.half_length;
            let right = base > cc.half_length;
            if hit {
                let second_mask = cc.first_mask ^ cc.both_mask;
                let mut hidden = 0;
                if !left {
                    hidden |= cc.first_mask;
                }
                if !right {
                    hidden |= second_mask;
                }
                sphere_mask &= !hidden;
            }
            if left || right {
                continue;
            }

            let scale = cur_radius * inv_distance * cc.sqr_cosine - cc.sqr_cosine;
            accum.add(cur - cc.axis * base, scale);
            if self.friction {
                accum.add_velocity(self.cone_velocity(c, cur_dot));
            }
        }
        sphere_mask
    }
}

/// Solve `|prev + (cur - prev) t| = r(t)` for the first contact time.
///
/// Returns `(hit, toi, sqrt(discriminant), minus_a)`.
fn time_of_impact(
    dot_prev_prev: f32,
    dot_prev_cur: f32,
    dot_cur_cur: f32,
    prev_radius: f32,
    cur_radius: f32,
) -> (bool, f32, f32, f32) {
    let discriminant = dot_prev_cur * dot_prev_cur - dot_cur_cur * dot_prev_prev;
    let sqrt_discriminant = discriminant.sqrt();
    let half_b = dot_prev_cur - dot_prev_prev;
    let minus_a = dot_prev_cur - dot_cur_cur + half_b;

    let toi = minus_a.recip() * (half_b + sqrt_discriminant).min(0.0);

    // skip tangential contacts and trajectories starting inside
    let min_radius = prev_radius + half_b * minus_a * (cur_radius - prev_radius);
    let hit = toi < 1.0
        && half_b < sqrt_discriminant
        && discriminant > minus_a * min_radius * min_radius * SKELETON_WIDTH
        && minus_a < -EPSILON;

    (hit, toi, sqrt_discriminant, minus_a)
}

/// Fraction of the remaining path to roll back after a swept hit. Slightly
/// less than `1 - toi` so the particle ends up inside the shape and the
/// discrete response resolves it.
fn contact_weight(toi: f32, sqrt_discriminant: f32, minus_a: f32) -> f32 {
    let omt = 1.0 - toi;
    let minus_k = if omt > EPSILON {
        sqrt_discriminant / (minus_a * omt)
    } else {
        0.0
    };
    omt * (1.0 - minus_k).recip()
}

/// Collision state for one cloth over one frame.
pub struct Collision<'a> {
    buffers: &'a mut CollisionBuffers,
    grid: ShapeGrid,
    has_prev: bool,
}

impl<'a> Collision<'a> {
    /// Prepare shape buffers for a frame. Shape velocities are measured from
    /// the start-of-frame spheres.
    pub fn new(cloth: &Cloth, buffers: &'a mut CollisionBuffers) -> Self {
        let has_prev = cloth.continuous_collision || cloth.friction > 0.0;
        buffers.prev_spheres.clear();
        buffers.prev_cones.clear();
        if has_prev {
            let start = cloth.spheres.start();
            generate_spheres(&mut buffers.prev_spheres, start, start, None);
            generate_cones(&mut buffers.prev_cones, &buffers.prev_spheres, &cloth.capsules);
        }
        Self {
            buffers,
            grid: ShapeGrid::default(),
            has_prev,
        }
    }

    /// Run all collision stages for the current iteration.
    pub fn collide(&mut self, cloth: &mut Cloth, state: &IterationState) {
        let alpha = state.blend_alpha();

        self.collide_convexes(cloth, alpha);
        self.collide_triangles(cloth, alpha);
        let prev_bounds = compute_bounds(cloth);

        if cloth.spheres.is_empty() {
            return;
        }

        let buffers = &mut *self.buffers;
        generate_spheres(
            &mut buffers.spheres,
            cloth.spheres.start(),
            cloth.spheres.end_values(),
            alpha,
        );
        generate_cones(&mut buffers.cones, &buffers.spheres, &cloth.capsules);

        let continuous = cloth.continuous_collision;
        let particle_bounds = if continuous {
            cloth.bounds.union(prev_bounds)
        } else {
            cloth.bounds
        };
        let swept_spheres = continuous.then_some(buffers.prev_spheres.as_slice());

        if self
            .grid
            .build(&buffers.spheres, swept_spheres, &buffers.cones, particle_bounds)
        {
            let shapes = ShapeSet {
                spheres: &buffers.spheres,
                prev_spheres: &buffers.prev_spheres,
                cones: &buffers.cones,
                prev_cones: &buffers.prev_cones,
                capsules: &cloth.capsules,
                friction: cloth.friction > 0.0,
            };
            let response = Response {
                friction: cloth.friction,
                mass_scale: cloth.collision_mass_scale,
            };
            let (cur, prev) = cloth.particles.split_mut();

            if continuous {
                collide_particles_continuous(&self.grid, &shapes, cur, prev, response);
            }
            self.grid.merge();
            if !continuous {
                collide_particles(&self.grid, &shapes, cur, prev, response);
            }
            collide_virtual_particles(
                &self.grid,
                &shapes,
                cur,
                prev,
                &cloth.virtual_particle_indices,
                &cloth.virtual_particle_weights,
                response,
            );
        }

        if self.has_prev {
            std::mem::swap(&mut buffers.spheres, &mut buffers.prev_spheres);
            std::mem::swap(&mut buffers.cones, &mut buffers.prev_cones);
        }
    }

    fn collide_convexes(&mut self, cloth: &mut Cloth, alpha: Option<f32>) {
        if cloth.convexes.is_empty() {
            return;
        }
        let planes = &mut self.buffers.planes;
        generate_planes(planes, cloth.planes.start(), cloth.planes.end_values(), alpha);

        let response = Response {
            friction: cloth.friction,
            mass_scale: 0.0,
        };
        let mut distances = [0.0f32; MAX_COLLISION_SHAPES];
        let (cur, prev) = cloth.particles.split_mut();

        for (c, p) in cur.iter_mut().zip(prev.iter_mut()) {
            let pos = c.truncate();
            let mut inside = 0u32;
            for (k, plane) in planes.iter().enumerate() {
                distances[k] = plane.w + pos.dot(plane.truncate());
                if distances[k] < 0.0 {
                    inside |= 1 << k;
                }
            }
            if inside == 0 {
                continue;
            }

            let mut accum = ImpulseAccumulator::new();
            for &mask in &cloth.convexes {
                if mask & inside != mask {
                    continue;
                }
                // push out through the nearest face
                let mut best = mask.trailing_zeros() as usize;
                for k in bits(mask) {
                    if distances[k] > distances[best] {
                        best = k;
                    }
                }
                accum.subtract(planes[best].truncate(), distances[best]);
            }
            response.apply(&accum, pos, c, p);
        }
    }

    fn collide_triangles(&mut self, cloth: &mut Cloth, alpha: Option<f32>) {
        if cloth.triangles.is_empty() {
            return;
        }
        let triangles = &mut self.buffers.triangles;
        generate_triangles(
            triangles,
            cloth.triangles.start(),
            cloth.triangles.end_values(),
            alpha,
        );

        let (cur, prev) = cloth.particles.split_mut();
        for (c, p) in cur.iter_mut().zip(prev.iter_mut()) {
            let pos = c.truncate();
            let mut min_sqr_length = f32::MAX;
            let mut normal = Vec3::ZERO;
            let mut normal_distance = 0.0;

            for tri in triangles.iter() {
                let delta = pos - tri.base;
                let dd0 = delta.dot(tri.edge0);
                let dd1 = delta.dot(tri.edge1);
                let ddn = delta.dot(tri.normal);

                let s = tri.edge1_sqr_length * dd0 - tri.edge0_dot_edge1 * dd1;
                let t = tri.edge0_sqr_length * dd1 - tri.edge0_dot_edge1 * dd0;

                // closest point on the triangle, clamped to edges
                let mut s_clamped = if t > 0.0 {
                    s * tri.inv_det
                } else {
                    dd0 * tri.inv_edge0_sqr_length
                };
                let t_clamped = if s > 0.0 {
                    t * tri.inv_det
                } else {
                    dd1 * tri.inv_edge1_sqr_length
                };
                if s_clamped + t_clamped > 1.0 {
                    s_clamped = (tri.edge1_sqr_length - tri.edge0_dot_edge1 + dd0 - dd1)
                        * tri.inv_denom;
                }
                let s_clamped = s_clamped.clamp(0.0, 1.0);
                let t_clamped = t_clamped.min(1.0 - s_clamped).max(0.0);

                let offset = delta - tri.edge0 * s_clamped - tri.edge1 * t_clamped;
                let mut sqr_length = offset.length_squared();
                // prefer triangles the particle is in front of
                if ddn < 0.0 {
                    sqr_length += sqr_length * 1e-4;
                }

                if sqr_length < min_sqr_length {
                    min_sqr_length = sqr_length;
                    normal = tri.normal;
                    normal_distance = ddn;
                }
            }

            if normal_distance < 0.0 {
                let mut accum = ImpulseAccumulator::new();
                accum.subtract(normal, normal_distance);
                Response::FRICTIONLESS.apply(&accum, pos, c, p);
            }
        }
    }
}

/// Recompute the cloth bounds from current positions and restore inverse
/// masses scaled by the previous collision pass. Returns the old bounds.
fn compute_bounds(cloth: &mut Cloth) -> BoundingBox {
    let (cur, prev) = cloth.particles.split_mut();
    let mut bounds = BoundingBox::EMPTY;
    for (c, p) in cur.iter_mut().zip(prev.iter()) {
        bounds = bounds.include(c.truncate());
        if c.w > 0.0 {
            c.w = p.w;
        }
    }
    std::mem::replace(&mut cloth.bounds, bounds)
}

fn collide_particles(
    grid: &ShapeGrid,
    shapes: &ShapeSet<'_>,
    cur: &mut [Vec4],
    prev: &mut [Vec4],
    response: Response,
) {
    for (c, p) in cur.iter_mut().zip(prev.iter_mut()) {
        let pos = c.truncate();
        let mask = grid.point_mask(pos);
        let mut accum = ImpulseAccumulator::new();
        let spheres = shapes.collide_cones(mask.cones, mask.spheres, pos, &mut accum);
        shapes.collide_spheres(spheres, pos, &mut accum);
        response.apply(&accum, pos, c, p);
    }
}

fn collide_particles_continuous(
    grid: &ShapeGrid,
    shapes: &ShapeSet<'_>,
    cur: &mut [Vec4],
    prev: &mut [Vec4],
    response: Response,
) {
    for (c, p) in cur.iter_mut().zip(prev.iter_mut()) {
        let p0 = p.truncate();
        let mut p1 = c.truncate();
        let mask = grid.swept_mask(p0, p1);
        let mut accum = ImpulseAccumulator::new();
        let spheres =
            shapes.collide_cones_continuous(mask.cones, mask.spheres, p0, &mut p1, &mut accum);
        shapes.collide_spheres_continuous(spheres, p0, &mut p1, &mut accum);
        response.apply(&accum, p1, c, p);
    }
}

/// Collide points interpolated from particle triplets and distribute the
/// correction back by barycentric weight.
fn collide_virtual_particles(
    grid: &ShapeGrid,
    shapes: &ShapeSet<'_>,
    cur: &mut [Vec4],
    prev: &mut [Vec4],
    triplets: &[Triplet],
    weights: &[Vec4],
    response: Response,
) {
    let n = cur.len();
    for t in triplets {
        let idx = [t[0] as usize, t[1] as usize, t[2] as usize];
        // scheduler padding points past the real particles
        if idx.iter().any(|&i| i >= n) {
            continue;
        }
        let w = weights[t[3] as usize];
        let pos = cur[idx[0]].truncate() * w.x
            + cur[idx[1]].truncate() * w.y
            + cur[idx[2]].truncate() * w.z;

        let mask = grid.point_mask(pos);
        let mut accum = ImpulseAccumulator::new();
        let spheres = shapes.collide_cones(mask.cones, mask.spheres, pos, &mut accum);
        shapes.collide_spheres(spheres, pos, &mut accum);
        if !accum.has_collisions() {
            continue;
        }

        let inv_n = accum.num_collisions.recip();
        let delta = accum.delta * inv_n;
        let rw = w.truncate() * w.w;

        if response.friction > 0.0 {
            let prev_pos = prev[idx[0]].truncate() * w.x
                + prev[idx[1]].truncate() * w.y
                + prev[idx[2]].truncate() * w.z;
            let impulse = friction_impulse(&accum, pos, prev_pos, inv_n, response.friction);
            for (k, &i) in idx.iter().enumerate() {
                if cur[i].w != 0.0 {
                    prev[i] -= (impulse * rw[k]).extend(0.0);
                }
            }
        }

        if response.mass_scale > 0.0 {
            let delta_sq = inv_n * inv_n * accum.delta.length_squared();
            let weight_scale = (1.0 + response.mass_scale * delta_sq).recip() - 1.0;
            for (k, &i) in idx.iter().enumerate() {
                cur[i].w *= 1.0 + weight_scale * w[k];
            }
        }

        for (k, &i) in idx.iter().enumerate() {
            if cur[i].w != 0.0 {
                cur[i] += (delta * rw[k]).extend(0.0);
            }
        }
    }
}
