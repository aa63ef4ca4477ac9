//! Mutable per-instance cloth state.
//!
//! A [`Cloth`] owns its particles and every time-varying input (constraints,
//! collision shapes, rigid motion). Coefficients that compound per iteration
//! are stored as `log2(1 - c)` so the solver can rescale them to any time
//! step with a single multiply.

use std::sync::Arc;

use glam::{Quat, Vec3, Vec4};
use tracing::{debug, warn};

use crate::bounds::BoundingBox;
use crate::config::PhaseConfig;
use crate::constraints::fabric::SolverPhaseConfig;
use crate::double_buffer::DoubleBuffer;
use crate::error::{check_capacity, check_indices, check_size, ClothError, ClothResult};
use crate::fabric::Fabric;
use crate::math::{
    from_log_coefficient, safe_exp2_vec, safe_log2_vec, to_log_coefficient, Transform,
    LOG2_OF_ZERO,
};
use crate::moving_average::MovingAverage;
use crate::particle::ParticleBuffers;
use crate::scheduler::{Triplet, TripletScheduler};

/// Bitmask width of the collision grid and convex masks.
pub const MAX_COLLISION_SHAPES: usize = 32;

/// Collision triangles past this count are dropped.
pub const MAX_COLLISION_TRIANGLES: usize = 500;

/// Sphere indices of a capsule.
pub type Capsule = [u32; 2];

pub struct Cloth {
    pub(crate) fabric: Arc<Fabric>,
    pub(crate) particles: ParticleBuffers,
    pub(crate) bounds: BoundingBox,
    pub(crate) phase_configs: Vec<SolverPhaseConfig>,

    pub(crate) current_motion: Transform,
    pub(crate) target_motion: Transform,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    pub(crate) ignore_velocity_discontinuity: bool,
    pub(crate) prev_iter_dt: f32,
    pub(crate) iter_dt_average: MovingAverage,

    pub(crate) gravity: Vec3,
    pub(crate) log_damping: Vec3,
    pub(crate) linear_log_drag: Vec3,
    pub(crate) angular_log_drag: Vec3,
    pub(crate) linear_inertia: Vec3,
    pub(crate) angular_inertia: Vec3,
    pub(crate) centrifugal_inertia: Vec3,
    pub(crate) solver_frequency: f32,
    pub(crate) stiffness_frequency: f32,

    pub(crate) tether_log_stiffness: f32,
    pub(crate) tether_scale: f32,

    pub(crate) motion_constraints: DoubleBuffer<Vec4>,
    pub(crate) separation_constraints: DoubleBuffer<Vec4>,
    pub(crate) motion_scale: f32,
    pub(crate) motion_bias: f32,
    pub(crate) motion_log_stiffness: f32,
    pub(crate) particle_accelerations: Vec<Vec4>,

    pub(crate) wind: Vec3,
    pub(crate) drag_log_coefficient: f32,
    pub(crate) lift_log_coefficient: f32,
    pub(crate) fluid_density: f32,

    pub(crate) spheres: DoubleBuffer<Vec4>,
    pub(crate) capsules: Vec<Capsule>,
    pub(crate) planes: DoubleBuffer<Vec4>,
    pub(crate) convexes: Vec<u32>,
    pub(crate) triangles: DoubleBuffer<Vec3>,
    pub(crate) friction: f32,
    pub(crate) collision_mass_scale: f32,
    pub(crate) continuous_collision: bool,
    triangles_truncated: bool,

    pub(crate) virtual_particle_indices: Vec<Triplet>,
    pub(crate) virtual_particle_weights: Vec<Vec4>,

    pub(crate) self_collision_distance: f32,
    pub(crate) self_collision_log_stiffness: f32,
    pub(crate) self_collision_indices: Vec<u32>,
    pub(crate) rest_positions: Vec<Vec4>,

    pub(crate) sleep_threshold: f32,
    pub(crate) sleep_test_interval: u32,
    pub(crate) sleep_after_count: u32,
    pub(crate) sleep_pass_counter: u32,
    pub(crate) sleep_test_counter: u32,

    user_data: u64,
}

/// Fail unless every component lies in `[0, 1]`.
fn check_unit(name: &'static str, value: f32) -> ClothResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ClothError::InvalidParameter { name, value });
    }
    Ok(())
}

fn check_unit_vec(name: &'static str, v: Vec3) -> ClothResult<()> {
    check_unit(name, v.x)?;
    check_unit(name, v.y)?;
    check_unit(name, v.z)
}

/// Rejects collision triangles whose edges are (nearly) parallel or empty.
fn check_triangle_areas(vertices: &[Vec3]) -> ClothResult<()> {
    for t in vertices.chunks_exact(3) {
        let edge0 = t[1] - t[0];
        let edge1 = t[2] - t[0];
        let cross_sq = edge0.cross(edge1).length_squared();
        if cross_sq <= f32::EPSILON * edge0.length_squared() * edge1.length_squared() {
            return Err(ClothError::InvalidParameter {
                name: "collision triangle area",
                value: 0.5 * cross_sq.sqrt(),
            });
        }
    }
    Ok(())
}

impl Cloth {
    /// Create a cloth from `fabric` with one `(position, inverse mass)` per
    /// fabric particle. Every phase starts fully stiff.
    pub fn new(fabric: Arc<Fabric>, particles: &[Vec4]) -> ClothResult<Self> {
        check_size("cloth particles", fabric.num_particles(), particles.len())?;

        let phase_configs = (0..fabric.num_phases() as u16)
            .map(|i| SolverPhaseConfig::from_config(&PhaseConfig::new(i)))
            .collect();

        debug!(
            particles = particles.len(),
            phases = fabric.num_phases(),
            "cloth created"
        );

        Ok(Self {
            bounds: BoundingBox::from_points(particles),
            particles: ParticleBuffers::new(particles),
            fabric,
            phase_configs,

            current_motion: Transform::IDENTITY,
            target_motion: Transform::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            ignore_velocity_discontinuity: false,
            prev_iter_dt: 0.0,
            iter_dt_average: MovingAverage::new(30),

            gravity: Vec3::ZERO,
            log_damping: Vec3::ZERO,
            linear_log_drag: Vec3::ZERO,
            angular_log_drag: Vec3::ZERO,
            linear_inertia: Vec3::ONE,
            angular_inertia: Vec3::ONE,
            centrifugal_inertia: Vec3::ONE,
            solver_frequency: 300.0,
            stiffness_frequency: 10.0,

            tether_log_stiffness: LOG2_OF_ZERO,
            tether_scale: 1.0,

            motion_constraints: DoubleBuffer::new(),
            separation_constraints: DoubleBuffer::new(),
            motion_scale: 1.0,
            motion_bias: 0.0,
            motion_log_stiffness: LOG2_OF_ZERO,
            particle_accelerations: Vec::new(),

            wind: Vec3::ZERO,
            drag_log_coefficient: 0.0,
            lift_log_coefficient: 0.0,
            fluid_density: 1.0,

            spheres: DoubleBuffer::new(),
            capsules: Vec::new(),
            planes: DoubleBuffer::new(),
            convexes: Vec::new(),
            triangles: DoubleBuffer::new(),
            friction: 0.0,
            collision_mass_scale: 0.0,
            continuous_collision: false,
            triangles_truncated: false,

            virtual_particle_indices: Vec::new(),
            virtual_particle_weights: Vec::new(),

            self_collision_distance: 0.0,
            self_collision_log_stiffness: LOG2_OF_ZERO,
            self_collision_indices: Vec::new(),
            rest_positions: Vec::new(),

            sleep_threshold: 0.0,
            sleep_test_interval: u32::MAX,
            sleep_after_count: u32::MAX,
            sleep_pass_counter: 0,
            sleep_test_counter: 0,

            user_data: 0,
        })
    }

    pub fn fabric(&self) -> &Arc<Fabric> {
        &self.fabric
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Opaque value passed to the inter-collision filter.
    pub fn set_user_data(&mut self, data: u64) {
        self.user_data = data;
    }

    // ---- particles ----

    pub fn current_particles(&self) -> &[Vec4] {
        self.particles.current()
    }

    pub fn previous_particles(&self) -> &[Vec4] {
        self.particles.previous()
    }

    pub fn current_particles_mut(&mut self) -> &mut [Vec4] {
        self.wake_up();
        self.particles.current_mut()
    }

    pub fn previous_particles_mut(&mut self) -> &mut [Vec4] {
        self.wake_up();
        self.particles.previous_mut()
    }

    pub fn particles(&self) -> &ParticleBuffers {
        &self.particles
    }

    pub fn bounding_box_center(&self) -> Vec3 {
        self.bounds.center()
    }

    pub fn bounding_box_half_extent(&self) -> Vec3 {
        self.bounds.half_extent()
    }

    /// Per-particle accelerations, allocated as zeros on first use.
    pub fn particle_accelerations_mut(&mut self) -> &mut [Vec4] {
        if self.particle_accelerations.is_empty() {
            self.particle_accelerations = vec![Vec4::ZERO; self.num_particles()];
        }
        self.wake_up();
        &mut self.particle_accelerations
    }

    pub fn clear_particle_accelerations(&mut self) {
        self.particle_accelerations = Vec::new();
        self.wake_up();
    }

    // ---- rigid motion ----

    pub fn translation(&self) -> Vec3 {
        self.target_motion.translation
    }

    pub fn rotation(&self) -> Quat {
        self.target_motion.rotation
    }

    /// Target position of the local frame at the end of the next frame.
    pub fn set_translation(&mut self, translation: Vec3) {
        if translation == self.target_motion.translation {
            return;
        }
        self.target_motion.translation = translation;
        self.wake_up();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        if rotation == self.target_motion.rotation {
            return;
        }
        self.target_motion.rotation = rotation;
        self.wake_up();
    }

    /// Shift the local frame without inducing inertia.
    pub fn teleport(&mut self, delta: Vec3) {
        self.current_motion.translation += delta;
        self.target_motion.translation += delta;
    }

    pub fn teleport_to_location(&mut self, translation: Vec3, rotation: Quat) {
        self.current_motion = Transform::new(translation, rotation);
        self.target_motion = self.current_motion;
    }

    /// Treat the next frame's motion as a jump rather than a velocity.
    pub fn ignore_velocity_discontinuity(&mut self) {
        self.ignore_velocity_discontinuity = true;
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn clear_inertia(&mut self) {
        self.current_motion = self.target_motion;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.wake_up();
    }

    // ---- phases and solver frequencies ----

    /// Replace the phase configurations. Phases without a config (or with
    /// zero stiffness) are not relaxed.
    pub fn set_phase_config(&mut self, configs: &[PhaseConfig]) -> ClothResult<()> {
        check_indices(
            "phase config",
            configs.iter().map(|c| c.phase_index as u32),
            self.fabric.num_phases(),
        )?;
        self.phase_configs = configs
            .iter()
            .filter(|c| c.stiffness > 0.0)
            .map(SolverPhaseConfig::from_config)
            .collect();
        self.wake_up();
        Ok(())
    }

    pub fn num_phase_configs(&self) -> usize {
        self.phase_configs.len()
    }

    pub fn solver_frequency(&self) -> f32 {
        self.solver_frequency
    }

    /// Iterations per second. Restarts the time step average.
    pub fn set_solver_frequency(&mut self, frequency: f32) -> ClothResult<()> {
        if frequency <= 0.0 {
            return Err(ClothError::InvalidParameter {
                name: "solver frequency",
                value: frequency,
            });
        }
        if frequency == self.solver_frequency {
            return Ok(());
        }
        self.solver_frequency = frequency;
        self.iter_dt_average.reset();
        self.wake_up();
        Ok(())
    }

    pub fn stiffness_frequency(&self) -> f32 {
        self.stiffness_frequency
    }

    /// Rate at which per-iteration coefficients are specified.
    pub fn set_stiffness_frequency(&mut self, frequency: f32) {
        if frequency == self.stiffness_frequency {
            return;
        }
        self.stiffness_frequency = frequency;
        self.wake_up();
    }

    pub fn num_iterations(&self, frame_dt: f32) -> u32 {
        ((frame_dt * self.solver_frequency + 0.5) as u32).max(1)
    }

    // ---- integration coefficients ----

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        if gravity == self.gravity {
            return;
        }
        self.gravity = gravity;
        self.wake_up();
    }

    pub fn damping(&self) -> Vec3 {
        Vec3::ONE - safe_exp2_vec(self.log_damping)
    }

    pub fn set_damping(&mut self, damping: Vec3) -> ClothResult<()> {
        check_unit_vec("damping", damping)?;
        let value = safe_log2_vec(Vec3::ONE - damping);
        if value != self.log_damping {
            self.log_damping = value;
            self.wake_up();
        }
        Ok(())
    }

    pub fn linear_drag(&self) -> Vec3 {
        Vec3::ONE - safe_exp2_vec(self.linear_log_drag)
    }

    pub fn set_linear_drag(&mut self, drag: Vec3) -> ClothResult<()> {
        check_unit_vec("linear drag", drag)?;
        let value = safe_log2_vec(Vec3::ONE - drag);
        if value != self.linear_log_drag {
            self.linear_log_drag = value;
            self.wake_up();
        }
        Ok(())
    }

    pub fn angular_drag(&self) -> Vec3 {
        Vec3::ONE - safe_exp2_vec(self.angular_log_drag)
    }

    pub fn set_angular_drag(&mut self, drag: Vec3) -> ClothResult<()> {
        check_unit_vec("angular drag", drag)?;
        let value = safe_log2_vec(Vec3::ONE - drag);
        if value != self.angular_log_drag {
            self.angular_log_drag = value;
            self.wake_up();
        }
        Ok(())
    }

    pub fn linear_inertia(&self) -> Vec3 {
        self.linear_inertia
    }

    /// Fraction of the frame's linear acceleration felt by the particles.
    pub fn set_linear_inertia(&mut self, inertia: Vec3) {
        if inertia == self.linear_inertia {
            return;
        }
        self.linear_inertia = inertia;
        self.wake_up();
    }

    pub fn angular_inertia(&self) -> Vec3 {
        self.angular_inertia
    }

    pub fn set_angular_inertia(&mut self, inertia: Vec3) {
        if inertia == self.angular_inertia {
            return;
        }
        self.angular_inertia = inertia;
        self.wake_up();
    }

    pub fn centrifugal_inertia(&self) -> Vec3 {
        self.centrifugal_inertia
    }

    pub fn set_centrifugal_inertia(&mut self, inertia: Vec3) {
        if inertia == self.centrifugal_inertia {
            return;
        }
        self.centrifugal_inertia = inertia;
        self.wake_up();
    }

    // ---- tethers ----

    pub fn tether_constraint_stiffness(&self) -> f32 {
        from_log_coefficient(self.tether_log_stiffness)
    }

    pub fn set_tether_constraint_stiffness(&mut self, stiffness: f32) -> ClothResult<()> {
        check_unit("tether stiffness", stiffness)?;
        let value = to_log_coefficient(stiffness);
        if value != self.tether_log_stiffness {
            self.tether_log_stiffness = value;
            self.wake_up();
        }
        Ok(())
    }

    pub fn tether_constraint_scale(&self) -> f32 {
        self.tether_scale
    }

    /// Scale applied to every tether length.
    pub fn set_tether_constraint_scale(&mut self, scale: f32) {
        if scale == self.tether_scale {
            return;
        }
        self.tether_scale = scale;
        self.wake_up();
    }

    // ---- motion and separation constraints ----

    /// Writable target spheres `(center, radius)` limiting each particle.
    pub fn push_motion_constraints(&mut self) -> &mut [Vec4] {
        self.wake_up();
        let n = self.num_particles();
        self.motion_constraints.push(n)
    }

    pub fn clear_motion_constraints(&mut self) {
        self.motion_constraints.clear();
        self.wake_up();
    }

    pub fn num_motion_constraints(&self) -> usize {
        self.motion_constraints.len()
    }

    pub fn set_motion_constraint_scale_bias(&mut self, scale: f32, bias: f32) {
        if scale == self.motion_scale && bias == self.motion_bias {
            return;
        }
        self.motion_scale = scale;
        self.motion_bias = bias;
        self.wake_up();
    }

    pub fn motion_constraint_scale(&self) -> f32 {
        self.motion_scale
    }

    pub fn motion_constraint_bias(&self) -> f32 {
        self.motion_bias
    }

    pub fn motion_constraint_stiffness(&self) -> f32 {
        from_log_coefficient(self.motion_log_stiffness)
    }

    pub fn set_motion_constraint_stiffness(&mut self, stiffness: f32) -> ClothResult<()> {
        check_unit("motion constraint stiffness", stiffness)?;
        let value = to_log_coefficient(stiffness);
        if value != self.motion_log_stiffness {
            self.motion_log_stiffness = value;
            self.wake_up();
        }
        Ok(())
    }

    /// Writable target spheres each particle is kept outside of.
    pub fn push_separation_constraints(&mut self) -> &mut [Vec4] {
        self.wake_up();
        let n = self.num_particles();
        self.separation_constraints.push(n)
    }

    pub fn clear_separation_constraints(&mut self) {
        self.separation_constraints.clear();
        self.wake_up();
    }

    pub fn num_separation_constraints(&self) -> usize {
        self.separation_constraints.len()
    }

    /// Snap interpolated inputs to their targets.
    pub fn clear_interpolation(&mut self) {
        self.spheres.pop();
        self.motion_constraints.pop();
        self.separation_constraints.pop();
        self.wake_up();
    }

    // ---- wind ----

    pub fn wind_velocity(&self) -> Vec3 {
        self.wind
    }

    pub fn set_wind_velocity(&mut self, wind: Vec3) {
        if wind == self.wind {
            return;
        }
        self.wind = wind;
        self.wake_up();
    }

    pub fn drag_coefficient(&self) -> f32 {
        from_log_coefficient(self.drag_log_coefficient)
    }

    pub fn set_drag_coefficient(&mut self, coefficient: f32) -> ClothResult<()> {
        check_unit("drag coefficient", coefficient)?;
        let value = to_log_coefficient(coefficient);
        if value != self.drag_log_coefficient {
            self.drag_log_coefficient = value;
            self.wake_up();
        }
        Ok(())
    }

    pub fn lift_coefficient(&self) -> f32 {
        from_log_coefficient(self.lift_log_coefficient)
    }

    pub fn set_lift_coefficient(&mut self, coefficient: f32) -> ClothResult<()> {
        check_unit("lift coefficient", coefficient)?;
        let value = to_log_coefficient(coefficient);
        if value != self.lift_log_coefficient {
            self.lift_log_coefficient = value;
            self.wake_up();
        }
        Ok(())
    }

    pub fn fluid_density(&self) -> f32 {
        self.fluid_density
    }

    pub fn set_fluid_density(&mut self, density: f32) -> ClothResult<()> {
        if density <= 0.0 {
            return Err(ClothError::InvalidParameter {
                name: "fluid density",
                value: density,
            });
        }
        if density != self.fluid_density {
            self.fluid_density = density;
            self.wake_up();
        }
        Ok(())
    }

    // ---- collision shapes ----

    pub fn num_spheres(&self) -> usize {
        self.spheres.len()
    }

    /// Replace spheres `[first, last)` with `spheres`. Replaced spheres
    /// interpolate towards the new values over the next frame.
    pub fn set_spheres(&mut self, spheres: &[Vec4], first: usize, last: usize) -> ClothResult<()> {
        let old_len = self.spheres.len();
        check_range("sphere", first, last, old_len)?;
        check_capacity(
            "collision spheres",
            spheres.len() + old_len - (last - first),
            MAX_COLLISION_SHAPES,
        )?;
        let delta = self.spheres.replace_range(spheres, first, last);
        if old_len > 0 && delta != 0 {
            let threshold = last as isize + delta.min(0);
            self.capsules.retain_mut(|capsule| {
                let first_kept = shift_index(&mut capsule[0], threshold, delta);
                let second_kept = shift_index(&mut capsule[1], threshold, delta);
                first_kept && second_kept
            });
        }
        self.wake_up();
        Ok(())
    }

    /// Replace all spheres with explicit start and target values.
    pub fn set_spheres_interpolated(&mut self, start: &[Vec4], target: &[Vec4]) -> ClothResult<()> {
        check_size("target spheres", start.len(), target.len())?;
        check_capacity("collision spheres", start.len(), MAX_COLLISION_SHAPES)?;
        self.spheres.assign(start, target);
        let n = start.len() as u32;
        self.capsules.retain(|c| c[0] < n && c[1] < n);
        self.wake_up();
        Ok(())
    }

    pub fn spheres(&self) -> &DoubleBuffer<Vec4> {
        &self.spheres
    }

    pub fn num_capsules(&self) -> usize {
        self.capsules.len()
    }

    /// Replace capsules `[first, last)`. Each capsule links two spheres.
    pub fn set_capsules(&mut self, capsules: &[Capsule], first: usize, last: usize) -> ClothResult<()> {
        let old_len = self.capsules.len();
        check_range("capsule", first, last, old_len)?;
        check_capacity(
            "collision capsules",
            capsules.len() + old_len - (last - first),
            MAX_COLLISION_SHAPES,
        )?;
        check_indices(
            "capsule sphere",
            capsules.iter().flatten().copied(),
            self.spheres.len(),
        )?;
        self.capsules.splice(first..last, capsules.iter().copied());
        self.wake_up();
        Ok(())
    }

    pub fn capsules(&self) -> &[Capsule] {
        &self.capsules
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Replace planes `[first, last)`. Planes are `(normal, offset)` with
    /// `dot(normal, p) + offset < 0` inside.
    pub fn set_planes(&mut self, planes: &[Vec4], first: usize, last: usize) -> ClothResult<()> {
        let old_len = self.planes.len();
        check_range("plane", first, last, old_len)?;
        check_capacity(
            "collision planes",
            planes.len() + old_len - (last - first),
            MAX_COLLISION_SHAPES,
        )?;
        let delta = self.planes.replace_range(planes, first, last);
        if old_len > 0 && delta != 0 {
            let shift = last as isize + delta.min(0);
            self.convexes.retain_mut(|mask| {
                *mask = shift_mask(*mask, shift, delta);
                *mask != 0
            });
        }
        self.wake_up();
        Ok(())
    }

    pub fn set_planes_interpolated(&mut self, start: &[Vec4], target: &[Vec4]) -> ClothResult<()> {
        check_size("target planes", start.len(), target.len())?;
        check_capacity("collision planes", start.len(), MAX_COLLISION_SHAPES)?;
        self.planes.assign(start, target);
        let valid = if start.len() >= 32 {
            u32::MAX
        } else {
            (1u32 << start.len()) - 1
        };
        self.convexes.retain_mut(|mask| {
            *mask &= valid;
            *mask != 0
        });
        self.wake_up();
        Ok(())
    }

    pub fn planes(&self) -> &DoubleBuffer<Vec4> {
        &self.planes
    }

    pub fn num_convexes(&self) -> usize {
        self.convexes.len()
    }

    /// Replace convexes `[first, last)`. Each convex is a bitmask of planes.
    pub fn set_convexes(&mut self, masks: &[u32], first: usize, last: usize) -> ClothResult<()> {
        let old_len = self.convexes.len();
        check_range("convex", first, last, old_len)?;
        check_capacity(
            "collision convexes",
            masks.len() + old_len - (last - first),
            MAX_COLLISION_SHAPES,
        )?;
        if let Some(index) = masks.iter().position(|&m| m == 0) {
            return Err(ClothError::InvalidParameter {
                name: "convex mask",
                value: index as f32,
            });
        }
        self.convexes.splice(first..last, masks.iter().copied());
        self.wake_up();
        Ok(())
    }

    pub fn convexes(&self) -> &[u32] {
        &self.convexes
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Replace triangles `[first, last)` (in triangles, three vertices each).
    ///
    /// The total is capped at [`MAX_COLLISION_TRIANGLES`]; excess triangles
    /// are dropped with a one-time warning. Zero-area triangles are rejected.
    pub fn set_triangles(&mut self, triangles: &[Vec3], first: usize, last: usize) -> ClothResult<()> {
        if triangles.len() % 3 != 0 {
            return Err(ClothError::SizeMismatch {
                what: "triangle vertices",
                expected: triangles.len() / 3 * 3,
                actual: triangles.len(),
            });
        }
        let old_len = self.num_triangles();
        check_range("triangle", first, last, old_len)?;
        check_triangle_areas(triangles)?;
        let triangles = self.clamp_triangles(triangles, old_len - (last - first));
        self.triangles.replace_range(triangles, first * 3, last * 3);
        self.wake_up();
        Ok(())
    }

    pub fn set_triangles_interpolated(&mut self, start: &[Vec3], target: &[Vec3]) -> ClothResult<()> {
        check_size("target triangles", start.len(), target.len())?;
        if start.len() % 3 != 0 {
            return Err(ClothError::SizeMismatch {
                what: "triangle vertices",
                expected: start.len() / 3 * 3,
                actual: start.len(),
            });
        }
        check_triangle_areas(start)?;
        check_triangle_areas(target)?;
        let start = self.clamp_triangles(start, 0);
        let target = &target[..start.len()];
        self.triangles.assign(start, target);
        self.wake_up();
        Ok(())
    }

    pub fn triangles(&self) -> &DoubleBuffer<Vec3> {
        &self.triangles
    }

    fn clamp_triangles<'a>(&mut self, triangles: &'a [Vec3], retained: usize) -> &'a [Vec3] {
        let room = MAX_COLLISION_TRIANGLES.saturating_sub(retained) * 3;
        if triangles.len() <= room {
            return triangles;
        }
        if !self.triangles_truncated {
            warn!(
                requested = retained + triangles.len() / 3,
                max = MAX_COLLISION_TRIANGLES,
                "too many collision triangles, extra triangles are ignored"
            );
            self.triangles_truncated = true;
        }
        &triangles[..room]
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Coulomb friction against collision shapes. Does not wake the cloth.
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    pub fn collision_mass_scale(&self) -> f32 {
        self.collision_mass_scale
    }

    pub fn set_collision_mass_scale(&mut self, scale: f32) {
        if scale == self.collision_mass_scale {
            return;
        }
        self.collision_mass_scale = scale;
        self.wake_up();
    }

    pub fn is_continuous_collision_enabled(&self) -> bool {
        self.continuous_collision
    }

    pub fn enable_continuous_collision(&mut self, enable: bool) {
        if enable == self.continuous_collision {
            return;
        }
        self.continuous_collision = enable;
        self.wake_up();
    }

    // ---- virtual particles ----

    pub fn num_virtual_particles(&self) -> usize {
        self.virtual_particle_indices.len()
    }

    /// Add collision points interpolated from three particles.
    ///
    /// `indices[k][3]` selects a barycentric weight from `weights`.
    pub fn set_virtual_particles(&mut self, indices: &[Triplet], weights: &[Vec3]) -> ClothResult<()> {
        let n = self.num_particles();
        check_indices(
            "virtual particle",
            indices.iter().flat_map(|t| t[..3].iter().copied()),
            n,
        )?;
        check_indices("virtual particle weight", indices.iter().map(|t| t[3]), weights.len())?;
        if let Some(w) = weights.iter().find(|w| w.length_squared() == 0.0) {
            return Err(ClothError::InvalidParameter {
                name: "virtual particle weight",
                value: w.length(),
            });
        }

        let mut scheduler = TripletScheduler::new(indices);
        scheduler.simd(n as u32, 4);
        self.virtual_particle_indices = scheduler.into_padded_triplets();
        self.virtual_particle_weights = weights
            .iter()
            .map(|w| w.extend(1.0 / w.length_squared()))
            .collect();
        self.wake_up();
        Ok(())
    }

    // ---- self collision ----

    pub fn self_collision_distance(&self) -> f32 {
        self.self_collision_distance
    }

    pub fn set_self_collision_distance(&mut self, distance: f32) {
        if distance == self.self_collision_distance {
            return;
        }
        self.self_collision_distance = distance;
        self.wake_up();
    }

    pub fn self_collision_stiffness(&self) -> f32 {
        from_log_coefficient(self.self_collision_log_stiffness)
    }

    pub fn set_self_collision_stiffness(&mut self, stiffness: f32) -> ClothResult<()> {
        check_unit("self collision stiffness", stiffness)?;
        let value = to_log_coefficient(stiffness);
        if value != self.self_collision_log_stiffness {
            self.self_collision_log_stiffness = value;
            self.wake_up();
        }
        Ok(())
    }

    /// Restrict self collision to a subset of particles. Empty means all.
    pub fn set_self_collision_indices(&mut self, indices: &[u32]) -> ClothResult<()> {
        check_indices("self collision", indices.iter().copied(), self.num_particles())?;
        self.self_collision_indices = indices.to_vec();
        self.wake_up();
        Ok(())
    }

    /// Rest pose used to exempt pairs that start closer than the
    /// self-collision distance. Empty disables the exemption.
    pub fn set_rest_positions(&mut self, positions: &[Vec4]) -> ClothResult<()> {
        if !positions.is_empty() {
            check_size("rest positions", self.num_particles(), positions.len())?;
        }
        self.rest_positions = positions.to_vec();
        self.wake_up();
        Ok(())
    }

    pub fn is_self_collision_enabled(&self) -> bool {
        self.self_collision_distance.min(self.self_collision_stiffness()) > 0.0
    }

    // ---- sleeping ----

    pub fn sleep_threshold(&self) -> f32 {
        self.sleep_threshold
    }

    /// Maximum per-second particle movement still considered at rest.
    pub fn set_sleep_threshold(&mut self, threshold: f32) {
        if threshold == self.sleep_threshold {
            return;
        }
        self.sleep_threshold = threshold;
        self.wake_up();
    }

    pub fn sleep_test_interval(&self) -> u32 {
        self.sleep_test_interval
    }

    /// Milliseconds of simulated time between sleep tests.
    pub fn set_sleep_test_interval(&mut self, interval: u32) {
        if interval == self.sleep_test_interval {
            return;
        }
        self.sleep_test_interval = interval;
        self.wake_up();
    }

    pub fn sleep_after_count(&self) -> u32 {
        self.sleep_after_count
    }

    pub fn set_sleep_after_count(&mut self, count: u32) {
        if count == self.sleep_after_count {
            return;
        }
        self.sleep_after_count = count;
        self.wake_up();
    }

    pub fn sleep_pass_count(&self) -> u32 {
        self.sleep_pass_counter
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep_pass_counter >= self.sleep_after_count
    }

    pub fn put_to_sleep(&mut self) {
        self.sleep_pass_counter = self.sleep_after_count;
    }

    pub fn wake_up(&mut self) {
        self.sleep_pass_counter = 0;
    }

    /// Promote per-frame targets to start values. Runs after every frame.
    pub(crate) fn pop_targets(&mut self) {
        self.motion_constraints.pop();
        self.separation_constraints.pop();
        self.spheres.pop();
        self.planes.pop();
        self.triangles.pop();
    }
}

fn check_range(what: &'static str, first: usize, last: usize, len: usize) -> ClothResult<()> {
    if last > len {
        return Err(ClothError::IndexOutOfRange {
            what,
            index: last,
            len,
        });
    }
    if first > last {
        return Err(ClothError::IndexOutOfRange {
            what,
            index: first,
            len: last,
        });
    }
    Ok(())
}

/// Move an index past an inserted or removed range. Returns false if the
/// index referred to a removed element.
fn shift_index(index: &mut u32, threshold: isize, delta: isize) -> bool {
    if (*index as isize) < threshold {
        return true;
    }
    let shifted = *index as isize + delta;
    if shifted < threshold {
        return false;
    }
    *index = shifted as u32;
    true
}

/// Shift the plane bits at or above `threshold` by `delta`, dropping bits of
/// removed planes.
fn shift_mask(mask: u32, threshold: isize, delta: isize) -> u32 {
    let mask = mask as u64;
    let low = (1u64 << threshold) - 1;
    let high = if delta < 0 {
        (mask >> (-delta) as u32) & !low
    } else {
        (mask & !low) << delta as u32
    };
    ((mask & low) | high) as u32
}
