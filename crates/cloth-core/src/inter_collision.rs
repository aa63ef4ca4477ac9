//! Collision between particles of different cloths.
//!
//! Runs once per frame after every cloth has been simulated. Particles are
//! moved into world space with each cloth's rigid motion, resolved with the
//! same sort-and-sweep as self collision, then moved back.

use glam::Vec4;

use crate::bounds::BoundingBox;
use crate::cloth::Cloth;
use crate::config::InterCollisionConfig;
use crate::scratch::SweepBuffers;
use crate::self_collision::{sweep_and_collide, PairResponse, SweepGrid};

/// Decides from two cloths' user data whether they collide with each other.
pub type InterCollisionFilter = Box<dyn Fn(u64, u64) -> bool + Send + Sync>;

#[derive(Debug, Default)]
pub struct InterCollisionBuffers {
    /// World-space particles of all cloths.
    positions: Vec<Vec4>,
    /// `(cloth, particle)` each position came from.
    origins: Vec<(u32, u32)>,
    user_data: Vec<u64>,
    sweep: SweepBuffers,
}

/// Push apart particles of different cloths that `filter` lets collide.
///
/// Each cloth contributes its self-collision particle subset, or all of its
/// particles when no subset is set.
pub fn inter_collide(
    cloths: &mut [&mut Cloth],
    config: &InterCollisionConfig,
    filter: &(dyn Fn(u64, u64) -> bool + Send + Sync),
    buffers: &mut InterCollisionBuffers,
) {
    if !config.is_enabled() || cloths.len() < 2 {
        return;
    }

    buffers.positions.clear();
    buffers.origins.clear();
    buffers.user_data.clear();

    for (c, cloth) in cloths.iter().enumerate() {
        buffers.user_data.push(cloth.user_data());
        let motion = cloth.target_motion;
        let particles = cloth.particles.current();
        let mut gather = |i: u32| {
            let p = particles[i as usize];
            buffers
                .positions
                .push(motion.transform_point(p.truncate()).extend(p.w));
            buffers.origins.push((c as u32, i));
        };
        if cloth.self_collision_indices.is_empty() {
            (0..particles.len() as u32).for_each(&mut gather);
        } else {
            cloth.self_collision_indices.iter().copied().for_each(&mut gather);
        }
    }

    let bounds = BoundingBox::from_points(&buffers.positions);
    let grid = SweepGrid::new(bounds, config.distance);
    let response = PairResponse::new(config.distance, config.stiffness);
    let count = buffers.positions.len();

    let origins = &buffers.origins;
    let user_data = &buffers.user_data;
    for _ in 0..config.iterations {
        sweep_and_collide(
            &mut buffers.positions,
            count,
            |i| i,
            &grid,
            &response,
            &mut buffers.sweep,
            |i, j| {
                let (a, b) = (origins[i].0 as usize, origins[j].0 as usize);
                a != b && filter(user_data[a], user_data[b])
            },
        );
    }

    for (p, &(c, i)) in buffers.positions.iter().zip(&buffers.origins) {
        let cloth = &mut *cloths[c as usize];
        let local = cloth.target_motion.inverse_transform_point(p.truncate());
        let particle = &mut cloth.particles.current_mut()[i as usize];
        *particle = local.extend(particle.w);
    }
}
