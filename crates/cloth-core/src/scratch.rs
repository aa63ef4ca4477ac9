//! Working memory for one simulation chunk, reused across frames.
//!
//! Buffers keep their capacity between uses and are cleared at the start of
//! every chunk, so nothing from a previous cloth survives a reset.

use std::mem::size_of;

use glam::Vec4;

use crate::cloth::{Cloth, MAX_COLLISION_SHAPES};
use crate::collision::shapes::{ConeData, TriangleData};

/// Interpolated collision shapes for the current and previous iteration.
#[derive(Debug, Default)]
pub struct CollisionBuffers {
    pub(crate) spheres: Vec<Vec4>,
    pub(crate) prev_spheres: Vec<Vec4>,
    pub(crate) cones: Vec<ConeData>,
    pub(crate) prev_cones: Vec<ConeData>,
    pub(crate) planes: Vec<Vec4>,
    pub(crate) triangles: Vec<TriangleData>,
}

impl CollisionBuffers {
    fn clear(&mut self) {
        self.spheres.clear();
        self.prev_spheres.clear();
        self.cones.clear();
        self.prev_cones.clear();
        self.planes.clear();
        self.triangles.clear();
    }

    fn reserve(&mut self, cloth: &Cloth) {
        self.spheres.reserve(MAX_COLLISION_SHAPES);
        self.prev_spheres.reserve(MAX_COLLISION_SHAPES);
        self.cones.reserve(cloth.num_capsules());
        self.prev_cones.reserve(cloth.num_capsules());
        self.planes.reserve(cloth.num_planes());
        self.triangles.reserve(cloth.num_triangles());
    }
}

/// Keys and permutation buffers of the sweep-and-prune collision passes.
#[derive(Debug, Default)]
pub struct SweepBuffers {
    pub(crate) keys: Vec<u32>,
    /// Sorted keys followed by a `u32::MAX` sentinel.
    pub(crate) sorted_keys: Vec<u32>,
    pub(crate) sorted: Vec<u32>,
    pub(crate) radix: Vec<u32>,
}

impl SweepBuffers {
    pub(crate) fn clear(&mut self) {
        self.keys.clear();
        self.sorted_keys.clear();
        self.sorted.clear();
        self.radix.clear();
    }

    pub(crate) fn reserve(&mut self, count: usize) {
        self.keys.reserve(count);
        self.sorted_keys.reserve(count + 1);
        self.sorted.reserve(count);
        self.radix.reserve(count);
    }
}

#[derive(Debug, Default)]
pub struct Scratch {
    pub(crate) collision: CollisionBuffers,
    pub(crate) sweep: SweepBuffers,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every buffer and make room for simulating `cloth`.
    pub fn reset(&mut self, cloth: &Cloth) {
        self.collision.clear();
        self.sweep.clear();
        self.collision.reserve(cloth);
        if cloth.is_self_collision_enabled() {
            self.sweep.reserve(self_collision_count(cloth));
        }
    }

    /// Bytes currently reserved.
    pub fn capacity_bytes(&self) -> usize {
        let c = &self.collision;
        let s = &self.sweep;
        (c.spheres.capacity() + c.prev_spheres.capacity() + c.planes.capacity()) * size_of::<Vec4>()
            + (c.cones.capacity() + c.prev_cones.capacity()) * size_of::<ConeData>()
            + c.triangles.capacity() * size_of::<TriangleData>()
            + (s.keys.capacity() + s.sorted_keys.capacity() + s.sorted.capacity() + s.radix.capacity())
                * size_of::<u32>()
    }
}

fn self_collision_count(cloth: &Cloth) -> usize {
    if cloth.self_collision_indices.is_empty() {
        cloth.num_particles()
    } else {
        cloth.self_collision_indices.len()
    }
}

/// Upper bound on the scratch bytes one frame of `cloth` needs.
pub fn estimate_temporary_memory(cloth: &Cloth) -> usize {
    let spheres = 2 * cloth.num_spheres() * size_of::<Vec4>();
    let cones = 2 * cloth.num_capsules() * size_of::<ConeData>();
    let planes = cloth.num_planes() * size_of::<Vec4>();
    let triangles = cloth.num_triangles() * size_of::<TriangleData>();

    let self_collision = if cloth.is_self_collision_enabled() {
        (4 * self_collision_count(cloth) + 1) * size_of::<u32>()
    } else {
        0
    };

    spheres + cones + planes + triangles + self_collision
}
