use std::ops::BitAndAssign;

use glam::{Vec3, Vec4};

use super::shapes::ConeData;
use crate::bounds::BoundingBox;
use crate::math::EPSILON;

/// Cells per axis.
pub const GRID_SIZE: usize = 8;

/// Grid coordinates map the collision bounds onto `[0, GRID_LENGTH]`.
const GRID_LENGTH: f32 = GRID_SIZE as f32 - 1e-3;

/// Relative padding of the grid bounds against rounding.
const GRID_EXPAND: f32 = 1e-4;

/// Candidate spheres and cones for one point or trajectory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShapeMask {
    pub spheres: u32,
    pub cones: u32,
}

impl BitAndAssign for ShapeMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.spheres &= rhs.spheres;
        self.cones &= rhs.cones;
    }
}

/// Per-axis bitmask acceleration structure over at most 32 spheres and
/// 32 cones.
///
/// For each axis and cell, the "first" row marks shapes whose lower extent
/// is at or before the cell and the "last" row marks shapes whose upper
/// extent is at or after it. Continuous collision queries the rows
/// separately with the two corners of a trajectory's box; after
/// [`ShapeGrid::merge`] the first rows hold the shapes overlapping each
/// cell and answer point queries.
#[derive(Clone, Debug)]
pub struct ShapeGrid {
    scale: Vec3,
    bias: Vec3,
    /// Rows `0..3` are "first" per axis, rows `3..6` are "last".
    spheres: [[u32; GRID_SIZE]; 6],
    cones: [[u32; GRID_SIZE]; 6],
}

impl Default for ShapeGrid {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            bias: Vec3::ZERO,
            spheres: [[0; GRID_SIZE]; 6],
            cones: [[0; GRID_SIZE]; 6],
        }
    }
}

impl ShapeGrid {
    /// Build the grid over the overlap of the sphere and particle bounds.
    ///
    /// `prev_spheres` is given for continuous collision and widens both the
    /// bounds and the marked cells to cover the spheres' motion. Returns
    /// false when no particle can touch any sphere.
    pub fn build(
        &mut self,
        spheres: &[Vec4],
        prev_spheres: Option<&[Vec4]>,
        cones: &[ConeData],
        particle_bounds: BoundingBox,
    ) -> bool {
        let mut sphere_bounds = BoundingBox::from_spheres(spheres);
        if let Some(prev) = prev_spheres {
            sphere_bounds = sphere_bounds.expand_spheres(prev);
        }

        let bounds = sphere_bounds.intersect(particle_bounds);
        if bounds.is_empty() {
            return false;
        }

        let lower = bounds.lower - bounds.lower.abs() * GRID_EXPAND;
        let upper = bounds.upper + bounds.upper.abs() * GRID_EXPAND;
        let edge = (upper - lower).max(Vec3::splat(EPSILON));
        self.scale = Vec3::splat(GRID_LENGTH) / edge;
        self.bias = -lower * self.scale;

        self.spheres = [[0; GRID_SIZE]; 6];
        if let Some(prev) = prev_spheres {
            self.mark_spheres(prev);
        }
        self.mark_spheres(spheres);

        self.cones = [[0; GRID_SIZE]; 6];
        self.mark_cones(cones);
        true
    }

    fn mark_spheres(&mut self, spheres: &[Vec4]) {
        for (i, sphere) in spheres.iter().enumerate() {
            let mask = 1u32 << i;
            let center = sphere.truncate();
            let first = self.clamped_cell(center - sphere.w);
            let last = self.clamped_cell(center + sphere.w);
            for axis in 0..3 {
                for cell in &mut self.spheres[axis][first[axis]..] {
                    *cell |= mask;
                }
                for cell in &mut self.spheres[3 + axis][..=last[axis]] {
                    *cell |= mask;
                }
            }
        }
    }

    /// A cone occupies every cell either of its spheres does.
    fn mark_cones(&mut self, cones: &[ConeData]) {
        for (i, cone) in cones.iter().enumerate() {
            if cone.radius == 0.0 {
                continue;
            }
            let mask = 1u32 << i;
            for (sphere_row, cone_row) in self.spheres.iter().zip(self.cones.iter_mut()) {
                for (s, c) in sphere_row.iter().zip(cone_row.iter_mut()) {
                    if s & cone.both_mask != 0 {
                        *c |= mask;
                    }
                }
            }
        }
    }

    /// Collapse first/last rows into per-cell overlap masks.
    pub fn merge(&mut self) {
        for grid in [&mut self.spheres, &mut self.cones] {
            for axis in 0..3 {
                let last = grid[3 + axis];
                for (cell, l) in grid[axis].iter_mut().zip(last) {
                    *cell &= l;
                }
            }
        }
    }

    fn coordinates(&self, p: Vec3) -> Vec3 {
        p * self.scale + self.bias
    }

    fn clamped_cell(&self, p: Vec3) -> [usize; 3] {
        let c = self.coordinates(p).clamp(Vec3::ZERO, Vec3::splat(GRID_LENGTH));
        [c.x as usize, c.y as usize, c.z as usize]
    }

    /// Look up one row at a grid coordinate; outside the grid matches nothing.
    fn lookup(&self, row: usize, coordinate: f32) -> ShapeMask {
        let cell = coordinate.floor();
        if !(0.0..GRID_SIZE as f32).contains(&cell) {
            return ShapeMask::default();
        }
        let cell = cell as usize;
        ShapeMask {
            spheres: self.spheres[row][cell],
            cones: self.cones[row][cell],
        }
    }

    /// Shapes whose cells contain `p`. Valid after [`ShapeGrid::merge`].
    pub fn point_mask(&self, p: Vec3) -> ShapeMask {
        let c = self.coordinates(p);
        let mut mask = self.lookup(0, c.x);
        mask &= self.lookup(1, c.y);
        mask &= self.lookup(2, c.z);
        mask
    }

    /// Shapes overlapping the box around a trajectory. Valid before
    /// [`ShapeGrid::merge`].
    pub fn swept_mask(&self, prev: Vec3, cur: Vec3) -> ShapeMask {
        let prev = self.coordinates(prev);
        let cur = self.coordinates(cur);
        let max = prev.max(cur).min(Vec3::splat(GRID_LENGTH));
        let min = prev.min(cur).max(Vec3::ZERO);

        let mut mask = self.lookup(0, max.x);
        mask &= self.lookup(1, max.y);
        mask &= self.lookup(2, max.z);
        mask &= self.lookup(3, min.x);
        mask &= self.lookup(4, min.y);
        mask &= self.lookup(5, min.z);
        mask
    }
}
