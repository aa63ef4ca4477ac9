//! Particle-particle collision by sort and sweep.
//!
//! Particles are keyed by a fine bucket along the longest bounds axis and
//! coarse buckets along the two others, radix sorted, then swept: each
//! particle is tested against later particles in its own cell and in four of
//! its eight neighbouring cells within a window of sweep buckets. The other
//! four neighbours see the pair from their side, so no pair is tested twice.

use glam::{Vec3, Vec4};

use crate::bounds::BoundingBox;
use crate::cloth::Cloth;
use crate::iteration_state::IterationState;
use crate::math::{compound, EPSILON};
use crate::scratch::SweepBuffers;
use crate::sort::radix_sort;

/// Low 16 bits of a key hold the sweep bucket.
const BUCKET_MASK: u32 = 0x0000_ffff;

/// Key offsets of the searched cells: own cell, then hash0 + 1,
/// (hash0 - 1, hash1 + 1), hash1 + 1 and (hash0 + 1, hash1 + 1).
const KEY_OFFSETS: [u32; 5] = [0, 0x0001_0000, 0x00ff_0000, 0x0100_0000, 0x0101_0000];

/// Hash buckets per axis are `1..=253`; 0, 254 and 255 stay free so the
/// neighbour offsets never wrap into another cell.
const HASH_GRID_SIZE: f32 = 254.0;
/// Sweep buckets are `1..=65533`; 0 and 65535 stay free as sentinels.
const SWEEP_GRID_SIZE: f32 = 65534.0;

fn longest_axis(edge: Vec3) -> usize {
    if edge.x > edge.y {
        if edge.x > edge.z {
            0
        } else {
            2
        }
    } else if edge.y > edge.z {
        1
    } else {
        2
    }
}

/// Quantisation of positions into sortable keys.
#[derive(Clone, Copy, Debug)]
pub struct SweepGrid {
    scale: Vec3,
    bias: Vec3,
    grid_size: Vec3,
    sweep_axis: usize,
    hash_axes: [usize; 2],
    window: u32,
}

impl SweepGrid {
    pub fn new(bounds: BoundingBox, distance: f32) -> Self {
        let edge = (bounds.upper - bounds.lower).max(Vec3::splat(EPSILON));
        let sweep_axis = longest_axis(edge);
        let hash_axes = [(sweep_axis + 1) % 3, (sweep_axis + 2) % 3];

        let mut cell_size = Vec3::splat(distance).max(edge / (HASH_GRID_SIZE - 1.0));
        cell_size[sweep_axis] = edge[sweep_axis] / (SWEEP_GRID_SIZE - 1.0);

        let mut grid_size = Vec3::splat(HASH_GRID_SIZE);
        grid_size[sweep_axis] = SWEEP_GRID_SIZE;

        let scale = cell_size.recip();
        // +1 keeps bucket 0 free
        let bias = -bounds.lower * scale + Vec3::ONE;

        let window = 2u32.saturating_add((scale[sweep_axis] * distance).floor() as u32);

        Self {
            scale,
            bias,
            grid_size,
            sweep_axis,
            hash_axes,
            window,
        }
    }

    /// Key of a position. Positions outside the bounds clamp to the border
    /// buckets.
    pub fn key(&self, p: Vec3) -> u32 {
        let cell = (p * self.scale + self.bias)
            .min(self.grid_size - Vec3::ONE)
            .max(Vec3::ONE)
            .floor();
        cell[self.sweep_axis] as u32
            | (cell[self.hash_axes[0]] as u32) << 16
            | (cell[self.hash_axes[1]] as u32) << 24
    }

    /// Sweep buckets searched ahead of each particle.
    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn sweep_axis(&self) -> usize {
        self.sweep_axis
    }
}

#[inline]
fn key_range(key: u32, window: u32) -> (u32, u32) {
    let first = key - window.min(key & BUCKET_MASK);
    let last = key.saturating_add(window).min(key | BUCKET_MASK);
    (first, last)
}

/// Call `visit(a, b)` with two positions into `keys` for every candidate
/// pair. `keys` must be sorted and end with a `u32::MAX` sentinel.
///
/// Every search pointer only moves forward, so the sweep is linear in the
/// number of keys plus candidate pairs.
pub fn for_each_candidate_pair(keys: &[u32], window: u32, mut visit: impl FnMut(usize, usize)) {
    let n = keys.len().saturating_sub(1);
    if n == 0 {
        return;
    }
    debug_assert_eq!(keys[n], u32::MAX);

    let mut first = [0usize; 5];
    let mut last = [0usize; 5];

    // position the cursors once for the first key
    {
        let (lo, hi) = key_range(keys[0], window);
        let mut it = 0;
        while keys[it] < hi {
            it += 1;
        }
        last[0] = it;
        for c in 1..5 {
            while keys[it] < lo + KEY_OFFSETS[c] {
                it += 1;
            }
            first[c] = it;
            while keys[it] < hi + KEY_OFFSETS[c] {
                it += 1;
            }
            last[c] = it;
        }
    }

    for i in 0..n {
        let (lo, hi) = key_range(keys[i], window);

        while keys[last[0]] < hi {
            last[0] += 1;
        }
        for j in i + 1..last[0] {
            visit(i, j);
        }

        for c in 1..5 {
            while keys[first[c]] < lo + KEY_OFFSETS[c] {
                first[c] += 1;
            }
            while keys[last[c]] < hi + KEY_OFFSETS[c] {
                last[c] += 1;
            }
            for j in first[c]..last[c] {
                visit(i, j);
            }
        }
    }
}

/// Pushes two particles apart to the collision distance, weighted by
/// inverse mass.
#[derive(Clone, Copy, Debug)]
pub struct PairResponse {
    pub distance: f32,
    pub stiffness: f32,
    sqr_distance: f32,
}

impl PairResponse {
    pub fn new(distance: f32, stiffness: f32) -> Self {
        Self {
            distance,
            stiffness,
            sqr_distance: distance * distance,
        }
    }

    pub fn sqr_distance(&self) -> f32 {
        self.sqr_distance
    }

    pub fn collide(&self, p0: &mut Vec4, p1: &mut Vec4) {
        let diff = (*p1 - *p0).truncate();
        let sqr_distance = diff.length_squared();
        if sqr_distance > self.sqr_distance {
            return;
        }

        let w0 = p0.w;
        let w1 = p1.w;
        let ratio = self.distance / sqr_distance.max(EPSILON).sqrt();
        let scale = self.stiffness / (EPSILON + w0 + w1);
        let delta = (diff - diff * ratio) * scale;

        *p0 += (delta * w0).extend(0.0);
        *p1 -= (delta * w1).extend(0.0);
    }
}

/// Two distinct elements of a slice.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    if a < b {
        let (low, high) = items.split_at_mut(b);
        (&mut low[a], &mut high[0])
    } else {
        let (low, high) = items.split_at_mut(a);
        (&mut high[0], &mut low[b])
    }
}

/// Key, sort and sweep `count` particles, colliding every candidate pair
/// that `accept` lets through.
///
/// `index` maps a slot in `0..count` to a particle in `positions`.
pub(crate) fn sweep_and_collide(
    positions: &mut [Vec4],
    count: usize,
    index: impl Fn(usize) -> usize,
    grid: &SweepGrid,
    response: &PairResponse,
    buffers: &mut SweepBuffers,
    mut accept: impl FnMut(usize, usize) -> bool,
) {
    if count < 2 {
        return;
    }

    buffers.keys.clear();
    buffers
        .keys
        .extend((0..count).map(|i| grid.key(positions[index(i)].truncate())));

    radix_sort(&buffers.keys, &mut buffers.sorted, &mut buffers.radix);

    buffers.sorted_keys.clear();
    let keys = &buffers.keys;
    buffers
        .sorted_keys
        .extend(buffers.sorted.iter().map(|&i| keys[i as usize]));
    buffers.sorted_keys.push(u32::MAX);

    let sorted = &buffers.sorted;
    for_each_candidate_pair(&buffers.sorted_keys, grid.window(), |a, b| {
        let i = index(sorted[a] as usize);
        let j = index(sorted[b] as usize);
        if i == j || !accept(i, j) {
            return;
        }
        let (p0, p1) = pair_mut(positions, i, j);
        response.collide(p0, p1);
    });
}

/// Resolve particle pairs of one cloth closer than its self-collision
/// distance.
pub fn self_collide(cloth: &mut Cloth, state: &IterationState, buffers: &mut SweepBuffers) {
    let stiffness = compound(
        cloth.self_collision_log_stiffness,
        cloth.stiffness_frequency * state.iter_dt,
    );
    let distance = cloth.self_collision_distance;
    if distance.min(stiffness) <= 0.0 {
        return;
    }

    let response = PairResponse::new(distance, stiffness);
    let grid = SweepGrid::new(cloth.bounds, distance);

    let indices = &cloth.self_collision_indices;
    let rest = &cloth.rest_positions;
    let positions = cloth.particles.current_mut();
    let count = if indices.is_empty() {
        positions.len()
    } else {
        indices.len()
    };
    let index = |i: usize| {
        if indices.is_empty() {
            i
        } else {
            indices[i] as usize
        }
    };

    // pairs already this close at rest are not pushed apart
    let accept = |i: usize, j: usize| {
        rest.is_empty() || (rest[j] - rest[i]).truncate().length_squared() >= response.sqr_distance()
    };

    sweep_and_collide(positions, count, index, &grid, &response, buffers, accept);
}

/// Every candidate pair the sweep tests, as particle indices.
pub fn candidate_pairs(positions: &[Vec4], distance: f32) -> Vec<(u32, u32)> {
    let grid = SweepGrid::new(BoundingBox::from_points(positions), distance);
    let keys: Vec<u32> = positions.iter().map(|p| grid.key(p.truncate())).collect();
    let mut sorted = Vec::new();
    let mut scratch = Vec::new();
    radix_sort(&keys, &mut sorted, &mut scratch);
    let mut sorted_keys: Vec<u32> = sorted.iter().map(|&i| keys[i as usize]).collect();
    sorted_keys.push(u32::MAX);

    let mut pairs = Vec::new();
    for_each_candidate_pair(&sorted_keys, grid.window(), |a, b| {
        let (i, j) = (sorted[a], sorted[b]);
        pairs.push((i.min(j), i.max(j)));
    });
    pairs
}

/// O(n^2) reference: every pair strictly closer than `distance`.
pub fn close_pairs_brute_force(positions: &[Vec4], distance: f32) -> Vec<(u32, u32)> {
    let sqr_distance = distance * distance;
    let mut pairs = Vec::new();
    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            let d = (positions[j] - positions[i]).truncate();
            if d.length_squared() < sqr_distance {
                pairs.push((i as u32, j as u32));
            }
        }
    }
    pairs
}
