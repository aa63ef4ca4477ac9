//! Builds fabric topology from a triangle/quad mesh.
//!
//! Every mesh edge and every vertex pair two edges apart is a candidate
//! constraint. Candidates are scored by the shape of the path connecting
//! them and classified as stretch (horizontal or vertical relative to
//! gravity), shearing, or bending. Each class is then greedily coloured into
//! particle-disjoint sets so one set can be relaxed in any order.

use std::collections::BTreeMap;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::FabricDesc;
use crate::error::{check_indices, check_size, ClothError, ClothResult};

/// Edges whose direction is closer than this to gravity count as vertical.
const HORIZONTAL_COSINE: f32 = 0.632_455_5; // sqrt(0.4)

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseType {
    Vertical,
    Horizontal,
    Bending,
    Shearing,
}

/// Input mesh. `inv_masses` and `point_stiffness` may be empty.
#[derive(Clone, Debug, Default)]
pub struct MeshDesc {
    pub points: Vec<Vec3>,
    pub inv_masses: Vec<f32>,
    pub triangles: Vec<[u32; 3]>,
    pub quads: Vec<[u32; 4]>,
    pub point_stiffness: Vec<f32>,
}

impl MeshDesc {
    /// Regular quad grid in the XY plane hanging down from `y = 0`.
    ///
    /// Particle `row * columns + column` sits at
    /// `(column * spacing, -row * spacing, 0)`.
    pub fn grid(columns: u32, rows: u32, spacing: f32) -> Self {
        let mut points = Vec::with_capacity((columns * rows) as usize);
        for r in 0..rows {
            for c in 0..columns {
                points.push(Vec3::new(c as f32 * spacing, -(r as f32) * spacing, 0.0));
            }
        }
        let mut quads = Vec::new();
        for r in 0..rows.saturating_sub(1) {
            for c in 0..columns.saturating_sub(1) {
                let i = r * columns + c;
                quads.push([i, i + 1, i + 1 + columns, i + columns]);
            }
        }
        Self {
            points,
            quads,
            ..Default::default()
        }
    }

    /// Particles as `(position, inverse mass)`, defaulting to unit mass.
    pub fn particles(&self) -> Vec<Vec4> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| p.extend(self.inv_masses.get(i).copied().unwrap_or(1.0)))
            .collect()
    }

    fn validate(&self) -> ClothResult<()> {
        let np = self.points.len();
        if np == 0 {
            return Err(ClothError::InvalidFabric("mesh has no points".into()));
        }
        if !self.inv_masses.is_empty() {
            check_size("mesh inverse masses", np, self.inv_masses.len())?;
        }
        if !self.point_stiffness.is_empty() {
            check_size("mesh point stiffness", np, self.point_stiffness.len())?;
        }
        check_indices("mesh triangle", self.triangles.iter().flatten().copied(), np)?;
        check_indices("mesh quad", self.quads.iter().flatten().copied(), np)?;
        Ok(())
    }

    /// Unique 1-ring neighbours of every vertex.
    fn neighbors(&self) -> Vec<Vec<u32>> {
        let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); self.points.len()];
        let mut link = |a: u32, b: u32| {
            let list = &mut neighbors[a as usize];
            if !list.contains(&b) {
                list.push(b);
            }
        };
        for t in &self.triangles {
            for j in 0..3 {
                link(t[j], t[(j + 1) % 3]);
                link(t[j], t[(j + 2) % 3]);
            }
        }
        for q in &self.quads {
            for j in 0..4 {
                link(q[j], q[(j + 1) % 4]);
                link(q[j], q[(j + 3) % 4]);
            }
        }
        neighbors
    }

    /// Triangle list with quads split along their 0-2 diagonal.
    fn triangle_indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.triangles.len() * 3 + self.quads.len() * 6);
        for t in &self.triangles {
            out.extend_from_slice(t);
        }
        for q in &self.quads {
            out.extend_from_slice(&[q[0], q[1], q[2], q[2], q[3], q[0]]);
        }
        out
    }
}

/// Cooked fabric plus the class of each phase.
#[derive(Clone, Debug)]
pub struct CookedFabric {
    pub desc: FabricDesc,
    pub phase_types: Vec<PhaseType>,
}

#[derive(Clone, Copy, Default)]
struct EdgeScore {
    stretching: f32,
    bending: f32,
    shearing: f32,
}

impl EdgeScore {
    fn classify_ring(&mut self) {
        self.stretching += 0.1;
    }

    /// Score the `p0-p2` edge by the alternative path through `p1`.
    fn classify_path(&mut self, p0: Vec3, p1: Vec3, p2: Vec3) {
        let area = (p1 - p0).cross(p2 - p1).length();
        // 1.0 for a quad edge, 0.5 for a quad diagonal, 0.0 for collinear
        let ratio = area / (p2 - p0).length_squared();
        self.shearing += (0.15 - (0.45 - ratio).abs()).max(0.0);
        self.bending += (0.1 - ratio).max(0.0) * 3.0;
    }

    fn phase_type(&self, a: Vec3, b: Vec3, gravity: Vec3) -> Option<PhaseType> {
        if self.stretching + self.bending + self.shearing <= 0.0 {
            return None;
        }
        let kind = if self.bending > self.stretching.max(self.shearing) {
            PhaseType::Bending
        } else if self.shearing > self.stretching.max(self.bending) {
            PhaseType::Shearing
        } else {
            let dot = gravity.dot((a - b).normalize_or_zero());
            if dot.abs() < HORIZONTAL_COSINE {
                PhaseType::Horizontal
            } else {
                PhaseType::Vertical
            }
        };
        Some(kind)
    }
}

/// Cook `mesh` into a fabric. `gravity` only orients stretch edges.
pub fn cook(mesh: &MeshDesc, gravity: Vec3) -> ClothResult<CookedFabric> {
    mesh.validate()?;
    let gravity = gravity.normalize_or_zero();
    let particles = mesh.particles();
    let np = particles.len();
    let neighbors = mesh.neighbors();

    // BTreeMap keeps the output independent of hashing order.
    let mut edges: BTreeMap<(u32, u32), EdgeScore> = BTreeMap::new();
    let key = |a: u32, b: u32| (a.min(b), a.max(b));
    for i in 0..np as u32 {
        let wi = particles[i as usize].w;
        for &m in &neighbors[i as usize] {
            if wi + particles[m as usize].w > 0.0 {
                edges.entry(key(i, m)).or_default().classify_ring();
            }
            for &n in &neighbors[m as usize] {
                if n != i && wi + particles[n as usize].w > 0.0 {
                    edges.entry(key(i, n)).or_default().classify_path(
                        particles[i as usize].truncate(),
                        particles[m as usize].truncate(),
                        particles[n as usize].truncate(),
                    );
                }
            }
        }
    }

    let constraints: Vec<((u32, u32), PhaseType)> = edges
        .iter()
        .filter_map(|(&(a, b), score)| {
            score
                .phase_type(
                    particles[a as usize].truncate(),
                    particles[b as usize].truncate(),
                    gravity,
                )
                .map(|kind| ((a, b), kind))
        })
        .collect();

    // Greedy colouring: a colour may hold each movable particle once.
    let mut color_types: Vec<PhaseType> = Vec::new();
    let mut color_used: Vec<Vec<bool>> = Vec::new();
    let mut members: Vec<Vec<(u32, u32)>> = Vec::new();
    for &((a, b), kind) in &constraints {
        let movable = |p: u32| particles[p as usize].w != 0.0;
        let color = (0..color_types.len()).find(|&c| {
            color_types[c] == kind
                && !(movable(a) && color_used[c][a as usize])
                && !(movable(b) && color_used[c][b as usize])
        });
        let color = match color {
            Some(c) => c,
            None => {
                color_types.push(kind);
                color_used.push(vec![false; np]);
                members.push(Vec::new());
                color_types.len() - 1
            }
        };
        color_used[color][a as usize] = true;
        color_used[color][b as usize] = true;
        members[color].push((a, b));
    }

    let mut desc = FabricDesc {
        num_particles: np as u32,
        ..Default::default()
    };
    for (color, set) in members.iter_mut().enumerate() {
        set.sort_unstable();
        for &(a, b) in set.iter() {
            desc.indices.extend_from_slice(&[a, b]);
            desc.rest_values
                .push((particles[b as usize] - particles[a as usize]).truncate().length());
            if !mesh.point_stiffness.is_empty() {
                desc.stiffness_values.push(
                    mesh.point_stiffness[a as usize].min(mesh.point_stiffness[b as usize]),
                );
            }
        }
        desc.phases.push(color as u32);
        desc.sets.push(desc.rest_values.len() as u32);
    }

    let (anchors, lengths) = simple_tethers(&particles);
    desc.anchors = anchors;
    desc.tether_lengths = lengths;
    desc.triangles = mesh.triangle_indices();

    Ok(CookedFabric {
        desc,
        phase_types: color_types,
    })
}

/// One tether per particle to its closest pinned particle.
///
/// Returns empty tethers when nothing is pinned.
pub fn simple_tethers(particles: &[Vec4]) -> (Vec<u32>, Vec<f32>) {
    let pinned: Vec<u32> = (0..particles.len() as u32)
        .filter(|&i| particles[i as usize].w == 0.0)
        .collect();
    if pinned.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let mut anchors = Vec::with_capacity(particles.len());
    let mut lengths = Vec::with_capacity(particles.len());
    for p in particles {
        let (anchor, dist_sq) = pinned
            .iter()
            .map(|&a| (a, (particles[a as usize] - *p).truncate().length_squared()))
            .fold((pinned[0], f32::MAX), |best, c| if c.1 < best.1 { c } else { best });
        anchors.push(anchor);
        lengths.push(dist_sq.sqrt());
    }
    (anchors, lengths)
}
