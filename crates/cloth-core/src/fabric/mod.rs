//! Immutable constraint topology shared by any number of cloths.
//!
//! A fabric is built once, wrapped in an [`Arc`], and referenced by every
//! cloth created from it. The last cloth to drop its handle frees it.

pub mod cooker;

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::error::{check_indices, check_size, ClothError, ClothResult};
use crate::math::to_log_coefficient;

/// Raw fabric data as produced by a cooker or an authoring tool.
///
/// `sets` holds the exclusive end offset of each constraint set (no leading
/// zero). `phases` maps each phase to the set it relaxes. Per-constraint
/// `stiffness_values` are user coefficients in `[0, 1]` or empty.
#[derive(Clone, Debug, Default)]
pub struct FabricDesc {
    pub num_particles: u32,
    pub phases: Vec<u32>,
    pub sets: Vec<u32>,
    pub rest_values: Vec<f32>,
    pub stiffness_values: Vec<f32>,
    pub indices: Vec<u32>,
    pub anchors: Vec<u32>,
    pub tether_lengths: Vec<f32>,
    pub triangles: Vec<u32>,
}

/// Validated, solver-ready fabric.
#[derive(Debug)]
pub struct Fabric {
    num_particles: u32,
    phases: Vec<u32>,
    /// Set offsets prefixed with 0, so set `s` spans `sets[s]..sets[s + 1]`.
    sets: Vec<u32>,
    rest_values: Vec<f32>,
    /// `log2(1 - stiffness)` per constraint, or empty.
    stiffness_values: Vec<f32>,
    indices: Vec<u32>,
    anchors: Vec<u32>,
    tether_lengths: Vec<f32>,
    triangles: Vec<u32>,
}

impl Fabric {
    pub fn new(desc: FabricDesc) -> ClothResult<Arc<Self>> {
        let np = desc.num_particles as usize;
        let num_constraints = desc.rest_values.len();

        if desc.sets.windows(2).any(|w| w[0] >= w[1]) || desc.sets.first() == Some(&0) {
            return Err(ClothError::InvalidFabric(
                "constraint sets must be non-empty and sorted".into(),
            ));
        }
        check_size(
            "constraint rest values",
            desc.sets.last().copied().unwrap_or(0) as usize,
            num_constraints,
        )?;
        check_size("constraint indices", num_constraints * 2, desc.indices.len())?;
        if !desc.stiffness_values.is_empty() {
            check_size(
                "constraint stiffness values",
                num_constraints,
                desc.stiffness_values.len(),
            )?;
        }
        check_indices("constraint index", desc.indices.iter().copied(), np)?;
        check_indices("phase set", desc.phases.iter().copied(), desc.sets.len())?;

        check_size("tether lengths", desc.anchors.len(), desc.tether_lengths.len())?;
        if np > 0 && desc.anchors.len() % np != 0 {
            return Err(ClothError::InvalidFabric(format!(
                "{} tethers is not a multiple of {} particles",
                desc.anchors.len(),
                np
            )));
        }
        check_indices("tether anchor", desc.anchors.iter().copied(), np)?;

        if desc.triangles.len() % 3 != 0 {
            return Err(ClothError::InvalidFabric(format!(
                "{} triangle indices is not a multiple of 3",
                desc.triangles.len()
            )));
        }
        check_indices("triangle index", desc.triangles.iter().copied(), np)?;

        let mut sets = Vec::with_capacity(desc.sets.len() + 1);
        sets.push(0);
        sets.extend_from_slice(&desc.sets);

        let stiffness_values = desc
            .stiffness_values
            .iter()
            .map(|&s| to_log_coefficient(s.clamp(0.0, 1.0)))
            .collect();

        debug!(
            particles = np,
            phases = desc.phases.len(),
            constraints = num_constraints,
            tethers = desc.anchors.len(),
            triangles = desc.triangles.len() / 3,
            "fabric created"
        );

        Ok(Arc::new(Self {
            num_particles: desc.num_particles,
            phases: desc.phases,
            sets,
            rest_values: desc.rest_values,
            stiffness_values,
            indices: desc.indices,
            anchors: desc.anchors,
            tether_lengths: desc.tether_lengths,
            triangles: desc.triangles,
        }))
    }

    pub fn num_particles(&self) -> usize {
        self.num_particles as usize
    }

    pub fn num_phases(&self) -> usize {
        self.phases.len()
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len() - 1
    }

    pub fn num_constraints(&self) -> usize {
        self.rest_values.len()
    }

    pub fn num_tethers(&self) -> usize {
        self.anchors.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Constraint range relaxed by `phase`.
    pub fn phase_range(&self, phase: usize) -> Range<usize> {
        let set = self.phases[phase] as usize;
        self.sets[set] as usize..self.sets[set + 1] as usize
    }

    pub fn phases(&self) -> &[u32] {
        &self.phases
    }

    pub fn rest_values(&self) -> &[f32] {
        &self.rest_values
    }

    pub fn stiffness_values(&self) -> &[f32] {
        &self.stiffness_values
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn anchors(&self) -> &[u32] {
        &self.anchors
    }

    pub fn tether_lengths(&self) -> &[f32] {
        &self.tether_lengths
    }

    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }
}
