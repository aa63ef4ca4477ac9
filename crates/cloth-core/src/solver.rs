//! Multi-cloth solver.
//!
//! The solver owns its cloths and exposes one chunk of work per cloth. A
//! frame is `begin_simulation`, every chunk once (in any order, on any
//! thread), then `end_simulation`, which runs inter-cloth collision and so
//! must wait for all chunks.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, trace, trace_span, warn};

use crate::cloth::Cloth;
use crate::config::InterCollisionConfig;
use crate::error::{ClothError, ClothResult};
use crate::inter_collision::{inter_collide, InterCollisionBuffers, InterCollisionFilter};
use crate::iteration_state::IterationStateFactory;
use crate::kernel::simulate_cloth;
use crate::scratch::Scratch;

/// Handle of a cloth inside a solver. Never reused by the same solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClothId(u64);

impl ClothId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Backend-independent solver interface.
///
/// Only a CPU backend exists; device backends would implement the same
/// frame protocol and report failures through [`ClothSolver::has_error`].
pub trait ClothSolver {
    fn add_cloth(&mut self, cloth: Cloth) -> ClothId;
    fn remove_cloth(&mut self, id: ClothId) -> ClothResult<Cloth>;
    fn num_cloths(&self) -> usize;
    fn cloth(&self, id: ClothId) -> ClothResult<&Cloth>;
    fn cloth_mut(&mut self, id: ClothId) -> ClothResult<&mut Cloth>;

    /// Start a frame of length `dt`. Returns false if there is nothing to
    /// simulate, in which case the rest of the frame must be skipped.
    fn begin_simulation(&mut self, dt: f32) -> bool;
    fn simulation_chunk_count(&self) -> usize;
    fn simulate_chunk(&mut self, index: usize);
    fn end_simulation(&mut self);

    fn set_inter_collision(&mut self, config: InterCollisionConfig);
    fn inter_collision(&self) -> InterCollisionConfig;
    fn set_inter_collision_filter(&mut self, filter: InterCollisionFilter);

    /// Whether the backend hit an unrecoverable device error.
    fn has_error(&self) -> bool {
        false
    }
}

/// One cloth plus the scratch memory its frame runs in.
pub struct SimulationChunk {
    id: ClothId,
    cloth: Cloth,
    scratch: Scratch,
}

impl SimulationChunk {
    pub fn id(&self) -> ClothId {
        self.id
    }

    pub fn cloth(&self) -> &Cloth {
        &self.cloth
    }

    /// Simulate one frame of this chunk's cloth.
    ///
    /// A zero time step leaves the particles alone but still promotes the
    /// frame's interpolation targets.
    pub fn simulate(&mut self, dt: f32) {
        let _span = trace_span!(
            "simulate_chunk",
            cloth = self.id.0,
            particles = self.cloth.num_particles()
        )
        .entered();

        if dt > 0.0 {
            let factory = IterationStateFactory::new(&mut self.cloth, dt);
            simulate_cloth(&mut self.cloth, &factory, &mut self.scratch);
        }
        self.cloth.pop_targets();
        trace!(scratch_bytes = self.scratch.capacity_bytes(), "chunk simulated");
    }
}

/// CPU solver. Chunks are kept sorted by particle count, largest first, so
/// a thread pool picks up the longest jobs early.
pub struct SwSolver {
    chunks: Vec<SimulationChunk>,
    next_id: u64,
    dt: f32,
    inter_collision: InterCollisionConfig,
    inter_collision_filter: Option<InterCollisionFilter>,
    inter_collision_buffers: InterCollisionBuffers,
    warned_missing_filter: bool,
}

impl Default for SwSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SwSolver {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            next_id: 0,
            dt: 0.0,
            inter_collision: InterCollisionConfig::default(),
            inter_collision_filter: None,
            inter_collision_buffers: InterCollisionBuffers::default(),
            warned_missing_filter: false,
        }
    }

    fn position(&self, id: ClothId) -> ClothResult<usize> {
        self.chunks
            .iter()
            .position(|c| c.id == id)
            .ok_or(ClothError::ClothNotFound(id))
    }

    pub fn cloth_ids(&self) -> impl Iterator<Item = ClothId> + '_ {
        self.chunks.iter().map(|c| c.id)
    }

    /// Time step of the frame in progress.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Chunks for a host-side thread pool. Each may be simulated on its own
    /// thread with [`SimulationChunk::simulate`] and [`SwSolver::dt`].
    pub fn chunks_mut(&mut self) -> &mut [SimulationChunk] {
        &mut self.chunks
    }

    /// Run a whole frame: begin, every chunk, end. With the `parallel`
    /// feature the chunks run on the rayon pool.
    pub fn simulate(&mut self, dt: f32) {
        if !self.begin_simulation(dt) {
            return;
        }

        #[cfg(feature = "parallel")]
        {
            self.chunks.par_iter_mut().for_each(|chunk| chunk.simulate(dt));
        }

        #[cfg(not(feature = "parallel"))]
        {
            for chunk in &mut self.chunks {
                chunk.simulate(dt);
            }
        }

        self.end_simulation();
    }

    fn collide_cloths(&mut self) {
        if !self.inter_collision.is_enabled() {
            return;
        }
        let Some(filter) = self.inter_collision_filter.as_deref() else {
            if !self.warned_missing_filter {
                warn!("inter collision is configured but has no filter; set one with set_inter_collision_filter");
                self.warned_missing_filter = true;
            }
            return;
        };

        let mut cloths: Vec<&mut Cloth> = self.chunks.iter_mut().map(|c| &mut c.cloth).collect();
        inter_collide(
            &mut cloths,
            &self.inter_collision,
            filter,
            &mut self.inter_collision_buffers,
        );
    }
}

impl ClothSolver for SwSolver {
    fn add_cloth(&mut self, cloth: Cloth) -> ClothId {
        let id = ClothId(self.next_id);
        self.next_id += 1;
        debug!(cloth = id.0, particles = cloth.num_particles(), "cloth added");

        self.chunks.push(SimulationChunk {
            id,
            cloth,
            scratch: Scratch::new(),
        });
        self.chunks
            .sort_by(|a, b| b.cloth.num_particles().cmp(&a.cloth.num_particles()));
        id
    }

    fn remove_cloth(&mut self, id: ClothId) -> ClothResult<Cloth> {
        let index = self.position(id)?;
        let chunk = self.chunks.remove(index);
        debug!(cloth = id.0, remaining = self.chunks.len(), "cloth removed");
        Ok(chunk.cloth)
    }

    fn num_cloths(&self) -> usize {
        self.chunks.len()
    }

    fn cloth(&self, id: ClothId) -> ClothResult<&Cloth> {
        let index = self.position(id)?;
        Ok(&self.chunks[index].cloth)
    }

    fn cloth_mut(&mut self, id: ClothId) -> ClothResult<&mut Cloth> {
        let index = self.position(id)?;
        Ok(&mut self.chunks[index].cloth)
    }

    fn begin_simulation(&mut self, dt: f32) -> bool {
        if self.chunks.is_empty() {
            return false;
        }
        self.dt = dt;
        true
    }

    fn simulation_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn simulate_chunk(&mut self, index: usize) {
        let dt = self.dt;
        if let Some(chunk) = self.chunks.get_mut(index) {
            chunk.simulate(dt);
        }
    }

    fn end_simulation(&mut self) {
        self.collide_cloths();
    }

    fn set_inter_collision(&mut self, config: InterCollisionConfig) {
        self.inter_collision = config;
    }

    fn inter_collision(&self) -> InterCollisionConfig {
        self.inter_collision
    }

    fn set_inter_collision_filter(&mut self, filter: InterCollisionFilter) {
        self.inter_collision_filter = Some(filter);
    }
}
