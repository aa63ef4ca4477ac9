//! Position-based cloth simulation.
//!
//! A [`Fabric`] holds the immutable constraint topology, a [`Cloth`] the
//! per-instance particles and time-varying inputs, and a [`SwSolver`] steps
//! any number of cloths one frame at a time.

pub mod bounds;
pub mod cloth;
pub mod collision;
pub mod config;
pub mod constraints;
pub mod double_buffer;
pub mod error;
pub mod fabric;
pub mod forces;
pub mod inter_collision;
pub mod iteration_state;
pub mod kernel;
pub mod math;
pub mod moving_average;
pub mod particle;
pub mod scheduler;
pub mod scratch;
pub mod self_collision;
pub mod solver;
pub mod sort;

pub use cloth::{Capsule, Cloth, MAX_COLLISION_SHAPES, MAX_COLLISION_TRIANGLES};
pub use config::{ClothConfig, InterCollisionConfig, PhaseConfig};
pub use error::{ClothError, ClothResult};
pub use fabric::cooker::{cook, CookedFabric, MeshDesc, PhaseType};
pub use fabric::{Fabric, FabricDesc};
pub use solver::{ClothId, ClothSolver, SimulationChunk, SwSolver};
