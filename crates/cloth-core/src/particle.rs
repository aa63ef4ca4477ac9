use glam::Vec4;

/// Number of zeroed slots kept past the last real particle.
///
/// Virtual-particle padding triplets point at these slots, so they must
/// always exist and are never read back.
pub const DUMMY_PARTICLES: usize = 3;

/// Verlet particle storage: current and previous positions.
///
/// Each particle is `xyz` position plus inverse mass in `w`. An inverse mass
/// of zero marks an immovable particle. `previous.w` holds the user's inverse
/// mass; `current.w` may be zeroed by motion constraints or scaled by
/// collision during a frame.
#[derive(Clone, Debug)]
pub struct ParticleBuffers {
    count: usize,
    current: Vec<Vec4>,
    previous: Vec<Vec4>,
}

impl ParticleBuffers {
    pub fn new(particles: &[Vec4]) -> Self {
        let count = particles.len();
        let mut current = Vec::with_capacity(count + DUMMY_PARTICLES);
        current.extend_from_slice(particles);
        current.resize(count + DUMMY_PARTICLES, Vec4::ZERO);
        let previous = current.clone();
        Self {
            count,
            current,
            previous,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn current(&self) -> &[Vec4] {
        &self.current[..self.count]
    }

    pub fn current_mut(&mut self) -> &mut [Vec4] {
        &mut self.current[..self.count]
    }

    pub fn previous(&self) -> &[Vec4] {
        &self.previous[..self.count]
    }

    pub fn previous_mut(&mut self) -> &mut [Vec4] {
        &mut self.previous[..self.count]
    }

    /// Both buffers at once, real particles only.
    pub fn split_mut(&mut self) -> (&mut [Vec4], &mut [Vec4]) {
        (&mut self.current[..self.count], &mut self.previous[..self.count])
    }

    /// Current positions as a flat `f32` slice (`x, y, z, w` per particle).
    pub fn current_as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(self.current())
    }
}
