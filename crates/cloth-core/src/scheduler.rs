//! Reorders virtual-particle triplets into conflict-free batches.
//!
//! A batch of `width` triplets is evaluated in lock step, so no real particle
//! may appear twice inside one batch. Sets of batches are padded to a
//! multiple of `width` with dummy triplets that point at the scratch slots
//! past the last real particle.

/// Three particle indices plus an index into the weight table.
pub type Triplet = [u32; 4];

#[derive(Clone, Debug, Default)]
pub struct TripletScheduler {
    triplets: Vec<Triplet>,
    set_sizes: Vec<u32>,
    padded: Vec<Triplet>,
}

impl TripletScheduler {
    pub fn new(triplets: &[Triplet]) -> Self {
        Self {
            triplets: triplets.to_vec(),
            set_sizes: Vec::new(),
            padded: Vec::new(),
        }
    }

    /// Reordered triplets, without padding.
    pub fn triplets(&self) -> &[Triplet] {
        &self.triplets
    }

    /// Number of real triplets in each set.
    pub fn set_sizes(&self) -> &[u32] {
        &self.set_sizes
    }

    /// Sets laid out back to back, each padded to a multiple of the width.
    pub fn padded_triplets(&self) -> &[Triplet] {
        &self.padded
    }

    pub fn into_padded_triplets(self) -> Vec<Triplet> {
        self.padded
    }

    /// Group triplets so each aligned run of `width` shares no particle.
    ///
    /// Scans forward from the current position for the first triplet that
    /// does not touch the batch and swaps it into place. When none remains
    /// the current set is closed and the triplet starts a new one.
    pub fn simd(&mut self, num_particles: u32, width: u32) {
        self.set_sizes.clear();
        self.padded.clear();
        let width = width.max(1) as usize;
        if self.triplets.is_empty() {
            return;
        }

        let mut batch: Vec<u32> = Vec::with_capacity(width * 3);
        let mut set_size = 0usize;
        let mut i = 0usize;
        while i < self.triplets.len() {
            if set_size % width == 0 {
                batch.clear();
            }

            let conflicts = |t: &Triplet| t[..3].iter().any(|p| batch.contains(p));
            match (i..self.triplets.len()).find(|&j| !conflicts(&self.triplets[j])) {
                Some(j) => {
                    batch.extend_from_slice(&self.triplets[j][..3]);
                    self.triplets.swap(i, j);
                    set_size += 1;
                    i += 1;
                }
                None => {
                    self.set_sizes.push(set_size as u32);
                    set_size = 0;
                }
            }
        }
        if set_size > 0 {
            self.set_sizes.push(set_size as u32);
        }

        let dummy = [num_particles, num_particles + 1, num_particles + 2, 0];
        let mut next = 0usize;
        for &size in &self.set_sizes {
            let size = size as usize;
            self.padded
                .extend_from_slice(&self.triplets[next..next + size]);
            next += size;
            let padding = (width - size % width) % width;
            self.padded.extend(std::iter::repeat(dummy).take(padding));
        }
    }
}
