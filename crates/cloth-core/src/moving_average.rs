use std::collections::VecDeque;

/// Run-length encoded window of recent samples.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Run {
    count: u32,
    value: f32,
}

/// Smoothed average over the last `capacity` samples.
///
/// Samples are pushed in runs (`n` copies of one value), which is how
/// per-frame iteration time steps arrive. The average weights the oldest and
/// newest eighth of the window with a linear ramp so a single frame with an
/// odd time step does not produce a step change.
#[derive(Clone, Debug)]
pub struct MovingAverage {
    runs: VecDeque<Run>,
    count: u32,
    capacity: u32,
}

impl MovingAverage {
    pub fn new(capacity: u32) -> Self {
        Self {
            runs: VecDeque::new(),
            count: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of samples currently in the window.
    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn resize(&mut self, capacity: u32) {
        self.capacity = capacity.max(1);
        self.trim();
    }

    pub fn reset(&mut self) {
        self.runs.clear();
        self.count = 0;
    }

    /// Append `n` samples of `value`, evicting the oldest beyond capacity.
    pub fn push(&mut self, n: u32, value: f32) {
        let n = n.min(self.capacity);
        if n == 0 {
            return;
        }
        match self.runs.back_mut() {
            Some(last) if last.value == value => last.count += n,
            _ => self.runs.push_back(Run { count: n, value }),
        }
        self.count += n;
        self.trim();
    }

    /// Weighted average of the window. Returns 0 when empty.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let ramp = self.count / 8;
        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        let mut i = 0u32;
        for run in &self.runs {
            for _ in 0..run.count {
                let w = (i + 1).min(self.count - i).min(ramp + 1) as f64;
                weighted += w * run.value as f64;
                total += w;
                i += 1;
            }
        }
        (weighted / total) as f32
    }

    fn trim(&mut self) {
        while self.count > self.capacity {
            let excess = self.count - self.capacity;
            let Some(front) = self.runs.front_mut() else {
                break;
            };
            if front.count <= excess {
                self.count -= front.count;
                self.runs.pop_front();
            } else {
                front.count -= excess;
                self.count -= excess;
            }
        }
    }
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_push_returns_value() {
        let mut avg = MovingAverage::new(30);
        avg.push(5, 0.004);
        assert!((avg.average() - 0.004).abs() < 1e-9);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut avg = MovingAverage::new(4);
        avg.push(4, 1.0);
        avg.push(4, 3.0);
        assert_eq!(avg.len(), 4);
        assert!((avg.average() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_runs_between_extremes() {
        let mut avg = MovingAverage::new(30);
        avg.push(10, 1.0);
        avg.push(10, 2.0);
        let a = avg.average();
        assert!(a > 1.0 && a < 2.0, "average {a} outside sample range");
    }
}
