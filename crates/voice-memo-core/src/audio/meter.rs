use std::collections::VecDeque;

/// Floor of the level scale. Silence, empty buffers and non-finite results map here.
pub const MIN_LEVEL_DB: f32 = -160.0;

/// Number of level samples kept for visualization.
pub const LEVEL_HISTORY_CAPACITY: usize = 50;

/// Computes the level of a buffer as `10 * log10(mean(sample^2))`.
///
/// Deterministic and side-effect free. Accumulates in `f64` so the result
/// does not drift with buffer length for constant-amplitude input.
pub fn level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return MIN_LEVEL_DB;
    }

    let sum_of_squares: f64 = samples
        .iter()
        .map(|&s| {
            let s = f64::from(s);
            s * s
        })
        .sum();
    let mean_square = sum_of_squares / samples.len() as f64;
    let db = 10.0 * mean_square.log10();

    if db.is_finite() {
        (db as f32).max(MIN_LEVEL_DB)
    } else {
        MIN_LEVEL_DB
    }
}

/// Bounded FIFO of recent level samples, oldest first.
#[derive(Debug, Clone)]
pub struct LevelHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl LevelHistory {
    /// Creates a history holding at most `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest once over capacity.
    pub fn push(&mut self, level: f32) {
        self.samples.push_back(level);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    /// Samples in oldest-first order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    /// Copies the samples out, oldest first.
    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drops every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for LevelHistory {
    fn default() -> Self {
        Self::with_capacity(LEVEL_HISTORY_CAPACITY)
    }
}
