use rand::{
    distributions::{Distribution, Uniform},
    rngs::StdRng,
    SeedableRng,
};

/// Seed every driver starts from, so runs are reproducible across processes.
pub const DEFAULT_SEED: u64 = 42;

/// Deterministic stream of uniform samples in `[-1, 1)`.
///
/// The stream is never reset: every draw advances it, and two streams
/// built with the same seed yield the same sequence.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: StdRng,
    uniform: Uniform<f32>,
    drawn: u64,
}

impl RandomStream {
    pub fn new() -> RandomStream {
        RandomStream::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> RandomStream {
        RandomStream {
            rng: StdRng::seed_from_u64(seed),
            uniform: Uniform::new(-1.0, 1.0),
            drawn: 0,
        }
    }

    pub fn uniform(&mut self, len: usize) -> Vec<f32> {
        self.drawn += len as u64;
        (0..len).map(|_| self.uniform.sample(&mut self.rng)).collect()
    }

    /// Number of samples drawn since the stream was seeded.
    pub fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl Default for RandomStream {
    fn default() -> Self {
        RandomStream::new()
    }
}
