use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::Initializer;

pub const DEFAULT_DENSITY: f64 = 0.5;

/// A reseedable pseudo-random stream that remembers the seed it was started from.
pub struct SeedSource {
    seed: u64,
    rng: StdRng,
}

impl SeedSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::rng().random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Switch to `seed` and rewind the stream to its start.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Rewind to the current seed so the next draws repeat the previous run.
    pub fn reuse(&mut self) {
        self.set_seed(self.seed);
    }

    /// Draw a fresh seed and rewind to it.
    pub fn renew(&mut self) {
        let seed = rand::rng().random();
        log::debug!("seed renewed: {} -> {}", self.seed, seed);
        self.set_seed(seed);
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Fills each cell independently, alive with probability `density`.
pub struct RandomFill {
    density: f64,
    seeds: SeedSource,
}

impl RandomFill {
    pub fn new(density: f64, seeds: SeedSource) -> Self {
        Self {
            density: density.clamp(0.0, 1.0),
            seeds,
        }
    }
}

impl Initializer for RandomFill {
    fn fill(&mut self, cells: &mut [bool]) {
        for cell in cells.iter_mut() {
            *cell = self.seeds.next_f64() < self.density;
        }
    }

    fn seeds(&mut self) -> Option<&mut SeedSource> {
        Some(&mut self.seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(source: &mut SeedSource, n: usize) -> Vec<f64> {
        (0..n).map(|_| source.next_f64()).collect()
    }

    #[test]
    fn reuse_replays_the_same_stream() {
        let mut source = SeedSource::new(42);
        let first = draws(&mut source, 16);
        source.reuse();
        assert_eq!(draws(&mut source, 16), first);
    }

    #[test]
    fn renew_keeps_the_new_seed_reusable() {
        let mut source = SeedSource::new(7);
        source.renew();
        let seed = source.seed();
        let first = draws(&mut source, 8);
        source.reuse();
        assert_eq!(source.seed(), seed);
        assert_eq!(draws(&mut source, 8), first);
    }

    #[test]
    fn draws_stay_in_unit_interval() {
        let mut source = SeedSource::new(3);
        assert!(draws(&mut source, 1000).iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn density_bounds_are_respected() {
        let mut cells = vec![false; 64];
        RandomFill::new(1.0, SeedSource::new(1)).fill(&mut cells);
        assert!(cells.iter().all(|&c| c));

        RandomFill::new(0.0, SeedSource::new(1)).fill(&mut cells);
        assert!(cells.iter().all(|&c| !c));
    }
}
