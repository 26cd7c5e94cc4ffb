//! Edge id generation
//!
//! Ids are produced by an injected generator so test runs stay
//! reproducible while production runs can use random ids.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of unique ids for generated edges
pub trait IdGenerator {
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Monotonic counter: `edge-1`, `edge-2`, ...
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    counter: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }
}

/// Random alphanumeric suffixes, seedable for reproducible runs
#[derive(Debug, Clone)]
pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let suffix: String = (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        format!("{}-{}", prefix, suffix.to_lowercase())
    }
}
