//! Shared random source for the randomized components.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Mutex;

/// A lockable `StdRng`. Seed it in tests for reproducible draws.
#[derive(Debug)]
pub struct SharedRng(Mutex<StdRng>);

impl SharedRng {
    pub fn from_entropy() -> Self {
        Self(Mutex::new(StdRng::from_os_rng()))
    }

    pub fn seeded(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    /// Run `f` with exclusive access to the generator.
    pub fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.0.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
