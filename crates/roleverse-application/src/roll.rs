//! Dice for the chance engine.

use rand::Rng;

/// Source of uniform draws in `[0, 100)`.
///
/// Production draws are not replayable; tests inject a fixed value.
pub trait RollSource: Send + Sync {
    fn roll(&self) -> f64;
}

/// Draws from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngRoll;

impl RollSource for ThreadRngRoll {
    fn roll(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..100.0)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedRoll(pub f64);

impl RollSource for FixedRoll {
    fn roll(&self) -> f64 {
        self.0
    }
}
