//! Kick-power generator for recorder mode.
//!
//! The browser client asks for a fresh kick every time its particle crosses
//! the RF kick zone. Draws are uniform over the configured range and come
//! from a seeded generator so a session can be replayed.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RecorderConfig;

/// Seeded source of kick-power values.
#[derive(Debug)]
pub struct KickGenerator {
    min: f64,
    max: f64,
    rng: Mutex<StdRng>,
}

impl KickGenerator {
    /// Build a generator from recorder settings.
    ///
    /// The range is assumed to be validated by
    /// [`RecorderConfig::validate`].
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            min: config.kick_power_min,
            max: config.kick_power_max,
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
        }
    }

    /// Draw one kick in `[min, max]`.
    ///
    /// Falls back to the lower bound if the generator lock is poisoned.
    pub fn draw(&self) -> f64 {
        self.rng.lock().map_or_else(
            |_| {
                tracing::warn!("Kick generator lock poisoned, returning minimum");
                self.min
            },
            |mut rng| rng.random_range(self.min..=self.max),
        )
    }

    /// The configured `(min, max)` range.
    pub const fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}
