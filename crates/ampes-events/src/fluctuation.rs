//! Stochastic heat-source power perturbation
//!
//! The random source is injected so a run can be pinned to a seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use ampes_settings::{FluctuationScheme, FluctuationSettings, RunConfig};

/// Applies the configured power fluctuation to nominal powers
#[derive(Debug, Clone)]
pub struct PowerFluctuator<R: Rng = ChaCha8Rng> {
    settings: Option<FluctuationSettings>,
    rng: R,
}

impl PowerFluctuator<ChaCha8Rng> {
    /// Fluctuator for a run, seeded from the configuration or from entropy
    pub fn from_config(config: &RunConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        if let Some(settings) = config.fluctuation {
            debug!(
                "Applying {} scheme to fluctuate power (deviation {}, seed {:?})",
                settings.scheme, settings.deviation, config.seed
            );
        }
        Self::new(config.fluctuation, rng)
    }

    /// Fluctuator with a fixed seed
    pub fn seeded(settings: Option<FluctuationSettings>, seed: u64) -> Self {
        Self::new(settings, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> PowerFluctuator<R> {
    /// Create a fluctuator over an explicit random source
    pub fn new(settings: Option<FluctuationSettings>, rng: R) -> Self {
        Self { settings, rng }
    }

    /// Whether powers are perturbed at all
    pub fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    /// Draw one perturbation, 0 when disabled
    pub fn perturbation(&mut self) -> f64 {
        let Some(FluctuationSettings { scheme, deviation }) = self.settings else {
            return 0.0;
        };
        if deviation == 0.0 {
            return 0.0;
        }

        match scheme {
            FluctuationScheme::Gaussian => {
                let z: f64 = self.rng.sample(StandardNormal);
                (z * deviation / 3.0).clamp(-deviation, deviation)
            }
            FluctuationScheme::Strict => {
                let offsets = [-deviation, 0.0, deviation];
                offsets[self.rng.gen_range(0..offsets.len())]
            }
            FluctuationScheme::Uniform => self.rng.gen_range(-deviation..=deviation),
        }
    }

    /// Perturbed power, never negative
    ///
    /// A nominal power of zero stays zero.
    pub fn apply(&mut self, nominal: f64) -> f64 {
        if !self.is_enabled() || nominal == 0.0 {
            return nominal;
        }
        (nominal + self.perturbation()).max(0.0)
    }
}
