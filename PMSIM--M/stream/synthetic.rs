use std::f64::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    dataset::{DatasetError, TabularDataset},
    inference::{DenseNetwork, InferenceError},
};

/// Feature columns produced by [`SyntheticProfile`].
pub const FEATURE_NAMES: [&str; 5] = ["ambient", "coolant", "motor_speed", "torque", "current"];

const TRUE_WEIGHTS: [f64; 5] = [0.3, 0.5, 0.002, 0.12, 0.05];
const TRUE_BIAS: f64 = 10.0;

/// Seeded generator of motor-like samples following a periodic load cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProfile {
    /// Number of samples.
    pub samples: usize,
    /// RNG seed.
    pub seed: u64,
    /// Samples per load cycle.
    pub period: usize,
    /// Half-width of the uniform target noise.
    pub noise: f64,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        Self {
            samples: 600,
            seed: 7,
            period: 240,
            noise: 1.5,
        }
    }
}

/// Dataset plus the linear model that explains it.
#[derive(Debug, Clone)]
pub struct SyntheticRun {
    /// Generated samples.
    pub dataset: TabularDataset,
    /// Regression model matching the generating process.
    pub model: DenseNetwork,
}

/// Failure assembling a synthetic run.
#[derive(Debug, thiserror::Error)]
pub enum SyntheticError {
    /// Dataset assembly failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// Model assembly failed.
    #[error(transparent)]
    Model(#[from] InferenceError),
}

impl SyntheticProfile {
    /// Generates the dataset and its model.
    pub fn generate(&self) -> Result<SyntheticRun, SyntheticError> {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let period = self.period.max(2);
        let mut rows = Vec::with_capacity(self.samples);
        let mut targets = Vec::with_capacity(self.samples);
        for idx in 0..self.samples {
            #[allow(clippy::cast_precision_loss)]
            let phase = TAU * (idx % period) as f64 / period as f64;
            let load = 0.5 - 0.5 * phase.cos();
            let row = vec![
                24.0 + jitter(&mut rng, 0.5),
                40.0 + 35.0 * load + jitter(&mut rng, 0.5),
                1000.0 + 4000.0 * load + jitter(&mut rng, 25.0),
                20.0 + 100.0 * load + jitter(&mut rng, 2.0),
                50.0 + 150.0 * load + jitter(&mut rng, 3.0),
            ];
            let clean: f64 = row.iter().zip(TRUE_WEIGHTS).map(|(x, w)| x * w).sum();
            targets.push(clean + TRUE_BIAS + jitter(&mut rng, self.noise));
            rows.push(row);
        }
        Ok(SyntheticRun {
            dataset: TabularDataset::from_rows(rows, targets)?,
            model: DenseNetwork::linear(TRUE_WEIGHTS.to_vec(), TRUE_BIAS)?,
        })
    }
}

fn jitter(rng: &mut SmallRng, half_width: f64) -> f64 {
    if half_width > 0.0 {
        rng.gen_range(-half_width..half_width)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::DatasetSource, inference::InferenceService};

    #[test]
    fn generation_is_reproducible() {
        let profile = SyntheticProfile {
            samples: 32,
            ..SyntheticProfile::default()
        };
        let a = profile.generate().unwrap();
        let b = profile.generate().unwrap();
        assert_eq!(a.dataset, b.dataset);
        assert_eq!(a.dataset.len(), 32);
        assert_eq!(a.dataset.feature_width(), FEATURE_NAMES.len());
    }

    #[test]
    fn model_tracks_targets_within_noise() {
        let profile = SyntheticProfile {
            samples: 120,
            noise: 1.0,
            ..SyntheticProfile::default()
        };
        let mut run = profile.generate().unwrap();
        for idx in 0..run.dataset.len() {
            let sample = run.dataset.get(idx).unwrap();
            let predicted = run.model.predict(sample.features).unwrap();
            assert!((predicted - sample.actual).abs() <= 1.0);
        }
    }

    #[test]
    fn load_cycle_crosses_default_threshold() {
        let run = SyntheticProfile::default().generate().unwrap();
        let summary = run.dataset.summary();
        assert!(summary.target_min.unwrap() < 80.0);
        assert!(summary.target_max.unwrap() > 80.0);
    }
}
