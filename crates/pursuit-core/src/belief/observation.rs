//! Sensor model: likelihood of a noisy distance reading given a hypothesised position.

use crate::model::Cell;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Half-width of the sonar error window; errors range over `-SONAR_MAX..=SONAR_MAX`.
const SONAR_MAX: i32 = 7;

/// `(error, probability)` pairs; weight halves with every step away from zero error.
static SONAR_NOISE: Lazy<Vec<(i32, f64)>> = Lazy::new(|| {
    let denominator = 2f64.powi(SONAR_MAX) + 2f64.powi(SONAR_MAX + 1) - 2.0;
    (-SONAR_MAX..=SONAR_MAX)
        .map(|error| (error, 2f64.powi(SONAR_MAX - error.abs()) / denominator))
        .collect()
});

/// Discretized distance-error model.
pub trait NoiseModel {
    /// `P(noisy | true_distance)`.
    fn probability(&self, noisy: u32, true_distance: u32) -> f64;

    /// Draws a reading for an opponent at `true_distance`.
    fn sample_reading<R: Rng + ?Sized>(&self, true_distance: u32, rng: &mut R) -> u32
    where
        Self: Sized;
}

/// Built-in sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorModel {
    /// Symmetric error in `-7..=7` with geometrically decaying weight.
    #[default]
    Sonar,
    /// Perfect readings.
    Exact,
}

impl SensorModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            SensorModel::Sonar => "sonar",
            SensorModel::Exact => "exact",
        }
    }
}

impl FromStr for SensorModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sonar" | "noisy" => Ok(SensorModel::Sonar),
            "exact" | "perfect" => Ok(SensorModel::Exact),
            other => Err(format!("unknown sensor model '{other}'")),
        }
    }
}

impl NoiseModel for SensorModel {
    fn probability(&self, noisy: u32, true_distance: u32) -> f64 {
        match self {
            SensorModel::Exact => {
                if noisy == true_distance {
                    1.0
                } else {
                    0.0
                }
            }
            SensorModel::Sonar => SONAR_NOISE
                .iter()
                .filter(|(error, _)| (i64::from(noisy) - i64::from(*error)).max(1) == i64::from(true_distance))
                .map(|(_, prob)| *prob)
                .sum(),
        }
    }

    fn sample_reading<R: Rng + ?Sized>(&self, true_distance: u32, rng: &mut R) -> u32 {
        match self {
            SensorModel::Exact => true_distance,
            SensorModel::Sonar => {
                let mut choice = rng.gen_range(0.0..1.0);
                let mut error = 0;
                for (candidate, prob) in SONAR_NOISE.iter() {
                    error = *candidate;
                    if choice < *prob {
                        break;
                    }
                    choice -= prob;
                }
                (i64::from(true_distance) + i64::from(error)).max(0) as u32
            }
        }
    }
}

/// Likelihood of `noisy` for an opponent hypothesised at `opponent`.
///
/// A missing reading is only consistent with the opponent sitting in `jail`, and a
/// jailed opponent never produces a reading.
pub fn observation_probability<N: NoiseModel + ?Sized>(
    noisy: Option<u32>,
    agent: Cell,
    opponent: Cell,
    jail: Cell,
    noise: &N,
) -> f64 {
    match noisy {
        None => {
            if opponent == jail {
                1.0
            } else {
                0.0
            }
        }
        Some(_) if opponent == jail => 0.0,
        Some(reading) => noise.probability(reading, agent.manhattan(opponent)),
    }
}
