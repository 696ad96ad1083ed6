//! Belief tracking over hidden opponent positions.
//!
//! This module is composed of:
//! - `distribution`: the weighted-map primitive every estimator returns.
//! - `observation`: sensor likelihoods for noisy distance readings.
//! - `transition`: the one-step motion model, including capture into jail.
//! - `exact`, `particle`, `joint`, `marginal`: the estimators themselves.
//! - `telemetry`: summary metrics for logging belief quality.

mod distribution;
mod exact;
mod joint;
mod marginal;
mod observation;
mod particle;
pub mod telemetry;
mod transition;

pub use distribution::{DiscreteDistribution, DistributionError};
pub use exact::ExactInference;
pub use joint::{JointHandle, JointParticleFilter, JointPosition};
pub use marginal::MarginalInference;
pub use observation::{NoiseModel, SensorModel, observation_probability};
pub use particle::ParticleFilter;
pub use transition::{transition_distribution, transition_from};

use crate::game::{GridWorld, OpponentPolicy};
use crate::model::Cell;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PARTICLES: usize = 300;
pub const DEFAULT_JOINT_PARTICLES: usize = 600;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Distribution(#[from] DistributionError),
    #[error("layout has no open cell to place an opponent on")]
    NoLegalPositions,
    #[error("particle count must be positive")]
    ZeroParticles,
    #[error("expected {expected} sensor readings, got {found}")]
    ReadingCount { expected: usize, found: usize },
    #[error("expected {expected} opponent policies, got {found}")]
    PolicyCount { expected: usize, found: usize },
}

/// Which estimator family tracks the opponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    Exact,
    Particle,
    Joint,
}

impl EstimatorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EstimatorKind::Exact => "exact",
            EstimatorKind::Particle => "particle",
            EstimatorKind::Joint => "joint",
        }
    }

    /// Particle budget used when none is configured. Exact inference ignores it.
    pub const fn default_particles(self) -> usize {
        match self {
            EstimatorKind::Joint => DEFAULT_JOINT_PARTICLES,
            EstimatorKind::Exact | EstimatorKind::Particle => DEFAULT_PARTICLES,
        }
    }
}

impl FromStr for EstimatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(EstimatorKind::Exact),
            "particle" | "particles" => Ok(EstimatorKind::Particle),
            "joint" | "marginal" => Ok(EstimatorKind::Joint),
            other => Err(format!("unknown estimator '{other}'")),
        }
    }
}

/// One opponent's tracker, whichever family it comes from.
#[derive(Debug, Clone)]
pub enum Estimator {
    Exact(ExactInference),
    Particle(ParticleFilter),
    Marginal(MarginalInference),
}

impl Estimator {
    /// Builds one tracker per opponent. Joint trackers share a single filter.
    pub fn build_all(kind: EstimatorKind, num_opponents: usize, particles: usize, noise: SensorModel) -> Vec<Estimator> {
        match kind {
            EstimatorKind::Exact => (1..=num_opponents)
                .map(|opponent| Estimator::Exact(ExactInference::new(opponent, noise)))
                .collect(),
            EstimatorKind::Particle => (1..=num_opponents)
                .map(|opponent| Estimator::Particle(ParticleFilter::new(opponent, particles, noise)))
                .collect(),
            EstimatorKind::Joint => {
                let handle = JointHandle::new(JointParticleFilter::new(particles, noise));
                (1..=num_opponents)
                    .map(|opponent| Estimator::Marginal(MarginalInference::new(opponent, handle.clone())))
                    .collect()
            }
        }
    }

    pub fn kind(&self) -> EstimatorKind {
        match self {
            Estimator::Exact(_) => EstimatorKind::Exact,
            Estimator::Particle(_) => EstimatorKind::Particle,
            Estimator::Marginal(_) => EstimatorKind::Joint,
        }
    }

    pub fn opponent(&self) -> usize {
        match self {
            Estimator::Exact(inner) => inner.opponent(),
            Estimator::Particle(inner) => inner.opponent(),
            Estimator::Marginal(inner) => inner.opponent(),
        }
    }

    pub fn initialize<W: GridWorld>(&mut self, state: &W) -> Result<(), TrackingError> {
        match self {
            Estimator::Exact(inner) => inner.initialize(state),
            Estimator::Particle(inner) => inner.initialize(state),
            Estimator::Marginal(inner) => inner.initialize(state),
        }
    }

    pub fn observe<W: GridWorld, R: Rng + ?Sized>(
        &mut self,
        state: &W,
        rng: &mut R,
    ) -> Result<(), TrackingError> {
        match self {
            Estimator::Exact(inner) => {
                inner.observe(state);
                Ok(())
            }
            Estimator::Particle(inner) => inner.observe(state, rng),
            Estimator::Marginal(inner) => inner.observe(state, rng),
        }
    }

    /// `policies[i]` models opponent `i + 1`; single-opponent trackers use only their own.
    pub fn elapse_time<W, P, R>(&mut self, state: &W, policies: &[P], rng: &mut R) -> Result<(), TrackingError>
    where
        W: GridWorld + Clone,
        P: OpponentPolicy<W>,
        R: Rng + ?Sized,
    {
        let opponent = self.opponent();
        let own = || {
            policies.get(opponent - 1).ok_or(TrackingError::PolicyCount {
                expected: opponent,
                found: policies.len(),
            })
        };
        match self {
            Estimator::Exact(inner) => {
                inner.elapse_time(state, own()?);
                Ok(())
            }
            Estimator::Particle(inner) => inner.elapse_time(state, own()?, rng),
            Estimator::Marginal(inner) => inner.elapse_time(state, policies, rng),
        }
    }

    pub fn beliefs(&self) -> DiscreteDistribution<Cell> {
        match self {
            Estimator::Exact(inner) => inner.beliefs().clone(),
            Estimator::Particle(inner) => inner.beliefs(),
            Estimator::Marginal(inner) => inner.beliefs(),
        }
    }
}
