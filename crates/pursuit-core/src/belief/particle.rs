use super::observation::{SensorModel, observation_probability};
use super::transition::transition_from;
use super::{DiscreteDistribution, TrackingError};
use crate::game::{GridWorld, OpponentPolicy};
use crate::model::Cell;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{Level, event};

/// Sampling approximation of [`super::ExactInference`] with a fixed particle budget.
#[derive(Debug, Clone)]
pub struct ParticleFilter {
    opponent: usize,
    noise: SensorModel,
    num_particles: usize,
    legal: Vec<Cell>,
    particles: Vec<Cell>,
}

impl ParticleFilter {
    pub fn new(opponent: usize, num_particles: usize, noise: SensorModel) -> Self {
        debug_assert!(opponent >= 1, "opponent indices start at 1");
        Self {
            opponent,
            noise,
            num_particles,
            legal: Vec::new(),
            particles: Vec::new(),
        }
    }

    pub fn opponent(&self) -> usize {
        self.opponent
    }

    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    pub fn particles(&self) -> &[Cell] {
        &self.particles
    }

    pub fn initialize<W: GridWorld>(&mut self, state: &W) -> Result<(), TrackingError> {
        if self.num_particles == 0 {
            return Err(TrackingError::ZeroParticles);
        }
        self.legal = state.layout().open_cells();
        if self.legal.is_empty() {
            return Err(TrackingError::NoLegalPositions);
        }
        self.initialize_uniformly();
        Ok(())
    }

    /// Spreads particles over legal cells by cycling, so counts differ by at most one.
    pub fn initialize_uniformly(&mut self) {
        let legal = &self.legal;
        self.particles = (0..self.num_particles)
            .map(|idx| legal[idx % legal.len()])
            .collect();
    }

    pub fn observe<W: GridWorld, R: Rng + ?Sized>(
        &mut self,
        state: &W,
        rng: &mut R,
    ) -> Result<(), TrackingError> {
        match state.noisy_distances().get(self.opponent - 1).copied() {
            Some(reading) => self.observe_update(reading, state.agent_position(), rng),
            None => Ok(()),
        }
    }

    /// Reweights particles by the reading's likelihood and resamples.
    pub fn observe_update<R: Rng + ?Sized>(
        &mut self,
        reading: Option<u32>,
        agent: Cell,
        rng: &mut R,
    ) -> Result<(), TrackingError> {
        let jail = Cell::jail(self.opponent);
        let mut weights = DiscreteDistribution::new();
        for cell in &self.particles {
            let likelihood = observation_probability(reading, agent, *cell, jail, &self.noise);
            weights.add(*cell, likelihood);
        }
        weights.set(jail, 0.0);
        weights.normalize();

        if weights.total() == 0.0 {
            event!(
                target: "pursuit_core::belief",
                Level::DEBUG,
                opponent = self.opponent,
                estimator = "particle",
                "reading inconsistent with every particle; reinitializing"
            );
            self.initialize_uniformly();
            return Ok(());
        }

        self.particles = weights.sample_many(self.num_particles, rng)?;
        Ok(())
    }

    /// Advances every particle by one sampled move.
    pub fn elapse_time<W, P, R>(&mut self, state: &W, policy: &P, rng: &mut R) -> Result<(), TrackingError>
    where
        W: GridWorld,
        P: OpponentPolicy<W> + ?Sized,
        R: Rng + ?Sized,
    {
        let mut successors: BTreeMap<Cell, DiscreteDistribution<Cell>> = BTreeMap::new();
        let mut moved = Vec::with_capacity(self.particles.len());
        for cell in &self.particles {
            let dist = successors
                .entry(*cell)
                .or_insert_with(|| transition_from(state, self.opponent, *cell, policy));
            moved.push(dist.sample(rng)?);
        }
        self.particles = moved;
        Ok(())
    }

    /// Empirical distribution of the current particles.
    pub fn beliefs(&self) -> DiscreteDistribution<Cell> {
        DiscreteDistribution::from_counts(self.particles.iter())
    }
}
