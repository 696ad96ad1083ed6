use super::observation::{SensorModel, observation_probability};
use super::transition::transition_from;
use super::{DiscreteDistribution, TrackingError};
use crate::game::{GridWorld, OpponentPolicy};
use crate::model::Cell;
use tracing::{Level, event};

/// Forward-algorithm belief over one opponent's position (board cells plus jail).
#[derive(Debug, Clone)]
pub struct ExactInference {
    opponent: usize,
    noise: SensorModel,
    legal: Vec<Cell>,
    beliefs: DiscreteDistribution<Cell>,
}

impl ExactInference {
    pub fn new(opponent: usize, noise: SensorModel) -> Self {
        debug_assert!(opponent >= 1, "opponent indices start at 1");
        Self {
            opponent,
            noise,
            legal: Vec::new(),
            beliefs: DiscreteDistribution::new(),
        }
    }

    pub fn opponent(&self) -> usize {
        self.opponent
    }

    pub fn jail(&self) -> Cell {
        Cell::jail(self.opponent)
    }

    pub fn initialize<W: GridWorld>(&mut self, state: &W) -> Result<(), TrackingError> {
        self.legal = state.layout().open_cells();
        if self.legal.is_empty() {
            return Err(TrackingError::NoLegalPositions);
        }
        self.initialize_uniformly();
        Ok(())
    }

    /// Uniform over legal board cells; jail starts with no mass.
    pub fn initialize_uniformly(&mut self) {
        self.beliefs = DiscreteDistribution::uniform(self.legal.iter().copied());
    }

    /// Reads this opponent's entry from the state's readings; a short reading vector is skipped.
    pub fn observe<W: GridWorld>(&mut self, state: &W) {
        if let Some(reading) = state.noisy_distances().get(self.opponent - 1).copied() {
            self.observe_update(reading, state.agent_position());
        }
    }

    pub fn observe_update(&mut self, reading: Option<u32>, agent: Cell) {
        let jail = self.jail();

        if reading.is_none() {
            self.beliefs.clear();
            self.beliefs.set(jail, 1.0);
            return;
        }

        let mut updated = DiscreteDistribution::new();
        for cell in self.legal.iter().copied().chain(std::iter::once(jail)) {
            let prior = self.beliefs.get(&cell);
            let likelihood = observation_probability(reading, agent, cell, jail, &self.noise);
            updated.set(cell, prior * likelihood);
        }
        updated.normalize();

        if updated.total() == 0.0 {
            event!(
                target: "pursuit_core::belief",
                Level::DEBUG,
                opponent = self.opponent,
                estimator = "exact",
                "reading inconsistent with every position; reinitializing"
            );
            self.initialize_uniformly();
            return;
        }
        self.beliefs = updated;
    }

    pub fn elapse_time<W, P>(&mut self, state: &W, policy: &P)
    where
        W: GridWorld,
        P: OpponentPolicy<W> + ?Sized,
    {
        let mut predicted = DiscreteDistribution::new();
        for (cell, weight) in self.beliefs.iter() {
            if weight <= 0.0 {
                continue;
            }
            let successors = transition_from(state, self.opponent, *cell, policy);
            for (next, prob) in successors.iter() {
                predicted.add(*next, weight * prob);
            }
        }
        predicted.normalize();

        if predicted.total() == 0.0 {
            self.initialize_uniformly();
            return;
        }
        self.beliefs = predicted;
    }

    pub fn beliefs(&self) -> &DiscreteDistribution<Cell> {
        &self.beliefs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CollisionRule, GridState, WorldState};
    use crate::model::{Direction, Layout};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    struct Uniform;

    impl OpponentPolicy<GridState> for Uniform {
        fn action_distribution(
            &self,
            state: &GridState,
            opponent: usize,
        ) -> DiscreteDistribution<Direction> {
            DiscreteDistribution::uniform(state.legal_actions(opponent))
        }
    }

    fn grid(text: &str) -> GridState {
        GridState::new(Arc::new(Layout::parse(text).unwrap()), CollisionRule::Capture)
    }

    fn assert_normalized(dist: &DiscreteDistribution<Cell>) {
        assert!((dist.total() - 1.0).abs() < 1e-9, "total was {}", dist.total());
    }

    #[test]
    fn starts_uniform_without_jail() {
        let state = grid("%%%%%\n%PG %\n%%%%%\n");
        let mut exact = ExactInference::new(1, SensorModel::Exact);
        exact.initialize(&state).unwrap();
        assert_eq!(exact.beliefs().get(&Cell::jail(1)), 0.0);
        assert!((exact.beliefs().get(&Cell::new(3, 1)) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn corridor_reading_pins_opponent() {
        // 1x3 corridor: agent at the west end, opponent one cell away.
        let state = grid("%%%%%\n%PG %\n%%%%%\n").with_readings(vec![Some(1)]);
        let mut exact = ExactInference::new(1, SensorModel::Exact);
        exact.initialize(&state).unwrap();
        exact.observe(&state);
        assert_eq!(exact.beliefs().get(&Cell::new(2, 1)), 1.0);
        assert_eq!(exact.beliefs().get(&Cell::new(3, 1)), 0.0);
    }

    #[test]
    fn missing_reading_moves_all_mass_to_jail() {
        let state = grid("%%%%%\n%PG %\n%%%%%\n").with_readings(vec![None]);
        let mut exact = ExactInference::new(1, SensorModel::Exact);
        exact.initialize(&state).unwrap();
        exact.observe(&state);
        assert_eq!(exact.beliefs().get(&Cell::jail(1)), 1.0);
        exact.elapse_time(&state, &Uniform);
        assert_eq!(exact.beliefs().get(&Cell::jail(1)), 1.0);
    }

    #[test]
    fn inconsistent_reading_reinitializes() {
        let state = grid("%%%%%\n%PG %\n%%%%%\n").with_readings(vec![Some(9)]);
        let mut exact = ExactInference::new(1, SensorModel::Exact);
        exact.initialize(&state).unwrap();
        exact.observe(&state);
        assert_normalized(exact.beliefs());
        assert_eq!(exact.beliefs().get(&Cell::jail(1)), 0.0);
    }

    #[test]
    fn stays_normalized_over_random_observation_sequences() {
        let base = grid("%%%%%%%\n%P   G%\n% %%% %\n%     %\n%%%%%%%\n");
        let mut exact = ExactInference::new(1, SensorModel::Sonar);
        exact.initialize(&base).unwrap();
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..40 {
            let reading = if rng.gen_bool(0.2) {
                None
            } else {
                Some(rng.gen_range(0..10))
            };
            let state = base.with_readings(vec![reading]);
            exact.observe(&state);
            assert_normalized(exact.beliefs());
            exact.elapse_time(&state, &Uniform);
            assert_normalized(exact.beliefs());
        }
    }

    #[test]
    fn time_update_spreads_mass_to_neighbours() {
        let state = grid("%%%%%%%\n%P   G%\n%%%%%%%\n").with_readings(vec![Some(4)]);
        let mut exact = ExactInference::new(1, SensorModel::Exact);
        exact.initialize(&state).unwrap();
        exact.observe(&state);
        assert_eq!(exact.beliefs().get(&Cell::new(5, 1)), 1.0);
        exact.elapse_time(&state, &Uniform);
        assert_eq!(exact.beliefs().get(&Cell::new(4, 1)), 1.0);
    }
}
