use super::observation::{SensorModel, observation_probability};
use super::transition::transition_distribution;
use super::{DiscreteDistribution, TrackingError};
use crate::game::{GridWorld, OpponentPolicy};
use crate::model::Cell;
use parking_lot::{Mutex, MutexGuard};
use rand::Rng;
use std::sync::Arc;
use tracing::{Level, event};

/// One hypothesis for every opponent at once; slot `i` holds opponent `i + 1`.
pub type JointPosition = Vec<Cell>;

/// Particle filter over the joint position of all opponents.
#[derive(Debug, Clone)]
pub struct JointParticleFilter {
    noise: SensorModel,
    num_particles: usize,
    num_opponents: usize,
    legal: Vec<Cell>,
    particles: Vec<JointPosition>,
    driver: Option<usize>,
}

impl JointParticleFilter {
    pub fn new(num_particles: usize, noise: SensorModel) -> Self {
        Self {
            noise,
            num_particles,
            num_opponents: 0,
            legal: Vec::new(),
            particles: Vec::new(),
            driver: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.particles.is_empty()
    }

    pub fn num_opponents(&self) -> usize {
        self.num_opponents
    }

    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    pub fn particles(&self) -> &[JointPosition] {
        &self.particles
    }

    /// Opponent index whose view advances the filter, once one has claimed it.
    pub fn driver(&self) -> Option<usize> {
        self.driver
    }

    pub(crate) fn claim_driver(&mut self, opponent: usize) -> bool {
        match self.driver {
            Some(current) => current == opponent,
            None => {
                self.driver = Some(opponent);
                true
            }
        }
    }

    pub fn initialize<W: GridWorld>(&mut self, state: &W) -> Result<(), TrackingError> {
        if self.num_particles == 0 {
            return Err(TrackingError::ZeroParticles);
        }
        self.num_opponents = state.num_opponents();
        self.legal = state.layout().open_cells();
        if self.legal.is_empty() || self.num_opponents == 0 {
            return Err(TrackingError::NoLegalPositions);
        }
        self.initialize_uniformly();
        Ok(())
    }

    /// Spreads particles evenly over the Cartesian product of legal cells.
    ///
    /// With at least as many particles as tuples every tuple is covered in order;
    /// otherwise particles take evenly strided tuples from the product.
    pub fn initialize_uniformly(&mut self) {
        let base = self.legal.len() as u128;
        let tuples = u32::try_from(self.num_opponents)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .unwrap_or(u128::from(u64::MAX));
        let count = self.num_particles as u128;
        // floor(idx * tuples / count) without forming the product.
        let (quotient, remainder) = (tuples / count.max(1), tuples % count.max(1));

        self.particles = (0..count)
            .map(|idx| {
                let tuple = if count >= tuples {
                    idx % tuples
                } else {
                    idx * quotient + idx * remainder / count
                };
                self.decode(tuple)
            })
            .collect();
    }

    /// Mixed-radix decode; opponent 1 is the most significant digit.
    fn decode(&self, mut index: u128) -> JointPosition {
        let base = self.legal.len() as u128;
        let mut tuple = vec![self.legal[0]; self.num_opponents];
        for slot in tuple.iter_mut().rev() {
            *slot = self.legal[(index % base) as usize];
            index /= base;
        }
        tuple
    }

    pub fn observe<W: GridWorld, R: Rng + ?Sized>(
        &mut self,
        state: &W,
        rng: &mut R,
    ) -> Result<(), TrackingError> {
        self.observe_update(state.noisy_distances(), state.agent_position(), rng)
    }

    /// Reweights each joint particle by the product of per-opponent likelihoods.
    pub fn observe_update<R: Rng + ?Sized>(
        &mut self,
        readings: &[Option<u32>],
        agent: Cell,
        rng: &mut R,
    ) -> Result<(), TrackingError> {
        if readings.len() != self.num_opponents {
            return Err(TrackingError::ReadingCount {
                expected: self.num_opponents,
                found: readings.len(),
            });
        }

        let mut weights = DiscreteDistribution::new();
        for particle in &self.particles {
            let likelihood: f64 = particle
                .iter()
                .zip(readings)
                .enumerate()
                .map(|(slot, (cell, reading))| {
                    observation_probability(*reading, agent, *cell, Cell::jail(slot + 1), &self.noise)
                })
                .product();
            weights.add(particle.clone(), likelihood);
        }
        weights.normalize();

        if weights.total() == 0.0 {
            event!(
                target: "pursuit_core::belief",
                Level::DEBUG,
                estimator = "joint",
                particles = self.num_particles,
                "readings inconsistent with every joint particle; reinitializing"
            );
            self.initialize_uniformly();
            return Ok(());
        }

        self.particles = weights.sample_many(self.num_particles, rng)?;
        Ok(())
    }

    /// Moves every opponent in every particle, each conditioned on the particle's
    /// previous joint position.
    pub fn elapse_time<W, P, R>(&mut self, state: &W, policies: &[P], rng: &mut R) -> Result<(), TrackingError>
    where
        W: GridWorld + Clone,
        P: OpponentPolicy<W>,
        R: Rng + ?Sized,
    {
        if policies.len() != self.num_opponents {
            return Err(TrackingError::PolicyCount {
                expected: self.num_opponents,
                found: policies.len(),
            });
        }

        let mut moved = Vec::with_capacity(self.particles.len());
        for particle in &self.particles {
            let placed = state.with_opponent_positions(particle);
            let next = policies
                .iter()
                .enumerate()
                .map(|(slot, policy)| transition_distribution(&placed, slot + 1, policy).sample(rng))
                .collect::<Result<JointPosition, _>>()?;
            moved.push(next);
        }
        self.particles = moved;
        Ok(())
    }

    /// Empirical distribution over joint positions.
    pub fn beliefs(&self) -> DiscreteDistribution<JointPosition> {
        DiscreteDistribution::from_counts(self.particles.iter())
    }

    /// Marginal over one opponent's position (`opponent` starts at 1).
    pub fn marginal(&self, opponent: usize) -> DiscreteDistribution<Cell> {
        let slot = opponent - 1;
        DiscreteDistribution::from_counts(self.particles.iter().map(|particle| &particle[slot]))
    }
}

/// Shared ownership of one [`JointParticleFilter`] by every marginal view.
#[derive(Debug, Clone)]
pub struct JointHandle {
    inner: Arc<Mutex<JointParticleFilter>>,
}

impl JointHandle {
    pub fn new(filter: JointParticleFilter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(filter)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, JointParticleFilter> {
        self.inner.lock()
    }

    pub fn ptr_eq(&self, other: &JointHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CollisionRule, GridState, WorldState};
    use crate::model::{Direction, Layout};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

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

    fn two_ghosts() -> GridState {
        let layout = Layout::parse("%%%%%%\n%P  G%\n%G   %\n%%%%%%\n").unwrap();
        GridState::new(Arc::new(layout), CollisionRule::Capture)
    }

    #[test]
    fn covers_every_tuple_when_particles_suffice() {
        let state = two_ghosts();
        // 8 open cells, 64 tuples.
        let mut joint = JointParticleFilter::new(128, SensorModel::Sonar);
        joint.initialize(&state).unwrap();
        let mut counts: BTreeMap<JointPosition, usize> = BTreeMap::new();
        for particle in joint.particles() {
            *counts.entry(particle.clone()).or_default() += 1;
        }
        assert_eq!(counts.len(), 64);
        assert!(counts.values().all(|count| *count == 2));
    }

    #[test]
    fn strided_init_spreads_over_both_slots() {
        let state = two_ghosts();
        let mut joint = JointParticleFilter::new(8, SensorModel::Sonar);
        joint.initialize(&state).unwrap();
        let first_slots: std::collections::BTreeSet<Cell> =
            joint.particles().iter().map(|particle| particle[0]).collect();
        assert_eq!(first_slots.len(), 8);
    }

    #[test]
    fn readings_must_match_opponent_count() {
        let state = two_ghosts();
        let mut joint = JointParticleFilter::new(16, SensorModel::Sonar);
        joint.initialize(&state).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let err = joint
            .observe_update(&[Some(2)], state.agent_position(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, TrackingError::ReadingCount { expected: 2, found: 1 }));
    }

    #[test]
    fn exact_readings_pin_both_opponents() {
        let state = two_ghosts().with_readings(vec![Some(4), Some(1)]);
        let mut joint = JointParticleFilter::new(128, SensorModel::Exact);
        joint.initialize(&state).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        joint.observe(&state, &mut rng).unwrap();
        let marginal = joint.marginal(1);
        assert_eq!(marginal.get(&Cell::new(4, 1)), 1.0);
        // Distance 1 from the agent at (1, 2): (2, 2) or (1, 1).
        let second = joint.marginal(2);
        assert!((second.get(&Cell::new(2, 2)) + second.get(&Cell::new(1, 1)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn jailed_slot_requires_missing_reading() {
        let state = two_ghosts();
        let mut joint = JointParticleFilter::new(4, SensorModel::Exact);
        joint.initialize(&state).unwrap();
        joint.particles = vec![vec![Cell::jail(1), Cell::new(4, 2)]; 4];
        let mut rng = StdRng::seed_from_u64(8);
        joint
            .observe_update(&[None, Some(3)], state.agent_position(), &mut rng)
            .unwrap();
        assert_eq!(joint.marginal(1).get(&Cell::jail(1)), 1.0);
    }

    #[test]
    fn impossible_readings_restore_the_initial_set() {
        let state = two_ghosts().with_readings(vec![Some(99), Some(99)]);
        let mut joint = JointParticleFilter::new(24, SensorModel::Exact);
        joint.initialize(&state).unwrap();
        let initial = joint.particles().to_vec();

        let mut rng = StdRng::seed_from_u64(13);
        joint.elapse_time(&state, &[Uniform, Uniform], &mut rng).unwrap();
        joint.observe(&state, &mut rng).unwrap();
        assert_eq!(joint.particles().len(), 24);
        assert_eq!(joint.particles(), initial.as_slice());
    }

    #[test]
    fn strided_init_handles_huge_tuple_spaces() {
        let mut joint = JointParticleFilter::new(1000, SensorModel::Sonar);
        joint.legal = (1..=8).map(|x| Cell::new(x, 1)).collect();
        // 8^40 = 2^120 tuples; idx * tuples would not fit in u128.
        joint.num_opponents = 40;
        joint.initialize_uniformly();

        assert_eq!(joint.particles().len(), 1000);
        assert!(joint.particles().iter().all(|particle| particle.len() == 40));
        assert!(joint.particles()[0].iter().all(|cell| *cell == Cell::new(1, 1)));
        assert_eq!(joint.particles()[500][0], Cell::new(5, 1));
        assert_eq!(joint.particles()[999][0], Cell::new(8, 1));
        let first_slots: std::collections::BTreeSet<Cell> =
            joint.particles().iter().map(|particle| particle[0]).collect();
        assert_eq!(first_slots.len(), 8);
    }

    #[test]
    fn elapse_time_needs_one_policy_per_opponent() {
        let state = two_ghosts();
        let mut joint = JointParticleFilter::new(4, SensorModel::Sonar);
        joint.initialize(&state).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let err = joint.elapse_time(&state, &[Uniform], &mut rng).unwrap_err();
        assert!(matches!(err, TrackingError::PolicyCount { expected: 2, found: 1 }));
        joint.elapse_time(&state, &[Uniform, Uniform], &mut rng).unwrap();
        assert_eq!(joint.particles().len(), 4);
    }

    #[test]
    fn handle_shares_one_filter() {
        let handle = JointHandle::new(JointParticleFilter::new(4, SensorModel::Sonar));
        let other = handle.clone();
        assert!(handle.ptr_eq(&other));
        assert!(handle.lock().claim_driver(2));
        assert!(!other.lock().claim_driver(1));
        assert_eq!(other.lock().driver(), Some(2));
    }
}
