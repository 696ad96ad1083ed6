use super::joint::JointHandle;
use super::{DiscreteDistribution, TrackingError};
use crate::game::{GridWorld, OpponentPolicy};
use crate::model::Cell;
use rand::Rng;

/// Per-opponent view onto a shared [`super::JointParticleFilter`].
///
/// The first view to initialize becomes the driver: only it forwards observations and
/// time updates, so the joint filter advances once per step however many views exist.
#[derive(Debug, Clone)]
pub struct MarginalInference {
    opponent: usize,
    joint: JointHandle,
}

impl MarginalInference {
    pub fn new(opponent: usize, joint: JointHandle) -> Self {
        debug_assert!(opponent >= 1, "opponent indices start at 1");
        Self { opponent, joint }
    }

    pub fn opponent(&self) -> usize {
        self.opponent
    }

    pub fn joint(&self) -> &JointHandle {
        &self.joint
    }

    pub fn is_driver(&self) -> bool {
        self.joint.lock().driver() == Some(self.opponent)
    }

    pub fn initialize<W: GridWorld>(&mut self, state: &W) -> Result<(), TrackingError> {
        let mut joint = self.joint.lock();
        if joint.claim_driver(self.opponent) {
            joint.initialize(state)?;
        }
        Ok(())
    }

    pub fn observe<W: GridWorld, R: Rng + ?Sized>(
        &mut self,
        state: &W,
        rng: &mut R,
    ) -> Result<(), TrackingError> {
        let mut joint = self.joint.lock();
        if joint.driver() == Some(self.opponent) {
            joint.observe(state, rng)?;
        }
        Ok(())
    }

    pub fn elapse_time<W, P, R>(&mut self, state: &W, policies: &[P], rng: &mut R) -> Result<(), TrackingError>
    where
        W: GridWorld + Clone,
        P: OpponentPolicy<W>,
        R: Rng + ?Sized,
    {
        let mut joint = self.joint.lock();
        if joint.driver() == Some(self.opponent) {
            joint.elapse_time(state, policies, rng)?;
        }
        Ok(())
    }

    pub fn beliefs(&self) -> DiscreteDistribution<Cell> {
        self.joint.lock().marginal(self.opponent)
    }
}
