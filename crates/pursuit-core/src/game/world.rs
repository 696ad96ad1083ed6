//! Interfaces the search and tracking engines consume.
//!
//! Agent index 0 is the controlled agent; indices `1..num_agents()` are opponents.

use crate::belief::DiscreteDistribution;
use crate::model::{Cell, Direction, Layout};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Immutable game snapshot as seen by adversarial search.
pub trait WorldState: Sized {
    type Action: Copy + PartialEq + Debug;

    fn num_agents(&self) -> usize;

    fn legal_actions(&self, agent: usize) -> Vec<Self::Action>;

    /// Returns the state after `agent` plays `action`; the receiver is untouched.
    fn successor(&self, agent: usize, action: Self::Action) -> Self;

    fn is_win(&self) -> bool;

    fn is_lose(&self) -> bool;

    fn is_terminal(&self) -> bool {
        self.is_win() || self.is_lose()
    }

    fn score(&self) -> f64;
}

/// Grid-specific view used by belief tracking.
pub trait GridWorld: WorldState<Action = Direction> {
    fn layout(&self) -> &Layout;

    fn position(&self, agent: usize) -> Cell;

    fn agent_position(&self) -> Cell {
        self.position(0)
    }

    fn num_opponents(&self) -> usize {
        self.num_agents().saturating_sub(1)
    }

    fn food(&self) -> &BTreeSet<Cell>;

    /// Latest sensor readings, one per opponent (`None` when no reading arrived).
    fn noisy_distances(&self) -> &[Option<u32>];

    /// Hypothetical copy with `opponent` placed on `cell`. Sensor readings are kept.
    fn with_opponent_position(&self, opponent: usize, cell: Cell) -> Self;

    /// Hypothetical copy with every opponent placed; `cells[i]` is opponent `i + 1`.
    fn with_opponent_positions(&self, cells: &[Cell]) -> Self
    where
        Self: Clone,
    {
        cells
            .iter()
            .enumerate()
            .fold(self.clone(), |state, (idx, cell)| {
                state.with_opponent_position(idx + 1, *cell)
            })
    }
}

/// Action-choice model for one opponent, evaluated on a (possibly hypothetical) state.
pub trait OpponentPolicy<W> {
    fn action_distribution(&self, state: &W, opponent: usize) -> DiscreteDistribution<Direction>;
}

impl<W, P: OpponentPolicy<W> + ?Sized> OpponentPolicy<W> for &P {
    fn action_distribution(&self, state: &W, opponent: usize) -> DiscreteDistribution<Direction> {
        (**self).action_distribution(state, opponent)
    }
}

impl<W, P: OpponentPolicy<W> + ?Sized> OpponentPolicy<W> for Box<P> {
    fn action_distribution(&self, state: &W, opponent: usize) -> DiscreteDistribution<Direction> {
        (**self).action_distribution(state, opponent)
    }
}
