use pursuit_core::belief::DiscreteDistribution;
use pursuit_core::game::{GridWorld, OpponentPolicy};
use pursuit_core::model::Direction;

/// Picks uniformly among the opponent's legal actions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RandomGhost;

impl<W: GridWorld> OpponentPolicy<W> for RandomGhost {
    fn action_distribution(&self, state: &W, opponent: usize) -> DiscreteDistribution<Direction> {
        DiscreteDistribution::uniform(state.legal_actions(opponent))
    }
}
