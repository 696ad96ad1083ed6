//! Motion model: where an opponent can be one step from now.

use super::DiscreteDistribution;
use crate::game::{GridWorld, OpponentPolicy};
use crate::model::Cell;

/// Successor-cell distribution for `opponent` from its position in `state`.
///
/// Jail is absorbing. An opponent sharing the controlled agent's cell is captured
/// outright. Otherwise an opponent next to the controlled agent is caught with
/// probability `1 / |reach|` (the agent picks one of its reachable cells uniformly),
/// and every policy action ending inside the agent's reach loses a `1 / k` share of
/// its mass to jail, `k` being the number of actions the policy considers.
pub fn transition_distribution<W, P>(state: &W, opponent: usize, policy: &P) -> DiscreteDistribution<Cell>
where
    W: GridWorld,
    P: OpponentPolicy<W> + ?Sized,
{
    let jail = Cell::jail(opponent);
    let here = state.position(opponent);
    let mut dist = DiscreteDistribution::new();

    if here == jail {
        dist.set(jail, 1.0);
        return dist;
    }

    let agent = state.agent_position();
    if agent == here {
        dist.set(jail, 1.0);
        return dist;
    }

    let reach = state.layout().legal_neighbors(agent);
    let capture = if reach.contains(&here) {
        1.0 / reach.len() as f64
    } else {
        0.0
    };
    if capture > 0.0 {
        dist.set(jail, capture);
    }

    let actions = policy.action_distribution(state, opponent).normalized();
    let choices = actions.len() as f64;
    for (action, prob) in actions.iter() {
        let next = here.step(*action);
        let free = prob * (1.0 - capture);
        if reach.contains(&next) {
            dist.add(jail, free / choices);
            dist.add(next, free * (choices - 1.0) / choices);
        } else {
            dist.add(next, free);
        }
    }

    dist
}

/// Places `opponent` on `cell` in a copy of `state`, then applies [`transition_distribution`].
pub fn transition_from<W, P>(state: &W, opponent: usize, cell: Cell, policy: &P) -> DiscreteDistribution<Cell>
where
    W: GridWorld,
    P: OpponentPolicy<W> + ?Sized,
{
    let placed = state.with_opponent_position(opponent, cell);
    transition_distribution(&placed, opponent, policy)
}
