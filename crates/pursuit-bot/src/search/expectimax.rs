use super::{SearchError, SearchStats, Turn, evaluate, legal_actions};
use pursuit_core::game::WorldState;

pub(crate) fn decide<W, E>(
    state: &W,
    depth: u32,
    eval: &E,
    stats: &mut SearchStats,
) -> Result<(W::Action, f64), SearchError>
where
    W: WorldState,
    E: Fn(&W) -> f64 + ?Sized,
{
    let actions = legal_actions(state, 0)?;
    let turn = Turn::after_root(state);
    stats.nodes += 1;

    let mut best: Option<(W::Action, f64)> = None;
    for action in actions {
        let child = state.successor(0, action);
        let value = value(&child, turn, depth, eval, stats)?;
        if best.is_none_or(|(_, incumbent)| value > incumbent) {
            best = Some((action, value));
        }
    }
    best.ok_or(SearchError::NoLegalActions { agent: 0 })
}

/// Opponent layers average uniformly over their legal actions.
fn value<W, E>(state: &W, turn: Turn, depth: u32, eval: &E, stats: &mut SearchStats) -> Result<f64, SearchError>
where
    W: WorldState,
    E: Fn(&W) -> f64 + ?Sized,
{
    if turn.is_leaf(state, depth) {
        return Ok(evaluate(state, eval, stats));
    }

    let actions = legal_actions(state, turn.agent)?;
    let next = turn.next(state.num_agents());
    stats.nodes += 1;

    if turn.agent == 0 {
        let mut best = f64::NEG_INFINITY;
        for action in actions {
            let child = state.successor(0, action);
            best = best.max(value(&child, next, depth, eval, stats)?);
        }
        return Ok(best);
    }

    let count = actions.len() as f64;
    let mut total = 0.0;
    for action in actions {
        let child = state.successor(turn.agent, action);
        total += value(&child, next, depth, eval, stats)?;
    }
    Ok(total / count)
}
