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

    let maximizing = turn.agent == 0;
    let mut best = if maximizing { f64::NEG_INFINITY } else { f64::INFINITY };
    for action in actions {
        let child = state.successor(turn.agent, action);
        let child_value = value(&child, next, depth, eval, stats)?;
        best = if maximizing {
            best.max(child_value)
        } else {
            best.min(child_value)
        };
    }
    Ok(best)
}
