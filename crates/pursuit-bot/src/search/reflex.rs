use super::{SearchError, SearchStats, evaluate, legal_actions};
use pursuit_core::game::WorldState;

/// Scores every legal move of agent 0 by its immediate successor and returns the
/// moves sharing the top score, in legal-action order.
pub(crate) fn best_actions<W, E>(
    state: &W,
    eval: &E,
    stats: &mut SearchStats,
) -> Result<(Vec<W::Action>, f64), SearchError>
where
    W: WorldState,
    E: Fn(&W) -> f64 + ?Sized,
{
    let actions = legal_actions(state, 0)?;
    stats.nodes += 1;

    let mut best = Vec::new();
    let mut best_value = f64::NEG_INFINITY;
    for action in actions {
        let value = evaluate(&state.successor(0, action), eval, stats);
        if best.is_empty() || value > best_value {
            best.clear();
            best.push(action);
            best_value = value;
        } else if value == best_value {
            best.push(action);
        }
    }
    Ok((best, best_value))
}
