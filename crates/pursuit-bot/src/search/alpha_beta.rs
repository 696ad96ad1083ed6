use super::{SearchError, SearchStats, Turn, evaluate, legal_actions};
use pursuit_core::game::WorldState;

/// Root loop: every action is searched, and alpha only tightens the window below.
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

    let mut alpha = f64::NEG_INFINITY;
    let beta = f64::INFINITY;
    let mut best: Option<(W::Action, f64)> = None;
    for action in actions {
        let child = state.successor(0, action);
        let value = value(&child, turn, depth, alpha, beta, eval, stats)?;
        if best.is_none_or(|(_, incumbent)| value > incumbent) {
            best = Some((action, value));
        }
        alpha = alpha.max(value);
    }
    best.ok_or(SearchError::NoLegalActions { agent: 0 })
}

/// Pruning is strict: MAX stops once its value exceeds beta, MIN once it falls below alpha.
fn value<W, E>(
    state: &W,
    turn: Turn,
    depth: u32,
    mut alpha: f64,
    mut beta: f64,
    eval: &E,
    stats: &mut SearchStats,
) -> Result<f64, SearchError>
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
            let child = state.successor(turn.agent, action);
            best = best.max(value(&child, next, depth, alpha, beta, eval, stats)?);
            if best > beta {
                stats.cutoffs += 1;
                return Ok(best);
            }
            alpha = alpha.max(best);
        }
        Ok(best)
    } else {
        let mut best = f64::INFINITY;
        for action in actions {
            let child = state.successor(turn.agent, action);
            best = best.min(value(&child, next, depth, alpha, beta, eval, stats)?);
            if best < alpha {
                stats.cutoffs += 1;
                return Ok(best);
            }
            beta = beta.min(best);
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tree::{Node, TreeState, leaves, score};
    use super::*;

    #[test]
    fn equal_values_are_not_pruned() {
        // Second branch ties the first at 3; strict pruning keeps exploring it.
        let state = TreeState {
            node: Node::Branch(vec![leaves(&[3.0, 4.0]), leaves(&[3.0, 8.0])]),
            agents: 2,
        };
        let mut stats = SearchStats::default();
        let (action, value) = decide(&state, 1, &score, &mut stats).unwrap();
        assert_eq!((action, value), (0, 3.0));
        assert_eq!(stats.cutoffs, 0);
        assert_eq!(stats.evaluations, 4);
    }

    #[test]
    fn deeper_max_layer_prunes_against_beta() {
        // MAX -> MIN -> MAX -> leaves (single opponent, depth 2).
        let state = TreeState {
            node: Node::Branch(vec![Node::Branch(vec![
                Node::Branch(vec![leaves(&[5.0]), leaves(&[6.0])]),
                Node::Branch(vec![leaves(&[7.0]), leaves(&[1.0])]),
            ])]),
            agents: 2,
        };
        let mut stats = SearchStats::default();
        let (_, value) = decide(&state, 2, &score, &mut stats).unwrap();
        assert_eq!(value, 6.0);
        assert_eq!(stats.cutoffs, 1);
    }
}
