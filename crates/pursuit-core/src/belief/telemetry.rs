use super::DiscreteDistribution;
use crate::model::Cell;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BeliefMetrics {
    pub opponent: usize,
    pub entropy: f64,
    pub support: usize,
    pub max_probability: f64,
    pub jail_probability: f64,
    /// Mass on the opponent's actual cell, when the caller knows it.
    pub truth_probability: Option<f64>,
    /// Manhattan distance between the most likely cell and the actual one.
    pub map_error: Option<u32>,
}

impl BeliefMetrics {
    pub fn from_distribution(opponent: usize, beliefs: &DiscreteDistribution<Cell>, truth: Option<Cell>) -> Self {
        let total = beliefs.total();
        let share = |weight: f64| if total > 0.0 { weight / total } else { 0.0 };
        let max_probability = beliefs.iter().map(|(_, weight)| share(weight)).fold(0.0, f64::max);
        let best = beliefs.arg_max().copied();

        Self {
            opponent,
            entropy: beliefs.entropy(),
            support: beliefs.support().count(),
            max_probability,
            jail_probability: share(beliefs.get(&Cell::jail(opponent))),
            truth_probability: truth.map(|cell| share(beliefs.get(&cell))),
            map_error: match (best, truth) {
                (Some(best), Some(truth)) if !best.is_jail() && !truth.is_jail() => Some(best.manhattan(truth)),
                (Some(best), Some(truth)) => Some(if best == truth { 0 } else { u32::MAX }),
                _ => None,
            },
        }
    }
}
