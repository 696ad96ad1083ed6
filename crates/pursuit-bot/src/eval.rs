//! Evaluation functions handed to the searcher.

use pursuit_core::game::GridWorld;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Value assigned to winning states by [`better_evaluation`].
pub const WIN_VALUE: f64 = 99_999_999.0;

/// The state's running score.
pub fn score_evaluation<W: GridWorld>(state: &W) -> f64 {
    state.score()
}

/// Score plus shaping terms: pull toward food, push away from free opponents.
pub fn better_evaluation<W: GridWorld>(state: &W) -> f64 {
    if state.is_win() {
        return WIN_VALUE;
    }

    let agent = state.agent_position();
    let mut value = state.score();

    let mut closest = None;
    for cell in state.food() {
        let distance = agent.manhattan(*cell);
        value += 2.0 / (1.0 + f64::from(distance));
        closest = Some(closest.map_or(distance, |best: u32| best.min(distance)));
    }
    if let Some(distance) = closest {
        value -= f64::from(distance);
    }

    for opponent in 1..state.num_agents() {
        let cell = state.position(opponent);
        if cell.is_jail() {
            continue;
        }
        value -= 1.0 / (1.0 + f64::from(agent.manhattan(cell)));
    }
    value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    #[default]
    Score,
    Better,
}

impl EvaluationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EvaluationKind::Score => "score",
            EvaluationKind::Better => "better",
        }
    }

    pub fn evaluate<W: GridWorld>(self, state: &W) -> f64 {
        match self {
            EvaluationKind::Score => score_evaluation(state),
            EvaluationKind::Better => better_evaluation(state),
        }
    }
}

impl FromStr for EvaluationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(EvaluationKind::Score),
            "better" | "shaped" => Ok(EvaluationKind::Better),
            other => Err(format!("unknown evaluation '{other}'")),
        }
    }
}
