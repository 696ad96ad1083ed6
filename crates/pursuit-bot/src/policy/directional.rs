use pursuit_core::belief::DiscreteDistribution;
use pursuit_core::game::{GridWorld, OpponentPolicy};
use pursuit_core::model::Direction;

pub const DEFAULT_PROB_ATTACK: f64 = 0.8;

/// Prefers moves that close the distance to the controlled agent.
///
/// The closest-approach moves share `prob_attack`; every legal move also shares the
/// remaining `1 - prob_attack`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalGhost {
    prob_attack: f64,
}

impl Default for DirectionalGhost {
    fn default() -> Self {
        Self::new(DEFAULT_PROB_ATTACK)
    }
}

impl DirectionalGhost {
    pub fn new(prob_attack: f64) -> Self {
        Self {
            prob_attack: prob_attack.clamp(0.0, 1.0),
        }
    }

    pub fn prob_attack(&self) -> f64 {
        self.prob_attack
    }
}

impl<W: GridWorld> OpponentPolicy<W> for DirectionalGhost {
    fn action_distribution(&self, state: &W, opponent: usize) -> DiscreteDistribution<Direction> {
        let legal = state.legal_actions(opponent);
        if legal.is_empty() {
            return DiscreteDistribution::new();
        }

        let here = state.position(opponent);
        let target = state.agent_position();
        let distances: Vec<u32> = legal
            .iter()
            .map(|action| here.step(*action).manhattan(target))
            .collect();
        let closest = distances.iter().copied().min().unwrap_or(0);
        let best: Vec<Direction> = legal
            .iter()
            .zip(&distances)
            .filter(|(_, distance)| **distance == closest)
            .map(|(action, _)| *action)
            .collect();

        let mut dist = DiscreteDistribution::new();
        for action in &best {
            dist.add(*action, self.prob_attack / best.len() as f64);
        }
        for action in &legal {
            dist.add(*action, (1.0 - self.prob_attack) / legal.len() as f64);
        }
        dist.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pursuit_core::game::{CollisionRule, GridState};
    use pursuit_core::model::Layout;
    use std::sync::Arc;

    fn junction() -> GridState {
        let layout = Layout::parse("%%%%%\n%P  %\n%% G%\n%%%%%\n").unwrap();
        GridState::new(Arc::new(layout), CollisionRule::Capture)
    }

    #[test]
    fn favours_the_closing_move() {
        let dist = DirectionalGhost::default().action_distribution(&junction(), 1);
        // Ghost at (3,1); agent at (1,2). West and North both close the gap.
        assert!((dist.get(&Direction::West) - 0.5).abs() < 1e-12);
        assert!((dist.get(&Direction::North) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_best_move_gets_attack_share() {
        let layout = Layout::parse("%%%%%%\n%P  G%\n%%%% %\n%%%%%%\n").unwrap();
        let state = GridState::new(Arc::new(layout), CollisionRule::Capture);
        let dist = DirectionalGhost::new(0.8).action_distribution(&state, 1);
        assert!((dist.get(&Direction::West) - 0.9).abs() < 1e-12);
        assert!((dist.get(&Direction::South) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn attack_probability_is_clamped() {
        assert_eq!(DirectionalGhost::new(3.0).prob_attack(), 1.0);
        assert_eq!(DirectionalGhost::new(-1.0).prob_attack(), 0.0);
    }
}
