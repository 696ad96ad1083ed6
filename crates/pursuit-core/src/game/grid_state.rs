use super::world::{GridWorld, WorldState};
use crate::belief::{NoiseModel, SensorModel};
use crate::model::{Cell, Direction, Layout};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

pub const TIME_PENALTY: f64 = 1.0;
pub const FOOD_REWARD: f64 = 10.0;
pub const CLEAR_REWARD: f64 = 500.0;
pub const CAPTURE_REWARD: f64 = 200.0;
pub const CAUGHT_PENALTY: f64 = 500.0;

/// What happens when the controlled agent and an opponent share a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionRule {
    /// The opponent is captured and sent to its jail cell.
    #[default]
    Capture,
    /// The controlled agent is caught and the game is lost.
    Deadly,
}

impl FromStr for CollisionRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "capture" => Ok(CollisionRule::Capture),
            "deadly" => Ok(CollisionRule::Deadly),
            other => Err(format!("unknown collision rule '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Running,
    Win,
    Lose,
}

/// Reference grid world: one controlled agent chasing (or fleeing) opponents.
///
/// Every transition returns a fresh value; the layout is shared between copies.
#[derive(Debug, Clone)]
pub struct GridState {
    layout: Arc<Layout>,
    positions: Vec<Cell>,
    headings: Vec<Direction>,
    food: Arc<BTreeSet<Cell>>,
    score: f64,
    outcome: Outcome,
    rule: CollisionRule,
    readings: Vec<Option<u32>>,
}

impl GridState {
    /// Initial state from the layout's start cells. Sensor readings start empty.
    pub fn new(layout: Arc<Layout>, rule: CollisionRule) -> Self {
        let mut positions = vec![layout.agent_start()];
        positions.extend_from_slice(layout.opponent_starts());
        let agents = positions.len();
        let food = Arc::new(layout.food().clone());
        Self {
            layout,
            headings: vec![Direction::Stop; agents],
            positions,
            food,
            score: 0.0,
            outcome: Outcome::Running,
            rule,
            readings: vec![None; agents - 1],
        }
    }

    pub(crate) fn from_parts(
        layout: Arc<Layout>,
        positions: Vec<Cell>,
        food: BTreeSet<Cell>,
        score: f64,
        outcome: Outcome,
        rule: CollisionRule,
    ) -> Self {
        let agents = positions.len();
        Self {
            layout,
            headings: vec![Direction::Stop; agents],
            positions,
            food: Arc::new(food),
            score,
            outcome,
            rule,
            readings: vec![None; agents.saturating_sub(1)],
        }
    }

    pub fn rule(&self) -> CollisionRule {
        self.rule
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn positions(&self) -> &[Cell] {
        &self.positions
    }

    pub fn is_jailed(&self, opponent: usize) -> bool {
        self.positions[opponent] == Cell::jail(opponent)
    }

    /// Copy carrying fresh sensor readings: jailed opponents report nothing.
    pub fn with_sensor_readings<R: Rng + ?Sized>(&self, noise: SensorModel, rng: &mut R) -> Self {
        let agent = self.positions[0];
        let readings = (1..self.positions.len())
            .map(|opponent| {
                if self.is_jailed(opponent) {
                    None
                } else {
                    let distance = agent.manhattan(self.positions[opponent]);
                    Some(noise.sample_reading(distance, rng))
                }
            })
            .collect();
        Self {
            readings,
            ..self.clone()
        }
    }

    /// Copy carrying the supplied readings.
    pub fn with_readings(&self, readings: Vec<Option<u32>>) -> Self {
        debug_assert_eq!(readings.len(), self.positions.len() - 1);
        Self {
            readings,
            ..self.clone()
        }
    }

    fn resolve_collision(&mut self, opponent: usize) {
        if self.positions[opponent] != self.positions[0] {
            return;
        }
        match self.rule {
            CollisionRule::Deadly => {
                self.score -= CAUGHT_PENALTY;
                self.outcome = Outcome::Lose;
            }
            CollisionRule::Capture => {
                self.score += CAPTURE_REWARD;
                self.positions[opponent] = Cell::jail(opponent);
                self.headings[opponent] = Direction::Stop;
                if (1..self.positions.len()).all(|idx| self.is_jailed(idx)) {
                    self.outcome = Outcome::Win;
                }
            }
        }
    }

    fn move_agent(&mut self, action: Direction) {
        let next = self.positions[0].step(action);
        debug_assert!(!self.layout.is_wall(next), "illegal move {action} into a wall");
        self.positions[0] = next;
        self.headings[0] = action;
        self.score -= TIME_PENALTY;

        if self.food.contains(&next) {
            Arc::make_mut(&mut self.food).remove(&next);
            self.score += FOOD_REWARD;
            if self.food.is_empty() {
                self.score += CLEAR_REWARD;
                self.outcome = Outcome::Win;
            }
        }

        for opponent in 1..self.positions.len() {
            if self.outcome != Outcome::Running {
                break;
            }
            self.resolve_collision(opponent);
        }
    }

    fn move_opponent(&mut self, opponent: usize, action: Direction) {
        if self.is_jailed(opponent) {
            return;
        }
        let next = self.positions[opponent].step(action);
        debug_assert!(!self.layout.is_wall(next), "illegal move {action} into a wall");
        self.positions[opponent] = next;
        self.headings[opponent] = action;
        self.resolve_collision(opponent);
    }
}

impl WorldState for GridState {
    type Action = Direction;

    fn num_agents(&self) -> usize {
        self.positions.len()
    }

    fn legal_actions(&self, agent: usize) -> Vec<Direction> {
        if self.is_terminal() {
            return Vec::new();
        }
        let here = self.positions[agent];
        if agent == 0 {
            let mut actions = self.layout.open_moves(here);
            actions.push(Direction::Stop);
            return actions;
        }
        if self.is_jailed(agent) {
            return vec![Direction::Stop];
        }

        let mut actions = self.layout.open_moves(here);
        let reverse = self.headings[agent].reverse();
        if actions.len() > 1 && reverse != Direction::Stop {
            actions.retain(|dir| *dir != reverse);
        }
        if actions.is_empty() {
            actions.push(Direction::Stop);
        }
        actions
    }

    fn successor(&self, agent: usize, action: Direction) -> Self {
        let mut next = self.clone();
        if next.is_terminal() {
            return next;
        }
        if agent == 0 {
            next.move_agent(action);
        } else {
            next.move_opponent(agent, action);
        }
        next
    }

    fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }

    fn is_lose(&self) -> bool {
        self.outcome == Outcome::Lose
    }

    fn score(&self) -> f64 {
        self.score
    }
}

impl GridWorld for GridState {
    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn position(&self, agent: usize) -> Cell {
        self.positions[agent]
    }

    fn food(&self) -> &BTreeSet<Cell> {
        &self.food
    }

    fn noisy_distances(&self) -> &[Option<u32>] {
        &self.readings
    }

    fn with_opponent_position(&self, opponent: usize, cell: Cell) -> Self {
        let mut next = self.clone();
        next.positions[opponent] = cell;
        next.headings[opponent] = Direction::Stop;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const ARENA: &str = "\
%%%%%%%
%P...G%
% %%% %
%     %
%%%%%%%
";

    fn arena(rule: CollisionRule) -> GridState {
        GridState::new(Arc::new(Layout::parse(ARENA).unwrap()), rule)
    }

    #[test]
    fn successor_leaves_receiver_untouched() {
        let state = arena(CollisionRule::Capture);
        let next = state.successor(0, Direction::East);
        assert_eq!(state.position(0), Cell::new(1, 3));
        assert_eq!(next.position(0), Cell::new(2, 3));
        assert_eq!(state.food().len(), 3);
        assert_eq!(next.food().len(), 2);
        assert_eq!(next.score(), FOOD_REWARD - TIME_PENALTY);
    }

    #[test]
    fn controlled_agent_can_stop() {
        let state = arena(CollisionRule::Capture);
        let actions = state.legal_actions(0);
        assert!(actions.contains(&Direction::Stop));
        assert!(actions.contains(&Direction::East));
        assert!(actions.contains(&Direction::South));
        assert!(!actions.contains(&Direction::North));
    }

    #[test]
    fn opponents_do_not_reverse_or_stop() {
        let state = arena(CollisionRule::Capture);
        let moved = state.successor(1, Direction::West);
        let actions = moved.legal_actions(1);
        assert!(!actions.contains(&Direction::East));
        assert!(!actions.contains(&Direction::Stop));
        assert_eq!(actions, vec![Direction::West]);
    }

    #[test]
    fn capture_sends_opponent_to_jail_and_wins() {
        let state = arena(CollisionRule::Capture).with_opponent_position(1, Cell::new(2, 3));
        let next = state.successor(0, Direction::East);
        assert_eq!(next.position(1), Cell::jail(1));
        assert!(next.is_win());
        assert_eq!(next.legal_actions(0), Vec::<Direction>::new());
    }

    #[test]
    fn deadly_collision_loses() {
        let state = arena(CollisionRule::Deadly).with_opponent_position(1, Cell::new(2, 3));
        let next = state.successor(1, Direction::West);
        assert!(next.is_lose());
        assert_eq!(next.score(), -CAUGHT_PENALTY);
    }

    #[test]
    fn clearing_food_wins() {
        let mut state = arena(CollisionRule::Deadly).with_opponent_position(1, Cell::new(5, 1));
        for _ in 0..3 {
            state = state.successor(0, Direction::East);
        }
        assert!(state.is_win());
        assert_eq!(state.score(), 3.0 * (FOOD_REWARD - TIME_PENALTY) + CLEAR_REWARD);
    }

    #[test]
    fn sensor_readings_skip_jailed_opponents() {
        let state = arena(CollisionRule::Capture);
        let mut rng = StdRng::seed_from_u64(3);
        let observed = state.with_sensor_readings(SensorModel::Exact, &mut rng);
        assert_eq!(observed.noisy_distances(), &[Some(4)]);

        let jailed = state.with_opponent_position(1, Cell::jail(1));
        let observed = jailed.with_sensor_readings(SensorModel::Exact, &mut rng);
        assert_eq!(observed.noisy_distances(), &[None]);
    }
}
