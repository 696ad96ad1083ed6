use super::grid_state::{CollisionRule, GridState, Outcome};
use super::world::{GridWorld, WorldState};
use crate::model::{Cell, Layout};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Serializable capture of the dynamic part of a [`GridState`].
///
/// The layout is not embedded; restoring requires the layout the snapshot came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridSnapshot {
    pub positions: Vec<Cell>,
    pub food: Vec<Cell>,
    pub score: f64,
    pub outcome: Outcome,
    #[serde(default)]
    pub rule: CollisionRule,
}

impl GridSnapshot {
    pub fn capture(state: &GridState) -> Self {
        GridSnapshot {
            positions: state.positions().to_vec(),
            food: state.food().iter().copied().collect(),
            score: state.score(),
            outcome: state.outcome(),
            rule: state.rule(),
        }
    }

    pub fn restore(self, layout: Arc<Layout>) -> GridState {
        GridState::from_parts(
            layout,
            self.positions,
            self.food.into_iter().collect(),
            self.score,
            self.outcome,
            self.rule,
        )
    }

    pub fn to_json(state: &GridState) -> serde_json::Result<String> {
        let snapshot = Self::capture(state);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::GridSnapshot;
    use crate::game::grid_state::{CollisionRule, GridState};
    use crate::game::world::{GridWorld, WorldState};
    use crate::model::{Cell, Direction, Layout};
    use std::sync::Arc;

    fn layout() -> Arc<Layout> {
        Arc::new(Layout::parse("%%%%%\n%P.G%\n%%%%%\n").unwrap())
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let state = GridState::new(layout(), CollisionRule::Capture);
        let json = GridSnapshot::to_json(&state).unwrap();
        assert!(json.contains("\"outcome\": \"running\""));
        assert!(json.contains("\"score\": 0.0"));
    }

    #[test]
    fn snapshot_roundtrip_restores_positions_and_food() {
        let layout = layout();
        let state = GridState::new(layout.clone(), CollisionRule::Deadly).successor(0, Direction::East);
        let snapshot = GridSnapshot::capture(&state);
        let restored = snapshot.clone().restore(layout);
        assert_eq!(restored.position(0), Cell::new(2, 1));
        assert!(restored.food().is_empty());
        assert_eq!(restored.score(), state.score());
        assert_eq!(restored.rule(), CollisionRule::Deadly);
        assert_eq!(restored.is_win(), state.is_win());
    }

    #[test]
    fn snapshot_defaults_missing_rule() {
        let legacy = r#"{
            "positions": [{"x": 1, "y": 1}, {"x": 3, "y": 1}],
            "food": [],
            "score": 12.0,
            "outcome": "running"
        }"#;

        let snapshot = GridSnapshot::from_json(legacy).unwrap();
        assert_eq!(snapshot.rule, CollisionRule::Capture);
        assert_eq!(snapshot.positions.len(), 2);
    }
}
