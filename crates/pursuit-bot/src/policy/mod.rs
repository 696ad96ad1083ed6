mod directional;
mod random;

pub use directional::{DEFAULT_PROB_ATTACK, DirectionalGhost};
pub use random::RandomGhost;

use pursuit_core::belief::{DiscreteDistribution, DistributionError};
use pursuit_core::game::{GridWorld, OpponentPolicy};
use pursuit_core::model::Direction;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostKind {
    #[default]
    Random,
    Directional,
}

impl GhostKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            GhostKind::Random => "random",
            GhostKind::Directional => "directional",
        }
    }
}

impl FromStr for GhostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "uniform" => Ok(GhostKind::Random),
            "directional" | "chase" => Ok(GhostKind::Directional),
            other => Err(format!("unknown ghost policy '{other}'")),
        }
    }
}

/// Built-in opponent behaviours, used both to move opponents and as the tracker's
/// motion model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GhostPolicy {
    Random(RandomGhost),
    Directional(DirectionalGhost),
}

impl Default for GhostPolicy {
    fn default() -> Self {
        GhostPolicy::Random(RandomGhost)
    }
}

impl GhostPolicy {
    pub fn from_kind(kind: GhostKind, prob_attack: f64) -> Self {
        match kind {
            GhostKind::Random => GhostPolicy::Random(RandomGhost),
            GhostKind::Directional => GhostPolicy::Directional(DirectionalGhost::new(prob_attack)),
        }
    }

    pub fn kind(&self) -> GhostKind {
        match self {
            GhostPolicy::Random(_) => GhostKind::Random,
            GhostPolicy::Directional(_) => GhostKind::Directional,
        }
    }

    /// Samples one action for `opponent` from this policy's distribution.
    pub fn choose_action<W, R>(&self, state: &W, opponent: usize, rng: &mut R) -> Result<Direction, DistributionError>
    where
        W: GridWorld,
        R: Rng + ?Sized,
    {
        self.action_distribution(state, opponent).sample(rng)
    }
}

impl<W: GridWorld> OpponentPolicy<W> for GhostPolicy {
    fn action_distribution(&self, state: &W, opponent: usize) -> DiscreteDistribution<Direction> {
        match self {
            GhostPolicy::Random(inner) => inner.action_distribution(state, opponent),
            GhostPolicy::Directional(inner) => inner.action_distribution(state, opponent),
        }
    }
}
