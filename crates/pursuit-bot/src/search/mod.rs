//! Depth-limited adversarial search over any [`WorldState`].
//!
//! Agent 0 is the maximizing player. Opponents `1..num_agents` move in index order
//! after it; one full ply is complete once the last opponent has moved, and the
//! search evaluates once the configured number of plies has been played.
//! [`SearchKind::Reflex`] skips the tree entirely and scores agent 0's immediate
//! successors, drawing among equally good moves from the caller's RNG.

mod alpha_beta;
mod expectimax;
mod minimax;
mod reflex;

use pursuit_core::game::WorldState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{Level, event};

pub const DEFAULT_DEPTH: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("search depth must be at least 1, got {0}")]
    InvalidDepth(u32),
    #[error("agent {agent} has no legal action in a non-terminal state")]
    NoLegalActions { agent: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Minimax,
    #[default]
    AlphaBeta,
    Expectimax,
    Reflex,
}

impl SearchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SearchKind::Minimax => "minimax",
            SearchKind::AlphaBeta => "alpha_beta",
            SearchKind::Expectimax => "expectimax",
            SearchKind::Reflex => "reflex",
        }
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "minimax" => Ok(SearchKind::Minimax),
            "alpha_beta" | "alphabeta" => Ok(SearchKind::AlphaBeta),
            "expectimax" => Ok(SearchKind::Expectimax),
            "reflex" => Ok(SearchKind::Reflex),
            other => Err(format!("unknown search kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub kind: SearchKind,
    pub depth: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            kind: SearchKind::default(),
            depth: DEFAULT_DEPTH,
        }
    }
}

impl SearchConfig {
    /// Reads `PURSUIT_SEARCH_KIND` and `PURSUIT_SEARCH_DEPTH`, keeping defaults for
    /// anything missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let kind = read("PURSUIT_SEARCH_KIND")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(defaults.kind);
        let depth = read("PURSUIT_SEARCH_DEPTH")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|depth| *depth >= 1)
            .unwrap_or(defaults.depth);
        Self { kind, depth }
    }
}

/// Counters gathered during one decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Interior nodes whose children were generated.
    pub nodes: u64,
    pub evaluations: u64,
    pub cutoffs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome<A> {
    pub action: A,
    pub value: f64,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Searcher {
    kind: SearchKind,
    depth: u32,
}

impl Searcher {
    pub fn new(kind: SearchKind, depth: u32) -> Result<Self, SearchError> {
        if depth == 0 {
            return Err(SearchError::InvalidDepth(depth));
        }
        Ok(Self { kind, depth })
    }

    pub fn from_config(config: SearchConfig) -> Result<Self, SearchError> {
        Self::new(config.kind, config.depth)
    }

    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Best action for agent 0 with its backed-up value. Ties go to the first
    /// action in legal order.
    pub fn search<W, E>(&self, state: &W, eval: E) -> Result<SearchOutcome<W::Action>, SearchError>
    where
        W: WorldState,
        E: Fn(&W) -> f64,
    {
        self.run(state, &eval, |tied| tied[0])
    }

    /// Like [`Searcher::search`], but a reflex agent draws uniformly among its
    /// equally scored moves. The tree searches never touch `rng`.
    pub fn search_with_rng<W, E, R>(
        &self,
        state: &W,
        eval: E,
        rng: &mut R,
    ) -> Result<SearchOutcome<W::Action>, SearchError>
    where
        W: WorldState,
        E: Fn(&W) -> f64,
        R: Rng + ?Sized,
    {
        self.run(state, &eval, |tied| tied[rng.gen_range(0..tied.len())])
    }

    fn run<W, E, P>(&self, state: &W, eval: &E, pick: P) -> Result<SearchOutcome<W::Action>, SearchError>
    where
        W: WorldState,
        E: Fn(&W) -> f64,
        P: FnOnce(&[W::Action]) -> W::Action,
    {
        let mut stats = SearchStats::default();
        let (action, value) = match self.kind {
            SearchKind::Minimax => minimax::decide(state, self.depth, eval, &mut stats)?,
            SearchKind::AlphaBeta => alpha_beta::decide(state, self.depth, eval, &mut stats)?,
            SearchKind::Expectimax => expectimax::decide(state, self.depth, eval, &mut stats)?,
            SearchKind::Reflex => {
                let (tied, value) = reflex::best_actions(state, eval, &mut stats)?;
                (pick(&tied), value)
            }
        };
        log_decision(self, &action, value, &stats);
        Ok(SearchOutcome { action, value, stats })
    }

    pub fn choose_action<W, E>(&self, state: &W, eval: E) -> Result<W::Action, SearchError>
    where
        W: WorldState,
        E: Fn(&W) -> f64,
    {
        self.search(state, eval).map(|outcome| outcome.action)
    }
}

fn log_decision<A: std::fmt::Debug>(searcher: &Searcher, action: &A, value: f64, stats: &SearchStats) {
    if !tracing::enabled!(target: "pursuit_bot::search", Level::DEBUG) {
        return;
    }

    event!(
        target: "pursuit_bot::search",
        Level::DEBUG,
        kind = searcher.kind.as_str(),
        depth = searcher.depth,
        action = ?action,
        value,
        nodes = stats.nodes,
        evaluations = stats.evaluations,
        cutoffs = stats.cutoffs
    );
}

/// Whose move it is and how many full plies have been played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Turn {
    pub agent: usize,
    pub plies: u32,
}

impl Turn {
    pub fn after_root<W: WorldState>(state: &W) -> Self {
        Turn { agent: 0, plies: 0 }.next(state.num_agents())
    }

    pub fn next(self, num_agents: usize) -> Self {
        if self.agent + 1 >= num_agents {
            Turn {
                agent: 0,
                plies: self.plies + 1,
            }
        } else {
            Turn {
                agent: self.agent + 1,
                plies: self.plies,
            }
        }
    }

    /// Terminal states and exhausted depth are scored by the evaluation function.
    pub fn is_leaf<W: WorldState>(self, state: &W, depth: u32) -> bool {
        state.is_terminal() || (self.agent == 0 && self.plies >= depth)
    }
}

pub(crate) fn legal_actions<W: WorldState>(state: &W, agent: usize) -> Result<Vec<W::Action>, SearchError> {
    let actions = state.legal_actions(agent);
    if actions.is_empty() {
        return Err(SearchError::NoLegalActions { agent });
    }
    Ok(actions)
}

pub(crate) fn evaluate<W, E>(state: &W, eval: &E, stats: &mut SearchStats) -> f64
where
    E: Fn(&W) -> f64 + ?Sized,
{
    stats.evaluations += 1;
    eval(state)
}

#[cfg(test)]
pub(crate) mod tree {
    //! Explicit game trees for exercising the search variants.

    use pursuit_core::game::WorldState;

    #[derive(Debug, Clone)]
    pub enum Node {
        Leaf(f64),
        Branch(Vec<Node>),
    }

    /// Walks a [`Node`] tree; `agents` players alternate in index order.
    #[derive(Debug, Clone)]
    pub struct TreeState {
        pub node: Node,
        pub agents: usize,
    }

    impl WorldState for TreeState {
        type Action = usize;

        fn num_agents(&self) -> usize {
            self.agents
        }

        fn legal_actions(&self, _agent: usize) -> Vec<usize> {
            match &self.node {
                Node::Leaf(_) => Vec::new(),
                Node::Branch(children) => (0..children.len()).collect(),
            }
        }

        fn successor(&self, _agent: usize, action: usize) -> Self {
            match &self.node {
                Node::Branch(children) => TreeState {
                    node: children[action].clone(),
                    agents: self.agents,
                },
                Node::Leaf(_) => self.clone(),
            }
        }

        fn is_win(&self) -> bool {
            false
        }

        fn is_lose(&self) -> bool {
            false
        }

        fn is_terminal(&self) -> bool {
            matches!(self.node, Node::Leaf(_))
        }

        fn score(&self) -> f64 {
            match self.node {
                Node::Leaf(value) => value,
                Node::Branch(_) => 0.0,
            }
        }
    }

    pub fn leaves(values: &[f64]) -> Node {
        Node::Branch(values.iter().map(|value| Node::Leaf(*value)).collect())
    }

    pub fn score(state: &TreeState) -> f64 {
        state.score()
    }
}
