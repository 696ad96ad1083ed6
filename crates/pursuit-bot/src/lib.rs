pub mod eval;
pub mod policy;
pub mod search;

pub use eval::{EvaluationKind, better_evaluation, score_evaluation};
pub use policy::{DirectionalGhost, GhostKind, GhostPolicy, RandomGhost};
pub use search::{SearchConfig, SearchError, SearchKind, SearchOutcome, SearchStats, Searcher};
