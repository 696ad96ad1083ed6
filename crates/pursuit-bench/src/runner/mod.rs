mod episode;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pursuit_bot::{EvaluationKind, GhostPolicy, SearchError, Searcher};
use pursuit_core::belief::{DistributionError, TrackingError};
use pursuit_core::model::{Layout, LayoutError};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError, AnalyticsSummary};
use crate::config::{BenchConfig, ResolvedOutputs};
use crate::logging::telemetry_path;

/// Plays configured episodes and streams one JSONL row per episode.
pub struct BenchRunner {
    config: BenchConfig,
    outputs: ResolvedOutputs,
    layout: Arc<Layout>,
    searcher: Searcher,
    evaluation: EvaluationKind,
    policies: Vec<GhostPolicy>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub episodes_played: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub analytics: AnalyticsSummary,
}

impl BenchRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let layout = config.layout.load()?;
        if layout.num_opponents() == 0 {
            return Err(RunnerError::NoOpponents);
        }

        let searcher = Searcher::from_config(config.agent.search_config())?;
        let policy = GhostPolicy::from_kind(config.opponents.policy, config.opponents.prob_attack);
        let policies = vec![policy; layout.num_opponents()];

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            evaluation: config.agent.evaluation,
            config,
            outputs,
            layout: Arc::new(layout),
            searcher,
            policies,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Execute every episode, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.episodes.seed.unwrap_or(0));
        let mut analytics = AnalyticsCollector::new(self.config.run_id.clone());
        let mut rows_written = 0usize;

        for episode in 0..self.config.episodes.count {
            let seed = rng.next_u64();
            let record = self.play_episode(episode, seed)?;
            self.log_episode(&record);
            analytics.record_episode(&record);

            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
            rows_written += 1;
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_path = self.logging_enabled.then(|| telemetry_path(&self.outputs));

        Ok(RunSummary {
            episodes_played: self.config.episodes.count,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
            analytics: summary,
        })
    }

    fn log_episode(&self, record: &EpisodeRecord) {
        if !self.logging_enabled || !tracing::enabled!(target: "pursuit_bench::episode", Level::INFO) {
            return;
        }

        event!(
            target: "pursuit_bench::episode",
            Level::INFO,
            run_id = %record.run_id,
            episode = record.episode as u64,
            seed = record.seed,
            result = record.result.as_str(),
            steps = record.steps as u64,
            score = record.score,
            truth_probability = record.tracking.mean_truth_probability,
            map_hit_rate = record.tracking.map_hit_rate,
            nodes = record.search.nodes
        );
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeResult {
    Win,
    Lose,
    /// `max_steps` elapsed with the game still running.
    Timeout,
}

impl EpisodeResult {
    pub const fn as_str(self) -> &'static str {
        match self {
            EpisodeResult::Win => "win",
            EpisodeResult::Lose => "lose",
            EpisodeResult::Timeout => "timeout",
        }
    }
}

/// One JSONL row.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeRecord {
    pub run_id: String,
    pub episode: usize,
    pub seed: u64,
    pub steps: usize,
    pub result: EpisodeResult,
    pub score: f64,
    pub food_remaining: usize,
    pub opponents_captured: usize,
    pub tracking: TrackingSummary,
    pub search: SearchSummary,
}

/// Belief accuracy averaged over every (step, free opponent) pair.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingSummary {
    pub estimator: String,
    pub samples: usize,
    pub mean_truth_probability: f64,
    pub mean_entropy: f64,
    pub map_hit_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub kind: String,
    pub depth: u32,
    pub decisions: u32,
    pub nodes: u64,
    pub evaluations: u64,
    pub cutoffs: u64,
    pub ms_per_decision: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize episode row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("failed to load layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("layout has no opponents to track")]
    NoOpponents,
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error("belief tracking failed: {0}")]
    Tracking(#[from] TrackingError),
    #[error("opponent move sampling failed: {0}")]
    Distribution(#[from] DistributionError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(layout: &str) -> BenchConfig {
        config_with_search(layout, "alpha_beta")
    }

    fn config_with_search(layout: &str, search: &str) -> BenchConfig {
        let yaml = format!(
            r#"
run_id: "runner_unit"
episodes:
  seed: 9
  count: 2
  max_steps: 30
layout:
  text: "{layout}"
agent:
  search: "{search}"
  depth: 1
outputs:
  jsonl: "unused.jsonl"
  summary_md: "unused.md"
"#
        );
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
        cfg.validate().expect("config validates");
        cfg
    }

    #[test]
    fn layout_without_opponents_is_rejected() {
        let cfg = config("%%%%%\\n%P. %\\n%%%%%\\n");
        let outputs = cfg.resolved_outputs();
        assert!(matches!(BenchRunner::new(cfg, outputs), Err(RunnerError::NoOpponents)));
    }

    #[test]
    fn episodes_are_reproducible_from_their_seed() {
        let cfg = config("%%%%%%%%\\n%P  . G%\\n% %%%% %\\n%      %\\n%%%%%%%%\\n");
        let outputs = cfg.resolved_outputs();
        let runner = BenchRunner::new(cfg, outputs).expect("runner");

        let first = runner.play_episode(0, 77).expect("episode");
        let second = runner.play_episode(0, 77).expect("episode");
        assert_eq!(first.steps, second.steps);
        assert_eq!(first.score, second.score);
        assert_eq!(first.result, second.result);
        assert_eq!(first.tracking.mean_truth_probability, second.tracking.mean_truth_probability);
        assert!(first.steps <= 30);
        assert!(first.tracking.samples > 0);
        assert_eq!(first.search.decisions as usize, first.steps);
    }

    #[test]
    fn reflex_agent_plays_reproducible_episodes() {
        let cfg = config_with_search("%%%%%%%%\\n%P. . G%\\n% %%%% %\\n%  .   %\\n%%%%%%%%\\n", "reflex");
        let outputs = cfg.resolved_outputs();
        let runner = BenchRunner::new(cfg, outputs).expect("runner");

        let first = runner.play_episode(1, 2024).expect("episode");
        let second = runner.play_episode(1, 2024).expect("episode");
        assert_eq!(first.search.kind, "reflex");
        assert_eq!((first.steps, first.score, first.result), (second.steps, second.score, second.result));
        assert!(first.search.decisions > 0);
    }
}
