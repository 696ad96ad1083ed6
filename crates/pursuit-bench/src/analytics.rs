use std::fs;
use std::path::Path;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::runner::{EpisodeRecord, EpisodeResult};

const CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("no episodes were recorded")]
    Empty,
    #[error("invalid distribution parameters: {0}")]
    Statistics(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Accumulates per-episode rows into run-level statistics.
pub struct AnalyticsCollector {
    run_id: String,
    scores: Vec<f64>,
    steps: Vec<f64>,
    truth_probability: Vec<f64>,
    entropy: Vec<f64>,
    map_hits: Vec<f64>,
    wins: usize,
    losses: usize,
    timeouts: usize,
    decisions: u64,
    nodes: u64,
    cutoffs: u64,
    total_ms: f64,
}

impl AnalyticsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            scores: Vec::new(),
            steps: Vec::new(),
            truth_probability: Vec::new(),
            entropy: Vec::new(),
            map_hits: Vec::new(),
            wins: 0,
            losses: 0,
            timeouts: 0,
            decisions: 0,
            nodes: 0,
            cutoffs: 0,
            total_ms: 0.0,
        }
    }

    pub fn record_episode(&mut self, record: &EpisodeRecord) {
        self.scores.push(record.score);
        self.steps.push(record.steps as f64);
        match record.result {
            EpisodeResult::Win => self.wins += 1,
            EpisodeResult::Lose => self.losses += 1,
            EpisodeResult::Timeout => self.timeouts += 1,
        }

        // Episodes that never observed a free opponent carry no tracking signal.
        if record.tracking.samples > 0 {
            self.truth_probability.push(record.tracking.mean_truth_probability);
            self.entropy.push(record.tracking.mean_entropy);
            self.map_hits.push(record.tracking.map_hit_rate);
        }

        self.decisions += u64::from(record.search.decisions);
        self.nodes += record.search.nodes;
        self.cutoffs += record.search.cutoffs;
        self.total_ms += record.search.ms_per_decision * f64::from(record.search.decisions);
    }

    pub fn finalize(self) -> Result<AnalyticsSummary, AnalyticsError> {
        let episodes = self.scores.len();
        if episodes == 0 {
            return Err(AnalyticsError::Empty);
        }

        let per_decision = |total: f64| {
            if self.decisions == 0 {
                0.0
            } else {
                total / self.decisions as f64
            }
        };

        Ok(AnalyticsSummary {
            run_id: self.run_id,
            episodes,
            wins: self.wins,
            losses: self.losses,
            timeouts: self.timeouts,
            win_rate: wilson_interval(self.wins, episodes)?,
            score: MetricReport::from_samples(&self.scores)?,
            steps: MetricReport::from_samples(&self.steps)?,
            truth_probability: MetricReport::from_samples(&self.truth_probability)?,
            entropy: MetricReport::from_samples(&self.entropy)?,
            map_hit_rate: MetricReport::from_samples(&self.map_hits)?,
            avg_nodes_per_decision: per_decision(self.nodes as f64),
            avg_cutoffs_per_decision: per_decision(self.cutoffs as f64),
            avg_ms_per_decision: per_decision(self.total_ms),
        })
    }
}

/// Sample statistics for one per-episode metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReport {
    pub samples: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub ci95: (f64, f64),
}

impl MetricReport {
    pub fn from_samples(values: &[f64]) -> Result<Self, AnalyticsError> {
        match values.len() {
            0 => Ok(Self {
                samples: 0,
                mean: 0.0,
                std_dev: 0.0,
                ci95: (0.0, 0.0),
            }),
            1 => Ok(Self {
                samples: 1,
                mean: values[0],
                std_dev: 0.0,
                ci95: (values[0], values[0]),
            }),
            n => {
                let mean = values.iter().mean();
                let std_dev = values.iter().std_dev();
                let margin = student_quantile(n - 1)? * std_dev / (n as f64).sqrt();
                Ok(Self {
                    samples: n,
                    mean,
                    std_dev,
                    ci95: (mean - margin, mean + margin),
                })
            }
        }
    }
}

/// Proportion with its Wilson score interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateReport {
    pub rate: f64,
    pub ci95: (f64, f64),
}

fn student_quantile(degrees_of_freedom: usize) -> Result<f64, AnalyticsError> {
    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom as f64)
        .map_err(|err| AnalyticsError::Statistics(err.to_string()))?;
    Ok(dist.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0))
}

fn wilson_interval(successes: usize, trials: usize) -> Result<RateReport, AnalyticsError> {
    if trials == 0 {
        return Ok(RateReport {
            rate: 0.0,
            ci95: (0.0, 0.0),
        });
    }
    let normal = Normal::new(0.0, 1.0).map_err(|err| AnalyticsError::Statistics(err.to_string()))?;
    let z = normal.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);

    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let center = (p + z2 / (2.0 * n)) / (1.0 + z2 / n);
    let half = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / (1.0 + z2 / n);
    // Bounds are exact at p = 0 and p = 1.
    let lower = if successes == 0 { 0.0 } else { (center - half).max(0.0) };
    let upper = if successes >= trials { 1.0 } else { (center + half).min(1.0) };
    Ok(RateReport {
        rate: p,
        ci95: (lower, upper),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub run_id: String,
    pub episodes: usize,
    pub wins: usize,
    pub losses: usize,
    pub timeouts: usize,
    pub win_rate: RateReport,
    pub score: MetricReport,
    pub steps: MetricReport,
    pub truth_probability: MetricReport,
    pub entropy: MetricReport,
    pub map_hit_rate: MetricReport,
    pub avg_nodes_per_decision: f64,
    pub avg_cutoffs_per_decision: f64,
    pub avg_ms_per_decision: f64,
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str(&format!("# Pursuit Summary: {}\n\n", self.run_id));
        rows.push_str(&format!(
            "Episodes: {} (wins {}, losses {}, timeouts {})\n\n",
            self.episodes, self.wins, self.losses, self.timeouts
        ));
        rows.push_str(&format!(
            "Win rate: {:.1}% [{:.1}%, {:.1}%]\n\n",
            self.win_rate.rate * 100.0,
            self.win_rate.ci95.0 * 100.0,
            self.win_rate.ci95.1 * 100.0
        ));

        rows.push_str("| Metric | Samples | Mean | Std dev | 95% CI |\n");
        rows.push_str("|--------|---------|------|---------|--------|\n");
        for (label, metric) in [
            ("Score", &self.score),
            ("Steps", &self.steps),
            ("P(true cell)", &self.truth_probability),
            ("Belief entropy", &self.entropy),
            ("MAP hit rate", &self.map_hit_rate),
        ] {
            rows.push_str(&format!(
                "| {label} | {samples} | {mean:.3} | {std:.3} | [{low:.3}, {high:.3}] |\n",
                samples = metric.samples,
                mean = metric.mean,
                std = metric.std_dev,
                low = metric.ci95.0,
                high = metric.ci95.1,
            ));
        }

        rows.push_str(&format!(
            "\nSearch: {:.1} nodes, {:.1} cutoffs, {:.3} ms per decision\n",
            self.avg_nodes_per_decision, self.avg_cutoffs_per_decision, self.avg_ms_per_decision
        ));

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}
