use std::sync::Arc;
use std::time::{Duration, Instant};

use pursuit_bot::SearchStats;
use pursuit_core::belief::telemetry::BeliefMetrics;
use pursuit_core::belief::{DiscreteDistribution, Estimator};
use pursuit_core::game::{GridState, GridWorld, Outcome, WorldState};
use pursuit_core::model::Cell;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{Level, event};

use super::{BenchRunner, EpisodeRecord, EpisodeResult, RunnerError, SearchSummary, TrackingSummary};

impl BenchRunner {
    /// Plays one episode from its own seed: observe, track, decide, move.
    pub fn play_episode(&self, episode: usize, seed: u64) -> Result<EpisodeRecord, RunnerError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let tracking = &self.config.tracking;
        let mut state = GridState::new(Arc::clone(&self.layout), self.config.opponents.collision);

        let mut trackers =
            Estimator::build_all(tracking.estimator, state.num_opponents(), tracking.particle_count(), tracking.sensor);
        for tracker in &mut trackers {
            tracker.initialize(&state)?;
        }

        let mut accuracy = TrackingAccumulator::default();
        let mut decisions = DecisionMetrics::default();
        let mut steps = 0usize;

        while !state.is_terminal() && steps < self.config.episodes.max_steps {
            let observed = state.with_sensor_readings(tracking.sensor, &mut rng);
            for tracker in &mut trackers {
                tracker.observe(&observed, &mut rng)?;
            }

            let beliefs: Vec<(usize, DiscreteDistribution<Cell>)> = trackers
                .iter()
                .map(|tracker| (tracker.opponent(), tracker.beliefs()))
                .collect();
            for (opponent, dist) in &beliefs {
                let metrics = BeliefMetrics::from_distribution(*opponent, dist, Some(state.position(*opponent)));
                if !state.is_jailed(*opponent) {
                    accuracy.record(&metrics);
                }
                self.log_belief(episode, steps, &metrics);
            }

            let planning = self.planning_state(&observed, &beliefs);
            let start = Instant::now();
            let outcome =
                self.searcher
                    .search_with_rng(&planning, |s: &GridState| self.evaluation.evaluate(s), &mut rng)?;
            decisions.record(start.elapsed(), &outcome.stats);

            for tracker in &mut trackers {
                tracker.elapse_time(&observed, &self.policies, &mut rng)?;
            }

            state = state.successor(0, outcome.action);
            for opponent in 1..state.num_agents() {
                if state.is_terminal() {
                    break;
                }
                let action = self.policies[opponent - 1].choose_action(&state, opponent, &mut rng)?;
                state = state.successor(opponent, action);
            }
            steps += 1;
        }

        let result = match state.outcome() {
            Outcome::Win => EpisodeResult::Win,
            Outcome::Lose => EpisodeResult::Lose,
            Outcome::Running => EpisodeResult::Timeout,
        };
        let opponents_captured = (1..state.num_agents())
            .filter(|opponent| state.is_jailed(*opponent))
            .count();

        Ok(EpisodeRecord {
            run_id: self.config.run_id.clone(),
            episode,
            seed,
            steps,
            result,
            score: state.score(),
            food_remaining: state.food().len(),
            opponents_captured,
            tracking: accuracy.finish(tracking.estimator.as_str()),
            search: decisions.finish(self.searcher.kind().as_str(), self.searcher.depth()),
        })
    }

    /// The state the searcher plans on. Opponents sit on their most likely cells
    /// unless the agent is configured to see the true positions.
    fn planning_state(&self, observed: &GridState, beliefs: &[(usize, DiscreteDistribution<Cell>)]) -> GridState {
        if !self.config.agent.plan_on_beliefs {
            return observed.clone();
        }
        beliefs
            .iter()
            .fold(observed.clone(), |state, (opponent, dist)| match dist.arg_max() {
                Some(cell) => state.with_opponent_position(*opponent, *cell),
                None => state,
            })
    }

    fn log_belief(&self, episode: usize, step: usize, metrics: &BeliefMetrics) {
        if !self.logging_enabled || !tracing::enabled!(target: "pursuit_bench::belief", Level::DEBUG) {
            return;
        }

        event!(
            target: "pursuit_bench::belief",
            Level::DEBUG,
            run_id = %self.config.run_id,
            episode = episode as u64,
            step = step as u64,
            opponent = metrics.opponent as u64,
            entropy = metrics.entropy,
            support = metrics.support as u64,
            max_probability = metrics.max_probability,
            jail_probability = metrics.jail_probability,
            truth_probability = metrics.truth_probability.unwrap_or(0.0),
            map_error = metrics.map_error.map(u64::from)
        );
    }
}

#[derive(Default)]
struct TrackingAccumulator {
    samples: usize,
    truth_probability: f64,
    entropy: f64,
    map_hits: usize,
}

impl TrackingAccumulator {
    fn record(&mut self, metrics: &BeliefMetrics) {
        self.samples += 1;
        self.truth_probability += metrics.truth_probability.unwrap_or(0.0);
        self.entropy += metrics.entropy;
        if metrics.map_error == Some(0) {
            self.map_hits += 1;
        }
    }

    fn finish(self, estimator: &str) -> TrackingSummary {
        let mean = |total: f64| {
            if self.samples == 0 {
                0.0
            } else {
                total / self.samples as f64
            }
        };
        TrackingSummary {
            estimator: estimator.to_string(),
            samples: self.samples,
            mean_truth_probability: mean(self.truth_probability),
            mean_entropy: mean(self.entropy),
            map_hit_rate: mean(self.map_hits as f64),
        }
    }
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
    stats: SearchStats,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration, stats: &SearchStats) {
        self.total += duration;
        self.decisions += 1;
        self.stats.nodes += stats.nodes;
        self.stats.evaluations += stats.evaluations;
        self.stats.cutoffs += stats.cutoffs;
    }

    fn finish(self, kind: &str, depth: u32) -> SearchSummary {
        let ms_per_decision = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };
        SearchSummary {
            kind: kind.to_string(),
            depth,
            decisions: self.decisions,
            nodes: self.stats.nodes,
            evaluations: self.stats.evaluations,
            cutoffs: self.stats.cutoffs,
            ms_per_decision,
        }
    }
}
