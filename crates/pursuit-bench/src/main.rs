use std::path::PathBuf;

use clap::Parser;

use pursuit_bench::config::{BenchConfig, ResolvedOutputs};
use pursuit_bench::logging::init_logging;
use pursuit_bench::runner::BenchRunner;
use pursuit_core::AppInfo;

/// Episode harness for the pursuit agent.
#[derive(Debug, Parser)]
#[command(
    name = "pursuit-bench",
    author,
    version,
    about = "Deterministic search and belief-tracking episode harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of episodes to play.
    #[arg(long, value_name = "COUNT")]
    episodes: Option<usize>,

    /// Override the base RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the search depth in plies.
    #[arg(long, value_name = "PLIES")]
    depth: Option<u32>,

    /// Exit after validating the configuration (no episode is played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    println!("{} {} ({})", AppInfo::name(), AppInfo::version(), AppInfo::codename());
    let mut config = BenchConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(episodes) = cli.episodes {
        config.episodes.count = episodes;
    }

    if let Some(seed) = cli.seed {
        config.episodes.seed = Some(seed);
    }

    if let Some(depth) = cli.depth {
        config.agent.depth = depth;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let episodes = config.episodes.count;

    println!(
        "Loaded configuration '{run_id}': {episodes} episode{} with {} depth {} against {} opponents, {} tracking",
        if episodes == 1 { "" } else { "s" },
        config.agent.search.as_str(),
        config.agent.depth,
        config.opponents.policy.as_str(),
        config.tracking.estimator.as_str(),
    );

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = BenchRunner::new(config, outputs)?;

    if cli.validate_only {
        println!(
            "Validation-only mode: layout {}x{} with {} opponent(s); no episodes played.",
            runner.layout().width(),
            runner.layout().height(),
            runner.layout().num_opponents()
        );
        return Ok(());
    }

    let summary = runner.run()?;
    let stats = &summary.analytics;
    println!(
        "Run complete for '{run_id}': {} episodes → {} rows at {}",
        summary.episodes_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!(
        "  Win rate {:.1}%, mean score {:.1}, P(true cell) {:.3}",
        stats.win_rate.rate * 100.0,
        stats.score.mean,
        stats.truth_probability.mean
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
