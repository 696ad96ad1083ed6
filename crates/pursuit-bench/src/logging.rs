//! Structured telemetry for a bench run.
//!
//! When `logging.enable_structured` is set, every `tracing` event (episode rows,
//! belief metrics, search decisions) is written as one JSON object per line to
//! `telemetry.jsonl`, placed in the same directory as the summary table.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{Level, info};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Keeps the background writer alive; dropping it flushes pending events.
pub struct LoggingGuard {
    _flush: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Where the telemetry log for `outputs` lives.
pub fn telemetry_path(outputs: &ResolvedOutputs) -> PathBuf {
    let dir = outputs
        .summary_md
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    dir.join(TELEMETRY_FILE)
}

/// Returns `None` when structured logging is disabled.
pub fn init_logging(logging: &LoggingConfig, outputs: &ResolvedOutputs, run_id: &str) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let telemetry_path = telemetry_path(outputs);
    if let Some(dir) = telemetry_path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating telemetry directory at {}", dir.display()))?;
    }
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating telemetry file at {}", telemetry_path.display()))?;
    let (writer, flush) = NonBlockingBuilder::default().lossy(false).finish(file);

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level().unwrap_or(Level::INFO).as_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // Only the first subscriber installed in a process takes effect.
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        info!(
            target: "pursuit_bench::run",
            run_id,
            telemetry = %telemetry_path.display(),
            "structured telemetry enabled"
        );
    }

    Ok(Some(LoggingGuard {
        _flush: flush,
        telemetry_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn outputs_in(dir: &Path) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: dir.join("episodes.jsonl"),
            summary_md: dir.join("summary.md"),
        }
    }

    #[test]
    fn telemetry_sits_next_to_the_summary() {
        let outputs = outputs_in(Path::new("bench/out/run"));
        assert_eq!(telemetry_path(&outputs), PathBuf::from("bench/out/run/telemetry.jsonl"));

        let bare = ResolvedOutputs {
            jsonl: PathBuf::from("episodes.jsonl"),
            summary_md: PathBuf::from("summary.md"),
        };
        assert_eq!(telemetry_path(&bare), PathBuf::from("./telemetry.jsonl"));
    }

    #[test]
    fn disabled_logging_creates_nothing() {
        let dir = tempdir().unwrap();
        let outputs = outputs_in(&dir.path().join("nested"));
        let guard = init_logging(&LoggingConfig::default(), &outputs, "quiet").unwrap();
        assert!(guard.is_none());
        assert!(!dir.path().join("nested").exists());
    }

    #[test]
    fn enabled_logging_creates_the_telemetry_file() {
        let dir = tempdir().unwrap();
        let outputs = outputs_in(&dir.path().join("nested"));
        let logging = LoggingConfig {
            enable_structured: true,
            ..LoggingConfig::default()
        };
        let guard = init_logging(&logging, &outputs, "loud").unwrap().expect("guard");
        assert_eq!(guard.telemetry_path, dir.path().join("nested").join(TELEMETRY_FILE));
        assert!(guard.telemetry_path.exists());
    }
}
