use pursuit_bot::{EvaluationKind, GhostKind, SearchConfig, SearchKind};
use pursuit_core::belief::{EstimatorKind, SensorModel};
use pursuit_core::game::CollisionRule;
use pursuit_core::model::{Layout, LayoutError};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_MAX_STEPS: usize = 200;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchConfig {
    pub run_id: String,
    pub episodes: EpisodeConfig,
    pub layout: LayoutConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub opponents: OpponentsConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchConfig = serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
            source,
            path: path_buf.clone(),
        })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.episodes.validate()?;
        self.layout.validate()?;
        self.agent.validate()?;
        self.opponents.validate()?;
        self.tracking.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }
}

/// Episode scheduling block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EpisodeConfig {
    pub count: usize,
    pub seed: Option<u64>,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl EpisodeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(invalid("episodes.count", "number of episodes must be greater than zero"));
        }
        if self.max_steps == 0 {
            return Err(invalid("episodes.max_steps", "max_steps must be at least 1"));
        }
        Ok(())
    }
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

/// Board source: inline ASCII text or a path to a layout file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LayoutConfig {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match (&self.text, &self.path) {
            (Some(_), Some(_)) => Err(invalid("layout", "specify either layout.text or layout.path, not both")),
            (None, None) => Err(invalid("layout", "layout.text or layout.path is required")),
            (Some(text), None) if text.trim().is_empty() => Err(invalid("layout.text", "layout text must not be empty")),
            (None, Some(path)) if path.as_os_str().is_empty() => {
                Err(invalid("layout.path", "layout path must not be empty"))
            }
            _ => Ok(()),
        }
    }

    pub fn load(&self) -> Result<Layout, LayoutError> {
        match (&self.text, &self.path) {
            (Some(text), _) => Layout::parse(text),
            (None, Some(path)) => Layout::from_path(path),
            (None, None) => Err(LayoutError::Empty),
        }
    }
}

/// Controlled-agent search settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default = "default_search_kind")]
    pub search: SearchKind,
    #[serde(default = "default_search_depth")]
    pub depth: u32,
    #[serde(default)]
    pub evaluation: EvaluationKind,
    /// Search against the trackers' most likely opponent cells instead of the true ones.
    #[serde(default = "default_plan_on_beliefs")]
    pub plan_on_beliefs: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            search: default_search_kind(),
            depth: default_search_depth(),
            evaluation: EvaluationKind::default(),
            plan_on_beliefs: default_plan_on_beliefs(),
        }
    }
}

impl AgentConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.depth == 0 {
            return Err(invalid("agent.depth", "search depth must be at least 1"));
        }
        Ok(())
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            kind: self.search,
            depth: self.depth,
        }
    }
}

// Unset fields fall back to PURSUIT_SEARCH_KIND / PURSUIT_SEARCH_DEPTH.
fn default_search_kind() -> SearchKind {
    SearchConfig::from_env().kind
}

fn default_search_depth() -> u32 {
    SearchConfig::from_env().depth
}

fn default_plan_on_beliefs() -> bool {
    true
}

/// Opponent behaviour and collision rules.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OpponentsConfig {
    #[serde(default)]
    pub policy: GhostKind,
    #[serde(default = "default_prob_attack")]
    pub prob_attack: f64,
    #[serde(default)]
    pub collision: CollisionRule,
}

impl Default for OpponentsConfig {
    fn default() -> Self {
        Self {
            policy: GhostKind::default(),
            prob_attack: default_prob_attack(),
            collision: CollisionRule::default(),
        }
    }
}

impl OpponentsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.prob_attack) {
            return Err(invalid("opponents.prob_attack", "prob_attack must lie in [0, 1]"));
        }
        Ok(())
    }
}

fn default_prob_attack() -> f64 {
    pursuit_bot::policy::DEFAULT_PROB_ATTACK
}

/// Belief tracking settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackingConfig {
    #[serde(default)]
    pub estimator: EstimatorKind,
    /// Falls back to the estimator's own default when omitted.
    #[serde(default)]
    pub particles: Option<usize>,
    #[serde(default)]
    pub sensor: SensorModel,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorKind::default(),
            particles: None,
            sensor: SensorModel::default(),
        }
    }
}

impl TrackingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.estimator != EstimatorKind::Exact && self.particle_count() == 0 {
            return Err(invalid("tracking.particles", "particle count must be greater than zero"));
        }
        Ok(())
    }

    pub fn particle_count(&self) -> usize {
        self.particles.unwrap_or_else(|| self.estimator.default_particles())
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [("outputs.jsonl", &self.jsonl), ("outputs.summary_md", &self.summary_md)] {
            if value.trim().is_empty() {
                return Err(invalid(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(invalid(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(invalid("run_id", "run_id must not be empty"));
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(invalid(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }

    Ok(())
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid { path: PathBuf, source: ValidationError },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } | ConfigError::Invalid { path, .. } => {
                path.as_path()
            }
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pursuit_core::belief::{DEFAULT_JOINT_PARTICLES, DEFAULT_PARTICLES};

    const BASIC_YAML: &str = r#"
run_id: "chase_smoke"
episodes:
  seed: 123
  count: 4
layout:
  text: |
    %%%%%%%
    %P  .G%
    %%%%%%%
agent:
  search: "expectimax"
  depth: 1
opponents:
  policy: "directional"
  collision: "deadly"
tracking:
  estimator: "joint"
  particles: 50
  sensor: "exact"
outputs:
  jsonl: "bench/out/{run_id}/episodes.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    fn parse(yaml: &str) -> BenchConfig {
        serde_yaml::from_str(yaml).expect("parse yaml")
    }

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg = parse(BASIC_YAML);
        cfg.validate().expect("validate");

        assert_eq!(cfg.episodes.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(cfg.agent.search, SearchKind::Expectimax);
        assert_eq!(cfg.agent.evaluation, EvaluationKind::Score);
        assert!(cfg.agent.plan_on_beliefs);
        assert_eq!(cfg.opponents.policy, GhostKind::Directional);
        assert_eq!(cfg.opponents.collision, CollisionRule::Deadly);
        assert_eq!(cfg.tracking.estimator, EstimatorKind::Joint);
        assert_eq!(cfg.tracking.sensor, SensorModel::Exact);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(outputs.jsonl, PathBuf::from("bench/out/chase_smoke/episodes.jsonl"));
        assert_eq!(cfg.layout.load().expect("layout parses").num_opponents(), 1);
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let yaml = r#"
run_id: "defaults"
episodes:
  count: 1
layout:
  path: "bench/layouts/corridor.lay"
outputs:
  jsonl: "out.jsonl"
  summary_md: "out.md"
"#;
        let mut cfg = parse(yaml);
        cfg.validate().expect("validate");
        assert_eq!(cfg.tracking.particles, None);
        assert_eq!(cfg.tracking.particle_count(), DEFAULT_PARTICLES);
        assert_eq!(cfg.opponents.prob_attack, pursuit_bot::policy::DEFAULT_PROB_ATTACK);
        assert!(!cfg.logging.enable_structured);
    }

    #[test]
    fn joint_estimator_defaults_to_the_joint_budget() {
        let yaml = BASIC_YAML.replace("  particles: 50\n", "");
        let mut cfg = parse(&yaml);
        cfg.validate().expect("validate");
        assert_eq!(cfg.tracking.estimator, EstimatorKind::Joint);
        assert_eq!(cfg.tracking.particle_count(), DEFAULT_JOINT_PARTICLES);
        assert_eq!(parse(BASIC_YAML).tracking.particle_count(), 50);
    }

    #[test]
    fn rejects_zero_episodes() {
        let yaml = BASIC_YAML.replace("count: 4", "count: 0");
        let err = parse(&yaml).validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "episodes.count"
        ));
    }

    #[test]
    fn rejects_two_layout_sources() {
        let yaml = BASIC_YAML.replace("layout:\n", "layout:\n  path: \"board.lay\"\n");
        let err = parse(&yaml).validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "layout"
        ));
    }

    #[test]
    fn rejects_zero_particles_for_sampling_estimators() {
        let yaml = BASIC_YAML.replace("particles: 50", "particles: 0");
        let err = parse(&yaml).validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "tracking.particles"
        ));

        let exact = yaml.replace("estimator: \"joint\"", "estimator: \"exact\"");
        parse(&exact).validate().expect("exact inference needs no particles");
    }

    #[test]
    fn rejects_out_of_range_attack_probability() {
        let yaml = BASIC_YAML.replace("collision: \"deadly\"", "collision: \"deadly\"\n  prob_attack: 1.5");
        let err = parse(&yaml).validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "opponents.prob_attack"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("chase_smoke", "chase smoke");
        let err = parse(&yaml).validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }
}
