use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use crate::evolution::EvolutionParams;

const DEFAULT_RUN_ID: &str = "evolve";
const DEFAULT_SESSION_COMMAND: &str = "hanabi-server";
const DEFAULT_ADDRESS: &str = "127.0.0.1:1024";
const DEFAULT_STARTUP_DELAY_MS: u64 = 500;
const DEFAULT_PLAYERS: usize = 2;
const MIN_PLAYERS: usize = 2;
const MAX_PLAYERS: usize = 5;
const DEFAULT_EPISODES: usize = 4;
const DEFAULT_TIMEOUT_MS: u64 = 100_000;
const DEFAULT_RESULTS_DIR: &str = "outputs/{run_id}/results";
const DEFAULT_CHECKPOINT: &str = "outputs/best_strategy.txt";
const DEFAULT_LOG_JSON: &str = "outputs/{run_id}/evolve.jsonl";
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root configuration for an evolution run, loaded from YAML. Every section is optional.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EvolutionConfig {
    #[serde(default = "default_run_id")]
    pub run_id: String,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub fitness: FitnessConfig,
    #[serde(default)]
    pub evolution: SearchConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            run_id: default_run_id(),
            session: SessionConfig::default(),
            game: GameConfig::default(),
            fitness: FitnessConfig::default(),
            evolution: SearchConfig::default(),
            checkpoint: CheckpointConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EvolutionConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: EvolutionConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
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
        self.session.validate()?;
        self.game.validate()?;
        self.fitness.validate()?;
        self.evolution.validate()?;
        validate_path("checkpoint.path", &self.checkpoint.path)?;
        self.logging.normalize();
        validate_path("logging.json_path", &self.logging.json_path)?;
        Ok(())
    }

    /// Resolve `{run_id}` templates into concrete paths.
    pub fn resolved_paths(&self) -> ResolvedPaths {
        ResolvedPaths {
            results_dir: resolve_template(&self.run_id, &self.fitness.results_dir),
            checkpoint: resolve_template(&self.run_id, &self.checkpoint.path),
            log_json: resolve_template(&self.run_id, &self.logging.json_path),
        }
    }
}

/// How to launch the external game session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_session_command")]
    pub command: String,
    /// Arguments may use `{players}`, `{address}`, `{seed}` and `{episode_dir}`.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    /// Executable run for each agent; defaults to this binary.
    #[serde(default)]
    pub agent_command: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command: default_session_command(),
            args: Vec::new(),
            address: default_address(),
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            agent_command: None,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.command.trim().is_empty() {
            return Err(invalid("session.command", "command must not be empty"));
        }
        match self.address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
            _ => Err(invalid(
                "session.address",
                format!("'{}' is not a host:port address", self.address),
            )),
        }
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GameConfig {
    #[serde(default = "default_players")]
    pub players: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: DEFAULT_PLAYERS,
        }
    }
}

impl GameConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players) {
            return Err(invalid(
                "game.players",
                format!("player count must be between {MIN_PLAYERS} and {MAX_PLAYERS}"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FitnessConfig {
    #[serde(default = "default_episodes")]
    pub episodes: usize,
    /// Ceiling for joining one episode's processes.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    /// Base seed handed to sessions and agents; episode `n` always gets the same derived seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            episodes: DEFAULT_EPISODES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            results_dir: default_results_dir(),
            seed: None,
        }
    }
}

impl FitnessConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.episodes == 0 {
            return Err(invalid("fitness.episodes", "episodes must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid(
                "fitness.timeout_ms",
                "timeout must be greater than zero",
            ));
        }
        validate_path("fitness.results_dir", &self.results_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Genetic search tunables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Defaults to half the rule count.
    #[serde(default)]
    pub population_size: Option<usize>,
    #[serde(default = "default_offspring")]
    pub offspring_per_parent: usize,
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    #[serde(default = "default_survivor_percentage")]
    pub survivor_percentage: f64,
    #[serde(default = "default_steady_state_limit")]
    pub steady_state_limit: usize,
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    #[serde(default = "default_true")]
    pub resume: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let params = EvolutionParams::default();
        Self {
            population_size: None,
            offspring_per_parent: params.offspring_per_parent,
            mutation_rate: params.mutation_rate,
            survivor_percentage: params.survivor_percentage,
            steady_state_limit: params.steady_state_limit,
            max_generations: params.max_generations,
            resume: true,
            seed: None,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.population_size == Some(0) {
            return Err(invalid(
                "evolution.population_size",
                "population must hold at least one genome",
            ));
        }
        if self.offspring_per_parent == 0 {
            return Err(invalid(
                "evolution.offspring_per_parent",
                "each parent must produce at least one offspring",
            ));
        }
        if !(self.mutation_rate > 0.0 && self.mutation_rate < 1.0) {
            return Err(invalid(
                "evolution.mutation_rate",
                "mutation rate must lie strictly between 0 and 1",
            ));
        }
        if !(self.survivor_percentage > 0.0 && self.survivor_percentage <= 100.0) {
            return Err(invalid(
                "evolution.survivor_percentage",
                "survivor percentage must be in (0, 100]",
            ));
        }
        if self.steady_state_limit == 0 {
            return Err(invalid(
                "evolution.steady_state_limit",
                "steady-state limit must be at least 1",
            ));
        }
        if self.max_generations == 0 {
            return Err(invalid(
                "evolution.max_generations",
                "generation cap must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn params(&self, genome_len: usize) -> EvolutionParams {
        EvolutionParams {
            genome_len,
            population_size: self.population_size.unwrap_or(genome_len / 2).max(1),
            offspring_per_parent: self.offspring_per_parent,
            mutation_rate: self.mutation_rate,
            survivor_percentage: self.survivor_percentage,
            steady_state_limit: self.steady_state_limit,
            max_generations: self.max_generations,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint")]
    pub path: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint(),
        }
    }
}

/// Console logging is always on; structured JSON lines are opt-in.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default = "default_log_json")]
    pub json_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            json_path: default_log_json(),
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
        parse_level(&self.tracing_level)
    }
}

pub fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn default_run_id() -> String {
    DEFAULT_RUN_ID.to_string()
}

fn default_session_command() -> String {
    DEFAULT_SESSION_COMMAND.to_string()
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_startup_delay_ms() -> u64 {
    DEFAULT_STARTUP_DELAY_MS
}

fn default_players() -> usize {
    DEFAULT_PLAYERS
}

fn default_episodes() -> usize {
    DEFAULT_EPISODES
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_results_dir() -> String {
    DEFAULT_RESULTS_DIR.to_string()
}

fn default_offspring() -> usize {
    EvolutionParams::default().offspring_per_parent
}

fn default_mutation_rate() -> f64 {
    EvolutionParams::default().mutation_rate
}

fn default_survivor_percentage() -> f64 {
    EvolutionParams::default().survivor_percentage
}

fn default_steady_state_limit() -> usize {
    EvolutionParams::default().steady_state_limit
}

fn default_max_generations() -> usize {
    EvolutionParams::default().max_generations
}

fn default_true() -> bool {
    true
}

fn default_checkpoint() -> String {
    DEFAULT_CHECKPOINT.to_string()
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn default_log_json() -> String {
    DEFAULT_LOG_JSON.to_string()
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: message.into(),
    }
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

fn validate_path(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "path must not be empty"));
    }
    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub results_dir: PathBuf,
    pub checkpoint: PathBuf,
    pub log_json: PathBuf,
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
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
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

    const BASIC_YAML: &str = r#"
run_id: "nightly_01"
session:
  command: "./server/run.sh"
  args: ["--players", "{players}", "--listen", "{address}"]
  address: "127.0.0.1:4040"
game:
  players: 3
fitness:
  episodes: 2
  seed: 99
evolution:
  mutation_rate: 0.5
  max_generations: 20
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: EvolutionConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.game.players, 3);
        assert_eq!(cfg.fitness.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cfg.evolution.offspring_per_parent, 10);
        assert_eq!(cfg.evolution.steady_state_limit, 5);
        assert!(cfg.evolution.resume);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let paths = cfg.resolved_paths();
        assert_eq!(paths.results_dir, PathBuf::from("outputs/nightly_01/results"));
        assert_eq!(paths.checkpoint, PathBuf::from("outputs/best_strategy.txt"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let mut cfg: EvolutionConfig = serde_yaml::from_str("{}").expect("parse yaml");
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg, EvolutionConfig::default());
        let params = cfg.evolution.params(24);
        assert_eq!(params.population_size, 12);
        assert_eq!(params.max_generations, 100);
        assert_eq!(cfg.fitness.episodes, 4);
    }

    #[test]
    fn rejects_out_of_range_tunables() {
        let mut cfg = EvolutionConfig::default();
        cfg.evolution.mutation_rate = 1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::InvalidField { ref field, .. }) if field == "evolution.mutation_rate"
        ));

        let mut cfg = EvolutionConfig::default();
        cfg.game.players = 6;
        assert!(cfg.validate().is_err());

        let mut cfg = EvolutionConfig::default();
        cfg.evolution.survivor_percentage = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_malformed_address_and_run_id() {
        let mut cfg = EvolutionConfig::default();
        cfg.session.address = "localhost".into();
        assert!(cfg.validate().is_err());

        let mut cfg = EvolutionConfig::default();
        cfg.run_id = "bad id".into();
        assert!(cfg.validate().is_err());
    }
}
