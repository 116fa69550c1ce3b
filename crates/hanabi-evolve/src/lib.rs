pub mod checkpoint;
pub mod config;
pub mod evolution;
pub mod fitness;
pub mod logging;

pub use checkpoint::{Checkpoint, CheckpointError};
pub use config::EvolutionConfig;
pub use evolution::{EvolutionEngine, EvolutionParams, EvolutionSummary, Individual, StopReason};
pub use fitness::{
    EpisodeError, EpisodeOutcome, EpisodeRunner, FitnessEvaluator, FitnessFunction,
    ProcessEpisodeRunner, ProcessOptions,
};
