//! Genome scoring by repeated game episodes.

mod process;

pub use process::{ProcessEpisodeRunner, ProcessOptions, wait_with_deadline};

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use hanabi_bot::policy::Genome;
use hanabi_core::game::result::TerminalResult;
use thiserror::Error;
use tracing::{Level, event};

pub trait FitnessFunction {
    fn fitness(&mut self, genome: &Genome) -> f64;
}

impl<F> FitnessFunction for F
where
    F: FnMut(&Genome) -> f64,
{
    fn fitness(&mut self, genome: &Genome) -> f64 {
        self(genome)
    }
}

/// Plays one complete game with every seat driven by `genome`.
pub trait EpisodeRunner {
    fn run_episode(&mut self, genome: &Genome, episode: usize) -> Result<EpisodeOutcome, EpisodeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    /// Best score reported by any agent.
    pub score: f64,
    pub agent_scores: Vec<(String, usize)>,
}

impl EpisodeOutcome {
    pub fn from_results(results: &[TerminalResult]) -> Option<Self> {
        let score = results.iter().map(|result| result.score).max()?;
        if let Some(first) = results.first()
            && results.iter().any(|result| result.table != first.table)
        {
            event!(
                target: "hanabi_evolve::fitness",
                Level::WARN,
                agents = results.len(),
                "agents disagree on the final table"
            );
        }
        Some(Self {
            score: score as f64,
            agent_scores: results
                .iter()
                .map(|result| (result.player.clone(), result.score))
                .collect(),
        })
    }
}

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("failed to prepare episode directory {path:?}: {source}")]
    Workspace {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
    #[error("failed to spawn {what}: {source}")]
    Spawn {
        what: String,
        #[source]
        source: io::Error,
    },
    #[error("episode did not finish within {0:?}")]
    Timeout(Duration),
    #[error("failed waiting for {what}: {source}")]
    Wait {
        what: String,
        #[source]
        source: io::Error,
    },
    #[error("no agent reported a result")]
    NoResults,
}

/// Averages episode scores; a failed episode counts as zero.
///
/// Episode indices restart at zero for every genome, so each genome meets the same seeds.
pub struct FitnessEvaluator<R> {
    runner: R,
    episodes: usize,
}

impl<R: EpisodeRunner> FitnessEvaluator<R> {
    pub fn new(runner: R, episodes: usize) -> Self {
        Self {
            runner,
            episodes: episodes.max(1),
        }
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn evaluate(&mut self, genome: &Genome) -> f64 {
        let mut total = 0.0;
        for episode in 0..self.episodes {
            match self.runner.run_episode(genome, episode) {
                Ok(outcome) => {
                    event!(
                        target: "hanabi_evolve::fitness",
                        Level::DEBUG,
                        episode,
                        score = outcome.score,
                        "episode finished"
                    );
                    total += outcome.score;
                }
                Err(err) => {
                    event!(
                        target: "hanabi_evolve::fitness",
                        Level::WARN,
                        episode,
                        genome = %genome,
                        error = %err,
                        "episode failed; scoring zero"
                    );
                }
            }
        }
        let fitness = total / self.episodes as f64;
        event!(
            target: "hanabi_evolve::fitness",
            Level::INFO,
            genome = %genome,
            fitness,
            "genome evaluated"
        );
        fitness
    }
}

impl<R: EpisodeRunner> FitnessFunction for FitnessEvaluator<R> {
    fn fitness(&mut self, genome: &Genome) -> f64 {
        self.evaluate(genome)
    }
}

#[cfg(test)]
mod tests {
    use super::{EpisodeError, EpisodeOutcome, EpisodeRunner, FitnessEvaluator};
    use hanabi_bot::policy::Genome;
    use hanabi_core::game::result::TerminalResult;
    use hanabi_core::model::card::Card;
    use hanabi_core::model::color::Color;
    use hanabi_core::model::table::Table;
    use std::time::Duration;

    struct Scripted {
        scores: Vec<Option<f64>>,
        calls: Vec<usize>,
    }

    impl EpisodeRunner for Scripted {
        fn run_episode(&mut self, _: &Genome, episode: usize) -> Result<EpisodeOutcome, EpisodeError> {
            self.calls.push(episode);
            match self.scores[episode % self.scores.len()] {
                Some(score) => Ok(EpisodeOutcome {
                    score,
                    agent_scores: Vec::new(),
                }),
                None => Err(EpisodeError::Timeout(Duration::from_secs(1))),
            }
        }
    }

    fn result(player: &str, cards: &[(Color, u8)]) -> TerminalResult {
        let table: Table = cards
            .iter()
            .enumerate()
            .map(|(id, &(color, value))| Card {
                id: id as u32,
                color,
                value,
            })
            .collect();
        TerminalResult {
            player: player.to_string(),
            score: table.score(),
            table,
            used_note_tokens: 0,
            used_storm_tokens: 0,
        }
    }

    #[test]
    fn averages_over_episodes() {
        let runner = Scripted {
            scores: vec![Some(4.0), Some(8.0)],
            calls: Vec::new(),
        };
        let mut evaluator = FitnessEvaluator::new(runner, 4);
        assert_eq!(evaluator.evaluate(&Genome::identity(24)), 6.0);
        assert_eq!(evaluator.runner().calls, vec![0, 1, 2, 3]);
        evaluator.evaluate(&Genome::identity(24));
        assert_eq!(evaluator.runner().calls[4..], [0, 1, 2, 3]);
    }

    #[test]
    fn failed_episodes_score_zero() {
        let runner = Scripted {
            scores: vec![Some(10.0), None],
            calls: Vec::new(),
        };
        let mut evaluator = FitnessEvaluator::new(runner, 2);
        assert_eq!(evaluator.evaluate(&Genome::identity(24)), 5.0);
    }

    #[test]
    fn episode_score_is_best_agent_report() {
        let a = result("agent-0", &[(Color::Red, 1), (Color::Red, 2)]);
        let b = result(
            "agent-1",
            &[(Color::Red, 1), (Color::Red, 2), (Color::Blue, 1)],
        );
        let outcome = EpisodeOutcome::from_results(&[a, b]).unwrap();
        assert_eq!(outcome.score, 3.0);
        assert_eq!(outcome.agent_scores.len(), 2);
        assert!(EpisodeOutcome::from_results(&[]).is_none());
    }
}
