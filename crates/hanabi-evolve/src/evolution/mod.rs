//! Genetic search over rule priority orders.

mod operators;

pub use operators::{random_population, survivor_count, swap_mutation, top_percent};

use std::path::PathBuf;

use hanabi_bot::policy::{Genome, RULE_COUNT};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, event};

use crate::checkpoint::Checkpoint;
use crate::fitness::FitnessFunction;

/// Score a fresh run's offspring must beat before anything is checkpointed.
pub const FRESH_BEST_FITNESS: f64 = 0.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub genome: Genome,
    pub fitness: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionParams {
    pub genome_len: usize,
    pub population_size: usize,
    pub offspring_per_parent: usize,
    /// Divided by the generation number before each generation's mutations.
    pub mutation_rate: f64,
    pub survivor_percentage: f64,
    pub steady_state_limit: usize,
    pub max_generations: usize,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            genome_len: RULE_COUNT,
            population_size: RULE_COUNT / 2,
            offspring_per_parent: 10,
            mutation_rate: 0.75,
            survivor_percentage: 10.0,
            steady_state_limit: 5,
            max_generations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SteadyState,
    GenerationCap,
    EmptyPopulation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionSummary {
    /// `None` when no offspring ever scored above zero.
    pub best: Option<Individual>,
    pub generations: usize,
    pub evaluations: usize,
    pub stop: StopReason,
}

pub struct EvolutionEngine<F> {
    params: EvolutionParams,
    fitness: F,
    checkpoint: Option<PathBuf>,
    rng: StdRng,
}

impl<F: FitnessFunction> EvolutionEngine<F> {
    pub fn new(params: EvolutionParams, fitness: F, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            params,
            fitness,
            checkpoint: None,
            rng,
        }
    }

    /// Persist every new global best to `path`.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    pub fn params(&self) -> &EvolutionParams {
        &self.params
    }

    pub fn fitness(&self) -> &F {
        &self.fitness
    }

    /// Random permutations, or copies of the resumed genome.
    pub fn initial_population(&mut self, resume: Option<&Checkpoint>) -> Vec<Genome> {
        match resume {
            Some(checkpoint) => vec![checkpoint.genome.clone(); self.params.population_size],
            None => random_population(
                self.params.population_size,
                self.params.genome_len,
                &mut self.rng,
            ),
        }
    }

    /// Runs generations until the steady-state limit or the generation cap.
    ///
    /// A resumed checkpoint seeds both the population and the best fitness to beat;
    /// a fresh run must beat [`FRESH_BEST_FITNESS`].
    pub fn run(&mut self, resume: Option<Checkpoint>) -> EvolutionSummary {
        let mut population = self.initial_population(resume.as_ref());
        let mut best_fitness = resume
            .as_ref()
            .map_or(FRESH_BEST_FITNESS, |checkpoint| checkpoint.fitness);
        let mut best = resume.map(|checkpoint| Individual {
            genome: checkpoint.genome,
            fitness: checkpoint.fitness,
        });
        let mut steady_state = 0;
        let mut generation = 0;
        let mut evaluations = 0;

        let stop = loop {
            if population.is_empty() {
                break StopReason::EmptyPopulation;
            }
            generation += 1;
            steady_state += 1;
            let rate = self.params.mutation_rate / generation as f64;

            let mut offspring =
                Vec::with_capacity(population.len() * self.params.offspring_per_parent);
            for parent in &population {
                for _ in 0..self.params.offspring_per_parent {
                    let genome = swap_mutation(parent, rate, &mut self.rng);
                    let fitness = self.fitness.fitness(&genome);
                    evaluations += 1;
                    let child = Individual { genome, fitness };
                    if fitness > best_fitness {
                        best_fitness = fitness;
                        steady_state = 0;
                        self.record_best(&child, generation);
                        best = Some(child.clone());
                    }
                    offspring.push(child);
                }
            }

            let generation_best = offspring
                .iter()
                .map(|individual| individual.fitness)
                .max_by(f64::total_cmp)
                .unwrap_or(f64::NAN);
            population = top_percent(offspring, self.params.survivor_percentage)
                .into_iter()
                .map(|individual| individual.genome)
                .collect();

            event!(
                target: "hanabi_evolve::evolution",
                Level::INFO,
                generation,
                mutation_rate = rate,
                generation_best,
                best_fitness,
                steady_state,
                survivors = population.len(),
                "generation complete"
            );

            if generation >= self.params.max_generations {
                break StopReason::GenerationCap;
            }
            if steady_state >= self.params.steady_state_limit {
                break StopReason::SteadyState;
            }
        };

        EvolutionSummary {
            best,
            generations: generation,
            evaluations,
            stop,
        }
    }

    fn record_best(&self, individual: &Individual, generation: usize) {
        event!(
            target: "hanabi_evolve::evolution",
            Level::INFO,
            generation,
            fitness = individual.fitness,
            genome = %individual.genome,
            "new best genome"
        );
        let Some(path) = self.checkpoint.as_deref() else {
            return;
        };
        let checkpoint = Checkpoint {
            genome: individual.genome.clone(),
            fitness: individual.fitness,
        };
        if let Err(err) = checkpoint.save(path) {
            event!(
                target: "hanabi_evolve::evolution",
                Level::ERROR,
                error = %err,
                "failed to persist best genome"
            );
        }
    }
}
