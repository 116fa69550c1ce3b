use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, event};

use hanabi_bot::bot::{Agent, AgentOptions, FileTurnLock, JsonLinesTransport, LocalTurnLock, TurnLock};
use hanabi_bot::policy::{Genome, RULE_COUNT, RulePolicy};
use hanabi_evolve::checkpoint::Checkpoint;
use hanabi_evolve::config::{EvolutionConfig, parse_level};
use hanabi_evolve::evolution::EvolutionEngine;
use hanabi_evolve::fitness::{FitnessEvaluator, ProcessEpisodeRunner, ProcessOptions};
use hanabi_evolve::logging::{init_agent_logging, init_logging};

/// Evolves rule priority orders for a cooperative card-game agent.
#[derive(Debug, Parser)]
#[command(
    name = "hanabi-evolve",
    author,
    version,
    about = "Genetic search over agent rule orders"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the genetic search, checkpointing every new best genome.
    Evolve(EvolveArgs),
    /// Score one genome without evolving.
    Evaluate(EvaluateArgs),
    /// Play one game as a single agent (spawned by the evaluator).
    Agent(AgentArgs),
}

#[derive(Debug, Args)]
struct EvolveArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "evolve.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the generation cap.
    #[arg(long, value_name = "COUNT")]
    generations: Option<usize>,

    /// Override the number of episodes per evaluation.
    #[arg(long, value_name = "COUNT")]
    episodes: Option<usize>,

    /// Override the search RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Ignore any existing checkpoint.
    #[arg(long)]
    fresh: bool,

    /// Exit after validating the configuration.
    #[arg(long)]
    validate_only: bool,
}

#[derive(Debug, Args)]
struct EvaluateArgs {
    #[arg(short, long, value_name = "FILE", default_value = "evolve.yaml")]
    config: PathBuf,

    /// Rule order to score; defaults to the checkpoint genome.
    #[arg(long, value_name = "GENES")]
    genome: Option<String>,

    #[arg(long, value_name = "COUNT")]
    episodes: Option<usize>,
}

#[derive(Debug, Args)]
struct AgentArgs {
    #[arg(long, default_value = "agent-0")]
    name: String,

    /// Session address, `host:port`.
    #[arg(long, default_value = "127.0.0.1:1024")]
    address: String,

    /// Space or comma separated rule order.
    #[arg(long, value_name = "GENES")]
    genome: Option<String>,

    /// Checkpoint consulted when no genome is given.
    #[arg(long, value_name = "FILE", default_value = "outputs/best_strategy.txt")]
    checkpoint: PathBuf,

    #[arg(long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    /// Lock file shared by every agent of the game; in-process lock when omitted.
    #[arg(long, value_name = "FILE")]
    lock_file: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Evolve(args) => evolve(args),
        Command::Evaluate(args) => evaluate(args),
        Command::Agent(args) => agent(args),
    }
}

fn load_config(path: &Path) -> Result<EvolutionConfig> {
    EvolutionConfig::from_path(path)
        .with_context(|| format!("loading configuration from {}", path.display()))
}

fn current_exe() -> Result<PathBuf> {
    std::env::current_exe().context("locating the hanabi-evolve executable for agent processes")
}

fn evolve(args: EvolveArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(run_id) = args.run_id {
        config.run_id = run_id;
    }
    if let Some(generations) = args.generations {
        config.evolution.max_generations = generations;
    }
    if let Some(episodes) = args.episodes {
        config.fitness.episodes = episodes;
    }
    if let Some(seed) = args.seed {
        config.evolution.seed = Some(seed);
    }
    if args.fresh {
        config.evolution.resume = false;
    }
    config.validate()?;

    let paths = config.resolved_paths();
    let params = config.evolution.params(RULE_COUNT);
    println!(
        "Loaded configuration '{}' ({} players, {} episodes, population {}, up to {} generations)",
        config.run_id,
        config.game.players,
        config.fitness.episodes,
        params.population_size,
        params.max_generations
    );

    if args.validate_only {
        println!("Validation-only mode: evolution skipped.");
        return Ok(());
    }

    let _logging_guard = init_logging(&config.logging, &paths.log_json)?;

    let resume = if config.evolution.resume {
        load_checkpoint(&paths.checkpoint)
    } else {
        None
    };
    if let Some(checkpoint) = resume.as_ref() {
        println!(
            "Resuming from {} (fitness {:.3})",
            paths.checkpoint.display(),
            checkpoint.fitness
        );
    }

    let runner = ProcessEpisodeRunner::new(ProcessOptions::from_config(&config, &paths, current_exe()?));
    let evaluator = FitnessEvaluator::new(runner, config.fitness.episodes);
    let mut engine =
        EvolutionEngine::new(params, evaluator, config.evolution.seed).with_checkpoint(&paths.checkpoint);
    let summary = engine.run(resume);

    println!(
        "Evolution finished after {} generation{} ({} evaluations, stop: {:?})",
        summary.generations,
        if summary.generations == 1 { "" } else { "s" },
        summary.evaluations,
        summary.stop
    );
    match summary.best {
        Some(best) => {
            println!("Best fitness: {:.3}", best.fitness);
            println!("Best genome: {}", best.genome);
            println!("Checkpoint: {}", paths.checkpoint.display());
        }
        None => println!("No genome was evaluated."),
    }
    Ok(())
}

fn evaluate(args: EvaluateArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(episodes) = args.episodes {
        config.fitness.episodes = episodes;
    }
    config.validate()?;
    let paths = config.resolved_paths();
    let _logging_guard = init_logging(&config.logging, &paths.log_json)?;

    let genome = match args.genome {
        Some(raw) => parse_genome(&raw)?,
        None => load_checkpoint(&paths.checkpoint)
            .map(|checkpoint| checkpoint.genome)
            .unwrap_or_else(|| Genome::identity(RULE_COUNT)),
    };

    let runner = ProcessEpisodeRunner::new(ProcessOptions::from_config(&config, &paths, current_exe()?));
    let mut evaluator = FitnessEvaluator::new(runner, config.fitness.episodes);
    let fitness = evaluator.evaluate(&genome);
    println!("Genome: {genome}");
    println!(
        "Fitness over {} episode{}: {fitness:.3}",
        evaluator.episodes(),
        if evaluator.episodes() == 1 { "" } else { "s" }
    );
    Ok(())
}

fn agent(args: AgentArgs) -> Result<()> {
    init_agent_logging(parse_level(&args.log_level).unwrap_or(Level::INFO));

    let genome = match args.genome.as_deref() {
        Some(raw) => parse_genome(raw)?,
        None => load_checkpoint(&args.checkpoint)
            .map(|checkpoint| checkpoint.genome)
            .unwrap_or_else(|| Genome::identity(RULE_COUNT)),
    };
    let policy = RulePolicy::from_genome(&genome).context("building rule policy")?;

    let mut options = AgentOptions::new(args.name.clone());
    if let Some(dir) = args.results_dir {
        options = options.with_results_dir(dir);
    }
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }

    let transport = JsonLinesTransport::connect(args.address.as_str())
        .with_context(|| format!("connecting to session at {}", args.address))?;

    match args.lock_file {
        Some(path) => {
            let lock = FileTurnLock::open(&path)
                .with_context(|| format!("opening turn lock {}", path.display()))?;
            play(Agent::new(options, policy, transport, lock))
        }
        None => play(Agent::new(options, policy, transport, LocalTurnLock::default())),
    }
}

fn play<L: TurnLock>(mut agent: Agent<JsonLinesTransport<std::net::TcpStream, std::net::TcpStream>, L>) -> Result<()> {
    agent
        .run()
        .with_context(|| format!("agent {} stopped", agent.name()))?;
    event!(
        target: "hanabi_bot::agent",
        Level::INFO,
        agent = %agent.name(),
        "agent finished"
    );
    Ok(())
}

fn parse_genome(raw: &str) -> Result<Genome> {
    raw.parse::<Genome>()
        .and_then(|genome| genome.expect_len(RULE_COUNT))
        .with_context(|| format!("parsing genome {raw:?}"))
}

/// Missing or unreadable checkpoints mean "start from scratch".
fn load_checkpoint(path: &Path) -> Option<Checkpoint> {
    match Checkpoint::load_existing(path) {
        Ok(checkpoint) => checkpoint.and_then(|checkpoint| {
            match checkpoint.genome.clone().expect_len(RULE_COUNT) {
                Ok(_) => Some(checkpoint),
                Err(err) => {
                    event!(
                        target: "hanabi_evolve::checkpoint",
                        Level::WARN,
                        path = %path.display(),
                        error = %err,
                        "ignoring checkpoint with the wrong rule count"
                    );
                    None
                }
            }
        }),
        Err(err) => {
            event!(
                target: "hanabi_evolve::checkpoint",
                Level::WARN,
                path = %path.display(),
                error = %err,
                "no existing strategy"
            );
            None
        }
    }
}
