use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use hanabi_bot::policy::Genome;
use hanabi_core::game::result::TerminalResult;
use tracing::{Level, event};

use super::{EpisodeError, EpisodeOutcome, EpisodeRunner};
use crate::config::{EvolutionConfig, ResolvedPaths};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long the session may linger once every agent has exited.
const SESSION_GRACE: Duration = Duration::from_secs(2);
const LOCK_FILE: &str = "turn.lock";

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOptions {
    pub session_command: String,
    pub session_args: Vec<String>,
    pub address: String,
    pub startup_delay: Duration,
    pub players: usize,
    pub agent_command: PathBuf,
    pub results_dir: PathBuf,
    pub timeout: Duration,
    pub seed: u64,
}

impl ProcessOptions {
    /// `agent_command` is used unless the config names its own agent executable.
    pub fn from_config(config: &EvolutionConfig, paths: &ResolvedPaths, agent_command: PathBuf) -> Self {
        Self {
            session_command: config.session.command.clone(),
            session_args: config.session.args.clone(),
            address: config.session.address.clone(),
            startup_delay: config.session.startup_delay(),
            players: config.game.players,
            agent_command: config.session.agent_command.clone().unwrap_or(agent_command),
            results_dir: paths.results_dir.clone(),
            timeout: config.fitness.timeout(),
            seed: config.fitness.seed.unwrap_or_else(rand::random),
        }
    }
}

/// Launches one session process and one agent process per seat.
pub struct ProcessEpisodeRunner {
    options: ProcessOptions,
}

struct Launched {
    name: String,
    child: Child,
}

impl ProcessEpisodeRunner {
    pub fn new(options: ProcessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    pub fn episode_dir(&self, episode: usize) -> PathBuf {
        self.options.results_dir.join(format!("episode-{episode:06}"))
    }

    fn prepare_dir(dir: &Path) -> Result<(), EpisodeError> {
        let workspace_err = |source| EpisodeError::Workspace {
            source,
            path: dir.to_path_buf(),
        };
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(workspace_err)?;
        }
        fs::create_dir_all(dir).map_err(workspace_err)
    }

    fn log_stdio(dir: &Path, name: &str) -> Result<(Stdio, Stdio), EpisodeError> {
        let path = dir.join(format!("{name}.log"));
        let workspace_err = |source| EpisodeError::Workspace {
            source,
            path: path.clone(),
        };
        let out = File::create(&path).map_err(workspace_err)?;
        let err = out.try_clone().map_err(workspace_err)?;
        Ok((Stdio::from(out), Stdio::from(err)))
    }

    fn spawn_session(&self, dir: &Path, seed: u64) -> Result<Launched, EpisodeError> {
        let players = self.options.players.to_string();
        let seed = seed.to_string();
        let episode_dir = dir.display().to_string();
        let substitutions = [
            ("{players}", players.as_str()),
            ("{address}", self.options.address.as_str()),
            ("{seed}", seed.as_str()),
            ("{episode_dir}", episode_dir.as_str()),
        ];
        let args = expand_args(&self.options.session_args, &substitutions);
        let (stdout, stderr) = Self::log_stdio(dir, "session")?;
        let child = Command::new(&self.options.session_command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| EpisodeError::Spawn {
                what: format!("session `{}`", self.options.session_command),
                source,
            })?;
        Ok(Launched {
            name: "session".to_string(),
            child,
        })
    }

    fn spawn_agent(&self, dir: &Path, genome: &Genome, seat: usize, seed: u64) -> Result<Launched, EpisodeError> {
        let name = format!("agent-{seat}");
        let (stdout, stderr) = Self::log_stdio(dir, &name)?;
        let child = Command::new(&self.options.agent_command)
            .arg("agent")
            .args(["--name", name.as_str()])
            .args(["--address", self.options.address.as_str()])
            .arg("--genome")
            .arg(genome.to_string())
            .arg("--results-dir")
            .arg(dir)
            .arg("--lock-file")
            .arg(dir.join(LOCK_FILE))
            .arg("--seed")
            .arg(seed.wrapping_add(seat as u64 + 1).to_string())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| EpisodeError::Spawn {
                what: name.clone(),
                source,
            })?;
        Ok(Launched { name, child })
    }

    fn join_agents(agents: &mut [Launched], deadline: Instant, timeout: Duration) -> Result<(), EpisodeError> {
        for agent in agents.iter_mut() {
            let status = wait_with_deadline(&mut agent.child, deadline).map_err(|source| {
                EpisodeError::Wait {
                    what: agent.name.clone(),
                    source,
                }
            })?;
            match status {
                Some(status) if !status.success() => {
                    event!(
                        target: "hanabi_evolve::fitness",
                        Level::WARN,
                        agent = %agent.name,
                        %status,
                        "agent exited unsuccessfully"
                    );
                }
                Some(_) => {}
                None => return Err(EpisodeError::Timeout(timeout)),
            }
        }
        Ok(())
    }

    fn collect_results(&self, dir: &Path) -> Vec<TerminalResult> {
        (0..self.options.players)
            .filter_map(|seat| {
                let name = format!("agent-{seat}");
                match TerminalResult::read_from_dir(dir, &name) {
                    Ok(result) => Some(result),
                    Err(err) => {
                        event!(
                            target: "hanabi_evolve::fitness",
                            Level::WARN,
                            agent = %name,
                            error = %err,
                            "missing terminal result"
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

impl EpisodeRunner for ProcessEpisodeRunner {
    fn run_episode(&mut self, genome: &Genome, episode: usize) -> Result<EpisodeOutcome, EpisodeError> {
        let dir = self.episode_dir(episode);
        Self::prepare_dir(&dir)?;
        let seed = self.options.seed.wrapping_add((episode as u64).wrapping_mul(1_000));

        let mut session = self.spawn_session(&dir, seed)?;
        if !self.options.startup_delay.is_zero() {
            thread::sleep(self.options.startup_delay);
        }

        let mut agents = Vec::with_capacity(self.options.players);
        for seat in 0..self.options.players {
            match self.spawn_agent(&dir, genome, seat, seed) {
                Ok(agent) => agents.push(agent),
                Err(err) => {
                    kill_all(&mut agents);
                    kill(&mut session);
                    return Err(err);
                }
            }
        }
        event!(
            target: "hanabi_evolve::fitness",
            Level::DEBUG,
            episode,
            dir = %dir.display(),
            agents = agents.len(),
            "episode launched"
        );

        let deadline = Instant::now() + self.options.timeout;
        if let Err(err) = Self::join_agents(&mut agents, deadline, self.options.timeout) {
            kill_all(&mut agents);
            kill(&mut session);
            return Err(err);
        }

        let grace = deadline.min(Instant::now() + SESSION_GRACE);
        match wait_with_deadline(&mut session.child, grace) {
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => kill(&mut session),
        }

        let results = self.collect_results(&dir);
        EpisodeOutcome::from_results(&results).ok_or(EpisodeError::NoResults)
    }
}

/// Polls `child` until it exits or `deadline` passes; `Ok(None)` means still running.
pub fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn kill(launched: &mut Launched) {
    if let Err(err) = launched.child.kill() {
        event!(
            target: "hanabi_evolve::fitness",
            Level::DEBUG,
            process = %launched.name,
            error = %err,
            "kill failed"
        );
    }
    let _ = launched.child.wait();
}

fn kill_all(launched: &mut [Launched]) {
    for process in launched {
        kill(process);
    }
}

fn expand_args(args: &[String], substitutions: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            substitutions
                .iter()
                .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
        })
        .collect()
}
