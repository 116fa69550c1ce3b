use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bot::lock::TurnLock;
use crate::bot::transport::{Transport, TransportError};
use crate::policy::{RuleContext, RulePolicy};
use hanabi_core::belief::BeliefStore;
use hanabi_core::game::command::Move;
use hanabi_core::game::message::{ClientRequest, SessionMessage};
use hanabi_core::game::result::{ResultFileError, TerminalResult};
use hanabi_core::model::view::{GameView, hand_size_for};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub name: String,
    /// Where the terminal result is written when the game ends.
    pub results_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl AgentOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results_dir: None,
            seed: None,
        }
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Lobby,
    Game,
}

/// Summary of one handled session message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub tag: &'static str,
    pub rejected: bool,
    /// The message was a hint, whoever it was addressed to.
    pub hinted: bool,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("turn lock failed: {0}")]
    Lock(#[source] io::Error),
    #[error("handshake expected connection_ok, received {0}")]
    Handshake(&'static str),
    #[error(transparent)]
    Result(#[from] ResultFileError),
}

impl AgentError {
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, AgentError::Transport(TransportError::Closed))
    }
}

/// Protocol-side state: what the session told us and how to answer it.
struct Session<T> {
    name: String,
    transport: T,
    status: AgentStatus,
    ready: bool,
    all_ready: bool,
    running: bool,
    roster: Vec<String>,
    view: Option<Arc<GameView>>,
    results_dir: Option<PathBuf>,
    result_written: bool,
}

impl<T: Transport> Session<T> {
    fn request(&mut self, request: ClientRequest) -> Result<(), TransportError> {
        self.transport.send(&request)
    }

    fn send(&mut self, mv: &Move) -> Result<(), TransportError> {
        self.transport.send(&mv.to_request(&self.name))
    }

    fn is_my_turn(&self) -> bool {
        self.view
            .as_ref()
            .is_some_and(|view| view.is_turn_of(&self.name))
    }

    fn receive(&mut self, beliefs: &mut BeliefStore) -> Result<Received, AgentError> {
        let message = match self.transport.recv() {
            Ok(message) => message,
            Err(TransportError::Decode { line, source }) => {
                event!(
                    target: "hanabi_bot::agent",
                    Level::WARN,
                    agent = %self.name,
                    %line,
                    error = %source,
                    "undecodable session message"
                );
                SessionMessage::Unknown
            }
            Err(err) => return Err(err.into()),
        };
        self.handle(message, beliefs)
    }

    fn handle(
        &mut self,
        message: SessionMessage,
        beliefs: &mut BeliefStore,
    ) -> Result<Received, AgentError> {
        let tag = message.tag();
        let rejected = message.is_rejection();
        let mut hinted = false;
        match message {
            SessionMessage::ConnectionOk
            | SessionMessage::StartRequestAccepted
            | SessionMessage::ActionValid
            | SessionMessage::MoveOk => {
                event!(target: "hanabi_bot::agent", Level::DEBUG, agent = %self.name, tag, "session ack");
            }
            SessionMessage::StartGame { players } => {
                self.request(ClientRequest::Ready {
                    name: self.name.clone(),
                })?;
                self.status = AgentStatus::Game;
                self.all_ready = true;
                beliefs.resize(hand_size_for(players.len()));
                event!(
                    target: "hanabi_bot::agent",
                    Level::INFO,
                    agent = %self.name,
                    players = ?players,
                    "game started"
                );
                self.roster = players;
            }
            SessionMessage::GameState(view) => {
                self.view = Some(Arc::new(view));
            }
            SessionMessage::Hint(notice) => {
                hinted = true;
                if notice.destination == self.name {
                    let applied = beliefs.apply_hint(&notice.positions, notice.hint);
                    event!(
                        target: "hanabi_bot::agent",
                        Level::INFO,
                        agent = %self.name,
                        source = %notice.source,
                        hint = %notice.hint,
                        applied,
                        "received hint"
                    );
                }
            }
            SessionMessage::ThunderStrike => {
                event!(target: "hanabi_bot::agent", Level::WARN, agent = %self.name, "storm token spent");
            }
            SessionMessage::ActionInvalid { message } | SessionMessage::InvalidData { message } => {
                event!(
                    target: "hanabi_bot::agent",
                    Level::WARN,
                    agent = %self.name,
                    tag,
                    %message,
                    "session rejected action"
                );
            }
            SessionMessage::GameOver { score, message } => {
                event!(
                    target: "hanabi_bot::agent",
                    Level::INFO,
                    agent = %self.name,
                    score,
                    %message,
                    "game over"
                );
                self.running = false;
                self.finish()?;
            }
            SessionMessage::Unknown => {
                event!(
                    target: "hanabi_bot::agent",
                    Level::WARN,
                    agent = %self.name,
                    "unknown or unimplemented message"
                );
            }
        }
        Ok(Received {
            tag,
            rejected,
            hinted,
        })
    }

    /// Writes the terminal record once, from the latest view.
    fn finish(&mut self) -> Result<(), ResultFileError> {
        if self.result_written {
            return Ok(());
        }
        let Some(dir) = self.results_dir.as_deref() else {
            return Ok(());
        };
        let view = self.view.as_deref().cloned().unwrap_or_default();
        let path = TerminalResult::from_view(&self.name, &view).write_to_dir(dir)?;
        self.result_written = true;
        event!(
            target: "hanabi_bot::agent",
            Level::DEBUG,
            agent = %self.name,
            path = %path.display(),
            "terminal result written"
        );
        Ok(())
    }
}

/// One player: beliefs and rule policy driven by session messages.
pub struct Agent<T, L> {
    session: Session<T>,
    policy: RulePolicy,
    beliefs: BeliefStore,
    lock: L,
    rng: StdRng,
}

impl<T: Transport, L: TurnLock> Agent<T, L> {
    pub fn new(options: AgentOptions, policy: RulePolicy, transport: T, lock: L) -> Self {
        let rng = options
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            session: Session {
                name: options.name,
                transport,
                status: AgentStatus::Lobby,
                ready: false,
                all_ready: false,
                running: true,
                roster: Vec::new(),
                view: None,
                results_dir: options.results_dir,
                result_written: false,
            },
            policy,
            beliefs: BeliefStore::for_players(2),
            lock,
            rng,
        }
    }

    pub fn name(&self) -> &str {
        &self.session.name
    }

    pub fn status(&self) -> AgentStatus {
        self.session.status
    }

    pub fn is_ready(&self) -> bool {
        self.session.ready
    }

    pub fn is_running(&self) -> bool {
        self.session.running
    }

    pub fn roster(&self) -> &[String] {
        &self.session.roster
    }

    pub fn view(&self) -> Option<&GameView> {
        self.session.view.as_deref()
    }

    pub fn beliefs(&self) -> &BeliefStore {
        &self.beliefs
    }

    pub fn transport(&self) -> &T {
        &self.session.transport
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Registers with the session and asks to start.
    pub fn join(&mut self) -> Result<(), AgentError> {
        let name = self.session.name.clone();
        self.session
            .request(ClientRequest::AddPlayer { name: name.clone() })?;
        let reply = self.session.receive(&mut self.beliefs)?;
        if reply.tag != SessionMessage::ConnectionOk.tag() {
            return Err(AgentError::Handshake(reply.tag));
        }
        self.session.request(ClientRequest::StartRequest { name })?;
        self.session.ready = true;
        event!(
            target: "hanabi_bot::agent",
            Level::INFO,
            agent = %self.session.name,
            "connected; waiting for other players"
        );
        Ok(())
    }

    /// Joins, then plays until the session ends the game or disconnects.
    pub fn run(&mut self) -> Result<(), AgentError> {
        self.join()?;
        while self.session.running {
            match self.step() {
                Ok(()) => {}
                Err(err) if err.is_disconnect() => {
                    event!(
                        target: "hanabi_bot::agent",
                        Level::WARN,
                        agent = %self.session.name,
                        "session closed the connection"
                    );
                    self.session.running = false;
                    self.session.finish()?;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// One loop iteration: wait for a message, poll the session, act if it is our turn.
    pub fn step(&mut self) -> Result<(), AgentError> {
        self.session.receive(&mut self.beliefs)?;
        if !self.session.running || !self.session.all_ready {
            return Ok(());
        }

        self.poll()?;

        if self.session.running && self.session.is_my_turn() {
            match self.take_turn() {
                Ok(()) => {}
                Err(err) if err.is_disconnect() => return Err(err),
                Err(err) => {
                    event!(
                        target: "hanabi_bot::agent",
                        Level::ERROR,
                        agent = %self.session.name,
                        error = %err,
                        "agent failed during its turn"
                    );
                }
            }
        }
        Ok(())
    }

    /// Sends a text command; malformed commands are dropped.
    pub fn issue_command(&mut self, command: &str) -> Result<bool, AgentError> {
        match command.parse::<Move>() {
            Ok(mv) => {
                self.session.send(&mv)?;
                Ok(true)
            }
            Err(err) => {
                event!(
                    target: "hanabi_bot::agent",
                    Level::DEBUG,
                    agent = %self.session.name,
                    command,
                    error = %err,
                    "dropping malformed command"
                );
                Ok(false)
            }
        }
    }

    fn poll(&mut self) -> Result<(), AgentError> {
        let _guard = self.lock.acquire().map_err(AgentError::Lock)?;
        self.session.send(&Move::Show)?;
        self.session.receive(&mut self.beliefs)?;
        Ok(())
    }

    fn take_turn(&mut self) -> Result<(), AgentError> {
        let _guard = self.lock.acquire().map_err(AgentError::Lock)?;
        self.session.send(&Move::Show)?;
        self.session.receive(&mut self.beliefs)?;
        if !self.session.running {
            return Ok(());
        }
        let Some(view) = self.session.view.clone() else {
            return Ok(());
        };

        let name = self.session.name.clone();
        let beliefs = self.beliefs.clone();
        let ctx = RuleContext {
            player: &name,
            view: view.as_ref(),
            beliefs: &beliefs,
        };

        let mut attempted = false;
        for proposal in self.policy.proposals(&ctx, &mut self.rng) {
            attempted = true;
            event!(
                target: "hanabi_bot::agent",
                Level::INFO,
                agent = %name,
                rule = proposal.rule.name(),
                command = %proposal.mv,
                "sending move"
            );
            self.session.send(&proposal.mv)?;
            let reply = self.session.receive(&mut self.beliefs)?;
            if !reply.rejected {
                if let Some(slot) = proposal.mv.vacated_slot() {
                    self.beliefs.reset(slot);
                }
                return Ok(());
            }
            if !self.session.running {
                return Ok(());
            }
        }

        if !attempted {
            event!(
                target: "hanabi_bot::agent",
                Level::DEBUG,
                agent = %name,
                "every rule declined; refreshing"
            );
            self.session.send(&Move::Show)?;
            self.session.receive(&mut self.beliefs)?;
        }
        Ok(())
    }
}
