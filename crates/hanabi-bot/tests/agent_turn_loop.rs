use std::collections::VecDeque;

use hanabi_bot::bot::{Agent, AgentOptions, AgentStatus, LocalTurnLock, Transport, TransportError};
use hanabi_bot::policy::{Genome, RULE_COUNT, Rule, RulePolicy};
use hanabi_core::game::message::{ClientRequest, HintNotice, SessionMessage};
use hanabi_core::game::result::TerminalResult;
use hanabi_core::model::card::Card;
use hanabi_core::model::color::Color;
use hanabi_core::model::hint::Hint;
use hanabi_core::model::view::{GameView, PlayerHand};
use tempfile::tempdir;

#[derive(Default)]
struct ScriptedSession {
    incoming: VecDeque<SessionMessage>,
    sent: Vec<ClientRequest>,
}

impl ScriptedSession {
    fn new(script: Vec<SessionMessage>) -> Self {
        Self {
            incoming: script.into(),
            sent: Vec::new(),
        }
    }
}

impl Transport for ScriptedSession {
    fn send(&mut self, request: &ClientRequest) -> Result<(), TransportError> {
        self.sent.push(request.clone());
        Ok(())
    }

    fn recv(&mut self) -> Result<SessionMessage, TransportError> {
        self.incoming.pop_front().ok_or(TransportError::Closed)
    }
}

fn state(current: &str, used_note_tokens: u8) -> SessionMessage {
    SessionMessage::GameState(GameView {
        current_player: current.into(),
        players: vec![
            PlayerHand::new("alice", Vec::new()),
            PlayerHand::new(
                "bob",
                vec![Card::new(20, Color::Green, 1), Card::new(31, Color::Yellow, 2)],
            ),
        ],
        used_note_tokens,
        ..GameView::default()
    })
}

fn hint_to_alice(hint: Hint, positions: Vec<usize>) -> SessionMessage {
    SessionMessage::Hint(HintNotice {
        source: "bob".into(),
        destination: "alice".into(),
        hint,
        positions,
    })
}

fn start() -> SessionMessage {
    SessionMessage::StartGame {
        players: vec!["alice".into(), "bob".into()],
    }
}

fn show() -> ClientRequest {
    ClientRequest::GetGameState {
        name: "alice".into(),
    }
}

fn identity_policy() -> RulePolicy {
    RulePolicy::from_genome(&Genome::identity(RULE_COUNT)).expect("catalog-sized genome")
}

#[test]
fn plays_hinted_card_and_retries_after_rejection() {
    let dir = tempdir().expect("temp dir");
    let script = vec![
        SessionMessage::ConnectionOk,
        start(),
        state("bob", 2),
        hint_to_alice(Hint::Color(Color::Red), vec![0]),
        state("bob", 2),
        hint_to_alice(Hint::Value(1), vec![0]),
        state("alice", 2),
        state("alice", 2),
        SessionMessage::ActionInvalid {
            message: "not now".into(),
        },
        SessionMessage::MoveOk,
        SessionMessage::GameOver {
            score: 0,
            message: "done".into(),
        },
    ];
    let options = AgentOptions::new("alice")
        .with_results_dir(dir.path())
        .with_seed(7);
    let mut agent = Agent::new(
        options,
        identity_policy(),
        ScriptedSession::new(script),
        LocalTurnLock::default(),
    );

    agent.run().expect("agent finishes");

    assert!(!agent.is_running());
    assert_eq!(agent.status(), AgentStatus::Game);
    assert_eq!(agent.roster(), ["alice".to_string(), "bob".to_string()]);
    assert_eq!(
        agent.transport().sent,
        vec![
            ClientRequest::AddPlayer {
                name: "alice".into()
            },
            ClientRequest::StartRequest {
                name: "alice".into()
            },
            ClientRequest::Ready {
                name: "alice".into()
            },
            show(),
            show(),
            show(),
            show(),
            ClientRequest::Play {
                name: "alice".into(),
                slot: 0
            },
            ClientRequest::Play {
                name: "alice".into(),
                slot: 0
            },
        ]
    );
    assert!(agent.beliefs().slot(0).expect("slot 0").is_unidentified());
    assert_eq!(agent.lock().acquisitions(), 4);

    let result = TerminalResult::read_from_dir(dir.path(), "alice").expect("result written");
    assert_eq!(result.used_note_tokens, 2);
    assert_eq!(result.score, 0);
}

#[test]
fn declining_policy_falls_back_to_refresh() {
    let script = vec![
        SessionMessage::ConnectionOk,
        start(),
        state("alice", 0),
        state("alice", 0),
        state("alice", 0),
    ];
    let policy = RulePolicy::new(vec![Rule::DiscardOldest, Rule::DiscardUnidentified]);
    let mut agent = Agent::new(
        AgentOptions::new("alice").with_seed(1),
        policy,
        ScriptedSession::new(script),
        LocalTurnLock::default(),
    );

    agent.run().expect("disconnect ends the run cleanly");

    let sent = &agent.transport().sent;
    assert!(
        sent.iter()
            .all(|request| !matches!(request, ClientRequest::Discard { .. }))
    );
    assert_eq!(sent.iter().filter(|request| **request == show()).count(), 3);
}

fn random_rule_game(seed: u64) -> Vec<ClientRequest> {
    let mut script = vec![
        SessionMessage::ConnectionOk,
        start(),
        state("alice", 2),
        state("alice", 2),
        SessionMessage::MoveOk,
    ];
    for _ in 0..3 {
        script.extend([
            state("alice", 2),
            state("alice", 2),
            state("alice", 2),
            SessionMessage::MoveOk,
        ]);
    }
    script.push(SessionMessage::GameOver {
        score: 0,
        message: "done".into(),
    });

    let policy = RulePolicy::new(vec![Rule::PlayRandom, Rule::HintRandom]);
    let mut agent = Agent::new(
        AgentOptions::new("alice").with_seed(seed),
        policy,
        ScriptedSession::new(script),
        LocalTurnLock::default(),
    );
    agent.run().expect("agent finishes");
    agent.transport().sent.clone()
}

#[test]
fn same_seed_replays_the_same_moves() {
    let first = random_rule_game(42);
    let second = random_rule_game(42);
    assert_eq!(first, second);

    let moves = first
        .iter()
        .filter(|request| {
            matches!(
                request,
                ClientRequest::Play { .. } | ClientRequest::Discard { .. } | ClientRequest::Hint { .. }
            )
        })
        .count();
    assert_eq!(moves, 4);
}

#[test]
fn hints_for_other_players_leave_beliefs_untouched() {
    let script = vec![
        SessionMessage::ConnectionOk,
        SessionMessage::Hint(HintNotice {
            source: "alice".into(),
            destination: "bob".into(),
            hint: Hint::Value(1),
            positions: vec![0],
        }),
    ];
    let mut agent = Agent::new(
        AgentOptions::new("alice"),
        identity_policy(),
        ScriptedSession::new(script),
        LocalTurnLock::default(),
    );

    agent.run().expect("run ends on disconnect");
    assert!(agent.beliefs().slots().iter().all(|slot| slot.is_unidentified()));
    assert_eq!(agent.lock().acquisitions(), 0);
}

#[test]
fn handshake_requires_connection_ok() {
    let mut agent = Agent::new(
        AgentOptions::new("alice"),
        identity_policy(),
        ScriptedSession::new(vec![SessionMessage::MoveOk]),
        LocalTurnLock::default(),
    );
    assert!(agent.join().is_err());
    assert!(!agent.is_ready());
}

#[test]
fn malformed_commands_are_dropped() {
    let mut agent = Agent::new(
        AgentOptions::new("alice"),
        identity_policy(),
        ScriptedSession::default(),
        LocalTurnLock::default(),
    );
    assert!(!agent.issue_command("play banana").expect("no transport error"));
    assert!(agent.transport().sent.is_empty());
    assert!(agent.issue_command("hint value bob 1").expect("sent"));
    assert_eq!(
        agent.transport().sent,
        vec![ClientRequest::Hint {
            name: "alice".into(),
            destination: "bob".into(),
            hint: Hint::Value(1),
        }]
    );
}
