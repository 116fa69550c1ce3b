use crate::model::hint::Hint;
use crate::model::view::GameView;
use serde::{Deserialize, Serialize};

/// Hint broadcast by the session; only the destination updates its beliefs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintNotice {
    pub source: String,
    pub destination: String,
    pub hint: Hint,
    pub positions: Vec<usize>,
}

/// Everything the session can push to an agent, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMessage {
    ConnectionOk,
    StartRequestAccepted,
    StartGame {
        players: Vec<String>,
    },
    GameState(GameView),
    Hint(HintNotice),
    ActionValid,
    MoveOk,
    ThunderStrike,
    ActionInvalid {
        #[serde(default)]
        message: String,
    },
    InvalidData {
        #[serde(default)]
        message: String,
    },
    GameOver {
        #[serde(default)]
        score: u32,
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl SessionMessage {
    pub const fn tag(&self) -> &'static str {
        match self {
            SessionMessage::ConnectionOk => "connection_ok",
            SessionMessage::StartRequestAccepted => "start_request_accepted",
            SessionMessage::StartGame { .. } => "start_game",
            SessionMessage::GameState(_) => "game_state",
            SessionMessage::Hint(_) => "hint",
            SessionMessage::ActionValid => "action_valid",
            SessionMessage::MoveOk => "move_ok",
            SessionMessage::ThunderStrike => "thunder_strike",
            SessionMessage::ActionInvalid { .. } => "action_invalid",
            SessionMessage::InvalidData { .. } => "invalid_data",
            SessionMessage::GameOver { .. } => "game_over",
            SessionMessage::Unknown => "unknown",
        }
    }

    /// Whether the session refused what the agent last sent.
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            SessionMessage::ActionInvalid { .. }
                | SessionMessage::InvalidData { .. }
                | SessionMessage::Unknown
        )
    }
}

/// Requests an agent sends to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    AddPlayer {
        name: String,
    },
    StartRequest {
        name: String,
    },
    Ready {
        name: String,
    },
    GetGameState {
        name: String,
    },
    Play {
        name: String,
        slot: usize,
    },
    Discard {
        name: String,
        slot: usize,
    },
    Hint {
        name: String,
        destination: String,
        hint: Hint,
    },
}
