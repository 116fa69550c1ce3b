use core::fmt;
use core::str::FromStr;

use crate::game::message::ClientRequest;
use crate::model::card::{MAX_VALUE, MIN_VALUE};
use crate::model::color::{Color, ParseColorError};
use crate::model::hint::Hint;
use thiserror::Error;

/// A move in its text command form: `show`, `play <i>`, `discard <i>` or
/// `hint <color|value> <destination> <payload>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Move {
    /// Neutral state refresh.
    Show,
    Play { slot: usize },
    Discard { slot: usize },
    Hint { destination: String, hint: Hint },
}

impl Move {
    pub const fn is_show(&self) -> bool {
        matches!(self, Move::Show)
    }

    /// Hand position vacated when the move is accepted.
    pub const fn vacated_slot(&self) -> Option<usize> {
        match self {
            Move::Play { slot } | Move::Discard { slot } => Some(*slot),
            Move::Show | Move::Hint { .. } => None,
        }
    }

    pub fn to_request(&self, name: &str) -> ClientRequest {
        let name = name.to_string();
        match self {
            Move::Show => ClientRequest::GetGameState { name },
            Move::Play { slot } => ClientRequest::Play { name, slot: *slot },
            Move::Discard { slot } => ClientRequest::Discard { name, slot: *slot },
            Move::Hint { destination, hint } => ClientRequest::Hint {
                name,
                destination: destination.clone(),
                hint: *hint,
            },
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Show => f.write_str("show"),
            Move::Play { slot } => write!(f, "play {slot}"),
            Move::Discard { slot } => write!(f, "discard {slot}"),
            Move::Hint {
                destination,
                hint: Hint::Color(color),
            } => write!(f, "hint color {destination} {color}"),
            Move::Hint {
                destination,
                hint: Hint::Value(value),
            } => write!(f, "hint value {destination} {value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMoveError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("invalid slot index '{0}'")]
    InvalidSlot(String),
    #[error("hint type must be 'color' or 'value', got '{0}'")]
    InvalidHintKind(String),
    #[error(transparent)]
    InvalidColor(#[from] ParseColorError),
    #[error("hint value must be between 1 and 5, got '{0}'")]
    InvalidValue(String),
    #[error("unexpected trailing input '{0}'")]
    Trailing(String),
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let command = parts.next().ok_or(ParseMoveError::Empty)?;
        let parsed = match command.to_ascii_lowercase().as_str() {
            "show" => Move::Show,
            "play" => Move::Play {
                slot: parse_slot(parts.next())?,
            },
            "discard" => Move::Discard {
                slot: parse_slot(parts.next())?,
            },
            "hint" => {
                let kind = parts.next().ok_or(ParseMoveError::MissingArgument("hint type"))?;
                let destination = parts
                    .next()
                    .ok_or(ParseMoveError::MissingArgument("hint destination"))?
                    .to_string();
                let payload = parts
                    .next()
                    .ok_or(ParseMoveError::MissingArgument("hint payload"))?;
                let hint = match kind.to_ascii_lowercase().as_str() {
                    "color" => Hint::Color(payload.parse::<Color>()?),
                    "value" => Hint::Value(parse_value(payload)?),
                    _ => return Err(ParseMoveError::InvalidHintKind(kind.to_string())),
                };
                Move::Hint { destination, hint }
            }
            _ => return Err(ParseMoveError::UnknownCommand(command.to_string())),
        };
        if let Some(extra) = parts.next() {
            return Err(ParseMoveError::Trailing(extra.to_string()));
        }
        Ok(parsed)
    }
}

fn parse_slot(raw: Option<&str>) -> Result<usize, ParseMoveError> {
    let raw = raw.ok_or(ParseMoveError::MissingArgument("slot index"))?;
    raw.parse()
        .map_err(|_| ParseMoveError::InvalidSlot(raw.to_string()))
}

fn parse_value(raw: &str) -> Result<u8, ParseMoveError> {
    match raw.parse::<u8>() {
        Ok(value) if (MIN_VALUE..=MAX_VALUE).contains(&value) => Ok(value),
        _ => Err(ParseMoveError::InvalidValue(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{Move, ParseMoveError};
    use crate::game::message::ClientRequest;
    use crate::model::color::Color;
    use crate::model::hint::Hint;

    #[test]
    fn renders_text_commands() {
        assert_eq!(Move::Show.to_string(), "show");
        assert_eq!(Move::Play { slot: 0 }.to_string(), "play 0");
        assert_eq!(Move::Discard { slot: 3 }.to_string(), "discard 3");
        let hint = Move::Hint {
            destination: "bob".into(),
            hint: Hint::Color(Color::Red),
        };
        assert_eq!(hint.to_string(), "hint color bob red");
    }

    #[test]
    fn parses_hint_commands() {
        let parsed: Move = "hint value bob 5".parse().unwrap();
        assert_eq!(
            parsed,
            Move::Hint {
                destination: "bob".into(),
                hint: Hint::Value(5)
            }
        );
        assert_eq!("PLAY 2".parse::<Move>(), Ok(Move::Play { slot: 2 }));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!("".parse::<Move>(), Err(ParseMoveError::Empty));
        assert!(matches!(
            "play x".parse::<Move>(),
            Err(ParseMoveError::InvalidSlot(_))
        ));
        assert!(matches!(
            "hint value bob 9".parse::<Move>(),
            Err(ParseMoveError::InvalidValue(_))
        ));
        assert!(matches!(
            "hint color bob mauve".parse::<Move>(),
            Err(ParseMoveError::InvalidColor(_))
        ));
        assert!(matches!(
            "discard 1 2".parse::<Move>(),
            Err(ParseMoveError::Trailing(_))
        ));
        assert!(matches!(
            "jump".parse::<Move>(),
            Err(ParseMoveError::UnknownCommand(_))
        ));
    }

    #[test]
    fn show_maps_to_state_request() {
        assert_eq!(
            Move::Show.to_request("amy"),
            ClientRequest::GetGameState { name: "amy".into() }
        );
        assert_eq!(Move::Discard { slot: 1 }.vacated_slot(), Some(1));
        assert_eq!(Move::Show.vacated_slot(), None);
    }
}
