use crate::model::card::Card;
use crate::model::color::Color;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Information revealed by a hint: every matching card in the destination hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hint {
    Color(Color),
    Value(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintKind {
    Color,
    Value,
}

impl HintKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            HintKind::Color => "color",
            HintKind::Value => "value",
        }
    }
}

impl Hint {
    pub const fn kind(self) -> HintKind {
        match self {
            Hint::Color(_) => HintKind::Color,
            Hint::Value(_) => HintKind::Value,
        }
    }

    /// The hint of the given kind that would point at `card`.
    pub const fn about(kind: HintKind, card: &Card) -> Self {
        match kind {
            HintKind::Color => Hint::Color(card.color),
            HintKind::Value => Hint::Value(card.value),
        }
    }

    pub fn matches(self, card: &Card) -> bool {
        match self {
            Hint::Color(color) => card.color == color,
            Hint::Value(value) => card.value == value,
        }
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hint::Color(color) => write!(f, "color {color}"),
            Hint::Value(value) => write!(f, "value {value}"),
        }
    }
}
