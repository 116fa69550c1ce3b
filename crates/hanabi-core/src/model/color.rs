use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Blue = 1,
    Green = 2,
    Yellow = 3,
    White = 4,
}

impl Color {
    pub const ALL: [Color; 5] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::White,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Color::Red),
            1 => Some(Color::Blue),
            2 => Some(Color::Green),
            3 => Some(Color::Yellow),
            4 => Some(Color::White),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::White => "white",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown color '{0}'")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::ALL
            .iter()
            .copied()
            .find(|color| color.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseColorError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn parses_case_insensitive_names() {
        assert_eq!("Red".parse::<Color>(), Ok(Color::Red));
        assert_eq!(" white ".parse::<Color>(), Ok(Color::White));
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn from_index_follows_fixed_order() {
        assert_eq!(Color::from_index(3), Some(Color::Yellow));
        assert_eq!(Color::from_index(5), None);
        for color in Color::ALL {
            assert_eq!(Color::from_index(color.index()), Some(color));
        }
    }
}
