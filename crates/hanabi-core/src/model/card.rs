use crate::model::color::Color;
use core::fmt;
use serde::{Deserialize, Serialize};

pub const MIN_VALUE: u8 = 1;
pub const MAX_VALUE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub color: Color,
    pub value: u8,
}

impl Card {
    pub const fn new(id: u32, color: Color, value: u8) -> Self {
        Self { id, color, value }
    }

    /// Same face, ignoring the physical identity.
    pub fn same_face(&self, other: &Card) -> bool {
        self.color == other.color && self.value == other.value
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, Color};

    #[test]
    fn same_face_ignores_id() {
        let a = Card::new(0, Color::Red, 1);
        let b = Card::new(7, Color::Red, 1);
        let c = Card::new(0, Color::Blue, 1);
        assert!(a.same_face(&b));
        assert!(!a.same_face(&c));
    }

    #[test]
    fn display_shows_color_then_value() {
        assert_eq!(Card::new(3, Color::Green, 4).to_string(), "green 4");
    }
}
