use std::collections::BTreeMap;

use crate::model::card::Card;
use crate::model::color::Color;
use serde::{Deserialize, Serialize};

/// Played cards, one ordered stack per color.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    stacks: BTreeMap<Color, Vec<Card>>,
}

impl Table {
    pub fn stack(&self, color: Color) -> &[Card] {
        self.stacks.get(&color).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest value on the color's stack, `None` while it is empty.
    pub fn top(&self, color: Color) -> Option<u8> {
        self.stack(color).iter().map(|card| card.value).max()
    }

    pub fn is_playable(&self, color: Color, value: u8) -> bool {
        match self.top(color) {
            None => value == 1,
            Some(top) => top.checked_add(1) == Some(value),
        }
    }

    pub fn accepts(&self, card: &Card) -> bool {
        self.is_playable(card.color, card.value)
    }

    pub fn push(&mut self, card: Card) {
        self.stacks.entry(card.color).or_default().push(card);
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.stacks.values().flatten()
    }

    /// Cards on the table across all stacks.
    pub fn score(&self) -> usize {
        self.stacks.values().map(Vec::len).sum()
    }
}

impl FromIterator<Card> for Table {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut table = Table::default();
        for card in iter {
            table.push(card);
        }
        table
    }
}
