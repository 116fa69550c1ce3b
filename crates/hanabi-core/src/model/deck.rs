use crate::model::card::{Card, MAX_VALUE, MIN_VALUE};
use crate::model::color::Color;
use crate::model::table::Table;

/// Copies of each value per color.
pub const VALUE_MULTIPLICITY: [(u8, u8); 5] = [(1, 3), (2, 2), (3, 2), (4, 2), (5, 1)];
pub const DECK_SIZE: usize = 50;

const VALUE_SLOTS: usize = MAX_VALUE as usize;

/// The full card population with sequential ids, colors in their fixed order.
pub fn standard_cards() -> Vec<Card> {
    let mut cards = Vec::with_capacity(DECK_SIZE);
    let mut id = 0;
    for color in Color::ALL {
        for (value, copies) in VALUE_MULTIPLICITY {
            for _ in 0..copies {
                cards.push(Card::new(id, color, value));
                id += 1;
            }
        }
    }
    cards
}

/// Multiset of card faces still unaccounted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckModel {
    counts: [[u8; VALUE_SLOTS]; Color::ALL.len()],
}

impl DeckModel {
    pub fn empty() -> Self {
        Self {
            counts: [[0; VALUE_SLOTS]; Color::ALL.len()],
        }
    }

    pub fn full() -> Self {
        let mut model = Self::empty();
        for card in standard_cards() {
            if let Some(count) = model.slot_mut(card.color, card.value) {
                *count += 1;
            }
        }
        model
    }

    /// Removes one copy per card by face; faces already exhausted stay at zero.
    pub fn subtract<'a, I>(&mut self, cards: I)
    where
        I: IntoIterator<Item = &'a Card>,
    {
        for card in cards {
            if let Some(count) = self.slot_mut(card.color, card.value) {
                *count = count.saturating_sub(1);
            }
        }
    }

    pub fn without<'a, I>(mut self, cards: I) -> Self
    where
        I: IntoIterator<Item = &'a Card>,
    {
        self.subtract(cards);
        self
    }

    pub fn count(&self, color: Color, value: u8) -> usize {
        if !(MIN_VALUE..=MAX_VALUE).contains(&value) {
            return 0;
        }
        self.counts[color.index()][(value - MIN_VALUE) as usize] as usize
    }

    pub fn total(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|row| row.iter())
            .map(|&count| count as usize)
            .sum()
    }

    /// Remaining cards consistent with the optional color and value constraints.
    pub fn consistent(&self, color: Option<Color>, value: Option<u8>) -> usize {
        Self::faces(color, value)
            .map(|(color, value)| self.count(color, value))
            .sum()
    }

    /// Like [`consistent`](Self::consistent) but only counting faces playable on `table`.
    pub fn playable_consistent(
        &self,
        color: Option<Color>,
        value: Option<u8>,
        table: &Table,
    ) -> usize {
        Self::faces(color, value)
            .filter(|&(color, value)| table.is_playable(color, value))
            .map(|(color, value)| self.count(color, value))
            .sum()
    }

    fn faces(color: Option<Color>, value: Option<u8>) -> impl Iterator<Item = (Color, u8)> {
        Color::ALL
            .into_iter()
            .filter(move |c| color.is_none_or(|wanted| wanted == *c))
            .flat_map(move |c| {
                (MIN_VALUE..=MAX_VALUE)
                    .filter(move |v| value.is_none_or(|wanted| wanted == *v))
                    .map(move |v| (c, v))
            })
    }

    fn slot_mut(&mut self, color: Color, value: u8) -> Option<&mut u8> {
        if !(MIN_VALUE..=MAX_VALUE).contains(&value) {
            return None;
        }
        Some(&mut self.counts[color.index()][(value - MIN_VALUE) as usize])
    }
}
