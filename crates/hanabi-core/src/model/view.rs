use std::collections::BTreeSet;

use crate::model::card::Card;
use crate::model::color::Color;
use crate::model::table::Table;
use serde::{Deserialize, Serialize};

/// A player's entry in the roster together with the hand others can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHand {
    pub name: String,
    #[serde(default)]
    pub hand: Vec<Card>,
}

impl PlayerHand {
    pub fn new(name: impl Into<String>, hand: Vec<Card>) -> Self {
        Self {
            name: name.into(),
            hand,
        }
    }

    pub fn colors(&self) -> BTreeSet<Color> {
        self.hand.iter().map(|card| card.color).collect()
    }

    pub fn values(&self) -> BTreeSet<u8> {
        self.hand.iter().map(|card| card.value).collect()
    }
}

/// Snapshot of the session state as last pushed to an agent.
///
/// Never patched in place: a fresh push replaces the whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    pub current_player: String,
    #[serde(default)]
    pub players: Vec<PlayerHand>,
    #[serde(default)]
    pub table: Table,
    #[serde(default)]
    pub discard_pile: Vec<Card>,
    #[serde(default)]
    pub used_note_tokens: u8,
    #[serde(default)]
    pub used_storm_tokens: u8,
}

/// Hand size dealt for a table of `players`.
pub const fn hand_size_for(players: usize) -> usize {
    if players >= 4 { 4 } else { 5 }
}

impl GameView {
    pub fn hand_size(&self) -> usize {
        hand_size_for(self.players.len())
    }

    pub fn player(&self, name: &str) -> Option<&PlayerHand> {
        self.players.iter().find(|player| player.name == name)
    }

    pub fn hand_of(&self, name: &str) -> Option<&[Card]> {
        self.player(name).map(|player| player.hand.as_slice())
    }

    /// Every player except `me`, in roster order.
    pub fn others<'a>(&'a self, me: &'a str) -> impl Iterator<Item = &'a PlayerHand> + 'a {
        self.players.iter().filter(move |player| player.name != me)
    }

    /// The player seated after `me`, wrapping around the roster.
    pub fn next_player_after(&self, me: &str) -> Option<&PlayerHand> {
        let index = self.players.iter().position(|player| player.name == me)?;
        let next = &self.players[(index + 1) % self.players.len()];
        (next.name != me).then_some(next)
    }

    /// Cards whose faces `me` can see: the table, the discard pile and other hands.
    pub fn visible_cards_excluding<'a>(&'a self, me: &'a str) -> impl Iterator<Item = &'a Card> + 'a {
        self.table
            .cards()
            .chain(self.discard_pile.iter())
            .chain(self.others(me).flat_map(|player| player.hand.iter()))
    }

    pub fn is_turn_of(&self, name: &str) -> bool {
        self.current_player == name
    }
}

#[cfg(test)]
mod tests {
    use super::{GameView, PlayerHand, hand_size_for};
    use crate::model::card::Card;
    use crate::model::color::Color;

    fn view() -> GameView {
        GameView {
            current_player: "alice".into(),
            players: vec![
                PlayerHand::new("alice", Vec::new()),
                PlayerHand::new("bob", vec![Card::new(0, Color::Red, 1), Card::new(12, Color::Blue, 3)]),
                PlayerHand::new("carol", vec![Card::new(40, Color::White, 1)]),
            ],
            discard_pile: vec![Card::new(9, Color::Red, 5)],
            ..GameView::default()
        }
    }

    #[test]
    fn hand_size_shrinks_for_large_tables() {
        assert_eq!(hand_size_for(2), 5);
        assert_eq!(hand_size_for(3), 5);
        assert_eq!(hand_size_for(4), 4);
        assert_eq!(view().hand_size(), 5);
    }

    #[test]
    fn next_player_wraps_around() {
        let view = view();
        assert_eq!(view.next_player_after("alice").map(|p| p.name.as_str()), Some("bob"));
        assert_eq!(view.next_player_after("carol").map(|p| p.name.as_str()), Some("alice"));
        assert!(view.next_player_after("dave").is_none());
    }

    #[test]
    fn visible_cards_skip_own_hand() {
        let view = view();
        assert_eq!(view.visible_cards_excluding("alice").count(), 4);
        assert_eq!(view.visible_cards_excluding("bob").count(), 2);
        assert_eq!(view.others("alice").count(), 2);
    }

    #[test]
    fn hand_colors_and_values_are_collected() {
        let view = view();
        let bob = view.player("bob").unwrap();
        assert!(bob.colors().contains(&Color::Blue));
        assert!(bob.values().contains(&3));
        assert!(!bob.values().contains(&2));
    }

    #[test]
    fn decodes_with_missing_optional_fields() {
        let view: GameView = serde_json::from_str(r#"{"current_player":"bob"}"#).unwrap();
        assert!(view.is_turn_of("bob"));
        assert_eq!(view.used_note_tokens, 0);
        assert!(view.players.is_empty());
    }
}
