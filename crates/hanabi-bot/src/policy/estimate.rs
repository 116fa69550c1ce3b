use hanabi_core::belief::KnowledgeSlot;
use hanabi_core::model::deck::DeckModel;
use hanabi_core::model::table::Table;
use hanabi_core::model::view::GameView;

/// Cards `me` cannot see: the full deck minus the table, the discard pile and other hands.
pub fn unaccounted_cards(view: &GameView, me: &str) -> DeckModel {
    DeckModel::full().without(view.visible_cards_excluding(me))
}

/// Probability that the card behind `slot` is playable, given the unaccounted pool.
///
/// Zero when no remaining card is consistent with the slot's knowledge.
pub fn playability(slot: &KnowledgeSlot, pool: &DeckModel, table: &Table) -> f64 {
    let consistent = pool.consistent(slot.color, slot.value);
    if consistent == 0 {
        return 0.0;
    }
    let playable = pool.playable_consistent(slot.color, slot.value, table);
    playable as f64 / consistent as f64
}

#[cfg(test)]
mod tests {
    use super::{playability, unaccounted_cards};
    use hanabi_core::belief::KnowledgeSlot;
    use hanabi_core::model::card::Card;
    use hanabi_core::model::color::Color;
    use hanabi_core::model::deck::DeckModel;
    use hanabi_core::model::table::Table;
    use hanabi_core::model::view::{GameView, PlayerHand};

    fn red_hint() -> KnowledgeSlot {
        KnowledgeSlot {
            color: Some(Color::Red),
            value: None,
            last_update: 1,
        }
    }

    #[test]
    fn sole_remaining_candidate_is_certain() {
        let mut discard = vec![Card::new(0, Color::Red, 1)];
        for (id, value) in [(3, 2), (4, 2), (5, 3), (6, 3), (7, 4), (8, 4), (9, 5)] {
            discard.push(Card::new(id, Color::Red, value));
        }
        let view = GameView {
            current_player: "me".into(),
            players: vec![
                PlayerHand::new("me", Vec::new()),
                PlayerHand::new("other", vec![Card::new(1, Color::Red, 1)]),
            ],
            discard_pile: discard,
            ..GameView::default()
        };
        let pool = unaccounted_cards(&view, "me");
        assert_eq!(pool.consistent(Some(Color::Red), None), 1);
        assert_eq!(playability(&red_hint(), &pool, &view.table), 1.0);
    }

    #[test]
    fn empty_candidate_set_scores_zero() {
        let pool = DeckModel::empty();
        assert_eq!(playability(&red_hint(), &pool, &Table::default()), 0.0);
    }

    #[test]
    fn unknown_slot_on_fresh_table_uses_ones_ratio() {
        let pool = DeckModel::full();
        let p = playability(&KnowledgeSlot::unknown(0), &pool, &Table::default());
        assert!((p - 15.0 / 50.0).abs() < 1e-12);
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let table: Table = [Card::new(0, Color::Blue, 1)].into_iter().collect();
        let pool = DeckModel::full();
        for color in [None, Some(Color::Blue), Some(Color::White)] {
            for value in [None, Some(1), Some(2), Some(5)] {
                let slot = KnowledgeSlot {
                    color,
                    value,
                    last_update: 0,
                };
                let p = playability(&slot, &pool, &table);
                assert!((0.0..=1.0).contains(&p), "{color:?} {value:?} -> {p}");
            }
        }
    }
}
