//! Per-slot knowledge an agent holds about its own hand.
//!
//! The store only records what hints state explicitly. Inference over the
//! remaining card population lives with the rules that need it.

mod slot;

pub use slot::KnowledgeSlot;

use crate::model::hint::Hint;
use crate::model::view::hand_size_for;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeliefStore {
    slots: Vec<KnowledgeSlot>,
    clock: u64,
    last_hinted: Option<usize>,
}

impl BeliefStore {
    /// Fully unknown slots, stamped oldest-first by position.
    pub fn new(hand_size: usize) -> Self {
        let mut store = Self {
            slots: Vec::with_capacity(hand_size),
            clock: 0,
            last_hinted: None,
        };
        store.resize(hand_size);
        store
    }

    pub fn for_players(players: usize) -> Self {
        Self::new(hand_size_for(players))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[KnowledgeSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&KnowledgeSlot> {
        self.slots.get(index)
    }

    /// Position touched by the most recent hint addressed to this agent.
    pub fn last_hinted(&self) -> Option<usize> {
        self.last_hinted
    }

    /// Grows with fresh slots or truncates so there is one slot per card in hand.
    pub fn resize(&mut self, hand_size: usize) {
        self.slots.truncate(hand_size);
        while self.slots.len() < hand_size {
            let stamp = self.tick();
            self.slots.push(KnowledgeSlot::unknown(stamp));
        }
        if self.last_hinted.is_some_and(|index| index >= hand_size) {
            self.last_hinted = None;
        }
    }

    /// Forgets everything about `index`; the card drawn into it is new.
    pub fn reset(&mut self, index: usize) -> bool {
        if index >= self.slots.len() {
            return false;
        }
        let stamp = self.tick();
        self.slots[index] = KnowledgeSlot::unknown(stamp);
        if self.last_hinted == Some(index) {
            self.last_hinted = None;
        }
        true
    }

    /// Records the hinted field on every listed slot. Out-of-range positions are skipped.
    ///
    /// Returns the number of slots updated.
    pub fn apply_hint(&mut self, positions: &[usize], hint: Hint) -> usize {
        let mut applied = 0;
        for &index in positions {
            let Some(slot) = self.slots.get_mut(index) else {
                continue;
            };
            match hint {
                Hint::Color(color) => slot.color = Some(color),
                Hint::Value(value) => slot.value = Some(value),
            }
            self.last_hinted = Some(index);
            applied += 1;
        }
        applied
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::BeliefStore;
    use crate::model::color::Color;
    use crate::model::hint::Hint;

    #[test]
    fn new_store_is_fully_unidentified() {
        let store = BeliefStore::for_players(2);
        assert_eq!(store.len(), 5);
        assert!(store.slots().iter().all(|slot| slot.is_unidentified()));
        assert_eq!(BeliefStore::for_players(4).len(), 4);
    }

    #[test]
    fn apply_hint_sets_only_the_named_field() {
        let mut store = BeliefStore::new(5);
        let before = store.slot(1).unwrap().last_update;
        assert_eq!(store.apply_hint(&[1, 3], Hint::Color(Color::Red)), 2);
        let slot = store.slot(1).unwrap();
        assert_eq!(slot.color, Some(Color::Red));
        assert_eq!(slot.value, None);
        assert_eq!(slot.last_update, before);
        assert!(store.slot(0).unwrap().is_unidentified());
        assert_eq!(store.last_hinted(), Some(3));
    }

    #[test]
    fn apply_hint_ignores_out_of_range_positions() {
        let mut store = BeliefStore::new(4);
        assert_eq!(store.apply_hint(&[7], Hint::Value(2)), 0);
        assert_eq!(store.last_hinted(), None);
    }

    #[test]
    fn reset_clears_and_restamps() {
        let mut store = BeliefStore::new(5);
        store.apply_hint(&[2], Hint::Value(1));
        store.apply_hint(&[2], Hint::Color(Color::Blue));
        assert!(store.slot(2).unwrap().is_known());
        let newest = store.slots().iter().map(|s| s.last_update).max().unwrap();
        assert!(store.reset(2));
        let slot = store.slot(2).unwrap();
        assert!(slot.is_unidentified());
        assert!(slot.last_update > newest);
        assert_eq!(store.last_hinted(), None);
        assert!(!store.reset(5));
    }

    #[test]
    fn resize_keeps_existing_knowledge() {
        let mut store = BeliefStore::new(5);
        store.apply_hint(&[0], Hint::Value(5));
        store.resize(4);
        assert_eq!(store.len(), 4);
        assert_eq!(store.slot(0).unwrap().value, Some(5));
        store.resize(5);
        assert!(store.slot(4).unwrap().is_unidentified());
    }
}
