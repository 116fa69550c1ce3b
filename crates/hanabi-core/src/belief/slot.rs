use crate::model::color::Color;
use crate::model::table::Table;

/// What an agent has been told about the card in one hand position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnowledgeSlot {
    pub color: Option<Color>,
    pub value: Option<u8>,
    /// Logical time of the last reset; smaller means older.
    pub last_update: u64,
}

impl KnowledgeSlot {
    pub const fn unknown(last_update: u64) -> Self {
        Self {
            color: None,
            value: None,
            last_update,
        }
    }

    pub const fn is_known(&self) -> bool {
        self.color.is_some() && self.value.is_some()
    }

    pub const fn is_unidentified(&self) -> bool {
        self.color.is_none() && self.value.is_none()
    }

    /// Only fully known cards can be judged playable.
    pub fn is_playable(&self, table: &Table) -> bool {
        match (self.color, self.value) {
            (Some(color), Some(value)) => table.is_playable(color, value),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::KnowledgeSlot;
    use crate::model::card::Card;
    use crate::model::color::Color;
    use crate::model::table::Table;

    #[test]
    fn partial_knowledge_is_never_playable() {
        let table = Table::default();
        let mut slot = KnowledgeSlot::unknown(0);
        slot.value = Some(1);
        assert!(!slot.is_known());
        assert!(!slot.is_unidentified());
        assert!(!slot.is_playable(&table));
        slot.color = Some(Color::Red);
        assert!(slot.is_playable(&table));
    }

    #[test]
    fn known_slot_follows_stack_top() {
        let table: Table = [Card::new(0, Color::Red, 1)].into_iter().collect();
        let slot = KnowledgeSlot {
            color: Some(Color::Red),
            value: Some(2),
            last_update: 3,
        };
        assert!(slot.is_playable(&table));
        let stale = KnowledgeSlot {
            value: Some(1),
            ..slot
        };
        assert!(!stale.is_playable(&table));
    }
}
