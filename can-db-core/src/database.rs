//! Message database
//!
//! Holds the imported messages keyed and sorted by frame ID. Imports merge:
//! the first definition of a frame ID wins and later duplicates are counted
//! and skipped, so repeated imports of overlapping files stay predictable.

use std::collections::BTreeMap;

use crate::types::Message;

/// The message database
#[derive(Debug, Default)]
pub struct MessageDatabase {
    /// Messages sorted by frame ID
    messages: BTreeMap<u32, Message>,
}

/// Result of a bulk import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportOutcome {
    /// Messages added to the database
    pub added: usize,
    /// Messages skipped because their frame ID already existed
    pub skipped: usize,
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbStats {
    /// Total number of messages
    pub num_messages: usize,
    /// Total number of signals across all messages
    pub num_signals: usize,
}

impl MessageDatabase {
    /// Create a new empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message. Returns false (and leaves the database untouched) if
    /// the frame ID is already present.
    pub fn add_message(&mut self, message: Message) -> bool {
        match self.messages.entry(message.frame_id) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(message);
                true
            }
        }
    }

    /// Merge a batch of messages, first definition wins
    pub fn merge(&mut self, batch: impl IntoIterator<Item = Message>) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();
        for message in batch {
            if self.add_message(message) {
                outcome.added += 1;
            } else {
                outcome.skipped += 1;
            }
        }

        log::info!(
            "Imported {} messages, {} already existed and were skipped",
            outcome.added,
            outcome.skipped
        );
        outcome
    }

    /// Get a message by frame ID
    pub fn get(&self, frame_id: u32) -> Option<&Message> {
        self.messages.get(&frame_id)
    }

    /// Get a mutable message by frame ID
    pub fn get_mut(&mut self, frame_id: u32) -> Option<&mut Message> {
        self.messages.get_mut(&frame_id)
    }

    /// Remove a message, returning it if present
    pub fn remove(&mut self, frame_id: u32) -> Option<Message> {
        self.messages.remove(&frame_id)
    }

    /// Iterate messages in frame ID order
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// All frame IDs, ascending
    pub fn frame_ids(&self) -> Vec<u32> {
        self.messages.keys().copied().collect()
    }

    /// Clear the database
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Database statistics
    pub fn stats(&self) -> DbStats {
        DbStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.values().map(|m| m.signals.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Signal;

    #[test]
    fn test_empty_database() {
        let db = MessageDatabase::new();
        assert_eq!(db.stats().num_messages, 0);
        assert_eq!(db.stats().num_signals, 0);
    }

    #[test]
    fn test_first_definition_wins() {
        let mut db = MessageDatabase::new();

        let mut first = Message::new(0x0F6, "DONNEES_BSI", 8);
        first.signals.push(Signal::new("T_EAU", 15, 8));
        assert!(db.add_message(first));

        let second = Message::new(0x0F6, "DONNEES_BSI_V2", 8);
        assert!(!db.add_message(second));

        assert_eq!(db.get(0x0F6).unwrap().name, "DONNEES_BSI");
        assert_eq!(db.stats().num_signals, 1);
    }

    #[test]
    fn test_merge_counts_duplicates() {
        let mut db = MessageDatabase::new();
        db.add_message(Message::new(0x0F6, "DONNEES_BSI", 8));

        let outcome = db.merge(vec![
            Message::new(0x0F6, "DONNEES_BSI", 8),
            Message::new(0x307, "COMMANDES_BSI", 8),
        ]);

        assert_eq!(outcome, ImportOutcome { added: 1, skipped: 1 });
        assert_eq!(db.stats().num_messages, 2);
    }

    #[test]
    fn test_iteration_is_sorted_by_frame_id() {
        let mut db = MessageDatabase::new();
        db.add_message(Message::new(0x307, "COMMANDES_BSI", 8));
        db.add_message(Message::new(0x0F6, "DONNEES_BSI", 8));

        assert_eq!(db.frame_ids(), vec![0x0F6, 0x307]);
    }

    #[test]
    fn test_remove() {
        let mut db = MessageDatabase::new();
        db.add_message(Message::new(0x307, "COMMANDES_BSI", 8));
        assert!(db.remove(0x307).is_some());
        assert!(db.get(0x307).is_none());
    }
}
