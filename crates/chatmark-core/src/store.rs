//! Local message sequence: the canonical, ordered conversation view.
//!
//! The external store is the durable source of truth; this is a best-effort
//! cache reconciled as responses arrive.

use crate::message::{Message, MessageId};
use crate::session::Ticket;

#[derive(Debug, Clone)]
struct Entry {
    message: Message,
    /// Set while the record exists only locally, awaiting the create
    /// request issued under this ticket.
    unconfirmed: Option<Ticket>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    entries: Vec<Entry>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut store = Self::new();
        store.replace_all(messages);
        store
    }

    /// Replace the whole sequence, dropping any local-only records.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.entries = messages
            .into_iter()
            .map(|message| Entry {
                message,
                unconfirmed: None,
            })
            .collect();
    }

    /// Append a record confirmed by the store.
    pub fn push(&mut self, message: Message) {
        self.entries.push(Entry {
            message,
            unconfirmed: None,
        });
    }

    /// Append a record that is still awaiting the create issued as `ticket`.
    pub fn push_unconfirmed(&mut self, message: Message, ticket: Ticket) {
        self.entries.push(Entry {
            message,
            unconfirmed: Some(ticket),
        });
    }

    /// Swap the local-only record created under `ticket` for the store's copy.
    ///
    /// Returns `false` if that record is gone (e.g. a reload replaced it).
    pub fn confirm(&mut self, ticket: Ticket, message: Message) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.unconfirmed == Some(ticket))
        {
            Some(entry) => {
                entry.message = message;
                entry.unconfirmed = None;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.iter().find(|m| m.id.as_ref() == Some(id))
    }

    pub fn get_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.entries
            .iter_mut()
            .map(|e| &mut e.message)
            .find(|m| m.id.as_ref() == Some(id))
    }

    /// Record at `pos` in conversation order.
    pub fn at(&self, pos: usize) -> Option<&Message> {
        self.entries.get(pos).map(|e| &e.message)
    }

    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.message.id.as_ref() == Some(id))?;
        Some(self.entries.remove(pos).message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records not yet confirmed by the store.
    pub fn unconfirmed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.unconfirmed.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Correctness, Side};

    fn stored(id: &str, text: &str) -> Message {
        Message {
            id: Some(MessageId::from(id)),
            text: text.into(),
            side: Side::Left,
            correctness: Correctness::Unset,
            title: None,
        }
    }

    #[test]
    fn lookup_and_remove_by_id() {
        let mut store = MessageStore::from_messages(vec![stored("1", "one"), stored("2", "two")]);
        assert_eq!(store.get(&MessageId::from("2")).unwrap().text, "two");

        let removed = store.remove(&MessageId::from("1")).unwrap();
        assert_eq!(removed.text, "one");
        assert_eq!(store.len(), 1);
        assert!(store.remove(&MessageId::from("1")).is_none());
    }

    #[test]
    fn unconfirmed_record_is_swapped_on_confirm() {
        let mut store = MessageStore::new();
        store.push_unconfirmed(Message::answer("draft"), Ticket::new(7));
        assert_eq!(store.unconfirmed_count(), 1);

        assert!(store.confirm(Ticket::new(7), stored("9", "draft")));
        assert_eq!(store.unconfirmed_count(), 0);
        assert!(store.get(&MessageId::from("9")).is_some());
        assert!(!store.confirm(Ticket::new(7), stored("9", "draft")));
    }

    #[test]
    fn replace_all_drops_local_records() {
        let mut store = MessageStore::new();
        store.push_unconfirmed(Message::answer("draft"), Ticket::new(1));
        store.replace_all(vec![stored("1", "one")]);
        assert_eq!(store.len(), 1);
        assert!(!store.confirm(Ticket::new(1), stored("2", "draft")));
    }
}
