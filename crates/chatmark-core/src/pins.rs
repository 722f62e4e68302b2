//! Pin index: the messages whose correctness equals [`PIN_THRESHOLD`].
//!
//! The index is a derived view over a [`MessageStore`]. It holds positions,
//! never copies, and must be recomputed after any store mutation that can
//! change membership (insert, delete, correctness or title change).

use crate::message::Message;
use crate::store::MessageStore;

/// Correctness score at which a message becomes a pin.
pub const PIN_THRESHOLD: i64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinIndex {
    positions: Vec<usize>,
}

impl PinIndex {
    /// Build an index from scratch.
    pub fn build(store: &MessageStore) -> Self {
        let mut index = Self::default();
        index.recompute(store);
        index
    }

    pub fn recompute(&mut self, store: &MessageStore) {
        self.positions = store
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.is_pinned())
            .map(|(pos, _)| pos)
            .collect();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Pinned messages in conversation order.
    ///
    /// `store` must be the store this index was last recomputed from.
    pub fn resolve<'a>(&'a self, store: &'a MessageStore) -> impl Iterator<Item = &'a Message> + 'a {
        self.positions.iter().filter_map(|&pos| store.at(pos))
    }
}
