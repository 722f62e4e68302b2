//! Assistant answers awaiting a human approve/decline decision.

use std::collections::HashMap;

use crate::message::MessageId;

/// Per-message state of the answer workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState<'a> {
    /// No answer awaiting a decision.
    None,
    /// An answer has arrived and awaits approve or decline.
    Pending(&'a str),
}

/// At most one pending answer per message; a newer answer replaces the old.
#[derive(Debug, Clone, Default)]
pub struct PendingAnswers {
    answers: HashMap<MessageId, String>,
}

impl PendingAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: &MessageId) -> AnswerState<'_> {
        match self.answers.get(id) {
            Some(answer) => AnswerState::Pending(answer),
            None => AnswerState::None,
        }
    }

    /// Move `id` to `Pending`, returning any answer it replaced.
    pub fn insert(&mut self, id: MessageId, answer: String) -> Option<String> {
        self.answers.insert(id, answer)
    }

    /// Move `id` back to `None`, returning the answer it held.
    pub fn take(&mut self, id: &MessageId) -> Option<String> {
        self.answers.remove(id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_instead_of_queueing() {
        let id = MessageId::from("m1");
        let mut pending = PendingAnswers::new();
        assert_eq!(pending.state(&id), AnswerState::None);

        assert_eq!(pending.insert(id.clone(), "x".into()), None);
        assert_eq!(pending.insert(id.clone(), "y".into()), Some("x".into()));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.state(&id), AnswerState::Pending("y"));
    }

    #[test]
    fn take_returns_to_none() {
        let id = MessageId::from("m1");
        let mut pending = PendingAnswers::new();
        pending.insert(id.clone(), "answer".into());

        assert_eq!(pending.take(&id).as_deref(), Some("answer"));
        assert_eq!(pending.state(&id), AnswerState::None);
        assert!(pending.take(&id).is_none());
    }
}
