use crate::types::{Message, TurnInput};

/// Ordered conversation log. Insertion order is conversation order; turns are never
/// reordered or removed, only the tail may be replaced by [`History::reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    turns: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn unconditionally
    pub fn append(&mut self, turn: Message) {
        self.turns.push(turn);
    }

    /// Replace the tail when it has the same role as `candidate`, otherwise append.
    ///
    /// A streamed reply is folded in this way: every chunk carries the full text so far,
    /// and overwrites the in-progress turn instead of adding another one.
    pub fn reconcile(&mut self, candidate: Message) {
        match self.turns.last_mut() {
            Some(last) if last.role() == candidate.role() => *last = candidate,
            _ => self.turns.push(candidate),
        }
    }

    /// Validate caller input and append it.
    ///
    /// Invalid input is logged and dropped; returns whether the turn was added.
    pub fn add(&mut self, input: impl Into<TurnInput>) -> bool {
        match Message::from_input(input) {
            Ok(turn) => {
                self.turns.push(turn);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping invalid turn");
                false
            }
        }
    }

    /// Owned copy of the conversation, safe to render or serialize
    pub fn snapshot(&self) -> Vec<Message> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
