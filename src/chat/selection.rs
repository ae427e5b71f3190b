//! Which persona speaks next

use super::message::ChatMessage;
use super::persona::Persona;

pub trait SelectionStrategy: Send {
    /// Index into `personas` of the next speaker. `personas` is never empty.
    fn next(&mut self, personas: &[Persona], history: &[ChatMessage]) -> usize;
}

/// Round-robin in declaration order, starting with the first persona
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    next: usize,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStrategy for Sequential {
    fn next(&mut self, personas: &[Persona], _history: &[ChatMessage]) -> usize {
        let index = self.next % personas.len();
        self.next = index + 1;
        index
    }
}
