//! When the conversation stops

use super::message::ChatMessage;
use super::persona::Persona;

/// Phrase the reviewing persona emits once the deliverable is accepted
pub const APPROVAL_SENTINEL: &str = "READY FOR USER APPROVAL";

/// Hard cap on replies per conversation
pub const DEFAULT_MAXIMUM_ITERATIONS: usize = 99;

/// True iff the most recent message contains the approval sentinel.
///
/// Earlier messages are never consulted. An empty history is not approved.
pub fn is_approved(history: &[ChatMessage]) -> bool {
    contains_sentinel(history, APPROVAL_SENTINEL)
}

fn contains_sentinel(history: &[ChatMessage], sentinel: &str) -> bool {
    history
        .last()
        .is_some_and(|message| message.content().contains(sentinel))
}

/// Decides whether the chat is finished after an agent's reply
pub trait TerminationStrategy: Send + Sync {
    fn should_terminate(&self, agent: &Persona, history: &[ChatMessage]) -> bool;

    fn maximum_iterations(&self) -> usize {
        DEFAULT_MAXIMUM_ITERATIONS
    }
}

/// Stops when the last message carries the sentinel, whoever wrote it
#[derive(Debug, Clone)]
pub struct ApprovalTermination {
    sentinel: String,
    maximum_iterations: usize,
}

impl Default for ApprovalTermination {
    fn default() -> Self {
        Self {
            sentinel: APPROVAL_SENTINEL.to_string(),
            maximum_iterations: DEFAULT_MAXIMUM_ITERATIONS,
        }
    }
}

impl ApprovalTermination {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)] // Only the default sentinel is wired into the CLI
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_maximum_iterations(mut self, maximum_iterations: usize) -> Self {
        self.maximum_iterations = maximum_iterations;
        self
    }
}

impl TerminationStrategy for ApprovalTermination {
    fn should_terminate(&self, _agent: &Persona, history: &[ChatMessage]) -> bool {
        contains_sentinel(history, &self.sentinel)
    }

    fn maximum_iterations(&self) -> usize {
        self.maximum_iterations
    }
}
