//! Group chat orchestration
//!
//! `Orchestrator` is the boundary the turn driver consumes. `GroupChat` is a
//! minimal implementation: pick a persona, ask the chat-completion service
//! for its reply with the shared history, append, check termination.

use super::message::{AuthorRole, ChatHistory, ChatMessage};
use super::persona::Persona;
use super::selection::{SelectionStrategy, Sequential};
use super::termination::{ApprovalTermination, TerminationStrategy};
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService, SystemContent};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Source of agent replies for a conversation
#[async_trait]
pub trait Orchestrator: Send {
    /// Append a message to the shared history
    fn add_message(&mut self, message: ChatMessage);

    /// Produce the next agent reply, or `None` once the conversation is over
    async fn next_response(&mut self) -> Result<Option<ChatMessage>, LlmError>;
}

pub struct GroupChat<S = Sequential, T = ApprovalTermination> {
    id: Uuid,
    personas: Vec<Persona>,
    llm: Arc<dyn LlmService>,
    selection: S,
    termination: T,
    history: ChatHistory,
    iterations: usize,
    complete: bool,
    max_tokens: Option<u32>,
}

impl GroupChat {
    pub fn new(personas: Vec<Persona>, llm: Arc<dyn LlmService>) -> Self {
        Self {
            id: Uuid::new_v4(),
            personas,
            llm,
            selection: Sequential::new(),
            termination: ApprovalTermination::new(),
            history: ChatHistory::new(),
            iterations: 0,
            complete: false,
            max_tokens: None,
        }
    }
}

impl<S, T> GroupChat<S, T> {
    #[allow(dead_code)] // Round-robin is the only strategy the CLI uses
    pub fn with_selection<NewS: SelectionStrategy>(self, selection: NewS) -> GroupChat<NewS, T> {
        GroupChat {
            id: self.id,
            personas: self.personas,
            llm: self.llm,
            selection,
            termination: self.termination,
            history: self.history,
            iterations: self.iterations,
            complete: self.complete,
            max_tokens: self.max_tokens,
        }
    }

    pub fn with_termination<NewT: TerminationStrategy>(
        self,
        termination: NewT,
    ) -> GroupChat<S, NewT> {
        GroupChat {
            id: self.id,
            personas: self.personas,
            llm: self.llm,
            selection: self.selection,
            termination,
            history: self.history,
            iterations: self.iterations,
            complete: self.complete,
            max_tokens: self.max_tokens,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    #[allow(dead_code)] // Inspected by tests and available to callers
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Request for `persona`: its instructions as system prompt, then the
    /// whole history with author names attached
    fn build_request(&self, persona: &Persona) -> LlmRequest {
        let messages = self
            .history
            .iter()
            .map(|message| {
                let base = match message.role() {
                    AuthorRole::User => LlmMessage::user(message.content()),
                    AuthorRole::Assistant => LlmMessage::assistant(message.content()),
                };
                base.with_name(message.name())
            })
            .collect();

        LlmRequest {
            system: vec![SystemContent::new(persona.instructions.clone())],
            messages,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl<S, T> Orchestrator for GroupChat<S, T>
where
    S: SelectionStrategy,
    T: TerminationStrategy,
{
    fn add_message(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    async fn next_response(&mut self) -> Result<Option<ChatMessage>, LlmError> {
        if self.complete {
            return Ok(None);
        }
        if self.personas.is_empty() {
            tracing::warn!(conversation = %self.id, "No personas configured");
            self.complete = true;
            return Ok(None);
        }
        if self.iterations >= self.termination.maximum_iterations() {
            tracing::warn!(
                conversation = %self.id,
                iterations = self.iterations,
                "Maximum iterations reached without approval"
            );
            self.complete = true;
            return Ok(None);
        }

        let index = self.selection.next(&self.personas, self.history.as_slice());
        let persona = self.personas.get(index).cloned().ok_or_else(|| {
            LlmError::invalid_request(format!(
                "Selection picked persona {index} of {}",
                self.personas.len()
            ))
        })?;

        tracing::debug!(
            conversation = %self.id,
            persona = %persona.name,
            iteration = self.iterations + 1,
            "Requesting reply"
        );

        let request = self.build_request(&persona);
        let response = self.llm.complete(&request).await?;

        let message = ChatMessage::assistant(persona.name.clone(), response.content);
        self.history.push(message.clone());
        self.iterations += 1;

        if self
            .termination
            .should_terminate(&persona, self.history.as_slice())
        {
            tracing::info!(
                conversation = %self.id,
                persona = %persona.name,
                iterations = self.iterations,
                "Termination condition met"
            );
            self.complete = true;
        }

        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::default_personas;
    use crate::llm::testing::MockLlmService;
    use crate::llm::{LlmErrorKind, MessageRole};

    fn chat_with(mock: &Arc<MockLlmService>) -> GroupChat {
        GroupChat::new(default_personas(), mock.clone())
    }

    /// Always picks the same index
    struct Fixed(usize);

    impl SelectionStrategy for Fixed {
        fn next(&mut self, _personas: &[Persona], _history: &[ChatMessage]) -> usize {
            self.0
        }
    }

    #[tokio::test]
    async fn test_rotates_personas_until_approval() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_text("Requirements: four operations");
        mock.queue_text("```html\n<p>calc</p>\n```");
        mock.queue_text("READY FOR USER APPROVAL");
        mock.queue_text("never requested");

        let mut chat = chat_with(&mock);
        chat.add_message(ChatMessage::user("Build a calculator"));

        let mut names = Vec::new();
        while let Some(reply) = chat.next_response().await.unwrap() {
            names.push(reply.name().to_string());
        }

        assert_eq!(names, ["BusinessAnalyst", "SoftwareEngineer", "ProductOwner"]);
        assert!(chat.is_complete());
        assert_eq!(chat.iterations(), 3);
        assert_eq!(chat.history().len(), 4);
        assert_eq!(mock.recorded_requests().len(), 3);
        assert!(chat.next_response().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_request_carries_persona_and_history() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_text("plan");
        mock.queue_text("code");

        let mut chat = chat_with(&mock).with_max_tokens(Some(256));
        chat.add_message(ChatMessage::user("Build a calculator"));
        chat.next_response().await.unwrap();
        chat.next_response().await.unwrap();

        let requests = mock.recorded_requests();
        let personas = default_personas();

        assert_eq!(requests[0].system[0].text, personas[0].instructions);
        assert_eq!(
            requests[0].messages,
            vec![LlmMessage::user("Build a calculator").with_name("user")]
        );

        let second = &requests[1];
        assert_eq!(second.system[0].text, personas[1].instructions);
        assert_eq!(second.max_tokens, Some(256));
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[1].role, MessageRole::Assistant);
        assert_eq!(second.messages[1].name.as_deref(), Some("BusinessAnalyst"));
        assert_eq!(second.messages[1].content, "plan");
    }

    #[tokio::test]
    async fn test_stops_at_maximum_iterations() {
        let mock = Arc::new(MockLlmService::new("mock"));
        for _ in 0..5 {
            mock.queue_text("still working");
        }

        let mut chat = chat_with(&mock)
            .with_termination(ApprovalTermination::new().with_maximum_iterations(2));
        chat.add_message(ChatMessage::user("go"));

        assert!(chat.next_response().await.unwrap().is_some());
        assert!(chat.next_response().await.unwrap().is_some());
        assert!(chat.next_response().await.unwrap().is_none());
        assert!(chat.is_complete());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_error_propagates_without_appending() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_error(LlmError::auth("Authentication failed: bad key"));

        let mut chat = chat_with(&mock);
        chat.add_message(ChatMessage::user("go"));

        let err = chat.next_response().await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Auth);
        assert_eq!(chat.history().len(), 1);
        assert_eq!(chat.iterations(), 0);
        assert!(!chat.is_complete());
    }

    #[tokio::test]
    async fn test_no_personas_yields_nothing() {
        let mock = Arc::new(MockLlmService::new("mock"));
        let mut chat = GroupChat::new(Vec::new(), mock.clone());
        chat.add_message(ChatMessage::user("go"));

        assert!(chat.next_response().await.unwrap().is_none());
        assert!(mock.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_selection_is_invalid_request() {
        let mock = Arc::new(MockLlmService::new("mock"));
        let mut chat = chat_with(&mock).with_selection(Fixed(9));
        chat.add_message(ChatMessage::user("go"));

        let err = chat.next_response().await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_sentinel_from_any_persona_terminates() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_text("READY FOR USER APPROVAL, I think?");

        let mut chat = chat_with(&mock);
        chat.add_message(ChatMessage::user("go"));

        let reply = chat.next_response().await.unwrap().unwrap();
        assert_eq!(reply.name(), "BusinessAnalyst");
        assert!(chat.is_complete());
    }
}
