//! Turn driver: feed the request in, drain replies out

use super::group::Orchestrator;
use super::message::ChatMessage;
use crate::llm::LlmError;
use futures::{Stream, TryStreamExt};
use std::pin::pin;

/// Replies from `orchestrator` as a stream, ending when it yields `None`
pub fn response_stream<O>(
    orchestrator: &mut O,
) -> impl Stream<Item = Result<ChatMessage, LlmError>> + '_
where
    O: Orchestrator + ?Sized,
{
    futures::stream::try_unfold(orchestrator, |orchestrator| async move {
        let next = orchestrator.next_response().await?;
        Ok::<_, LlmError>(next.map(|message| (message, orchestrator)))
    })
}

/// Post `input` as the user's message and collect every reply in order.
///
/// `on_response` sees each reply as it arrives. Orchestrator failures are
/// returned as-is; nothing is retried.
pub async fn run_pipeline<O, F>(
    orchestrator: &mut O,
    input: &str,
    mut on_response: F,
) -> Result<Vec<ChatMessage>, LlmError>
where
    O: Orchestrator + ?Sized,
    F: FnMut(&ChatMessage),
{
    orchestrator.add_message(ChatMessage::user(input));

    let mut responses = Vec::new();
    let mut stream = pin!(response_stream(orchestrator));
    while let Some(message) = stream.try_next().await? {
        on_response(&message);
        responses.push(message);
    }

    tracing::info!(responses = responses.len(), "Conversation finished");
    Ok(responses)
}
