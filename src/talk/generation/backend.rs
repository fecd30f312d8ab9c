//! Completion backend abstraction.

use async_trait::async_trait;

use crate::talk::core::errors::TalkResult;
use crate::talk::generation::message::ChatMessage;
use crate::talk::schema::OutputSchema;

/// A chat-completion service constrained to a strict output schema.
///
/// One call to [`CompletionBackend::complete`] is one outbound request; retry and
/// correction policy belongs to the caller.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion and return the raw text payload.
    ///
    /// # Errors
    /// Returns [`crate::talk::TalkError::Generation`] when the call fails or times
    /// out, and [`crate::talk::TalkError::EmptyCompletion`] when it succeeds without content.
    async fn complete(&self, messages: &[ChatMessage], schema: &OutputSchema) -> TalkResult<String>;
}
