use crate::error::Result;
use crate::streaming::MessageStream;
use crate::types::Message;
use async_trait::async_trait;

/// Translates history into one provider's wire protocol and back.
///
/// Both calls read the system prompt fresh on every invocation. The streaming call builds
/// its request up front, so the returned stream does not borrow `history`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short provider name, for logs
    fn name(&self) -> &'static str;

    /// Non-streaming call, normalized into one assistant message
    async fn invoke(&self, history: &[Message], system_prompt: Option<&str>) -> Result<Message>;

    /// Streaming call: one update per wire event that carries new text
    async fn invoke_stream(
        &self,
        history: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<MessageStream>;
}
