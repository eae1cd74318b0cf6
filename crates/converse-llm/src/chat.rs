use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::history::History;
use crate::traits::ProviderAdapter;
use crate::types::{Message, TurnInput};

/// Returned by [`Chat::generate`] when the reply carries no text
pub const EMPTY_REPLY: &str = "-";

/// Text fragments of one streamed reply, in arrival order
pub type ChatStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// One conversation session over a single provider.
///
/// The system prompt lives beside the history, never inside it, and is read fresh on
/// every call. Calls are serialized by `&mut self`: a streamed reply keeps the session
/// borrowed until the stream is dropped.
pub struct Chat {
    history: History,
    system_prompt: Option<String>,
    adapter: Arc<dyn ProviderAdapter>,
}

impl Chat {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            history: History::new(),
            system_prompt: None,
            adapter,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn set_system_prompt(&mut self, system_prompt: Option<String>) {
        self.system_prompt = system_prompt;
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.history.snapshot()
    }

    pub fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }

    /// Start a new conversation; system prompt and provider are kept
    pub fn reset(&mut self) {
        tracing::info!(turns = self.history.len(), "resetting conversation");
        self.history = History::new();
    }

    /// Submit a turn and stream the reply.
    ///
    /// Every update is reconciled into history before its fragment is yielded, so once the
    /// stream is exhausted the tail of history holds the complete reply. An invalid turn is
    /// dropped and the stream is empty. A provider error is yielded once and ends the
    /// stream; history then ends with the user turn or a partial reply.
    pub fn submit(&mut self, turn: impl Into<TurnInput>) -> ChatStream<'_> {
        let turn = turn.into();

        Box::pin(async_stream::stream! {
            if !self.history.add(turn) {
                return;
            }

            let adapter = Arc::clone(&self.adapter);
            tracing::debug!(
                provider = adapter.name(),
                turns = self.history.len(),
                "invoking provider (streaming)"
            );

            let mut updates = match adapter
                .invoke_stream(self.history.turns(), self.system_prompt.as_deref())
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!(provider = adapter.name(), error = %e, "streaming invocation failed");
                    yield Err(e);
                    return;
                }
            };

            while let Some(update) = updates.next().await {
                match update {
                    Ok(update) => {
                        self.history.reconcile(update.message);
                        yield Ok(update.fragment);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Submit a turn and wait for the complete reply.
    ///
    /// Returns the reply's first text item, or [`EMPTY_REPLY`] when there is none. A reply
    /// without content is not recorded in history.
    pub async fn generate(&mut self, turn: impl Into<TurnInput>) -> Result<String> {
        if !self.history.add(turn) {
            return Ok(EMPTY_REPLY.to_string());
        }

        tracing::debug!(
            provider = self.adapter.name(),
            turns = self.history.len(),
            "invoking provider"
        );
        let reply = self
            .adapter
            .invoke(self.history.turns(), self.system_prompt.as_deref())
            .await
            .inspect_err(|e| {
                tracing::error!(provider = self.adapter.name(), error = %e, "invocation failed");
            })?;

        let text = reply.text().map(str::to_string);
        if reply.content().is_empty() {
            tracing::warn!(provider = self.adapter.name(), "provider returned an empty reply");
        } else {
            self.history.append(reply);
        }

        Ok(text.unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }
}
