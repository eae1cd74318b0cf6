use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::error::Result;
use crate::transport::WireStream;
use crate::types::{Content, Message, Role};

/// Newly arrived text plus the whole reply reconstructed so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUpdate {
    pub fragment: String,
    pub message: Message,
}

pub type MessageStream = Pin<Box<dyn Stream<Item = Result<StreamUpdate>> + Send>>;

/// What a single wire event contributes to the reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireDelta {
    /// Role announced before any content
    Role(Role),
    Text(String),
    /// Metadata, keep-alives, stop markers
    Skip,
}

/// Running concatenation of a streamed reply
#[derive(Debug, Clone, Default)]
pub struct StreamAccumulator {
    role: Option<Role>,
    text: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    /// Append a delta; empty deltas produce no update
    pub fn push(&mut self, delta: &str) -> Option<StreamUpdate> {
        if delta.is_empty() {
            return None;
        }
        self.text.push_str(delta);

        Some(StreamUpdate {
            fragment: delta.to_string(),
            message: self.message(),
        })
    }

    /// Reply so far; role defaults to assistant when none was announced
    pub fn message(&self) -> Message {
        Message::from_reply(
            self.role.unwrap_or(Role::Assistant),
            vec![Content::text(self.text.clone())],
        )
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Fold raw wire events into cumulative updates.
///
/// `decode` classifies one event. The first decode or transport error is yielded and ends
/// the stream; updates already yielded stay valid.
pub fn fold_wire_events<F>(events: WireStream, mut decode: F) -> MessageStream
where
    F: FnMut(&[u8]) -> Result<WireDelta> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut events = events;
        let mut acc = StreamAccumulator::new();

        while let Some(event) = events.next().await {
            let delta = match event.and_then(|bytes| decode(&bytes)) {
                Ok(delta) => delta,
                Err(e) => {
                    tracing::error!(error = %e, received = acc.text().len(), "streaming response aborted");
                    yield Err(e);
                    return;
                }
            };

            match delta {
                WireDelta::Role(role) => acc.set_role(role),
                WireDelta::Text(text) => {
                    if let Some(update) = acc.push(&text) {
                        yield Ok(update);
                    }
                }
                WireDelta::Skip => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use bytes::Bytes;

    fn wire(events: Vec<Result<&'static str>>) -> WireStream {
        Box::pin(futures::stream::iter(
            events
                .into_iter()
                .map(|e| e.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    fn plain_text(bytes: &[u8]) -> Result<WireDelta> {
        match std::str::from_utf8(bytes) {
            Ok("") => Ok(WireDelta::Skip),
            Ok(text) => Ok(WireDelta::Text(text.to_string())),
            Err(e) => Err(LlmError::Decode(e.to_string())),
        }
    }

    #[test]
    fn test_accumulator_defaults_to_assistant() {
        let mut acc = StreamAccumulator::new();
        assert!(acc.push("").is_none());

        let update = acc.push("Hi").unwrap();
        assert_eq!(update.fragment, "Hi");
        assert_eq!(update.message.role(), Role::Assistant);
        assert_eq!(update.message.text(), Some("Hi"));
    }

    #[tokio::test]
    async fn test_fold_skips_empty_events() {
        let stream = fold_wire_events(wire(vec![Ok("a"), Ok(""), Ok("b")]), plain_text);
        let updates: Vec<_> = stream.collect().await;

        assert_eq!(updates.len(), 2);
        let last = updates.last().unwrap().as_ref().unwrap();
        assert_eq!(last.message.text(), Some("ab"));
    }

    #[tokio::test]
    async fn test_fold_stops_at_first_error() {
        let stream = fold_wire_events(
            wire(vec![
                Ok("a"),
                Err(LlmError::Transport("ThrottlingException".to_string())),
                Ok("never"),
            ]),
            plain_text,
        );
        let updates: Vec<_> = stream.collect().await;

        assert_eq!(updates.len(), 2);
        assert!(updates[0].is_ok());
        assert!(matches!(updates[1], Err(LlmError::Transport(_))));
    }
}
