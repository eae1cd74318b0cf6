// Structured-turn adapter: Anthropic Claude messages API on Bedrock

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::ClaudeConfig;
use crate::error::{LlmError, Result};
use crate::streaming::{fold_wire_events, MessageStream, WireDelta};
use crate::traits::ProviderAdapter;
use crate::transport::{InvokeRequest, Transport};
use crate::types::{Content, Message, Role};

/// Sends history as an ordered list of `{role, content}` turns with an optional
/// top-level `system` field.
pub struct ClaudeAdapter {
    transport: Arc<dyn Transport>,
    config: ClaudeConfig,
}

impl ClaudeAdapter {
    pub fn new(transport: Arc<dyn Transport>, config: ClaudeConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }

    /// Build the request payload
    pub fn build_request(
        &self,
        history: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<InvokeRequest> {
        let body = MessagesBody {
            anthropic_version: &self.config.anthropic_version,
            max_tokens: self.config.max_tokens,
            messages: history,
            system: system_prompt.filter(|s| !s.is_empty()),
        };
        let body = serde_json::to_value(&body).map_err(|e| LlmError::Encode(e.to_string()))?;

        tracing::debug!(
            model_id = %self.config.model_id,
            turns = history.len(),
            has_system = body.get("system").is_some(),
            "built messages request"
        );

        Ok(InvokeRequest {
            model_id: self.config.model_id.clone(),
            content_type: self.config.content_type.clone(),
            accept: self.config.accept.clone(),
            body,
        })
    }
}

/// Normalize a complete response body. Text and image blocks are kept in order;
/// other block kinds (tool use, thinking) are skipped.
pub fn parse_response(body: &[u8]) -> Result<Message> {
    let raw: ClaudeResponse = serde_json::from_slice(body)
        .map_err(|e| LlmError::Transport(format!("malformed response body: {e}")))?;

    let mut content = Vec::with_capacity(raw.content.len());
    for block in &raw.content {
        match block.get("type").and_then(Value::as_str) {
            Some("text") | Some("image") => {
                let item = Content::parse(block)
                    .map_err(|e| LlmError::Transport(format!("malformed content block: {e}")))?;
                content.push(item);
            }
            other => tracing::debug!(block_type = ?other, "skipping content block"),
        }
    }

    Ok(Message::from_reply(raw.role.unwrap_or(Role::Assistant), content))
}

/// Classify one streaming event
pub fn decode_event(bytes: &[u8]) -> Result<WireDelta> {
    let event: StreamEvent = serde_json::from_slice(bytes)
        .map_err(|e| LlmError::Decode(format!("malformed stream event: {e}")))?;

    Ok(match event {
        StreamEvent::MessageStart { message } => match message.role {
            Some(role) => WireDelta::Role(role),
            None => WireDelta::Skip,
        },
        StreamEvent::ContentBlockStart {
            content_block,
            delta,
        } => content_block
            .and_then(|block| block.text)
            .or_else(|| delta.and_then(|d| d.text))
            .map_or(WireDelta::Skip, WireDelta::Text),
        StreamEvent::ContentBlockDelta { delta } => {
            delta.text.map_or(WireDelta::Skip, WireDelta::Text)
        }
        StreamEvent::Other => WireDelta::Skip,
    })
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn invoke(&self, history: &[Message], system_prompt: Option<&str>) -> Result<Message> {
        let request = self.build_request(history, system_prompt)?;
        let body = self.transport.invoke(request).await?;

        parse_response(&body).inspect_err(|e| {
            tracing::error!(error = %e, "failed to normalize Claude response");
        })
    }

    async fn invoke_stream(
        &self,
        history: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<MessageStream> {
        let request = self.build_request(history, system_prompt)?;
        let events = self.transport.invoke_stream(request).await?;

        Ok(fold_wire_events(events, decode_event))
    }
}

// ============================================================================
// CLAUDE WIRE TYPES
// ============================================================================

#[derive(Serialize)]
struct MessagesBody<'a> {
    anthropic_version: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    content: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {
        message: MessageMeta,
    },
    ContentBlockStart {
        #[serde(default)]
        content_block: Option<TextField>,
        #[serde(default)]
        delta: Option<TextField>,
    },
    ContentBlockDelta {
        delta: TextField,
    },
    /// content_block_stop, message_delta, message_stop, ping
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessageMeta {
    #[serde(default)]
    role: Option<Role>,
}

#[derive(Deserialize)]
struct TextField {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_start_role() {
        let delta = decode_event(
            br#"{"type":"message_start","message":{"id":"msg_1","role":"assistant","content":[]}}"#,
        )
        .unwrap();
        assert_eq!(delta, WireDelta::Role(Role::Assistant));
    }

    #[test]
    fn test_decode_tool_use_start_is_skipped() {
        let delta = decode_event(
            br#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"t1","name":"calc"}}"#,
        )
        .unwrap();
        assert_eq!(delta, WireDelta::Skip);
    }

    #[test]
    fn test_decode_input_json_delta_is_skipped() {
        let delta = decode_event(
            br#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        )
        .unwrap();
        assert_eq!(delta, WireDelta::Skip);
    }

    #[test]
    fn test_decode_block_start_falls_back_to_delta_text() {
        let delta = decode_event(
            br#"{"type":"content_block_start","content_block":{"type":"text"},"delta":{"text":"X"}}"#,
        )
        .unwrap();
        assert_eq!(delta, WireDelta::Text("X".to_string()));

        let delta = decode_event(
            br#"{"type":"content_block_start","content_block":{"type":"text","text":"A"},"delta":{"text":"B"}}"#,
        )
        .unwrap();
        assert_eq!(delta, WireDelta::Text("A".to_string()));
    }

    #[test]
    fn test_decode_unknown_event_type() {
        assert_eq!(decode_event(br#"{"type":"ping"}"#).unwrap(), WireDelta::Skip);
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(matches!(decode_event(b"{not json"), Err(LlmError::Decode(_))));
    }
}
