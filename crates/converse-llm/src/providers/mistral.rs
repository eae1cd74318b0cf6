// Flattened-prompt adapter: Mistral instruct models on Bedrock
// The model has no multi-turn request format, so history is rendered into one prompt string

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::MistralConfig;
use crate::error::{LlmError, Result};
use crate::streaming::{fold_wire_events, MessageStream, WireDelta};
use crate::traits::ProviderAdapter;
use crate::transport::{InvokeRequest, Transport};
use crate::types::{Content, Message, Role};

const INST_OPEN: &str = "[INST]";
const INST_CLOSE: &str = "[/INST]";

pub struct MistralAdapter {
    transport: Arc<dyn Transport>,
    config: MistralConfig,
}

impl MistralAdapter {
    pub fn new(transport: Arc<dyn Transport>, config: MistralConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &MistralConfig {
        &self.config
    }

    /// Render history with this adapter's BOS/EOS markers
    pub fn render_prompt(&self, history: &[Message], system_prompt: Option<&str>) -> Result<String> {
        render_instruct_prompt(
            history,
            system_prompt,
            &self.config.bos_token,
            &self.config.eos_token,
        )
    }

    /// Build the request payload
    pub fn build_request(
        &self,
        history: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<InvokeRequest> {
        let prompt = self.render_prompt(history, system_prompt)?;
        tracing::debug!(
            model_id = %self.config.model_id,
            turns = history.len(),
            prompt_len = prompt.len(),
            "rendered instruct prompt"
        );

        Ok(InvokeRequest {
            model_id: self.config.model_id.clone(),
            content_type: self.config.content_type.clone(),
            accept: self.config.accept.clone(),
            body: serde_json::json!({
                "max_tokens": self.config.max_tokens,
                "temperature": self.config.temperature,
                "top_p": self.config.top_p,
                "top_k": self.config.top_k,
                "prompt": prompt,
            }),
        })
    }
}

/// Render a conversation into the Mistral instruct template:
///
/// ```text
/// <s>[INST] {system} {user 1} [/INST]{assistant 1}</s>[INST] {user 2} [/INST]...
/// ```
///
/// Turns must alternate user/assistant starting with user. The system prompt is only
/// injected into the first user turn. Each turn contributes its first text item; image
/// content cannot be expressed and is dropped.
pub fn render_instruct_prompt(
    history: &[Message],
    system_prompt: Option<&str>,
    bos_token: &str,
    eos_token: &str,
) -> Result<String> {
    for (index, turn) in history.iter().enumerate() {
        let expected = if index % 2 == 0 { Role::User } else { Role::Assistant };
        if turn.role() != expected {
            return Err(LlmError::ConversationShape(format!(
                "turn {index} is `{}`, expected `{expected}`",
                turn.role()
            )));
        }
    }

    let system_prompt = system_prompt.filter(|s| !s.is_empty());
    let mut prompt = String::from(bos_token);

    for (index, turn) in history.iter().enumerate() {
        let text = turn_text(turn);
        match turn.role() {
            Role::User => match system_prompt {
                Some(system) if index == 0 => {
                    prompt.push_str(&format!("{INST_OPEN} {system} {text} {INST_CLOSE}"));
                }
                _ => prompt.push_str(&format!("{INST_OPEN} {text} {INST_CLOSE}")),
            },
            Role::Assistant => {
                prompt.push_str(text);
                prompt.push_str(eos_token);
            }
        }
    }

    Ok(prompt)
}

fn turn_text(turn: &Message) -> &str {
    let images = turn
        .content()
        .iter()
        .filter(|item| item.as_image().is_some())
        .count();
    if images > 0 {
        tracing::warn!(
            role = %turn.role(),
            dropped = images,
            "image content cannot be sent in a flattened prompt"
        );
    }
    turn.content()
        .iter()
        .find_map(Content::as_text)
        .unwrap_or_default()
}

/// Normalize a complete response body into a single-text assistant message
pub fn parse_response(body: &[u8]) -> Result<Message> {
    let raw: MistralResponse = serde_json::from_slice(body)
        .map_err(|e| LlmError::Transport(format!("malformed response body: {e}")))?;
    let output = raw
        .outputs
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Transport("response has no outputs".to_string()))?;

    Ok(Message::assistant(output.text))
}

/// Extract `outputs[0].text` from one streaming event
pub fn decode_event(bytes: &[u8]) -> Result<WireDelta> {
    let event: MistralResponse = serde_json::from_slice(bytes)
        .map_err(|e| LlmError::Decode(format!("malformed stream event: {e}")))?;
    let output = event
        .outputs
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Decode("stream event has no outputs".to_string()))?;

    Ok(WireDelta::Text(output.text))
}

#[async_trait]
impl ProviderAdapter for MistralAdapter {
    fn name(&self) -> &'static str {
        "mistral"
    }

    async fn invoke(&self, history: &[Message], system_prompt: Option<&str>) -> Result<Message> {
        let request = self.build_request(history, system_prompt)?;
        let body = self.transport.invoke(request).await?;

        parse_response(&body).inspect_err(|e| {
            tracing::error!(error = %e, "failed to normalize Mistral response");
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

#[derive(Deserialize)]
struct MistralResponse {
    outputs: Vec<MistralOutput>,
}

#[derive(Deserialize)]
struct MistralOutput {
    #[serde(default)]
    text: String,
}
