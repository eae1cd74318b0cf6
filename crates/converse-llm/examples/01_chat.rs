use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use converse_llm::{
    AdapterFactory, Chat, ClaudeConfig, InvokeRequest, LlmError, ProviderConfig, Transport,
    WireStream,
};
use serde_json::json;
use std::sync::Arc;

/// Answers every one-shot call with the same Claude message
struct CannedTransport;

#[async_trait]
impl Transport for CannedTransport {
    async fn invoke(&self, request: InvokeRequest) -> converse_llm::Result<Bytes> {
        println!("-> {}: {}", request.model_id, request.body);
        let reply = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Paris, matey."}],
            "stop_reason": "end_turn"
        });
        Ok(Bytes::from(reply.to_string()))
    }

    async fn invoke_stream(&self, _request: InvokeRequest) -> converse_llm::Result<WireStream> {
        Err(LlmError::Transport("streaming not scripted".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProviderConfig::Claude(ClaudeConfig::new("anthropic.claude-3-sonnet-20240229-v1:0"));
    let adapter = AdapterFactory::create_adapter(config, Arc::new(CannedTransport));

    let mut chat = Chat::new(adapter).with_system_prompt("Talk like a pirate.");

    let reply = chat.generate("What is the capital of France?").await?;
    println!("Response: {reply}");
    println!("Turns in history: {}", chat.history().len());

    Ok(())
}
