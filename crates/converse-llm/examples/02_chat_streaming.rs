use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use converse_llm::{
    AdapterFactory, Chat, InvokeRequest, LlmError, MistralConfig, ProviderConfig, Transport,
    WireStream,
};
use futures::StreamExt;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

/// Replays a fixed Mistral completion as streamed wire events
struct CannedStreamTransport;

#[async_trait]
impl Transport for CannedStreamTransport {
    async fn invoke(&self, _request: InvokeRequest) -> converse_llm::Result<Bytes> {
        Err(LlmError::Transport("one-shot call not scripted".to_string()))
    }

    async fn invoke_stream(&self, request: InvokeRequest) -> converse_llm::Result<WireStream> {
        println!("prompt: {}", request.body["prompt"]);
        let events = ["Un, ", "deux, ", "trois, ", "quatre, ", "cinq."]
            .into_iter()
            .map(|text| Ok(Bytes::from(json!({"outputs": [{"text": text}]}).to_string())))
            .collect::<Vec<_>>();
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProviderConfig::Mistral(MistralConfig::new("mistral.mistral-large-2402-v1:0"));
    let adapter = AdapterFactory::create_adapter(config, Arc::new(CannedStreamTransport));

    let mut chat = Chat::new(adapter).with_system_prompt("Answer in French.");

    print!("Response: ");
    let mut fragments = chat.submit("Count from one to five.");
    while let Some(fragment) = fragments.next().await {
        print!("{}", fragment?);
        std::io::stdout().flush()?;
    }
    drop(fragments);
    println!();

    println!("{}", serde_json::to_string_pretty(&chat.snapshot())?);

    Ok(())
}
