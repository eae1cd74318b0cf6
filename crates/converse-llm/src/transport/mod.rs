// Transport boundary: the two primitive calls adapters make against the inference service

pub mod bedrock;
pub mod event_stream;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

pub use bedrock::{BedrockTransport, BedrockTransportBuilder};
pub use event_stream::{EventStreamDecoder, Frame, HeaderValue};

/// Sequence of raw wire events, each one JSON document as bytes
pub type WireStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Provider-ready request: target model, content negotiation and JSON body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub model_id: String,
    pub content_type: String,
    pub accept: String,
    pub body: Value,
}

impl InvokeRequest {
    pub fn json(model_id: impl Into<String>, body: Value) -> Self {
        Self {
            model_id: model_id.into(),
            content_type: "application/json".to_string(),
            accept: "application/json".to_string(),
            body,
        }
    }
}

/// Network access to the inference service.
///
/// Implementations own timeouts and connection handling; adapters only see bytes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke once and return the full response body
    async fn invoke(&self, request: InvokeRequest) -> Result<Bytes>;

    /// Invoke once and return the response as a sequence of wire events
    async fn invoke_stream(&self, request: InvokeRequest) -> Result<WireStream>;
}
