// Amazon Bedrock runtime over plain HTTP (no SDK)

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue as HttpHeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;

use super::event_stream::{EventStreamDecoder, Frame};
use super::{InvokeRequest, Transport, WireStream};
use crate::config::TransportConfig;
use crate::error::{LlmError, Result};

const ACCEPT_HEADER: &str = "accept";
const STREAM_ACCEPT_HEADER: &str = "x-amzn-bedrock-accept";

/// Bedrock runtime client.
///
/// - URL: `{endpoint}/model/{modelId}/invoke` and `.../invoke-with-response-stream`
/// - Streaming bodies use the binary event-stream framing; every `chunk` event carries one
///   base64-encoded JSON wire event
/// - Request signing is out of scope: an optional bearer token is passed through as-is
#[derive(Debug, Clone)]
pub struct BedrockTransport {
    http_client: reqwest::Client,
    endpoint: String,
}

impl BedrockTransport {
    pub fn builder() -> BedrockTransportBuilder {
        BedrockTransportBuilder::default()
    }

    /// Build from settings; the bearer token is kept out of config files
    pub fn from_config(config: &TransportConfig, bearer_token: Option<String>) -> Result<Self> {
        let mut builder = Self::builder().region(config.region.clone());
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(token) = bearer_token {
            builder = builder.bearer_token(token);
        }
        builder.build()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_url(&self, model_id: &str, action: &str) -> String {
        format!("{}/model/{}/{}", self.endpoint, model_id, action)
    }

    async fn send(
        &self,
        request: &InvokeRequest,
        action: &str,
        accept_header: &'static str,
    ) -> Result<reqwest::Response> {
        let url = self.build_url(&request.model_id, action);
        tracing::debug!(%url, model_id = %request.model_id, "invoking model");

        let response = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, &request.content_type)
            .header(accept_header, &request.accept)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %url, "request to Bedrock failed");
                LlmError::Transport(format!("failed to send request: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, %body, "Bedrock returned an error");
            return Err(LlmError::Http { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for BedrockTransport {
    async fn invoke(&self, request: InvokeRequest) -> Result<Bytes> {
        let response = self.send(&request, "invoke", ACCEPT_HEADER).await?;
        Ok(response.bytes().await?)
    }

    async fn invoke_stream(&self, request: InvokeRequest) -> Result<WireStream> {
        let response = self
            .send(&request, "invoke-with-response-stream", STREAM_ACCEPT_HEADER)
            .await?;

        Ok(decode_event_stream(response.bytes_stream()))
    }
}

/// Turn a raw event-stream body into wire events
pub fn decode_event_stream<S, E>(body: S) -> WireStream
where
    S: futures::Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = EventStreamDecoder::new();

        while let Some(chunk_result) = body.next().await {
            let bytes = match chunk_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(LlmError::Transport(format!("stream error: {e}")));
                    return;
                }
            };
            decoder.extend(&bytes);

            while let Some(frame_result) = decoder.next_frame() {
                match frame_result.and_then(|frame| unwrap_frame(&frame)) {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if !decoder.is_empty() {
            yield Err(LlmError::Decode(format!(
                "event stream ended inside a frame ({} bytes left)",
                decoder.len()
            )));
        }
    })
}

#[derive(Deserialize)]
struct ChunkPayload {
    bytes: String,
}

#[derive(Deserialize)]
struct ExceptionPayload {
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Payload of a `chunk` event, `None` for events that carry no model output
fn unwrap_frame(frame: &Frame) -> Result<Option<Bytes>> {
    match frame.message_type() {
        Some("event") => {}
        Some("exception") | Some("error") => {
            let kind = frame
                .exception_type()
                .or_else(|| frame.header_str(":error-code"))
                .unwrap_or("UnknownException");
            let message = serde_json::from_slice::<ExceptionPayload>(&frame.payload)
                .ok()
                .and_then(|p| p.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&frame.payload).into_owned());
            return Err(LlmError::Transport(format!("{kind}: {message}")));
        }
        other => {
            tracing::debug!(message_type = ?other, "skipping event-stream frame");
            return Ok(None);
        }
    }

    if frame.event_type() != Some("chunk") {
        tracing::debug!(event_type = ?frame.event_type(), "skipping non-chunk event");
        return Ok(None);
    }

    let chunk: ChunkPayload = serde_json::from_slice(&frame.payload)
        .map_err(|e| LlmError::Decode(format!("chunk envelope: {e}")))?;
    let decoded = STANDARD
        .decode(chunk.bytes.as_bytes())
        .map_err(|e| LlmError::Decode(format!("chunk bytes are not base64: {e}")))?;

    Ok(Some(Bytes::from(decoded)))
}

/// Builder for BedrockTransport
#[derive(Default)]
pub struct BedrockTransportBuilder {
    region: Option<String>,
    endpoint: Option<String>,
    bearer_token: Option<String>,
    timeout: Option<Duration>,
}

impl BedrockTransportBuilder {
    /// AWS region, used to derive the default endpoint
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Override the endpoint (base URL), e.g. a VPC endpoint or a local proxy
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<BedrockTransport> {
        let endpoint = match (self.endpoint, self.region) {
            (Some(endpoint), _) => endpoint,
            (None, Some(region)) => format!("https://bedrock-runtime.{region}.amazonaws.com"),
            (None, None) => {
                return Err(LlmError::Config(
                    "Region or endpoint is required".to_string(),
                ))
            }
        };

        // Remove trailing slash from endpoint
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        if let Some(token) = self.bearer_token {
            headers.insert(
                AUTHORIZATION,
                HttpHeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| LlmError::Config("Invalid bearer token format".to_string()))?,
            );
        }

        let mut client = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let http_client = client
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(BedrockTransport {
            http_client,
            endpoint,
        })
    }
}
