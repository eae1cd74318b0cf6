// Configuration layer for provider adapters
// Settings are plain serde structs so front-ends can load them from any source

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{LlmError, Result};
use crate::providers::{ClaudeAdapter, MistralAdapter};
use crate::traits::ProviderAdapter;
use crate::transport::Transport;

/// Claude models known to work with the structured-turn adapter
pub const CLAUDE_MODELS: &[&str] = &[
    "anthropic.claude-instant-v1",
    "anthropic.claude-v2:1",
    "anthropic.claude-v2",
    "anthropic.claude-3-sonnet-20240229-v1:0",
    "anthropic.claude-3-haiku-20240307-v1:0",
];

/// Mistral models known to work with the flattened-prompt adapter
pub const MISTRAL_MODELS: &[&str] = &[
    "mistral.mistral-7b-instruct-v0:2",
    "mistral.mixtral-8x7b-instruct-v0:1",
    "mistral.mistral-large-2402-v1:0",
];

/// Type of provider adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Claude,
    Mistral,
}

/// Settings for the structured-turn (Claude messages) adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeConfig {
    pub model_id: String,
    pub anthropic_version: String,
    pub max_tokens: u32,
    pub content_type: String,
    pub accept: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            anthropic_version: "bedrock-2023-05-31".to_string(),
            max_tokens: 1000,
            content_type: "application/json".to_string(),
            accept: "application/json".to_string(),
        }
    }
}

impl ClaudeConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Settings for the flattened-prompt (Mistral instruct) adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MistralConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Opens the rendered prompt
    pub bos_token: String,
    /// Closes every assistant turn
    pub eos_token: String,
    pub content_type: String,
    pub accept: String,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            model_id: "mistral.mistral-large-2402-v1:0".to_string(),
            max_tokens: 1000,
            temperature: 0.5,
            top_p: 0.9,
            top_k: 50,
            bos_token: "<s>".to_string(),
            eos_token: "</s>".to_string(),
            content_type: "application/json".to_string(),
            accept: "application/json".to_string(),
        }
    }
}

impl MistralConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Complete provider configuration, tagged by `provider`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderConfig {
    Claude(ClaudeConfig),
    Mistral(MistralConfig),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Claude(ClaudeConfig::default())
    }
}

impl ProviderConfig {
    pub fn claude(model_id: impl Into<String>) -> Self {
        Self::Claude(ClaudeConfig::new(model_id))
    }

    pub fn mistral(model_id: impl Into<String>) -> Self {
        Self::Mistral(MistralConfig::new(model_id))
    }

    /// Pick the adapter from the model id's vendor segment
    /// (`anthropic.` / `mistral.`, optionally behind a cross-region prefix such as `us.`)
    pub fn from_model_id(model_id: impl Into<String>) -> Result<Self> {
        let model_id = model_id.into();
        let vendor = model_id
            .split('.')
            .take(2)
            .find(|segment| matches!(*segment, "anthropic" | "mistral"));

        match vendor {
            Some("anthropic") => Ok(Self::claude(model_id)),
            Some("mistral") => Ok(Self::mistral(model_id)),
            _ => Err(LlmError::Config(format!(
                "cannot infer provider from model id `{model_id}`"
            ))),
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Claude(_) => ProviderType::Claude,
            Self::Mistral(_) => ProviderType::Mistral,
        }
    }

    pub fn model_id(&self) -> &str {
        match self {
            Self::Claude(c) => &c.model_id,
            Self::Mistral(c) => &c.model_id,
        }
    }
}

/// Transport settings; credentials are not part of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub region: String,
    /// Overrides the regional Bedrock runtime endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            endpoint: None,
            timeout_secs: None,
        }
    }
}

/// Factory for creating provider adapters from configuration
pub struct AdapterFactory;

impl AdapterFactory {
    /// Create an adapter bound to the given transport
    pub fn create_adapter(
        config: ProviderConfig,
        transport: Arc<dyn Transport>,
    ) -> Arc<dyn ProviderAdapter> {
        let known = match &config {
            ProviderConfig::Claude(_) => CLAUDE_MODELS,
            ProviderConfig::Mistral(_) => MISTRAL_MODELS,
        };
        if !known.contains(&config.model_id()) {
            tracing::warn!(
                model_id = config.model_id(),
                provider = ?config.provider_type(),
                "model id is not in the known list for this provider"
            );
        }

        match config {
            ProviderConfig::Claude(claude) => Arc::new(ClaudeAdapter::new(transport, claude)),
            ProviderConfig::Mistral(mistral) => Arc::new(MistralAdapter::new(transport, mistral)),
        }
    }
}
