use config::{Config as ConfigLoader, ConfigError, Environment, File};
use converse_llm::{ProviderConfig, TransportConfig};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: ProviderConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Print replies as they arrive instead of waiting for the full text
    pub stream: bool,
    /// Empty string means no system prompt
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            stream: true,
            system_prompt: "Talk like a pirate.".to_string(),
        }
    }
}

impl ChatConfig {
    pub fn system_prompt(&self) -> Option<String> {
        Some(self.system_prompt.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables, e.g. `CONVERSE_LLM__MODEL_ID`, `CONVERSE_TRANSPORT__REGION`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("CONVERSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg: Config = builder.build()?.try_deserialize()?;
        Ok(cfg.with_env_secrets())
    }

    /// Load config from a single TOML file, skipping the layered lookup
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let cfg: Config = builder.build()?.try_deserialize()?;
        Ok(cfg.with_env_secrets())
    }

    // Optional pass-through credential, never read from TOML
    fn with_env_secrets(mut self) -> Self {
        self.bearer_token = std::env::var("BEDROCK_BEARER_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converse_llm::ProviderType;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [llm]
            provider = "mistral"
            model_id = "mistral.mixtral-8x7b-instruct-v0:1"
            temperature = 0.2

            [transport]
            region = "us-east-1"
            timeout_secs = 30

            [chat]
            stream = false
            system_prompt = ""

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.llm.provider_type(), ProviderType::Mistral);
        assert_eq!(config.llm.model_id(), "mistral.mixtral-8x7b-instruct-v0:1");
        assert_eq!(config.transport.region, "us-east-1");
        assert_eq!(config.transport.timeout_secs, Some(30));
        assert!(!config.chat.stream);
        assert_eq!(config.chat.system_prompt(), None);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("converse-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
            [llm]
            provider = "mistral"
            model_id = "mistral.mistral-large-2402-v1:0"
            max_tokens = 256

            [transport]
            region = "eu-west-3"

            [chat]
            system_prompt = "Answer in French."
        "#,
        )
        .unwrap();

        let config = Config::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.llm.provider_type(), ProviderType::Mistral);
        assert_eq!(config.llm.model_id(), "mistral.mistral-large-2402-v1:0");
        assert_eq!(config.transport.region, "eu-west-3");
        assert!(config.chat.stream);
        assert_eq!(
            config.chat.system_prompt().as_deref(),
            Some("Answer in French.")
        );
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_from_file_missing() {
        let path = std::env::temp_dir().join("converse-config-does-not-exist.toml");
        assert!(Config::from_file(path).is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.llm.provider_type(), ProviderType::Claude);
        assert_eq!(config.transport.region, "us-west-2");
        assert!(config.chat.stream);
        assert_eq!(
            config.chat.system_prompt().as_deref(),
            Some("Talk like a pirate.")
        );
        assert!(config.bearer_token.is_none());
    }
}
