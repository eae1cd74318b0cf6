mod config;
mod repl;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use converse_llm::{AdapterFactory, BedrockTransport, Chat};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // CONVERSE_CONFIG points at a single file and bypasses the layered lookup
    let config = match std::env::var_os("CONVERSE_CONFIG") {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.to_string_lossy()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    init_logging(&config);

    tracing::info!(
        provider = ?config.llm.provider_type(),
        model_id = config.llm.model_id(),
        region = %config.transport.region,
        "starting converse"
    );

    let transport = BedrockTransport::from_config(&config.transport, config.bearer_token.clone())
        .context("Failed to create Bedrock transport")?;
    let adapter = AdapterFactory::create_adapter(config.llm.clone(), Arc::new(transport));

    let mut chat = Chat::new(adapter);
    chat.set_system_prompt(config.chat.system_prompt());

    repl::run(&mut chat, &config.chat).await
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs go to stderr so they do not interleave with streamed replies
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
