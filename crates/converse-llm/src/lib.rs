pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod providers;
pub mod streaming;
pub mod traits;
pub mod transport;
pub mod types;

pub use chat::{Chat, ChatStream, EMPTY_REPLY};
pub use config::{
    AdapterFactory, ClaudeConfig, MistralConfig, ProviderConfig, ProviderType, TransportConfig,
};
pub use error::{ContentError, LlmError, MessageError, Result};
pub use history::History;
pub use providers::{ClaudeAdapter, MistralAdapter};
pub use streaming::{MessageStream, StreamAccumulator, StreamUpdate, WireDelta};
pub use traits::ProviderAdapter;
pub use transport::{BedrockTransport, InvokeRequest, Transport, WireStream};
pub use types::{Content, ImageSource, MediaType, Message, Role, TurnInput};
