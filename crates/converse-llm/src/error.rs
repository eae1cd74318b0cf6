use thiserror::Error;

/// A single content item failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("text content is missing its `text` field")]
    MissingText,

    #[error("image content is missing `source.data`")]
    MissingImageData,

    #[error("unsupported image media type: {0}")]
    UnsupportedMediaType(String),

    #[error("unsupported image encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("image data is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("unknown content type: {0}")]
    UnknownKind(String),

    #[error("malformed content item: {0}")]
    Malformed(String),
}

/// A turn could not be built from caller input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("invalid role: {0} (expected `user` or `assistant`)")]
    InvalidRole(String),

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("content item {index}: {source}")]
    Content {
        index: usize,
        #[source]
        source: ContentError,
    },

    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Errors raised while talking to a provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The flattened prompt template needs strictly alternating user/assistant turns.
    #[error("conversation roles must alternate user/assistant/user/...: {0}")]
    ConversationShape(String),

    /// A wire event or event-stream frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The transport failed or the provider returned an unusable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the provider endpoint.
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A request body could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// True for failures reported by the provider or the network rather than by local checks.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
