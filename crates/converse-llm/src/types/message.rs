use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::content::Content;
use crate::error::MessageError;

/// Who authored a turn. System instructions never live in history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MessageError> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(MessageError::InvalidRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversational turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    content: Vec<Content>,
}

/// Anything a caller may submit as a turn
#[derive(Debug, Clone)]
pub enum TurnInput {
    /// Bare text, shorthand for a user turn
    Text(String),

    /// `{role?, content}` object as produced by a front-end
    Structured(Value),

    /// Already-built message
    Message(Message),
}

impl From<&str> for TurnInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TurnInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for TurnInput {
    fn from(v: Value) -> Self {
        Self::Structured(v)
    }
}

impl From<Message> for TurnInput {
    fn from(m: Message) -> Self {
        Self::Message(m)
    }
}

impl Message {
    /// Build a message, rejecting empty content
    pub fn new(role: Role, content: Vec<Content>) -> Result<Self, MessageError> {
        if content.is_empty() {
            return Err(MessageError::EmptyContent);
        }
        Ok(Self { role, content })
    }

    /// Create user message with a single content item
    pub fn user(content: impl Into<Content>) -> Self {
        Self {
            role: Role::User,
            content: vec![content.into()],
        }
    }

    /// Create assistant message with a single content item
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![content.into()],
        }
    }

    /// Provider replies are taken as-is; a reply may legitimately carry no content.
    pub(crate) fn from_reply(role: Role, content: Vec<Content>) -> Self {
        Self { role, content }
    }

    /// Normalize caller input into a validated message.
    ///
    /// A bare string becomes a user turn with one text item. A structured value needs a
    /// `content` field (string or array of items); `role` defaults to `user`.
    pub fn from_input(input: impl Into<TurnInput>) -> Result<Self, MessageError> {
        match input.into() {
            TurnInput::Text(text) => Ok(Self::user(text)),
            TurnInput::Structured(value) => Self::from_value(&value),
            TurnInput::Message(message) => Self::new(message.role, message.content),
        }
    }

    fn from_value(value: &Value) -> Result<Self, MessageError> {
        let obj = match value {
            Value::String(text) => return Ok(Self::user(text.as_str())),
            Value::Object(obj) => obj,
            other => {
                return Err(MessageError::Malformed(format!(
                    "expected a string or an object, got {other}"
                )))
            }
        };

        let role = match obj.get("role") {
            None | Some(Value::Null) => Role::User,
            Some(Value::String(role)) => Role::parse(role)?,
            Some(other) => return Err(MessageError::InvalidRole(other.to_string())),
        };

        let content = match obj.get("content") {
            None | Some(Value::Null) => return Err(MessageError::EmptyContent),
            Some(Value::String(text)) => vec![Content::text(text.clone())],
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    Content::parse(item).map_err(|source| MessageError::Content { index, source })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(MessageError::Malformed(format!(
                    "`content` must be a string or an array, got {other}"
                )))
            }
        };

        Self::new(role, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &[Content] {
        &self.content
    }

    /// First text content, if any
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(Content::as_text)
    }

    pub fn into_parts(self) -> (Role, Vec<Content>) {
        (self.role, self.content)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}
