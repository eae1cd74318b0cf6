use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ContentError;

/// Image formats accepted as attachments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[default]
    #[serde(rename = "image/png")]
    Png,

    #[serde(rename = "image/jpeg")]
    Jpeg,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Parse a MIME string (`image/png`, `image/jpeg`)
    pub fn parse(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Guess from a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Base64,
}

/// Inline image payload. `data` always holds valid standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    encoding: ImageEncoding,
    media_type: MediaType,
    data: String,
}

impl ImageSource {
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Raw image bytes
    pub fn decode(&self) -> Result<Vec<u8>, ContentError> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ContentError::InvalidBase64(e.to_string()))
    }
}

/// One unit of payload within a turn.
///
/// Serializes to the structured-turn wire shape:
/// `{"type":"text","text":"..."}` or
/// `{"type":"image","source":{"type":"base64","media_type":"image/png","data":"..."}}`.
/// Deserialization goes through [`Content::parse`], so decoded values are always valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },

    Image { source: ImageSource },
}

impl Content {
    /// Create text content
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    /// Create image content from raw bytes
    pub fn image(media_type: MediaType, bytes: &[u8]) -> Self {
        Self::Image {
            source: ImageSource {
                encoding: ImageEncoding::Base64,
                media_type,
                data: STANDARD.encode(bytes),
            },
        }
    }

    /// Create image content from already-encoded data, checking that it decodes
    pub fn image_base64(
        media_type: MediaType,
        data: impl Into<String>,
    ) -> Result<Self, ContentError> {
        let data = data.into();
        STANDARD
            .decode(data.as_bytes())
            .map_err(|e| ContentError::InvalidBase64(e.to_string()))?;

        Ok(Self::Image {
            source: ImageSource {
                encoding: ImageEncoding::Base64,
                media_type,
                data,
            },
        })
    }

    /// Parse a heterogeneous item: a bare string, or an object discriminated by `type`
    /// (or, when `type` is absent, by the presence of `text` / `source`).
    pub fn parse(value: &Value) -> Result<Self, ContentError> {
        let obj = match value {
            Value::String(s) => return Ok(Self::text(s.clone())),
            Value::Object(obj) => obj,
            other => {
                return Err(ContentError::Malformed(format!(
                    "expected a string or an object, got {other}"
                )))
            }
        };

        let kind = match obj.get("type") {
            Some(Value::String(kind)) => kind.as_str(),
            Some(other) => {
                return Err(ContentError::Malformed(format!(
                    "`type` must be a string, got {other}"
                )))
            }
            None if obj.contains_key("source") => "image",
            None if obj.contains_key("text") => "text",
            None => {
                return Err(ContentError::Malformed(
                    "item has neither `text` nor `source`".to_string(),
                ))
            }
        };

        match kind {
            "text" => match obj.get("text") {
                Some(Value::String(text)) => Ok(Self::text(text.clone())),
                Some(other) => Err(ContentError::Malformed(format!(
                    "`text` must be a string, got {other}"
                ))),
                None => Err(ContentError::MissingText),
            },
            "image" => Self::parse_image_source(obj.get("source")),
            other => Err(ContentError::UnknownKind(other.to_string())),
        }
    }

    fn parse_image_source(source: Option<&Value>) -> Result<Self, ContentError> {
        let source = source
            .and_then(Value::as_object)
            .ok_or(ContentError::MissingImageData)?;

        match source.get("type") {
            None => {}
            Some(Value::String(encoding)) if encoding == "base64" => {}
            Some(other) => {
                let encoding = other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string());
                return Err(ContentError::UnsupportedEncoding(encoding));
            }
        }

        let media_type = match source.get("media_type") {
            None => MediaType::default(),
            Some(Value::String(mime)) => MediaType::parse(mime)
                .ok_or_else(|| ContentError::UnsupportedMediaType(mime.clone()))?,
            Some(other) => return Err(ContentError::UnsupportedMediaType(other.to_string())),
        };

        let data = source
            .get("data")
            .and_then(Value::as_str)
            .ok_or(ContentError::MissingImageData)?;

        Self::image_base64(media_type, data)
    }

    /// Text value, if this is text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageSource> {
        match self {
            Self::Image { source } => Some(source),
            Self::Text { .. } => None,
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}
