use serde_json::Value;

use crate::error::CodecError;
use crate::types::DEFAULT_CONTENT_TYPE;

pub const XML_ROOT: &str = "payload";

/// Body encoding negotiated from a subscription's content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Xml,
    Empty,
}

impl BodyFormat {
    /// Prefix match, so parameters such as `; charset=utf-8` are accepted.
    /// An empty content type means JSON.
    pub fn negotiate(content_type: &str) -> Self {
        let content_type = content_type.trim();
        if content_type.is_empty() || content_type.starts_with(DEFAULT_CONTENT_TYPE) {
            BodyFormat::Json
        } else if content_type.starts_with("application/xml") {
            BodyFormat::Xml
        } else {
            BodyFormat::Empty
        }
    }
}

/// Serializes an event payload for the wire. A null payload yields no body.
pub fn encode_payload(content_type: &str, payload: &Value) -> Result<Vec<u8>, CodecError> {
    if payload.is_null() {
        return Ok(Vec::new());
    }
    match BodyFormat::negotiate(content_type) {
        BodyFormat::Json => serde_json::to_vec(payload).map_err(|e| CodecError::Encode {
            content_type: content_type.to_string(),
            reason: e.to_string(),
        }),
        BodyFormat::Xml => quick_xml::se::to_string_with_root(XML_ROOT, payload)
            .map(String::into_bytes)
            .map_err(|e| CodecError::Encode {
                content_type: content_type.to_string(),
                reason: e.to_string(),
            }),
        BodyFormat::Empty => Ok(Vec::new()),
    }
}

/// Turns a subscriber's response body into a value surfaced to the producer.
pub trait ResponseDeserializer: Send + Sync {
    fn deserialize(&self, body: &[u8]) -> Result<Value, CodecError>;
}

/// Parses JSON response bodies; an empty body becomes `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserializer;

impl ResponseDeserializer for JsonDeserializer {
    fn deserialize(&self, body: &[u8]) -> Result<Value, CodecError> {
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(body).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Passes the body through as a UTF-8 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDeserializer;

impl ResponseDeserializer for TextDeserializer {
    fn deserialize(&self, body: &[u8]) -> Result<Value, CodecError> {
        std::str::from_utf8(body)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}
