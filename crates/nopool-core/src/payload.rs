//! Response bodies and their decoded form.

use bytes::Bytes;
use serde_json::{Map, Value};

/// A complete response with a non-error status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code (always below 400).
    pub status: u16,
    /// Full response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decodes the body, see [`Payload::decode`].
    pub fn decode(&self) -> Payload {
        Payload::decode(self.body.clone())
    }

    /// Consumes the response, returning the raw body.
    pub fn into_bytes(self) -> Bytes {
        self.body
    }
}

/// A response body decoded as far as its content allows.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Valid JSON.
    Json(Value),
    /// Valid UTF-8 that is not JSON.
    Text(String),
    /// Anything else.
    Binary(Bytes),
}

impl Payload {
    /// Decodes a body: JSON first, then UTF-8 text, then raw bytes.
    ///
    /// An empty body decodes to an empty JSON object.
    pub fn decode(body: Bytes) -> Self {
        if body.is_empty() {
            return Self::Json(Value::Object(Map::new()));
        }
        if let Ok(value) = serde_json::from_slice::<Value>(&body) {
            return Self::Json(value);
        }
        match std::str::from_utf8(&body) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Binary(body),
        }
    }

    /// Returns the JSON value, if the body was JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Converts into a JSON value; text and bytes become strings.
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Binary(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// Converts back into bytes.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Text(text) => Bytes::from(text),
            Self::Binary(bytes) => bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        let payload = Payload::decode(Bytes::from_static(br#"{"ok":true,"result":{"id":42}}"#));
        assert_eq!(payload, Payload::Json(json!({"ok": true, "result": {"id": 42}})));
    }

    #[test]
    fn test_decode_empty_is_empty_object() {
        assert_eq!(Payload::decode(Bytes::new()), Payload::Json(json!({})));
    }

    #[test]
    fn test_decode_falls_back_to_text_then_bytes() {
        assert_eq!(
            Payload::decode(Bytes::from_static(b"<html>bad gateway</html>")),
            Payload::Text("<html>bad gateway</html>".into())
        );

        let png = Bytes::from_static(&[0x89, b'P', b'N', b'G', 0xff, 0xfe]);
        assert_eq!(Payload::decode(png.clone()), Payload::Binary(png.clone()));
        assert_eq!(Payload::Binary(png.clone()).into_bytes(), png);
    }

    #[test]
    fn test_into_value() {
        assert_eq!(Payload::Text("plain".into()).into_value(), json!("plain"));
        let response = HttpResponse::new(200, "[1,2]");
        assert_eq!(response.decode().into_value(), json!([1, 2]));
    }
}
