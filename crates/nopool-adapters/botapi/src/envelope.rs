//! Bot-API response envelope.
//!
//! Every bot-API response is wrapped as `{"ok": true, "result": ...}` on
//! success or `{"ok": false, "error_code": ..., "description": ...}` on
//! failure. [`translate`] unwraps successful envelopes and passes
//! everything else through untouched; [`Envelope`] is the typed view used
//! when the caller wants failures as errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use nopool_core::Payload;

use crate::error::{AdapterError, AdapterResult};

/// Truthiness of a JSON value in the bot-API client's sense.
///
/// `false`, `null`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A decoded body as JSON; text and binary bodies become strings.
pub fn into_value(payload: Payload) -> Value {
    match payload {
        Payload::Json(value) => value,
        Payload::Text(text) => Value::String(text),
        Payload::Binary(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Unwraps a raw response value.
///
/// - an object with a truthy `ok` and a `result` key yields `result`;
/// - any other value is returned whole.
pub fn unwrap_envelope(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    let unwrap = map.get("ok").is_some_and(is_truthy) && map.contains_key("result");
    match map.remove("result") {
        Some(result) if unwrap => result,
        Some(result) => {
            map.insert("result".to_string(), result);
            Value::Object(map)
        }
        None => Value::Object(map),
    }
}

/// Unwraps a decoded response body.
///
/// Same as [`unwrap_envelope`] on [`into_value`]: text becomes a JSON
/// string, a successful envelope yields its `result`, everything else
/// passes through.
pub fn translate(payload: Payload) -> Value {
    unwrap_envelope(into_value(payload))
}

/// Extra failure details carried by some error envelopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    /// The group was migrated to a supergroup with this id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    /// Flood control: seconds to wait before retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Typed view of a bot-API envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ResponseParameters>,
}

impl Envelope {
    /// Parses an envelope from a JSON value.
    pub fn from_value(value: Value) -> AdapterResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns `result` for a successful envelope, or an
    /// [`AdapterError::Api`] built from its error fields.
    pub fn into_result(self) -> AdapterResult<Value> {
        if self.ok {
            return Ok(self.result.unwrap_or(Value::Null));
        }
        Err(AdapterError::Api {
            code: self.error_code.unwrap_or_default(),
            description: self
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
            retry_after: self.parameters.and_then(|p| p.retry_after),
        })
    }
}

/// Turns a raw (not yet unwrapped) response value into a result.
///
/// An object carrying `ok` is read as an envelope: truthy yields its
/// `result`, falsy becomes [`AdapterError::Api`]. Any other value is a
/// result as-is.
pub fn check(mut value: Value) -> AdapterResult<Value> {
    let Some(ok) = value.get("ok").map(is_truthy) else {
        return Ok(value);
    };
    if let Some(map) = value.as_object_mut() {
        map.insert("ok".to_string(), Value::Bool(ok));
    }
    Envelope::from_value(value)?.into_result()
}
