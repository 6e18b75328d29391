//! Normalized responses and the API's error payload.

use derive_getters::Getters;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One HTTP response, produced once per transport attempt.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct ResponseEnvelope {
    /// HTTP status code
    status: u16,
    /// HTTP reason phrase
    status_text: String,
    /// Response headers
    headers: HeaderMap,
    /// Decoded body: JSON when parseable, otherwise the raw text as a string
    body: Value,
}

impl ResponseEnvelope {
    /// Create an envelope with the canonical reason phrase for `status`.
    pub fn new(status: u16, body: Value) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Replace the reason phrase.
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add one header, ignoring names or values that are not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Whether the status is below 400, i.e. not an error.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// The API error payload, if the body has that shape.
    pub fn error_data(&self) -> ApiErrorData {
        ApiErrorData::from_body(&self.body)
    }

    /// The `result` field of a successful body, or `Null` when absent.
    pub fn into_result(self) -> Value {
        match self.body {
            Value::Object(mut map) => map.remove("result").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// Advisory parameters attached to some API errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ResponseParameters {
    /// Milliseconds to wait before the next request (429 only)
    #[serde(default)]
    retry_after: Option<u64>,
    /// Chat the group was migrated to
    #[serde(default)]
    migrate_to_chat_id: Option<i64>,
}

/// Error payload returned by the API alongside a 4xx status.
///
/// Each field is read on its own, so one malformed field never hides the
/// others. A proxy's HTML error page yields all defaults and classifies by
/// status alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ApiErrorData {
    /// Always false on errors
    #[serde(default)]
    ok: bool,
    /// API error code, usually the HTTP status
    #[serde(default)]
    error_code: Option<i64>,
    /// Human-readable reason
    #[serde(default)]
    description: Option<String>,
    /// Advisory parameters
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

impl ApiErrorData {
    /// Parse leniently from a response body.
    pub fn from_body(body: &Value) -> Self {
        let parameters = body
            .get("parameters")
            .filter(|parameters| parameters.is_object())
            .map(|_| ResponseParameters {
                retry_after: body
                    .pointer("/parameters/retry_after")
                    .and_then(as_u64_lenient),
                migrate_to_chat_id: body
                    .pointer("/parameters/migrate_to_chat_id")
                    .and_then(as_i64_lenient),
            });
        Self {
            ok: body.get("ok").and_then(Value::as_bool).unwrap_or_default(),
            error_code: body.get("error_code").and_then(as_i64_lenient),
            description: body
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            parameters,
        }
    }

    /// The advisory retry delay, zero when absent.
    pub fn retry_after(&self) -> Duration {
        let millis = self
            .parameters
            .as_ref()
            .and_then(|parameters| parameters.retry_after)
            .unwrap_or(0);
        Duration::from_millis(millis)
    }
}

/// Integer from a JSON number (truncating floats) or a numeric string.
fn as_i64_lenient(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Non-negative integer, read like [`as_i64_lenient`].
fn as_u64_lenient(value: &Value) -> Option<u64> {
    as_i64_lenient(value).and_then(|n| u64::try_from(n).ok())
}
