//! Turning a logical request into a concrete HTTP request.
//!
//! Resolution happens once per logical request, before it is queued. The
//! result is replayed unchanged for every retry.

use crate::config::RestOptions;
use crate::request::{FileData, RequestDescriptor};
use crate::sniff::content_type_or_default;
use derive_getters::Getters;
use herald_error::{RequestContext, RestError, RestErrorKind, RestResult};
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{instrument, trace};

/// Placeholder substituted for the credential in logged URLs.
pub const REDACTED: &str = "<redacted>";

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// Plain text field
    Text {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// File field
    File {
        /// Field name
        field: String,
        /// Reported file name
        file_name: String,
        /// MIME type of the part
        content_type: String,
        /// Raw contents
        data: Vec<u8>,
    },
}

/// Encoded request body, cloneable so retries can resend it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportBody {
    /// No body
    #[default]
    Empty,
    /// Raw bytes (JSON or pass-through)
    Bytes(Vec<u8>),
    /// multipart/form-data
    Multipart(Vec<FormPart>),
}

/// A fully resolved HTTP request.
#[derive(Debug, Clone, Getters)]
pub struct TransportRequest {
    /// HTTP method
    method: reqwest::Method,
    /// Full URL including the credential
    url: Url,
    /// Merged headers
    headers: HeaderMap,
    /// Encoded body
    body: TransportBody,
    /// Redacted diagnostics for events and errors
    context: RequestContext,
}

impl TransportRequest {
    /// URL with the credential replaced, safe to log.
    pub fn redacted_url(&self) -> &str {
        &self.context.url
    }
}

fn encoding_error(message: impl Into<String>) -> RestError {
    RestError::new(RestErrorKind::Encoding(message.into()))
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> RestResult<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| encoding_error(format!("Invalid header name '{}': {}", name, e)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| encoding_error(format!("Invalid value for header '{}': {}", name, e)))?;
    headers.insert(name, value);
    Ok(())
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn build_url(api: &str, token: &str, descriptor: &RequestDescriptor) -> RestResult<(Url, String)> {
    let route = descriptor.route();
    if route.is_empty() || !route.starts_with('/') {
        return Err(RestError::new(RestErrorKind::InvalidRoute {
            route: route.clone(),
            reason: "route must be a non-empty path starting with '/'".to_string(),
        }));
    }

    let base = api.trim_end_matches('/');
    let mut url = Url::parse(&format!("{}/bot{}{}", base, token, route)).map_err(|e| {
        RestError::new(RestErrorKind::InvalidRoute {
            route: route.clone(),
            reason: e.to_string(),
        })
    })?;

    let query = descriptor.data().query();
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }

    let mut redacted = format!("{}/bot{}{}", base, REDACTED, route);
    if let Some(query) = url.query() {
        redacted.push('?');
        redacted.push_str(query);
    }
    Ok((url, redacted))
}

fn multipart_parts(descriptor: &RequestDescriptor) -> RestResult<Vec<FormPart>> {
    let data = descriptor.data();
    let mut parts = Vec::with_capacity(data.files().len());

    for (index, file) in data.files().iter().enumerate() {
        let field = file
            .key()
            .clone()
            .unwrap_or_else(|| format!("files[{}]", index));
        let (content_type, bytes) = match file.data() {
            FileData::Bytes(bytes) => (
                file.content_type()
                    .clone()
                    .unwrap_or_else(|| content_type_or_default(bytes).to_string()),
                bytes.clone(),
            ),
            FileData::Text(text) => (
                file.content_type()
                    .clone()
                    .unwrap_or_else(|| "text/plain".to_string()),
                text.clone().into_bytes(),
            ),
        };
        parts.push(FormPart::File {
            field,
            file_name: file.name().clone(),
            content_type,
            data: bytes,
        });
    }

    match data.body() {
        None | Some(Value::Null) => {}
        Some(Value::Object(fields)) => {
            for (name, value) in fields {
                parts.push(FormPart::Text {
                    name: name.clone(),
                    value: text_value(value),
                });
            }
        }
        Some(_) => {
            return Err(encoding_error(
                "a body sent alongside files must be a JSON object",
            ));
        }
    }

    Ok(parts)
}

/// Resolve URL, headers and body for `descriptor`, authenticated with `token`.
///
/// Header precedence, lowest first: per-request headers, the JSON content
/// type, configured defaults, then the user agent.
///
/// # Errors
///
/// Returns [`RestErrorKind::InvalidRoute`] for a malformed route and
/// [`RestErrorKind::Encoding`] for unencodable headers or bodies.
#[instrument(skip(options, token, descriptor), fields(route = %descriptor.route(), method = %descriptor.method()))]
pub fn resolve_request(
    options: &RestOptions,
    token: &str,
    descriptor: &RequestDescriptor,
) -> RestResult<TransportRequest> {
    let data = descriptor.data();
    let (url, redacted_url) = build_url(options.api(), token, descriptor)?;

    let mut headers = HeaderMap::new();
    for (name, value) in data.headers() {
        insert_header(&mut headers, name, value)?;
    }

    let body = if !descriptor.method().allows_body() {
        TransportBody::Empty
    } else if !data.files().is_empty() {
        TransportBody::Multipart(multipart_parts(descriptor)?)
    } else {
        match data.body() {
            None | Some(Value::Null) => TransportBody::Empty,
            Some(body) if *data.pass_through_body() => {
                TransportBody::Bytes(text_value(body).into_bytes())
            }
            Some(body) => {
                insert_header(&mut headers, CONTENT_TYPE.as_str(), "application/json")?;
                TransportBody::Bytes(
                    serde_json::to_vec(body).map_err(|e| encoding_error(e.to_string()))?,
                )
            }
        }
    };

    for (name, value) in options.headers() {
        insert_header(&mut headers, name, value)?;
    }
    insert_header(&mut headers, USER_AGENT.as_str(), options.user_agent())?;

    let context = RequestContext {
        method: descriptor.method().to_string(),
        url: redacted_url,
        body: data.body().clone(),
        files: data.file_names(),
        response_body: None,
    };
    trace!(url = %context.url, "Request resolved");

    Ok(TransportRequest {
        method: (*descriptor.method()).into(),
        url,
        headers,
        body,
        context,
    })
}
