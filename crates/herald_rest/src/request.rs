//! Logical request types submitted by callers.

use derive_getters::Getters;
use derive_setters::Setters;
use herald_error::BuilderError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Routing key used when a request does not name one.
///
/// The upstream API applies a single global limit, so by default every
/// request is serialized through the same queue.
pub const GLOBAL_ROUTE_KEY: &str = "global";

/// HTTP verbs accepted by the dispatcher.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    /// DELETE
    Delete,
    /// GET
    Get,
    /// PATCH
    Patch,
    /// POST
    Post,
    /// PUT
    Put,
}

impl RequestMethod {
    /// Whether a body may be sent with this verb.
    pub fn allows_body(&self) -> bool {
        !matches!(self, RequestMethod::Get)
    }
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Delete => reqwest::Method::DELETE,
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// Contents of an attached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileData {
    /// Binary payload; content type is sniffed when not declared
    Bytes(Vec<u8>),
    /// Textual payload, sent with the declared content type as-is
    Text(String),
}

impl From<Vec<u8>> for FileData {
    fn from(bytes: Vec<u8>) -> Self {
        FileData::Bytes(bytes)
    }
}

impl From<&[u8]> for FileData {
    fn from(bytes: &[u8]) -> Self {
        FileData::Bytes(bytes.to_vec())
    }
}

impl From<String> for FileData {
    fn from(text: String) -> Self {
        FileData::Text(text)
    }
}

impl From<&str> for FileData {
    fn from(text: &str) -> Self {
        FileData::Text(text.to_string())
    }
}

/// A file attached to a multipart request.
///
/// # Example
///
/// ```
/// use herald_rest::RawFile;
///
/// let photo = RawFile::new("cat.png", vec![0x89, b'P', b'N', b'G'])
///     .with_key("photo");
/// assert_eq!(photo.key().as_deref(), Some("photo"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters)]
#[setters(prefix = "with_", strip_option, into)]
pub struct RawFile {
    /// File name reported in the form part
    #[setters(skip)]
    name: String,
    /// File contents
    #[setters(skip)]
    data: FileData,
    /// Declared content type
    content_type: Option<String>,
    /// Form field name; defaults to `files[{index}]`
    key: Option<String>,
}

impl RawFile {
    /// Create a file attachment with no declared content type or field name.
    pub fn new(name: impl Into<String>, data: impl Into<FileData>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            content_type: None,
            key: None,
        }
    }
}

/// Per-request options accepted by [`Rest`](crate::Rest) verb helpers.
///
/// # Example
///
/// ```
/// use herald_rest::RequestData;
/// use serde_json::json;
///
/// let data = RequestData::builder()
///     .body(json!({"chat_id": 42, "text": "hello"}))
///     .query_param("disable_notification", "true")
///     .build()
///     .expect("all fields have defaults");
/// assert_eq!(data.query().len(), 1);
/// ```
#[derive(Debug, Clone, Default, Getters, derive_builder::Builder)]
#[builder(
    pattern = "owned",
    default,
    setter(into, strip_option),
    build_fn(private, name = "build_internal")
)]
pub struct RequestData {
    /// Token used for this request only, instead of the dispatcher default
    token: Option<String>,
    /// Body; JSON-encoded unless `pass_through_body` is set or files are attached
    body: Option<serde_json::Value>,
    /// Files to upload as multipart form data
    files: Vec<RawFile>,
    /// Extra headers for this request
    headers: Vec<(String, String)>,
    /// Query string parameters, in order
    query: Vec<(String, String)>,
    /// Send the body verbatim instead of JSON-encoding it
    pass_through_body: bool,
    /// Cancels the queue wait, the rate limit wait and the transport call
    signal: Option<CancellationToken>,
    /// Routing key; defaults to [`GLOBAL_ROUTE_KEY`]
    route_key: Option<String>,
}

impl RequestData {
    /// Start building request options.
    pub fn builder() -> RequestDataBuilder {
        RequestDataBuilder::default()
    }

    /// Routing key this request is serialized under.
    pub fn resolved_route_key(&self) -> &str {
        self.route_key.as_deref().unwrap_or(GLOBAL_ROUTE_KEY)
    }

    /// Names of the attached files, for diagnostics.
    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|file| file.name.clone()).collect()
    }
}

impl RequestDataBuilder {
    /// Append one header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Append one query string parameter.
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Attach one file.
    pub fn file(mut self, file: RawFile) -> Self {
        self.files.get_or_insert_with(Vec::new).push(file);
        self
    }

    /// Build the RequestData.
    ///
    /// # Errors
    ///
    /// Returns error if the builder is internally inconsistent.
    pub fn build(self) -> Result<RequestData, BuilderError> {
        self.build_internal()
            .map_err(|e| BuilderError::from(e.to_string()))
    }
}

/// A fully described logical request: verb, route and options.
///
/// Immutable once submitted.
#[derive(Debug, Clone, Getters)]
pub struct RequestDescriptor {
    method: RequestMethod,
    route: String,
    data: RequestData,
}

impl RequestDescriptor {
    /// Describe a request for `route`, which must start with `/`.
    pub fn new(method: RequestMethod, route: impl Into<String>, data: RequestData) -> Self {
        Self {
            method,
            route: route.into(),
            data,
        }
    }
}
