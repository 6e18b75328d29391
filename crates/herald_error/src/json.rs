//! Errors decoding API results.

/// Stage of decoding that failed, mirroring `serde_json`'s categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum JsonErrorCategory {
    /// Malformed JSON text
    #[display("syntax")]
    Syntax,
    /// Well-formed JSON of the wrong shape for the target type
    #[display("shape")]
    Data,
    /// Input ended early
    #[display("eof")]
    Eof,
    /// Reader failure
    #[display("io")]
    Io,
}

/// A value that could not be decoded, with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("JSON Error ({}): {} at line {} in {}", category, message, line, file)]
pub struct JsonError {
    /// Stage of decoding that failed
    pub category: JsonErrorCategory,
    /// The decoder's message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl JsonError {
    /// Create a JsonError at the current location.
    #[track_caller]
    pub fn new(category: JsonErrorCategory, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            category,
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// True when the JSON was valid but did not match the requested type.
    ///
    /// # Examples
    ///
    /// ```
    /// use herald_error::JsonError;
    ///
    /// let err = JsonError::from(serde_json::from_value::<u32>(serde_json::json!("x")).unwrap_err());
    /// assert!(err.is_shape_mismatch());
    /// ```
    pub fn is_shape_mismatch(&self) -> bool {
        self.category == JsonErrorCategory::Data
    }
}

impl From<serde_json::Error> for JsonError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        let category = match err.classify() {
            serde_json::error::Category::Syntax => JsonErrorCategory::Syntax,
            serde_json::error::Category::Data => JsonErrorCategory::Data,
            serde_json::error::Category::Eof => JsonErrorCategory::Eof,
            serde_json::error::Category::Io => JsonErrorCategory::Io,
        };
        Self::new(category, err.to_string())
    }
}
