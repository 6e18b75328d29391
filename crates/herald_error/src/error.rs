//! Top-level error wrapper types.

use crate::{BuilderError, ConfigError, JsonError, RestError};

/// Foundation error enum aggregating every Herald error domain.
///
/// # Examples
///
/// ```
/// use herald_error::{HeraldError, RestError, RestErrorKind};
///
/// let err: HeraldError = RestError::new(RestErrorKind::MissingToken).into();
/// assert!(format!("{}", err).contains("token"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum HeraldErrorKind {
    /// Dispatcher error
    #[from(RestError)]
    Rest(RestError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
}

/// Herald error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Herald Error: {}", _0)]
pub struct HeraldError(Box<HeraldErrorKind>);

impl HeraldError {
    /// Create a new error from a kind.
    pub fn new(kind: HeraldErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &HeraldErrorKind {
        &self.0
    }

    /// The dispatcher error inside, if this is one.
    pub fn as_rest(&self) -> Option<&RestError> {
        match self.kind() {
            HeraldErrorKind::Rest(err) => Some(err),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to HeraldErrorKind
impl<T> From<T> for HeraldError
where
    T: Into<HeraldErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Herald operations.
///
/// # Examples
///
/// ```
/// use herald_error::{ConfigError, HeraldResult};
///
/// fn load() -> HeraldResult<()> {
///     Err(ConfigError::new("api must be an absolute URL"))?
/// }
///
/// assert!(load().is_err());
/// ```
pub type HeraldResult<T> = std::result::Result<T, HeraldError>;
