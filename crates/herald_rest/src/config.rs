//! Dispatcher configuration.
//!
//! Values are layered with the `config` crate:
//! - Bundled defaults (include_str! from herald.toml)
//! - User overrides (~/.config/herald/herald.toml, then ./herald.toml)
//! - `HERALD__REST__*` environment variables, highest precedence

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use derive_setters::Setters;
use herald_error::{BuilderError, ConfigError, HeraldError, HeraldResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

fn default_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_global_requests_per_second() -> u32 {
    50
}

fn default_window_ms() -> u64 {
    1_000
}

fn default_offset_ms() -> u64 {
    50
}

fn default_handler_sweep_interval_ms() -> u64 {
    3_600_000
}

fn default_user_agent() -> String {
    format!(
        "Herald ({}, {})",
        env!("CARGO_PKG_REPOSITORY"),
        env!("CARGO_PKG_VERSION")
    )
}

fn default_event_capacity() -> usize {
    256
}

/// Options for a [`Rest`](crate::Rest) dispatcher.
///
/// # Example
///
/// ```toml
/// [rest]
/// api = "https://api.telegram.org"
/// retries = 3
/// timeout_ms = 15_000
/// global_requests_per_second = 50
/// handler_sweep_interval_ms = 0   # never sweep
///
/// [rest.headers]
/// X-Client = "herald"
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_", into)]
#[builder(
    pattern = "owned",
    default,
    setter(into),
    build_fn(private, name = "build_internal")
)]
pub struct RestOptions {
    /// Base URL of the API, without trailing slash
    #[serde(default = "default_api")]
    api: String,

    /// Headers sent with every request
    #[serde(default)]
    headers: BTreeMap<String, String>,

    /// Counted retries allowed per request (server and transport failures)
    #[serde(default = "default_retries")]
    retries: u32,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,

    /// Requests allowed per global window
    #[serde(default = "default_global_requests_per_second")]
    global_requests_per_second: u32,

    /// Length of the global window in milliseconds
    #[serde(default = "default_window_ms")]
    window_ms: u64,

    /// Extra delay added to every rate limit wait
    #[serde(default = "default_offset_ms")]
    offset_ms: u64,

    /// How often idle routing keys are swept, 0 disables sweeping
    #[serde(default = "default_handler_sweep_interval_ms")]
    handler_sweep_interval_ms: u64,

    /// Warn every this many invalid requests, 0 disables warnings
    #[serde(default)]
    invalid_request_warning_interval: u32,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    user_agent: String,

    /// Capacity of the lifecycle event channel
    #[serde(default = "default_event_capacity")]
    event_capacity: usize,
}

impl Default for RestOptions {
    fn default() -> Self {
        Self {
            api: default_api(),
            headers: BTreeMap::new(),
            retries: default_retries(),
            timeout_ms: default_timeout_ms(),
            global_requests_per_second: default_global_requests_per_second(),
            window_ms: default_window_ms(),
            offset_ms: default_offset_ms(),
            handler_sweep_interval_ms: default_handler_sweep_interval_ms(),
            invalid_request_warning_interval: 0,
            user_agent: default_user_agent(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl RestOptions {
    /// Start building options from the defaults.
    pub fn builder() -> RestOptionsBuilder {
        RestOptionsBuilder::default()
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Length of the global window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Safety offset added to rate limit waits.
    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.offset_ms)
    }

    /// Sweep interval, or `None` when sweeping is disabled.
    pub fn handler_sweep_interval(&self) -> Option<Duration> {
        (self.handler_sweep_interval_ms > 0)
            .then(|| Duration::from_millis(self.handler_sweep_interval_ms))
    }
}

impl RestOptionsBuilder {
    /// Build the options.
    ///
    /// # Errors
    ///
    /// Returns error if the API base URL is empty.
    pub fn build(self) -> Result<RestOptions, BuilderError> {
        let options = self
            .build_internal()
            .map_err(|e| BuilderError::from(e.to_string()))?;
        if options.api.trim().is_empty() {
            return Err(BuilderError::from("api must not be empty".to_string()));
        }
        Ok(options)
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct HeraldConfig {
    /// Dispatcher options
    #[serde(default)]
    rest: RestOptions,
}

impl HeraldConfig {
    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> HeraldResult<Self> {
        debug!("Loading configuration from file");
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                HeraldError::from(
                    ConfigError::new(format!("Failed to read configuration: {}", e))
                        .with_path(&path),
                )
            })?
            .try_deserialize()
            .map_err(|e| {
                HeraldError::from(
                    ConfigError::new(format!("Failed to parse configuration: {}", e))
                        .with_path(&path),
                )
            })
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a present file is malformed.
    #[instrument]
    pub fn load() -> HeraldResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../herald.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(config_dir) = dirs::config_dir() {
            let home_config = config_dir.join("herald").join("herald.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("herald").required(false))
            .add_source(Environment::with_prefix("HERALD").separator("__"));

        builder
            .build()
            .map_err(|e| {
                HeraldError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                HeraldError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}
