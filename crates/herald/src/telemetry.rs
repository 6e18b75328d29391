use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,herald=debug";

/// Install a console subscriber filtered by `RUST_LOG`, defaulting to
/// `info,herald=debug`.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing_with(DEFAULT_FILTER)
}

/// Install a console subscriber with `default_filter` as the fallback directive.
///
/// Log lines go to stderr so command output on stdout stays parseable.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_tracing_with(
    default_filter: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    debug!(default_filter, "Tracing initialized");
    Ok(())
}
