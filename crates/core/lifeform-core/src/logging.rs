//! Logging utilities

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber
///
/// The filter comes from `LIFEFORM_LOG_LEVEL`, then `RUST_LOG`, then `info`.
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_logging() {
    let filter = std::env::var("LIFEFORM_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        tracing::info!("logging initialized twice without panicking");
    }
}
