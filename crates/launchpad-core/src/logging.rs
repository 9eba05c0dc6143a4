use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::CoreError;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,launchpad_core=debug,chain_eth=debug,chain_sol=debug";

/// Builds the filter: `RUST_LOG` wins, otherwise `filter`.
pub fn env_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
}

/// Installs a global subscriber with a compact console layer.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(filter: &str) -> Result<(), CoreError> {
    tracing_subscriber::registry()
        .with(env_filter(filter))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| CoreError::Internal(format!("Failed to initialize logging: {e}")))
}
