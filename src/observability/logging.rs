//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. JSON output is used when
/// `json_logs` is set (production), a human-readable format otherwise.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("mesh_control={},tower_http=info", config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}
