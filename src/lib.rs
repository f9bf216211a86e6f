pub mod analysis; // Prompting, transport, normalization, model fallback
pub mod config;
pub mod medications; // Medication list session + interaction slot
pub mod models;
pub mod predictor; // Offline keyword predictor

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Called once by the binary.
///
/// `RUST_LOG` takes precedence over `config::default_log_filter()`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
}
