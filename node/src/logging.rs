//! # Logging
//!
//! `tracing` subscriber setup for `pledge-node`. Every event goes to stderr:
//! `replay` owns stdout for its per-step JSON lines, and `run` logs the
//! transfer intents it hands to the executor.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selected with `--log-format` or `PLEDGE_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Colored text with source locations.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs the global subscriber. Panics if one is already installed.
///
/// `RUST_LOG` wins over `default_filter` when set; each subcommand passes
/// its own filter, e.g. `replay` keeps vault chatter at `warn`.
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }

    tracing::debug!(?format, "logging ready");
}
