//! Tracing setup: console output plus an optional rolling log file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

const DEFAULT_FILTER: &str = "context_keeper=info,tower_http=info";

/// Installs the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file logs are lost.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // JSON in production so log shippers can parse it.
    let console = if config.is_production() {
        fmt::layer().json().with_current_span(true).boxed()
    } else {
        fmt::layer().compact().with_target(false).boxed()
    };

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "context_keeper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .try_init()?;

    Ok(guard)
}
