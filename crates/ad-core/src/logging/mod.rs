//! Structured logging for abc-diag.
//!
//! - stdout is reserved for command payloads (JSON or summary lines)
//! - stderr receives all log output, human-readable or JSON lines

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter for the workspace crates and the `abc-diag` binary at `level`.
///
/// `RUST_LOG` is not read here; [`LogConfig::from_env`] has already folded it
/// in below `AD_LOG` and the CLI flags.
pub fn log_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(format!(
        "abc_diag={level},ad_core={level},ad_config={level}",
        level = level
    ))
}

/// Initialize the logging subsystem.
///
/// Call once at startup. A second call is a no-op.
pub fn init_logging(config: &LogConfig) {
    let filter = log_filter(config.level);

    let result = match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}
