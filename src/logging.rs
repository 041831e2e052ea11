//! Structured logging for the loader
//!
//! Console output goes to stderr so the success report on stdout stays
//! machine readable. Two formats are supported:
//!
//! ```text
//! text → 2026-10-18T10:00:00Z  INFO bpflock::deploy::pipeline: step finished step=load
//! json → {"timestamp":"…","level":"INFO","fields":{"message":"step finished","step":"load"}}
//! ```

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `--log-level` nor `RUST_LOG` is set
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "incorrect log format '{}', expected 'text' or 'json'",
                other
            )),
        }
    }
}

/// Initialize the global subscriber.
///
/// An unparsable level or format falls back to the default and is reported
/// once the subscriber is up, so the warning itself is not lost.
pub fn init_logging(
    level: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut warnings = Vec::new();

    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|e| {
            warnings.push(format!("ignoring log level '{}': {}", level, e));
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    let format = format.parse::<LogFormat>().unwrap_or_else(|e| {
        warnings.push(e);
        LogFormat::default()
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .try_init()?,
    }

    for warning in warnings {
        tracing::warn!("{}", warning);
    }

    Ok(())
}
