//! Tracing initialization.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Environment variable holding the filter directives; `RUST_LOG` is the fallback.
pub const FILTER_ENV: &str = "TEXSYNC_LOG";

/// Output layout of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

fn filter(is_test: bool) -> EnvFilter {
    let fallback = if is_test {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    std::env::var(FILTER_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::from_default_env().add_directive(fallback.into()))
}

/// Initialize tracing. Safe to call multiple times; only the first call counts.
pub fn init(format: LogFormat) {
    INIT.call_once(|| {
        let is_test =
            std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok();

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter(is_test))
            .with_ansi(false)
            .with_target(true)
            .with_writer(std::io::stderr);

        let result = match (format, is_test) {
            (_, true) => builder.with_test_writer().compact().try_init(),
            (LogFormat::Compact, false) => builder.compact().try_init(),
            (LogFormat::Json, false) => builder.json().try_init(),
        };
        if let Err(e) = result {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}
