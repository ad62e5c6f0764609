use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum LogFormat {
    Json,
    Compact,
    Pretty,
}

/// Installs the global subscriber, writing to stderr so command output stays clean.
///
/// `-v` flags take precedence over `RUST_LOG`; without them `RUST_LOG` applies and
/// falls back to `warn`. `AIENV_LOG_FORMAT` picks `json`, `compact` or `pretty`.
pub(crate) fn init(verbosity: u8) -> Result<()> {
    let env_filter = match verbosity_filter(verbosity) {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let format = parse_log_format(std::env::var("AIENV_LOG_FORMAT").ok().as_deref());

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false).json())
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().with_writer(std::io::stderr).compact())
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).pretty())
            .try_init(),
    };
    result.map_err(|err| anyhow!("failed to initialize logging: {err}"))
}

pub(crate) fn verbosity_filter(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

pub(crate) fn parse_log_format(value: Option<&str>) -> LogFormat {
    match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        Some("json") => LogFormat::Json,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::Compact,
    }
}
