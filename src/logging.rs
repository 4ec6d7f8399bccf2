//! Optional tracing output for azdo-remote.
//!
//! Logging stays off unless a level is given with `--log-level` or
//! `AZDO_LOG_LEVEL`. Output goes to stderr, or to `--log-file` /
//! `AZDO_LOG_FILE`, as text or JSON (`--log-format` / `AZDO_LOG_FORMAT`).

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub const LOG_LEVEL_ENV: &str = "AZDO_LOG_LEVEL";
pub const LOG_FILE_ENV: &str = "AZDO_LOG_FILE";
pub const LOG_FORMAT_ENV: &str = "AZDO_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Where and how to log.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// `None` disables logging.
    pub level: Option<LogLevel>,
    /// `None` logs to stderr.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

/// Flushes pending log lines when dropped. Hold it until exit.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// Returns `None` when logging is disabled, the log file cannot be opened or
/// a subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use azdo_remote::logging::{LogConfig, LogFormat, LogLevel, init_logging};
///
/// let _guard = init_logging(LogConfig {
///     level: Some(LogLevel::Debug),
///     file: None,
///     format: LogFormat::Json,
/// });
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: LogConfig) -> Option<LogGuard> {
    let level = config.level?;

    // Dependencies (reqwest, hyper) stay quiet.
    let filter = EnvFilter::new(format!("azdo_remote={}", level.as_filter_str()));

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };
    let to_file = config.file.is_some();

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_file(to_file)
            .with_line_number(to_file)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_level(true)
            .with_ansi(!to_file)
            .compact()
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init().ok()?;

    Some(LogGuard { _guard: guard })
}

/// Read the logging flags before the full command line is parsed, so that
/// configuration loading itself can log.
///
/// Precedence: CLI args > environment variables.
#[must_use]
pub fn parse_early_log_config(args: &[String]) -> LogConfig {
    let level = extract_arg_value(args, "--log-level").or_else(|| std::env::var(LOG_LEVEL_ENV).ok());
    let file = extract_arg_value(args, "--log-file").or_else(|| std::env::var(LOG_FILE_ENV).ok());
    let format = extract_arg_value(args, "--log-format").or_else(|| std::env::var(LOG_FORMAT_ENV).ok());

    LogConfig {
        level: level.and_then(|s| LogLevel::parse(&s)),
        file: file.filter(|f| !f.is_empty()).map(PathBuf::from),
        format: format.and_then(|s| LogFormat::parse(&s)).unwrap_or_default(),
    }
}

/// Value of `--flag value` or `--flag=value`.
fn extract_arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    args.iter().enumerate().find_map(|(i, arg)| {
        if arg == flag {
            args.get(i + 1).cloned()
        } else {
            arg.strip_prefix(&prefix).map(str::to_string)
        }
    })
}
