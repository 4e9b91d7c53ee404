//! Log output for the bookshelf web tier and worker.
//!
//! Both roles share one subscriber. Work-item lines carry `book_id` as a
//! field, so JSON output lets a log collector follow a book from the
//! producer's publish to the worker's `Updated book` line.
//!
//! Environment:
//! - `RUST_LOG`: filter directives, `info` when unset or unparsable
//! - `LOG_JSON`: `1` or `true` for one JSON object per line
//! - `LOG_SPANS`: `1` or `true` to log span open and close, which times
//!   each HTTP request and each processed book

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for local runs.
    #[default]
    Pretty,
    /// Newline-delimited JSON with source file and line.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub format: LogFormat,
    pub span_timings: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Pretty,
            span_timings: false,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("RUST_LOG").ok().as_deref(),
            std::env::var("LOG_JSON").ok().as_deref(),
            std::env::var("LOG_SPANS").ok().as_deref(),
        )
    }

    fn from_values(filter: Option<&str>, json: Option<&str>, spans: Option<&str>) -> Self {
        Self {
            filter: filter
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(DEFAULT_FILTER)
                .to_string(),
            format: if parse_flag(json) {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            span_timings: parse_flag(spans),
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Installs the global subscriber. A second call keeps the first one,
/// which lets tests and the binary share this entry point.
pub fn init_tracing(settings: &LogSettings) {
    let filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let spans = if settings.span_timings {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(spans)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_span_events(spans))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(filter = %settings.filter, format = ?settings.format, "Logging ready");
    }
}

pub fn init_tracing_from_env() {
    init_tracing(&LogSettings::from_env());
}
