//! # Logging
//!
//! `tracing` subscriber setup for hosts that do not install their own, plus
//! helpers that keep OAuth credentials out of log output.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! init_logging(LoggingConfig::default().with_format(LogFormat::Json))?;
//! tracing::info!("Receipt connector started");
//! ```
//!
//! The filter is taken from, in order: [`LoggingConfig::with_filter`], the
//! `RUST_LOG` environment variable, then `warn` for dependencies and the
//! configured level for the connector crates.
//!
//! Tokens never appear as event fields. URLs that can carry one (the
//! authorization URL and the redirect callback) go through [`redact_url`].

use crate::error::{Error, Result};

use std::io;

use tracing::Level;
use tracing_subscriber::{
    filter::EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
    Layer,
};

/// Crates whose events are shown at the configured level by default
const CONNECTOR_TARGETS: &[&str] = &[
    "core_runtime",
    "core_auth",
    "core_upload",
    "core_service",
    "bridge_desktop",
];

/// OAuth parameters whose values are replaced by [`REDACTED`]
const SENSITIVE_PARAMS: &[&str] = &[
    "access_token",
    "refresh_token",
    "id_token",
    "code",
    "state",
    "client_secret",
];

pub const REDACTED: &str = "[REDACTED]";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human readable
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
    /// Single line per event
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the connector crates
    pub level: Level,
    /// Full `EnvFilter` directive string, overrides `level` and `RUST_LOG`
    pub filter: Option<String>,
    /// Log span close events with their duration
    pub span_timings: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            filter: None,
            span_timings: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_span_timings(mut self, enabled: bool) -> Self {
        self.span_timings = enabled;
        self
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// `Error::Logging` if the filter does not parse or a global subscriber is
/// already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let span_events = if config.span_timings {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let fmt = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_writer(io::stdout);

    let output = match config.format {
        LogFormat::Pretty => fmt.pretty().boxed(),
        LogFormat::Json => fmt.json().flatten_event(true).with_current_span(true).boxed(),
        LogFormat::Compact => fmt.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Some(directives) = &config.filter {
        return EnvFilter::try_new(directives)
            .map_err(|e| Error::Logging(format!("Invalid log filter '{}': {}", directives, e)));
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(default_directives(config.level))
        .map_err(|e| Error::Logging(format!("Invalid default log filter: {}", e)))
}

fn default_directives(level: Level) -> String {
    let level = level.to_string().to_ascii_lowercase();
    std::iter::once("warn".to_string())
        .chain(
            CONNECTOR_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, level)),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether an OAuth parameter carries a credential.
pub fn is_sensitive_param(name: &str) -> bool {
    SENSITIVE_PARAMS
        .iter()
        .any(|param| name.eq_ignore_ascii_case(param))
}

/// Masks credential values in a URL's query and fragment.
///
/// Other parameters, such as `error` on a failed redirect, are kept.
///
/// ```
/// use core_runtime::logging::redact_url;
///
/// assert_eq!(
///     redact_url("db-abc://2/token#access_token=sl.secret&token_type=bearer"),
///     "db-abc://2/token#access_token=[REDACTED]&token_type=bearer"
/// );
/// ```
pub fn redact_url(url: &str) -> String {
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = match head.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (head, None),
    };

    let mut redacted = base.to_string();
    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&redact_params(query));
    }
    if let Some(fragment) = fragment {
        redacted.push('#');
        redacted.push_str(&redact_params(fragment));
    }
    redacted
}

fn redact_params(params: &str) -> String {
    params
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if is_sensitive_param(name) => format!("{}={}", name, REDACTED),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_connector_crates() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("core_auth=debug"));
        assert!(directives.contains("core_upload=debug"));
        assert!(directives.contains("bridge_desktop=debug"));
    }

    #[test]
    fn test_custom_filter_wins() {
        let config = LoggingConfig::default().with_filter("core_auth=trace");
        let filter = build_filter(&config).unwrap();
        assert_eq!(filter.to_string(), "core_auth=trace");
    }

    #[test]
    fn test_invalid_custom_filter() {
        let config = LoggingConfig::default().with_filter("core_auth=loud");
        assert!(matches!(build_filter(&config), Err(Error::Logging(_))));
    }

    #[test]
    fn test_sensitive_params() {
        assert!(is_sensitive_param("access_token"));
        assert!(is_sensitive_param("STATE"));
        assert!(!is_sensitive_param("error"));
        assert!(!is_sensitive_param("expires_in"));
    }

    #[test]
    fn test_redact_url_keeps_structure() {
        assert_eq!(redact_url("db-abc://2/token"), "db-abc://2/token");
        assert_eq!(
            redact_url("db-abc://2/token?error=access_denied&state=s1"),
            "db-abc://2/token?error=access_denied&state=[REDACTED]"
        );
        assert_eq!(redact_url("db-abc://2/token#"), "db-abc://2/token#");
    }
}
