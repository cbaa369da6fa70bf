//! Semantic validation of a loaded configuration.
//!
//! Reports missing credentials, unusable SMTP settings and out-of-range
//! digest settings before the relay connects anywhere.

use secrecy::ExposeSecret;

use crate::schema::SlackntellConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "smtp.host"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Validate `config`.
#[must_use]
pub fn validate(config: &SlackntellConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.slack.token.expose_secret().trim().is_empty() {
        result.push(Severity::Error, "slack.token", "access token is required");
    }
    if config.slack.app_token.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "slack.app_token",
            "app-level token is required to open the event stream",
        );
    } else if !config.slack.app_token.expose_secret().starts_with("xapp-") {
        result.push(
            Severity::Warning,
            "slack.app_token",
            "app-level tokens normally start with `xapp-`",
        );
    }
    if url::Url::parse(&config.slack.api_base).is_err() {
        result.push(Severity::Error, "slack.api_base", "not a valid URL");
    }

    let required = [
        ("smtp.host", &config.smtp.host),
        ("smtp.username", &config.smtp.username),
        ("smtp.from", &config.smtp.from),
        ("smtp.to", &config.smtp.to),
    ];
    for (path, value) in required {
        if value.trim().is_empty() {
            result.push(Severity::Error, path, "must not be empty");
        }
    }
    for (path, value) in [("smtp.from", &config.smtp.from), ("smtp.to", &config.smtp.to)] {
        if !value.trim().is_empty() && !value.contains('@') {
            result.push(Severity::Error, path, format!("`{value}` is not an address"));
        }
    }
    if config.smtp.port == 0 {
        result.push(Severity::Error, "smtp.port", "must be non-zero");
    }

    if config.digest.rate_window_secs == 0 {
        result.push(
            Severity::Warning,
            "digest.rate_window_secs",
            "zero disables coalescing; every message sends its own email",
        );
    }
    if config.digest.lookback_secs == 0 {
        result.push(
            Severity::Error,
            "digest.lookback_secs",
            "must be non-zero or every digest is empty",
        );
    }
    if config.digest.history_limit == 0 {
        result.push(Severity::Error, "digest.history_limit", "must be non-zero");
    }
    if config.digest.timezone.parse::<chrono_tz::Tz>().is_err() {
        result.push(
            Severity::Error,
            "digest.timezone",
            format!("unknown timezone `{}`", config.digest.timezone),
        );
    }

    if config.supervisor.health_interval_secs == 0 {
        result.push(
            Severity::Error,
            "supervisor.health_interval_secs",
            "must be non-zero",
        );
    }

    result
}
