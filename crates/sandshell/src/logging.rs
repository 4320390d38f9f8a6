//! Logging configuration for Sandshell
//!
//! The library emits `tracing` events and never installs a subscriber.
//!
//! - **DEBUG**: command dispatch, variable assignment, job lifecycle, redirects
//! - **TRACE**: argument resolution and glob expansion
//!
//! Command lines and variable values are user data. [`LogConfig`] decides
//! how much of them reaches a log line.

use std::borrow::Cow;
use std::collections::HashSet;

/// Variable name fragments that mark a value as secret.
const SECRET_NAME_PATTERNS: &[&str] = &[
    "PASSWORD",
    "PASSWD",
    "SECRET",
    "TOKEN",
    "KEY",
    "CREDENTIAL",
    "AUTH",
    "PRIVATE",
    "BEARER",
    "SESSION",
    "COOKIE",
    "DATABASE_URL",
    "AWS_SECRET",
    "AWS_ACCESS",
];

/// Value prefixes of well-known API keys.
const SECRET_VALUE_PREFIXES: &[&str] = &[
    "sk-", "pk-", "sk_live_", "sk_test_", "ghp_", "gho_", "ghs_", "xoxb-", "xoxp-", "AKIA", "eyJ",
];

/// Configuration for logging behavior.
///
/// By default variable values with secret-looking names are hidden, URL
/// credentials are stripped and long values are truncated.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to redact sensitive data from logs (default: true)
    pub redact_sensitive: bool,

    /// Variable name fragments to redact (matched case-insensitively)
    pub redact_env_vars: HashSet<String>,

    /// Whether full command lines are logged (default: false, only a summary)
    pub log_command_lines: bool,

    /// Maximum length of logged values before truncation (default: 200)
    pub max_value_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            redact_sensitive: true,
            redact_env_vars: SECRET_NAME_PATTERNS.iter().map(|p| p.to_string()).collect(),
            log_command_lines: false,
            max_value_length: 200,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable redaction. Only for local debugging.
    pub fn unsafe_disable_redaction(mut self) -> Self {
        self.redact_sensitive = false;
        self
    }

    /// Add a variable name fragment to redact
    pub fn redact_env(mut self, pattern: &str) -> Self {
        self.redact_env_vars.insert(pattern.to_uppercase());
        self
    }

    /// Log full command lines instead of a summary
    pub fn log_command_lines(mut self) -> Self {
        self.log_command_lines = true;
        self
    }

    /// Set maximum length for logged values
    pub fn max_value_length(mut self, len: usize) -> Self {
        self.max_value_length = len;
        self
    }

    /// Check if a variable name should be redacted
    pub fn should_redact_env(&self, name: &str) -> bool {
        if !self.redact_sensitive {
            return false;
        }
        let upper = name.to_uppercase();
        self.redact_env_vars
            .iter()
            .any(|pattern| upper.contains(pattern.as_str()))
    }

    /// Loggable form of a variable's value.
    pub fn variable_value<'a>(&self, name: &str, value: &'a str) -> Cow<'a, str> {
        if self.should_redact_env(name) {
            return Cow::Borrowed("[REDACTED]");
        }
        self.redact_value(value)
    }

    /// Redact a value if it looks like a credential
    pub fn redact_value<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if self.redact_sensitive && is_likely_secret(value) {
            return Cow::Borrowed("[REDACTED]");
        }
        self.truncate(value)
    }

    /// Remove `user:password@` from URLs
    pub fn redact_url<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if !self.redact_sensitive {
            return self.truncate(url);
        }

        if let Some(scheme_end) = url.find("://") {
            let rest = &url[scheme_end + 3..];
            if let Some(at_pos) = rest.find('@') {
                if rest[..at_pos].contains(':') {
                    let scheme = &url[..scheme_end + 3];
                    let host_part = &rest[at_pos + 1..];
                    return Cow::Owned(format!("{}[REDACTED]@{}", scheme, host_part));
                }
            }
        }

        self.truncate(url)
    }

    /// Loggable form of a submitted command line.
    pub fn command_line(&self, line: &str) -> String {
        if !self.log_command_lines {
            return format!("[command: {} bytes]", line.len());
        }
        let sanitized = sanitize_for_log(line);
        self.truncate(&sanitized).into_owned()
    }

    fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            return Cow::Borrowed(value);
        }
        let mut end = self.max_value_length;
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        Cow::Owned(format!(
            "{}...[truncated {} bytes]",
            &value[..end],
            value.len() - end
        ))
    }
}

/// Remove URL credentials using the default configuration.
pub fn redact_url(url: &str) -> String {
    LogConfig::default().redact_url(url).into_owned()
}

fn is_likely_secret(value: &str) -> bool {
    let trimmed = value.trim();
    let lower = trimmed.to_lowercase();
    if lower.starts_with("bearer ") || lower.starts_with("basic ") {
        return true;
    }
    SECRET_VALUE_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix) && trimmed.len() > prefix.len() + 10)
}

/// Escape control characters so a value cannot forge log lines.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}
