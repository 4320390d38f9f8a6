//! Error types for Sandshell
//!
//! Errors are values propagated up the recursive evaluation chain. The only
//! local recovery point is the `||` control operator at the command level;
//! everything else surfaces to the caller of [`Session::exec`](crate::Session::exec),
//! which presents the error as text.

use thiserror::Error;

/// Result type alias using Sandshell's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Sandshell error types.
///
/// The `Display` output of every variant is what a user sees in the terminal,
/// so messages are short and carry no internal detail.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed command text.
    ///
    /// The detail is kept for logging and tests; users always see the same
    /// message regardless of what went wrong in the parser.
    #[error("Unrecognized command")]
    Parse(String),

    /// Subshells, compound commands, unimplemented redirects, test
    /// expressions and unsupported argument kinds.
    #[error("Error: {0} is not supported.")]
    UnsupportedConstruct(String),

    /// A built-in or backend command failed.
    #[error("{0}")]
    Execution(String),

    /// The command name matches neither a built-in nor a backend tool.
    #[error("{0}: command not found")]
    UnknownCommand(String),

    /// I/O error from filesystem operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (curl, URL mounts).
    #[error("network error: {0}")]
    Network(String),

    /// Internal error for unexpected failures, e.g. a background job that
    /// panicked.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an execution failure from any displayable message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create an unsupported-construct error naming the construct.
    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::UnsupportedConstruct(construct.into())
    }

    /// Whether this error came from the parser.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
