//! Sandshell - a sandboxed command interpreter for teaching terminals
//!
//! Parses POSIX-shell-like command lines and runs them against a virtual
//! filesystem. Built-in commands run in-process; everything else goes to an
//! [`ExecutionBackend`](backend::ExecutionBackend).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sandshell::{BufferSink, Session, SharedSink};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Session::builder().build().await?;
//!     let sink: SharedSink = Arc::new(BufferSink::new());
//!     let output = session.exec("mkdir -p a/b && cd a/b && pwd", &sink).await?;
//!     assert_eq!(output, "/shared/data/a/b\n");
//!     Ok(())
//! }
//! ```
//!
//! Supported: `;`, `&&`, `||`, `|`, `>`, `>>`, `2>&1` (for backend
//! commands), `&`, `time`, `NAME=value`, `$NAME`, `$(...)`, `<(...)`, `*`
//! and `?` globs. Subshells, compound commands and the remaining redirects
//! are rejected with [`Error::UnsupportedConstruct`].

pub mod backend;
pub mod builtins;
mod error;
pub mod fs;
pub mod interpreter;
pub mod logging;
pub mod network;
pub mod parser;
mod session;

pub use async_trait::async_trait;
pub use backend::{ExecutionBackend, MountSource, Tool, ToolContext, ToolOutput, VirtualBackend};
pub use builtins::{Builtin, History, ScratchDir, SequentialSuffix, SuffixSource};
pub use error::{Error, Result};
pub use fs::{FileSystem, InMemoryFs};
pub use interpreter::{
    BufferSink, Environment, FnSink, Interpreter, InterpreterOptions, NullSink, OutputSink,
    SharedSink,
};
pub use logging::LogConfig;
pub use network::Fetcher;
#[cfg(feature = "http_client")]
pub use network::HttpClient;
pub use parser::parse;
pub use session::{DEFAULT_BASE_URL, Session, SessionBuilder, SessionConfig, TUTORIALS_DIR};
