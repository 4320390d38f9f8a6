//! Built-in commands
//!
//! Built-ins run in-process against the session's variables and the
//! backend's virtual filesystem instead of going through the execution
//! backend. Each returns its standard output as a string; failures are
//! [`Error::Execution`] values carrying the message a user sees.

mod args;
mod curl;
mod environ;
mod fileops;
mod history;
mod man;
mod navigation;
mod scratch;
mod sleep;
mod system;

pub use args::{FlagValue, ParsedArgs};
pub use history::History;
pub use scratch::{RandomSuffix, SCRATCH_DIR, ScratchDir, SequentialSuffix, SuffixSource};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::backend::ExecutionBackend;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, resolve_path};
use crate::interpreter::Environment;
use crate::network::Fetcher;

/// Execution context for built-in commands.
pub struct Context<'a> {
    /// Parsed arguments (the command name is not included)
    pub args: &'a ParsedArgs,
    /// Session variables
    pub env: &'a Environment,
    /// Backend owning the filesystem and working directory
    pub backend: &'a Arc<dyn ExecutionBackend>,
    /// Directory `cd -` returns to
    pub previous_dir: &'a Mutex<Option<PathBuf>>,
    /// Submitted command lines
    pub history: &'a History,
    /// Temporary file allocator
    pub scratch: &'a ScratchDir,
    /// Network access, if configured
    pub fetcher: Option<&'a Arc<dyn Fetcher>>,
}

impl Context<'_> {
    pub fn fs(&self) -> Arc<dyn FileSystem> {
        self.backend.fs()
    }

    pub fn cwd(&self) -> PathBuf {
        self.backend.cwd()
    }

    /// Resolve an operand against the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_path(&self.cwd(), path)
    }
}

/// Trait for built-in commands.
#[async_trait]
pub trait Builtin: Send + Sync {
    /// Run the command and return its output.
    async fn execute(&self, ctx: Context<'_>) -> Result<String>;

    /// Short flags that never take a value.
    fn boolean_flags(&self) -> &'static [&'static str] {
        &[]
    }
}

/// All built-ins, keyed by command name.
pub fn default_builtins() -> HashMap<&'static str, Box<dyn Builtin>> {
    let mut builtins: HashMap<&'static str, Box<dyn Builtin>> = HashMap::new();
    builtins.insert("cd", Box::new(navigation::Cd));
    builtins.insert("pwd", Box::new(navigation::Pwd));
    builtins.insert("mkdir", Box::new(fileops::Mkdir));
    builtins.insert("rmdir", Box::new(fileops::Rmdir));
    builtins.insert("rm", Box::new(fileops::Rm));
    builtins.insert("mv", Box::new(fileops::Mv));
    builtins.insert("cp", Box::new(fileops::Cp));
    builtins.insert("touch", Box::new(fileops::Touch));
    builtins.insert("mktemp", Box::new(fileops::Mktemp));
    builtins.insert("history", Box::new(environ::HistoryCmd));
    builtins.insert("env", Box::new(environ::Env));
    builtins.insert("unset", Box::new(environ::Unset));
    builtins.insert("whoami", Box::new(environ::Whoami));
    builtins.insert("hostname", Box::new(system::Hostname));
    builtins.insert("uname", Box::new(system::Uname));
    builtins.insert("sleep", Box::new(sleep::Sleep));
    builtins.insert("curl", Box::new(curl::Curl));
    builtins.insert("man", Box::new(man::Man));
    builtins
}

/// Prefix a filesystem error with the operand it concerns.
pub fn path_error(path: &str, err: Error) -> Error {
    match err {
        Error::Io(e) => Error::execution(format!("{}: {}", path, e)),
        other => other,
    }
}

/// Collapse per-operand failures into one error.
fn collect_failures(failures: Vec<String>) -> Result<String> {
    if failures.is_empty() {
        Ok(String::new())
    } else {
        Err(Error::execution(failures.join("\n")))
    }
}
