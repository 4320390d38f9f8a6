//! Sessions
//!
//! A [`Session`] is one terminal: an interpreter, its variables and history,
//! and an execution backend with its filesystem. [`SessionBuilder`] prepares
//! the filesystem (scratch directory, tutorial directory, preloaded files)
//! before the first command runs.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{ExecutionBackend, MountSource, Tool, VirtualBackend};
use crate::builtins::{History, SCRATCH_DIR, ScratchDir, SuffixSource, path_error};
use crate::error::{Error, Result};
use crate::fs::{FileSystem, InMemoryFs};
use crate::interpreter::{BufferSink, Environment, Interpreter, InterpreterOptions, SharedSink};
use crate::logging::LogConfig;
use crate::network::Fetcher;
use crate::parser::{Node, parse};

/// Directory holding one subdirectory per tutorial.
pub const TUTORIALS_DIR: &str = "/shared/data/tutorials";

/// Base URL used to fetch configured files when none is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost";

const DEFAULT_HOME: &str = "/shared/data";
const DEFAULT_USER: &str = "guest";

/// Session settings loaded from JSON.
///
/// ```
/// use sandshell::SessionConfig;
///
/// let config = SessionConfig::from_json(
///     r#"{ "pwd": "dna-secrets", "files": ["data/dna-secrets/reads.fq"] }"#,
/// ).unwrap();
/// assert_eq!(config.pwd.as_deref(), Some("dna-secrets"));
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Tools the session expects the backend to provide
    pub tools: Vec<String>,
    /// Files to preload, as `data/<tutorial>/<relative path>`
    pub files: Vec<String>,
    /// Tutorial directory name under [`TUTORIALS_DIR`]
    pub pwd: Option<String>,
    /// Command line run once the filesystem is ready
    pub init: Option<String>,
    /// Extra variables
    pub env: HashMap<String, String>,
}

impl SessionConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::execution(format!("invalid session config: {}", e)))
    }
}

/// Where a configured file lands: `data/<tutorial>/a/b.txt` becomes `a/b.txt`.
fn preload_destination(file: &str) -> Option<String> {
    let rest: Vec<&str> = file.split('/').skip(2).collect();
    if rest.is_empty() || rest.iter().all(|part| part.is_empty()) {
        return None;
    }
    Some(rest.join("/"))
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    backend: Option<Arc<dyn ExecutionBackend>>,
    fs: Option<Arc<dyn FileSystem>>,
    only_tools: Option<Vec<String>>,
    extra_tools: Vec<(String, Box<dyn Tool>)>,
    expected_tools: Vec<String>,
    preload: Vec<(String, MountSource)>,
    config_files: Vec<String>,
    base_url: Option<String>,
    cwd: Option<String>,
    env: Vec<(String, String)>,
    history: Vec<String>,
    init: Option<String>,
    fetcher: Option<Arc<dyn Fetcher>>,
    log: LogConfig,
    suffixes: Option<Box<dyn SuffixSource>>,
}

impl SessionBuilder {
    /// Use a custom execution backend. `fs`, `tools` and `tool` only apply
    /// to the default backend.
    pub fn backend(mut self, backend: Arc<dyn ExecutionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a custom filesystem for the default backend.
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Keep only these tools from the default catalog.
    pub fn tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_tools = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Register an additional tool.
    pub fn tool(mut self, name: impl Into<String>, tool: Box<dyn Tool>) -> Self {
        self.extra_tools.push((name.into(), tool));
        self
    }

    /// Preload a file at `path`, relative to the tutorial directory.
    pub fn preload(mut self, path: impl Into<String>, source: MountSource) -> Self {
        self.preload.push((path.into(), source));
        self
    }

    /// Tutorial directory name; the session starts in
    /// `/shared/data/tutorials/<name>`.
    pub fn cwd(mut self, name: impl Into<String>) -> Self {
        self.cwd = Some(name.into());
        self
    }

    /// Set a variable.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    /// Start with existing history entries.
    pub fn history<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.history = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Command line to run after setup.
    pub fn init(mut self, line: impl Into<String>) -> Self {
        self.init = Some(line.into());
        self
    }

    /// Network access for `curl` and URL preloads.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Base URL configured files are fetched from.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Source of temporary file name suffixes.
    pub fn scratch_suffixes(mut self, suffixes: Box<dyn SuffixSource>) -> Self {
        self.suffixes = Some(suffixes);
        self
    }

    /// Apply a configuration document.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.expected_tools.extend(config.tools);
        self.config_files.extend(config.files);
        if config.pwd.is_some() {
            self.cwd = config.pwd;
        }
        if config.init.is_some() {
            self.init = config.init;
        }
        let mut env: Vec<(String, String)> = config.env.into_iter().collect();
        env.sort();
        self.env.extend(env);
        self
    }

    /// Build the session and prepare its filesystem.
    pub async fn build(self) -> Result<Session> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => {
                let fs = self.fs.unwrap_or_else(|| Arc::new(InMemoryFs::new()));
                let mut backend = VirtualBackend::new(fs).with_default_tools();
                if let Some(names) = &self.only_tools {
                    backend.retain_tools(names);
                }
                for (name, tool) in self.extra_tools {
                    backend.register(name, tool);
                }
                if let Some(fetcher) = &self.fetcher {
                    backend = backend.with_fetcher(Arc::clone(fetcher));
                }
                Arc::new(backend)
            }
        };

        for tool in &self.expected_tools {
            if !backend.has_tool(tool) {
                tracing::warn!(tool = %tool, "configured tool is not available");
            }
        }

        let env = Environment::with_vars([("HOME", DEFAULT_HOME), ("USER", DEFAULT_USER)]);
        for (name, value) in self.env {
            env.set(name, value);
        }

        let options = InterpreterOptions {
            env,
            history: History::with_entries(self.history),
            scratch: self
                .suffixes
                .map(ScratchDir::with_suffixes)
                .unwrap_or_default(),
            fetcher: self.fetcher,
            log: self.log,
        };
        let session = Session {
            interpreter: Interpreter::with_options(Arc::clone(&backend), options),
        };

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut preload = self.preload;
        for file in &self.config_files {
            let Some(dest) = preload_destination(file) else {
                tracing::warn!(file = %file, "ignoring preload without a file name");
                continue;
            };
            let name = dest.rsplit('/').next().unwrap_or(&dest).to_string();
            let url = format!("{}/{}", base_url.trim_end_matches('/'), file);
            preload.push((dest, MountSource::Url { name, url }));
        }

        session.prepare(self.cwd, preload).await?;
        if let Some(line) = &self.init {
            let buffer = BufferSink::shared();
            let sink: SharedSink = buffer.clone();
            session.exec(line, &sink).await?;
            tracing::debug!(bytes = buffer.contents().len(), "init finished");
        }
        Ok(session)
    }
}

/// A terminal session.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sandshell::{BufferSink, Session, SharedSink};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> sandshell::Result<()> {
/// let session = Session::builder().build().await?;
/// let sink: SharedSink = Arc::new(BufferSink::new());
/// let output = session.exec("echo hello; pwd", &sink).await?;
/// assert_eq!(output, "hello\n/shared/data\n");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    interpreter: Interpreter,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    async fn prepare(&self, cwd: Option<String>, preload: Vec<(String, MountSource)>) -> Result<()> {
        let backend = self.interpreter.backend();
        let fs = backend.fs();
        fs.mkdir(Path::new(SCRATCH_DIR), true).await?;

        if cwd.is_none() && preload.is_empty() {
            let home = PathBuf::from(self.interpreter.env().home());
            fs.mkdir(&home, true).await?;
            return backend.cd(&home).await;
        }

        let dir = Path::new(TUTORIALS_DIR).join(cwd.unwrap_or_default());
        fs.mkdir(&dir, true).await?;
        backend.cd(&dir).await?;
        tracing::debug!(dir = %dir.display(), files = preload.len(), "preparing tutorial directory");

        for (dest, source) in preload {
            let target = dir.join(&dest);
            if let Some(parent) = target.parent() {
                fs.mkdir(parent, true).await?;
            }
            let mounted = backend.mount(source).await?;
            if mounted != target {
                fs.rename(&mounted, &target)
                    .await
                    .map_err(|e| path_error(&dest, e))?;
            }
        }
        Ok(())
    }

    /// Parse and run one command line.
    ///
    /// The returned string is the captured output. Background notices,
    /// stderr and recovered errors go to `sink` as they happen.
    pub async fn exec(&self, line: &str, sink: &SharedSink) -> Result<String> {
        tracing::debug!(
            command = %self.interpreter.log_config().command_line(line),
            "exec"
        );
        let node = parse(line)?;
        self.exec_node(&node, sink).await
    }

    /// Run an already parsed command line.
    pub async fn exec_node(&self, node: &Node, sink: &SharedSink) -> Result<String> {
        self.interpreter.execute(node, sink).await
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn history(&self) -> &History {
        self.interpreter.history()
    }

    pub fn env(&self) -> &Environment {
        self.interpreter.env()
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        self.interpreter.backend().fs()
    }

    pub fn cwd(&self) -> PathBuf {
        self.interpreter.backend().cwd()
    }

    /// Wait until every background job has finished.
    pub async fn wait_jobs(&self) {
        self.interpreter.jobs().wait_all().await;
    }

    /// Number of background jobs still running.
    pub fn live_jobs(&self) -> usize {
        self.interpreter.jobs().live_count()
    }
}
