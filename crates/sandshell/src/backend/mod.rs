//! Execution backend
//!
//! Everything that is not a built-in runs here. The backend owns the
//! virtual filesystem, the working directory and the "next stdin" buffer
//! that pipes into external tools use.

mod tools;

pub use tools::default_tools;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::fs::{FileSystem, normalize_path};
use crate::network::Fetcher;

/// Directory that mounted files land in.
pub const MOUNT_DIR: &str = "/shared/data";

/// Captured output of a backend command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Output with only stdout.
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            stderr: String::new(),
        }
    }
}

/// Where a mounted file's contents come from.
#[derive(Debug, Clone, PartialEq)]
pub enum MountSource {
    /// In-memory contents
    Bytes { name: String, data: Vec<u8> },
    /// Contents fetched from a URL
    Url { name: String, url: String },
}

impl MountSource {
    /// File name the mount is created under.
    pub fn name(&self) -> &str {
        match self {
            MountSource::Bytes { name, .. } | MountSource::Url { name, .. } => name,
        }
    }
}

/// The external execution backend.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Run a tool. Consumes the pending stdin buffer.
    async fn execute(&self, name: &str, args: &[String]) -> Result<ToolOutput>;

    /// Whether a tool with this name is available.
    fn has_tool(&self, name: &str) -> bool;

    /// The virtual filesystem.
    fn fs(&self) -> Arc<dyn FileSystem>;

    /// Current working directory.
    fn cwd(&self) -> PathBuf;

    /// Change the working directory. Fails if `path` is not a directory.
    async fn cd(&self, path: &Path) -> Result<()>;

    /// Set the input for the next `execute` call.
    fn set_stdin(&self, stdin: Option<String>);

    /// Make a file available under [`MOUNT_DIR`] and return its path.
    async fn mount(&self, source: MountSource) -> Result<PathBuf>;
}

/// Input handed to a [`Tool`].
pub struct ToolContext<'a> {
    /// Arguments (not including the tool name)
    pub args: &'a [String],
    /// Piped input, if any
    pub stdin: Option<String>,
    /// Working directory
    pub cwd: PathBuf,
    /// Virtual filesystem
    pub fs: Arc<dyn FileSystem>,
}

/// A command implemented by the backend.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool.
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput>;
}

/// Backend that runs [`Tool`]s against a [`FileSystem`].
pub struct VirtualBackend {
    fs: Arc<dyn FileSystem>,
    tools: HashMap<String, Box<dyn Tool>>,
    cwd: RwLock<PathBuf>,
    stdin: Mutex<Option<String>>,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl VirtualBackend {
    /// Backend with no tools, starting in `/home/user`.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            tools: HashMap::new(),
            cwd: RwLock::new(PathBuf::from("/home/user")),
            stdin: Mutex::new(None),
            fetcher: None,
        }
    }

    /// Register the default tool catalog.
    pub fn with_default_tools(mut self) -> Self {
        self.tools.extend(default_tools());
        self
    }

    /// Register (or replace) a tool.
    pub fn register(&mut self, name: impl Into<String>, tool: Box<dyn Tool>) {
        self.tools.insert(name.into(), tool);
    }

    /// Keep only the named tools.
    pub fn retain_tools(&mut self, names: &[String]) {
        self.tools.retain(|name, _| names.iter().any(|n| n == name));
    }

    /// Use `fetcher` for URL mounts.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Names of the available tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ExecutionBackend for VirtualBackend {
    async fn execute(&self, name: &str, args: &[String]) -> Result<ToolOutput> {
        let stdin = self
            .stdin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;

        tracing::debug!(tool = name, args = args.len(), piped = stdin.is_some(), "running tool");

        let ctx = ToolContext {
            args,
            stdin,
            cwd: self.cwd(),
            fs: Arc::clone(&self.fs),
        };
        tool.run(ctx).await
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    fn cwd(&self) -> PathBuf {
        self.cwd
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn cd(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path);
        if !self.fs.is_dir(&path).await {
            return Err(Error::execution(format!(
                "{}: No such file or directory",
                path.display()
            )));
        }
        *self.cwd.write().unwrap_or_else(PoisonError::into_inner) = path;
        Ok(())
    }

    fn set_stdin(&self, stdin: Option<String>) {
        *self.stdin.lock().unwrap_or_else(PoisonError::into_inner) = stdin;
    }

    async fn mount(&self, source: MountSource) -> Result<PathBuf> {
        let path = Path::new(MOUNT_DIR).join(source.name());
        let data = match source {
            MountSource::Bytes { data, .. } => data,
            MountSource::Url { url, .. } => {
                let fetcher = self
                    .fetcher
                    .as_ref()
                    .ok_or_else(|| Error::Network("network access is not configured".into()))?;
                fetcher.fetch(&url).await?
            }
        };

        self.fs.mkdir(Path::new(MOUNT_DIR), true).await?;
        self.fs.write_file(&path, &data).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "mounted file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    fn backend() -> VirtualBackend {
        VirtualBackend::new(Arc::new(InMemoryFs::new())).with_default_tools()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = backend().execute("samtools", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "samtools: command not found");
    }

    #[tokio::test]
    async fn test_stdin_is_consumed_once() {
        let backend = backend();
        backend.set_stdin(Some("piped\n".to_string()));
        let first = backend.execute("cat", &[]).await.unwrap();
        assert_eq!(first.stdout, "piped\n");
        let second = backend.execute("cat", &[]).await.unwrap();
        assert_eq!(second.stdout, "");
    }

    #[tokio::test]
    async fn test_cd() {
        let backend = backend();
        backend.cd(Path::new("/shared/data")).await.unwrap();
        assert_eq!(backend.cwd(), PathBuf::from("/shared/data"));
        assert!(backend.cd(Path::new("/missing")).await.is_err());
        assert_eq!(backend.cwd(), PathBuf::from("/shared/data"));
    }

    #[tokio::test]
    async fn test_mount_bytes() {
        let backend = backend();
        let path = backend
            .mount(MountSource::Bytes {
                name: "ref.fa".to_string(),
                data: b">chr1\nACGT\n".to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/shared/data/ref.fa"));
        let out = backend.execute("cat", &args(&["/shared/data/ref.fa"])).await;
        assert_eq!(out.unwrap().stdout, ">chr1\nACGT\n");
    }

    #[tokio::test]
    async fn test_mount_url_without_fetcher() {
        let err = backend()
            .mount(MountSource::Url {
                name: "x".to_string(),
                url: "https://example.com/x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_retain_tools() {
        let mut backend = backend();
        backend.retain_tools(&args(&["cat", "ls"]));
        assert_eq!(backend.tool_names(), vec!["cat", "ls"]);
        assert!(!backend.has_tool("grep"));
    }
}
