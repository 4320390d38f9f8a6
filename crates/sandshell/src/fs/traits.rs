//! Filesystem trait definitions

use async_trait::async_trait;
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;

/// Async filesystem trait.
///
/// These are the primitives the execution backend exposes to the
/// interpreter. Failures are reported as [`std::io::Error`]s wrapped in
/// [`Error::Io`](crate::Error::Io) so callers can match on the error kind.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file's contents.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or overwrite a file. The parent directory must exist.
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Create a directory. With `recursive`, missing ancestors are created
    /// and an existing directory is not an error.
    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Remove a file. Fails on directories.
    async fn unlink(&self, path: &Path) -> Result<()>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &Path) -> Result<()>;

    /// Get file metadata.
    async fn stat(&self, path: &Path) -> Result<Metadata>;

    /// Read directory entries, sorted by name.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Rename/move a file or directory (with everything under it).
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Set a file's modification time.
    async fn utime(&self, path: &Path, modified: SystemTime) -> Result<()>;

    /// Whether the path is an existing directory.
    async fn is_dir(&self, path: &Path) -> bool {
        self.stat(path)
            .await
            .map(|m| m.file_type.is_dir())
            .unwrap_or(false)
    }
}

/// File metadata.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// File type
    pub file_type: FileType,
    /// File size in bytes
    pub size: u64,
    /// File permissions (Unix mode)
    pub mode: u32,
    /// Last modification time
    pub modified: SystemTime,
    /// Creation time
    pub created: SystemTime,
}

impl Metadata {
    pub(crate) fn new(file_type: FileType, size: u64) -> Self {
        let now = SystemTime::now();
        let mode = match file_type {
            FileType::File => 0o644,
            FileType::Directory => 0o755,
        };
        Self {
            file_type,
            size,
            mode,
            modified: now,
            created: now,
        }
    }
}

/// File type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
}

impl FileType {
    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Directory entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry name (not full path)
    pub name: String,
    /// Entry metadata
    pub metadata: Metadata,
}
