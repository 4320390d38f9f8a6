//! In-memory filesystem implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use super::normalize_path;
use super::traits::{DirEntry, FileSystem, FileType, Metadata};
use crate::error::Result;

/// Directories every session starts with.
const SEED_DIRS: &[&str] = &["/tmp", "/home", "/home/user", "/shared", "/shared/data"];

/// In-memory filesystem.
///
/// Stores all files and directories in memory using a HashMap keyed by
/// normalized absolute path.
pub struct InMemoryFs {
    entries: RwLock<HashMap<PathBuf, FsEntry>>,
}

#[derive(Debug, Clone)]
enum FsEntry {
    File { content: Vec<u8>, metadata: Metadata },
    Directory { metadata: Metadata },
}

impl FsEntry {
    fn directory() -> Self {
        FsEntry::Directory {
            metadata: Metadata::new(FileType::Directory, 0),
        }
    }

    fn metadata(&self) -> &Metadata {
        match self {
            FsEntry::File { metadata, .. } | FsEntry::Directory { metadata } => metadata,
        }
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            FsEntry::File { metadata, .. } | FsEntry::Directory { metadata } => metadata,
        }
    }
}

impl Default for InMemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFs {
    /// Create a new in-memory filesystem with the standard directories.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("/"), FsEntry::directory());
        for dir in SEED_DIRS {
            entries.insert(PathBuf::from(dir), FsEntry::directory());
        }

        Self {
            entries: RwLock::new(entries),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, FsEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, FsEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found() -> crate::Error {
    IoError::new(ErrorKind::NotFound, "No such file or directory").into()
}

fn parent_is_dir(entries: &HashMap<PathBuf, FsEntry>, path: &Path) -> bool {
    match path.parent() {
        Some(parent) => matches!(entries.get(parent), Some(FsEntry::Directory { .. })),
        None => true,
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize_path(path);
        let entries = self.read();

        match entries.get(&path) {
            Some(FsEntry::File { content, .. }) => Ok(content.clone()),
            Some(FsEntry::Directory { .. }) => {
                Err(IoError::new(ErrorKind::IsADirectory, "Is a directory").into())
            }
            None => Err(not_found()),
        }
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write();

        if !parent_is_dir(&entries, &path) {
            return Err(not_found());
        }

        match entries.get_mut(&path) {
            Some(FsEntry::Directory { .. }) => {
                Err(IoError::new(ErrorKind::IsADirectory, "Is a directory").into())
            }
            Some(FsEntry::File {
                content: existing,
                metadata,
            }) => {
                *existing = content.to_vec();
                metadata.size = content.len() as u64;
                metadata.modified = SystemTime::now();
                Ok(())
            }
            None => {
                entries.insert(
                    path,
                    FsEntry::File {
                        content: content.to_vec(),
                        metadata: Metadata::new(FileType::File, content.len() as u64),
                    },
                );
                Ok(())
            }
        }
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write();

        if recursive {
            let mut current = PathBuf::from("/");
            for component in path.components().skip(1) {
                current.push(component);
                match entries.get(&current) {
                    Some(FsEntry::Directory { .. }) => {}
                    Some(FsEntry::File { .. }) => {
                        return Err(
                            IoError::new(ErrorKind::NotADirectory, "Not a directory").into()
                        );
                    }
                    None => {
                        entries.insert(current.clone(), FsEntry::directory());
                    }
                }
            }
            return Ok(());
        }

        if entries.contains_key(&path) {
            return Err(IoError::new(ErrorKind::AlreadyExists, "File exists").into());
        }
        if !parent_is_dir(&entries, &path) {
            return Err(not_found());
        }
        entries.insert(path, FsEntry::directory());
        Ok(())
    }

    async fn unlink(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write();

        match entries.get(&path) {
            Some(FsEntry::File { .. }) => {
                entries.remove(&path);
                Ok(())
            }
            Some(FsEntry::Directory { .. }) => {
                Err(IoError::new(ErrorKind::IsADirectory, "Is a directory").into())
            }
            None => Err(not_found()),
        }
    }

    async fn rmdir(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write();

        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => {
                let has_children = entries
                    .keys()
                    .any(|p| p != &path && p.parent() == Some(path.as_path()));
                if has_children || path == Path::new("/") {
                    return Err(
                        IoError::new(ErrorKind::DirectoryNotEmpty, "Directory not empty").into(),
                    );
                }
                entries.remove(&path);
                Ok(())
            }
            Some(FsEntry::File { .. }) => {
                Err(IoError::new(ErrorKind::NotADirectory, "Not a directory").into())
            }
            None => Err(not_found()),
        }
    }

    async fn stat(&self, path: &Path) -> Result<Metadata> {
        let path = normalize_path(path);
        let entries = self.read();

        entries
            .get(&path)
            .map(|entry| entry.metadata().clone())
            .ok_or_else(not_found)
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = normalize_path(path);
        let entries = self.read();

        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => {
                let mut result: Vec<DirEntry> = entries
                    .iter()
                    .filter(|(entry_path, _)| {
                        entry_path.parent() == Some(path.as_path()) && **entry_path != path
                    })
                    .map(|(entry_path, entry)| DirEntry {
                        name: entry_path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default(),
                        metadata: entry.metadata().clone(),
                    })
                    .collect();
                result.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(result)
            }
            Some(FsEntry::File { .. }) => {
                Err(IoError::new(ErrorKind::NotADirectory, "Not a directory").into())
            }
            None => Err(not_found()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path);
        Ok(self.read().contains_key(&path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = normalize_path(from);
        let to = normalize_path(to);
        let mut entries = self.write();

        if !entries.contains_key(&from) {
            return Err(not_found());
        }
        if !parent_is_dir(&entries, &to) {
            return Err(not_found());
        }
        if to.starts_with(&from) && to != from {
            return Err(IoError::new(
                ErrorKind::InvalidInput,
                "cannot move a directory into itself",
            )
            .into());
        }
        if let Some(FsEntry::Directory { .. }) = entries.get(&to) {
            return Err(IoError::new(ErrorKind::IsADirectory, "Is a directory").into());
        }

        // Move the entry together with everything below it
        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|p| p.starts_with(&from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let new = match old.strip_prefix(&from) {
                    Ok(rest) if !rest.as_os_str().is_empty() => to.join(rest),
                    _ => to.clone(),
                };
                entries.insert(new, entry);
            }
        }
        Ok(())
    }

    async fn utime(&self, path: &Path, modified: SystemTime) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write();

        let entry = entries.get_mut(&path).ok_or_else(not_found)?;
        entry.metadata_mut().modified = modified;
        Ok(())
    }
}
