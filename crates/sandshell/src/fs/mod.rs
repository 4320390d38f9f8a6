//! Virtual filesystem for Sandshell
//!
//! The interpreter never touches the host filesystem. Everything goes through
//! the [`FileSystem`] trait, which the execution backend exposes.

mod memory;
mod traits;

pub use memory::InMemoryFs;
pub use traits::{DirEntry, FileSystem, FileType, Metadata};

use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use crate::error::Result;

static ANSI_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b\][^\x07]*\x07").ok());

/// Resolve a path relative to the current working directory.
pub fn resolve_path(cwd: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    let joined = if p.is_absolute() {
        p.to_path_buf()
    } else {
        cwd.join(p)
    };
    normalize_path(&joined)
}

/// Normalize a path, resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::RootDir => result.push("/"),
            Component::Normal(name) => result.push(name),
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir | Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() {
        result.push("/");
    }
    result
}

/// Remove terminal escape sequences (colors, cursor control) from text.
pub fn strip_ansi(text: &str) -> String {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Write text to a file with terminal escape sequences removed.
pub async fn write_text(fs: &dyn FileSystem, path: &Path, text: &str) -> Result<()> {
    fs.write_file(path, strip_ansi(text).as_bytes()).await
}

/// Read a file as (lossy) UTF-8 text.
pub async fn read_text(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read_file(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
