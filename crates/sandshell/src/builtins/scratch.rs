//! Temporary file allocation
//!
//! `mktemp` and `<(...)` both allocate files named `tmp<N>` under
//! [`SCRATCH_DIR`]. `N` comes from a [`SuffixSource`], random by default;
//! an allocation that lands on an existing path draws again.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::fs::FileSystem;

/// Directory holding temporary files.
pub const SCRATCH_DIR: &str = "/shared/tmp";

/// Suffixes are drawn below this bound.
const SUFFIX_RANGE: u64 = 1_000_000;

const MAX_ATTEMPTS: usize = 100;

/// Produces numeric suffixes for temporary file names.
pub trait SuffixSource: Send + Sync {
    fn next_suffix(&self) -> u64;
}

impl<F> SuffixSource for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn next_suffix(&self) -> u64 {
        self()
    }
}

/// Random suffixes in `0..1_000_000`.
#[derive(Debug, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self) -> u64 {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u64(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default(),
        );
        hasher.finish() % SUFFIX_RANGE
    }
}

/// Suffixes counting up from a starting value.
#[derive(Debug, Default)]
pub struct SequentialSuffix {
    next: AtomicU64,
}

impl SequentialSuffix {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl SuffixSource for SequentialSuffix {
    fn next_suffix(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Allocator for temporary files.
pub struct ScratchDir {
    suffixes: Box<dyn SuffixSource>,
}

impl Default for ScratchDir {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScratchDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchDir").finish_non_exhaustive()
    }
}

impl ScratchDir {
    pub fn new() -> Self {
        Self::with_suffixes(Box::new(RandomSuffix))
    }

    pub fn with_suffixes(suffixes: Box<dyn SuffixSource>) -> Self {
        Self { suffixes }
    }

    /// Create an empty file with a fresh name and return its path.
    pub async fn allocate(&self, fs: &dyn FileSystem) -> Result<PathBuf> {
        let dir = Path::new(SCRATCH_DIR);
        fs.mkdir(dir, true).await?;

        for _ in 0..MAX_ATTEMPTS {
            let path = dir.join(format!("tmp{}", self.suffixes.next_suffix()));
            if fs.exists(&path).await? {
                tracing::trace!(path = %path.display(), "temporary name taken, retrying");
                continue;
            }
            fs.write_file(&path, b"").await?;
            return Ok(path);
        }

        Err(Error::execution(format!(
            "{}: Cannot create temporary file",
            SCRATCH_DIR
        )))
    }
}
