//! File operation builtins - mkdir, rmdir, rm, mv, cp, touch, mktemp
//!
//! Commands taking several operands try every one of them and report all
//! failures together in a single error.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{Builtin, Context, collect_failures, path_error};
use crate::error::{Error, Result};
use crate::fs::FileSystem;

/// `a/b/c` becomes `a`, `a/b`, `a/b/c`; `/x/y` becomes `/x`, `/x/y`.
fn ancestor_paths(path: &str) -> Vec<String> {
    let mut subpaths = Vec::new();
    let mut current = String::new();
    for (i, part) in path.split('/').enumerate() {
        if i > 0 {
            current.push('/');
        }
        current.push_str(part);
        if !part.is_empty() {
            subpaths.push(current.clone());
        }
    }
    subpaths
}

/// Everything below `top`; each directory precedes its descendants.
async fn descendants(fs: &dyn FileSystem, top: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let mut found = Vec::new();
    let mut pending = vec![top.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut subdirs = Vec::new();
        for entry in fs.read_dir(&dir).await? {
            let path = dir.join(&entry.name);
            let is_dir = entry.metadata.file_type.is_dir();
            if is_dir {
                subdirs.push(path.clone());
            }
            found.push((path, is_dir));
        }
        pending.extend(subdirs.into_iter().rev());
    }
    Ok(found)
}

fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// The mkdir builtin - create directories.
///
/// Usage: mkdir [-p] DIRECTORY...
///
/// With `-p` every ancestor is created in order and existing ones are
/// skipped.
pub struct Mkdir;

#[async_trait]
impl Builtin for Mkdir {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let fs = ctx.fs();
        let parents = ctx.args.flag("p");
        let mut failures = Vec::new();

        for dir in ctx.args.positional() {
            let subpaths = if parents {
                ancestor_paths(dir)
            } else {
                vec![dir.clone()]
            };

            for subpath in subpaths {
                let path = ctx.resolve(&subpath);
                if parents && fs.exists(&path).await? {
                    continue;
                }
                if let Err(err) = fs.mkdir(&path, false).await {
                    tracing::debug!(path = %path.display(), error = %err, "mkdir failed");
                    failures.push(format!("{}: Cannot create folder", subpath));
                    break;
                }
            }
        }

        collect_failures(failures)
    }

    fn boolean_flags(&self) -> &'static [&'static str] {
        &["p"]
    }
}

/// The rmdir builtin - remove empty directories.
pub struct Rmdir;

#[async_trait]
impl Builtin for Rmdir {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let fs = ctx.fs();
        let mut failures = Vec::new();
        for dir in ctx.args.positional() {
            if let Err(err) = fs.rmdir(&ctx.resolve(dir)).await {
                failures.push(path_error(dir, err).to_string());
            }
        }
        collect_failures(failures)
    }
}

/// The rm builtin - remove files or directories.
///
/// Usage: rm [-rf] FILE...
///
/// With `-r`, files below a directory are deleted first, then its
/// subdirectories deepest first, then the directory itself.
pub struct Rm;

impl Rm {
    async fn remove(fs: &dyn FileSystem, path: &Path, recursive: bool) -> Result<()> {
        if !(recursive && fs.is_dir(path).await) {
            return fs.unlink(path).await;
        }

        let found = descendants(fs, path).await?;
        for (file, _) in found.iter().filter(|(_, is_dir)| !is_dir) {
            fs.unlink(file).await?;
        }
        for (dir, _) in found.iter().rev().filter(|(_, is_dir)| *is_dir) {
            fs.rmdir(dir).await?;
        }
        fs.rmdir(path).await
    }
}

#[async_trait]
impl Builtin for Rm {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let fs = ctx.fs();
        let recursive = ctx.args.flag("r") || ctx.args.flag("R");
        let force = ctx.args.flag("f");
        let mut failures = Vec::new();

        for operand in ctx.args.positional() {
            let path = ctx.resolve(operand);
            if force && !fs.exists(&path).await? {
                continue;
            }
            if let Err(err) = Self::remove(fs.as_ref(), &path, recursive).await {
                tracing::debug!(path = %path.display(), error = %err, "rm failed");
                failures.push(format!("{}: Cannot delete files", operand));
            }
        }

        collect_failures(failures)
    }

    fn boolean_flags(&self) -> &'static [&'static str] {
        &["r", "R", "f"]
    }
}

fn missing_operand(command: &str) -> Error {
    Error::execution(format!("{}: missing file operand", command))
}

/// Destination for `mv`/`cp`: `.` or an existing directory receives the
/// source's base name.
async fn destination(ctx: &Context<'_>, fs: &dyn FileSystem, src: &str, dst: &str) -> PathBuf {
    if dst == "." {
        return ctx.resolve(base_name(src));
    }
    let path = ctx.resolve(dst);
    if fs.is_dir(&path).await {
        path.join(base_name(src))
    } else {
        path
    }
}

/// The mv builtin - move or rename a file or directory.
pub struct Mv;

#[async_trait]
impl Builtin for Mv {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let [src, dst] = ctx.args.positional() else {
            return Err(missing_operand("mv"));
        };
        let fs = ctx.fs();
        let to = destination(&ctx, fs.as_ref(), src, dst).await;
        fs.rename(&ctx.resolve(src), &to)
            .await
            .map_err(|e| path_error(src, e))?;
        Ok(String::new())
    }
}

/// The cp builtin - copy a file.
pub struct Cp;

#[async_trait]
impl Builtin for Cp {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let [src, dst] = ctx.args.positional() else {
            return Err(missing_operand("cp"));
        };
        let fs = ctx.fs();
        let data = fs
            .read_file(&ctx.resolve(src))
            .await
            .map_err(|e| path_error(src, e))?;
        let to = destination(&ctx, fs.as_ref(), src, dst).await;
        fs.write_file(&to, &data)
            .await
            .map_err(|e| path_error(dst, e))?;
        Ok(String::new())
    }
}

/// The touch builtin - update modification times, creating missing files.
pub struct Touch;

#[async_trait]
impl Builtin for Touch {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let fs = ctx.fs();
        let mut failures = Vec::new();
        for operand in ctx.args.positional() {
            let path = ctx.resolve(operand);
            let result = if fs.exists(&path).await? {
                fs.utime(&path, SystemTime::now()).await
            } else {
                fs.write_file(&path, b"").await
            };
            if let Err(err) = result {
                failures.push(path_error(operand, err).to_string());
            }
        }
        collect_failures(failures)
    }
}

/// The mktemp builtin - create an empty temporary file and print its path.
pub struct Mktemp;

#[async_trait]
impl Builtin for Mktemp {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let fs = ctx.fs();
        let path = ctx.scratch.allocate(fs.as_ref()).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::test_support::Fixture;
    use crate::fs::read_text;

    #[test]
    fn test_ancestor_paths() {
        assert_eq!(ancestor_paths("a/b/c"), ["a", "a/b", "a/b/c"]);
        assert_eq!(ancestor_paths("/x/y"), ["/x", "/x/y"]);
        assert_eq!(ancestor_paths("a//b/"), ["a", "a//b"]);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/shared/data/a.txt"), "a.txt");
        assert_eq!(base_name("a.txt"), "a.txt");
        assert_eq!(base_name("dir/"), "dir");
    }

    #[tokio::test]
    async fn test_mkdir_parents_idempotent() {
        let fx = Fixture::new();
        assert_eq!(fx.run(&Mkdir, &["-p", "a/b/c"]).await.unwrap(), "");
        assert_eq!(fx.run(&Mkdir, &["-p", "a/b/c"]).await.unwrap(), "");
        assert!(fx.fs().is_dir(Path::new("/home/user/a/b/c")).await);
    }

    #[tokio::test]
    async fn test_mkdir_without_parents_fails_per_path() {
        let fx = Fixture::new();
        let err = fx.run(&Mkdir, &["x/y", "ok", "z/w"]).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "x/y: Cannot create folder\nz/w: Cannot create folder"
        );
        assert!(fx.fs().is_dir(Path::new("/home/user/ok")).await);
    }

    #[tokio::test]
    async fn test_mkdir_existing_without_parents() {
        let fx = Fixture::new();
        let err = fx.run(&Mkdir, &["/tmp"]).await.unwrap_err();
        assert_eq!(err.to_string(), "/tmp: Cannot create folder");
    }

    #[tokio::test]
    async fn test_rm_recursive() {
        let fx = Fixture::new();
        let fs = fx.fs();
        fx.run(&Mkdir, &["-p", "top/a/deep", "top/b"]).await.unwrap();
        fs.write_file(Path::new("/home/user/top/f.txt"), b"1").await.unwrap();
        fs.write_file(Path::new("/home/user/top/a/deep/g.txt"), b"2")
            .await
            .unwrap();

        assert_eq!(fx.run(&Rm, &["-r", "top"]).await.unwrap(), "");
        assert!(!fs.exists(Path::new("/home/user/top")).await.unwrap());
    }

    #[tokio::test]
    async fn test_rm_directory_needs_recursive() {
        let fx = Fixture::new();
        fx.run(&Mkdir, &["d"]).await.unwrap();
        let err = fx.run(&Rm, &["d"]).await.unwrap_err();
        assert_eq!(err.to_string(), "d: Cannot delete files");
    }

    #[tokio::test]
    async fn test_rm_reports_each_operand() {
        let fx = Fixture::new();
        let fs = fx.fs();
        fs.write_file(Path::new("/home/user/a.txt"), b"").await.unwrap();
        let err = fx.run(&Rm, &["missing", "a.txt", "gone"]).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing: Cannot delete files\ngone: Cannot delete files"
        );
        assert!(!fs.exists(Path::new("/home/user/a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_rm_force_ignores_missing() {
        let fx = Fixture::new();
        assert_eq!(fx.run(&Rm, &["-rf", "missing"]).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_rmdir() {
        let fx = Fixture::new();
        fx.run(&Mkdir, &["d"]).await.unwrap();
        assert_eq!(fx.run(&Rmdir, &["d"]).await.unwrap(), "");
        let err = fx.run(&Rmdir, &["d"]).await.unwrap_err();
        assert_eq!(err.to_string(), "d: No such file or directory");
    }

    #[tokio::test]
    async fn test_mv_into_directory() {
        let fx = Fixture::new();
        let fs = fx.fs();
        fs.write_file(Path::new("/home/user/a.txt"), b"x").await.unwrap();
        fx.run(&Mv, &["a.txt", "/tmp"]).await.unwrap();
        assert!(fs.exists(Path::new("/tmp/a.txt")).await.unwrap());
        assert!(!fs.exists(Path::new("/home/user/a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_mv_missing_source() {
        let fx = Fixture::new();
        let err = fx.run(&Mv, &["nope", "b"]).await.unwrap_err();
        assert_eq!(err.to_string(), "nope: No such file or directory");
        let err = fx.run(&Mv, &["only"]).await.unwrap_err();
        assert_eq!(err.to_string(), "mv: missing file operand");
    }

    #[tokio::test]
    async fn test_cp_to_dot_uses_base_name() {
        let fx = Fixture::new();
        let fs = fx.fs();
        fs.write_file(Path::new("/tmp/src.bin"), &[0, 159, 146, 150])
            .await
            .unwrap();
        fx.run(&Cp, &["/tmp/src.bin", "."]).await.unwrap();
        assert_eq!(
            fs.read_file(Path::new("/home/user/src.bin")).await.unwrap(),
            vec![0, 159, 146, 150]
        );
    }

    #[tokio::test]
    async fn test_cp_missing_source() {
        let fx = Fixture::new();
        let err = fx.run(&Cp, &["nope", "b"]).await.unwrap_err();
        assert_eq!(err.to_string(), "nope: No such file or directory");
    }

    #[tokio::test]
    async fn test_touch_creates_and_updates() {
        let fx = Fixture::new();
        let fs = fx.fs();
        fs.write_file(Path::new("/home/user/keep.txt"), b"data")
            .await
            .unwrap();
        fx.run(&Touch, &["new.txt", "keep.txt"]).await.unwrap();
        assert_eq!(
            read_text(fs.as_ref(), Path::new("/home/user/new.txt"))
                .await
                .unwrap(),
            ""
        );
        assert_eq!(
            read_text(fs.as_ref(), Path::new("/home/user/keep.txt"))
                .await
                .unwrap(),
            "data"
        );
    }

    #[tokio::test]
    async fn test_mktemp() {
        let fx = Fixture::new();
        let first = fx.run(&Mktemp, &[]).await.unwrap();
        let second = fx.run(&Mktemp, &[]).await.unwrap();
        assert_eq!(first, "/shared/tmp/tmp1");
        assert_eq!(second, "/shared/tmp/tmp2");
        assert!(fx.fs().exists(Path::new(&first)).await.unwrap());
    }
}
