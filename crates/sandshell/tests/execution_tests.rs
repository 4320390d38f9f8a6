//! Integration tests for command execution
//!
//! Drives whole command lines through a [`Session`] and checks the captured
//! output, the side-channel sink and the virtual filesystem.

use pretty_assertions::assert_eq;
use sandshell::fs::{DirEntry, Metadata};
use sandshell::{BufferSink, Error, FileSystem, InMemoryFs, Session, SharedSink, async_trait};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

async fn session() -> Session {
    Session::builder().build().await.unwrap()
}

/// Run a line, wait for background jobs, return (output, sink contents).
async fn run(session: &Session, line: &str) -> (sandshell::Result<String>, String) {
    let buffer = BufferSink::shared();
    let sink: SharedSink = buffer.clone();
    let result = session.exec(line, &sink).await;
    session.wait_jobs().await;
    (result, buffer.contents())
}

async fn output(session: &Session, line: &str) -> String {
    run(session, line).await.0.unwrap()
}

async fn read(session: &Session, path: &str) -> String {
    let bytes = session.fs().read_file(Path::new(path)).await.unwrap();
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn sequencing() {
    let s = session().await;
    assert_eq!(output(&s, "echo 1; echo 2; echo 3").await, "1\n2\n3\n");
    assert_eq!(output(&s, "echo 1\necho 2").await, "1\n2\n");
}

#[tokio::test]
async fn and_chain() {
    let s = session().await;
    assert_eq!(output(&s, "echo 1 && echo 2").await, "1\n2\n");

    let (result, _) = run(&s, "cat missing.txt && echo 2 > ran.txt").await;
    assert_eq!(
        result.unwrap_err().to_string(),
        "cat: missing.txt: No such file or directory"
    );
    assert!(!s.fs().exists(Path::new("/shared/data/ran.txt")).await.unwrap());
}

#[tokio::test]
async fn or_chain() {
    let s = session().await;
    assert_eq!(output(&s, "echo 1 || echo 2").await, "1\n");

    let (result, side) = run(&s, "unknowncmd || echo 2").await;
    assert_eq!(result.unwrap(), "2\n");
    assert_eq!(side, "unknowncmd: command not found\n");
}

#[tokio::test]
async fn failure_aborts_rest_of_sequence() {
    let s = session().await;
    let (result, _) = run(&s, "echo 1 > a.txt; unknowncmd; echo 2 > b.txt").await;
    assert!(matches!(result, Err(Error::UnknownCommand(_))));
    assert!(s.fs().exists(Path::new("/shared/data/a.txt")).await.unwrap());
    assert!(!s.fs().exists(Path::new("/shared/data/b.txt")).await.unwrap());
}

#[tokio::test]
async fn pipes() {
    let s = session().await;
    assert_eq!(output(&s, "echo 1 | cat").await, "1\n");
    assert_eq!(
        output(&s, "echo -e 'b\\na\\nb\\nc' | sort | uniq -c | sort -r -n | head -n 1").await,
        "      2 b\n"
    );
}

#[tokio::test]
async fn pipe_then_and() {
    let s = session().await;
    assert_eq!(output(&s, "echo x | cat && echo y").await, "x\ny\n");
}

#[tokio::test]
async fn redirect_overwrite_and_append() {
    let s = session().await;
    output(&s, "echo test > f").await;
    output(&s, "echo test > f").await;
    assert_eq!(read(&s, "/shared/data/f").await, "test\n");

    output(&s, "echo test >> f").await;
    assert_eq!(read(&s, "/shared/data/f").await, "test\ntest\n");

    output(&s, "echo new >> g").await;
    assert_eq!(read(&s, "/shared/data/g").await, "new\n");
}

#[tokio::test]
async fn redirect_clears_output_and_continues() {
    let s = session().await;
    assert_eq!(output(&s, "echo hidden > f && echo shown").await, "shown\n");
}

#[tokio::test]
async fn only_first_redirect_is_honored() {
    let s = session().await;
    assert_eq!(output(&s, "echo once > first.txt > second.txt").await, "");
    assert_eq!(read(&s, "/shared/data/first.txt").await, "once\n");
    assert!(
        !s.fs()
            .exists(Path::new("/shared/data/second.txt"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn redirect_strips_ansi() {
    let s = session().await;
    output(&s, "echo -e '\\x1b[31mred\\x1b[0m' > colors.txt").await;
    assert_eq!(read(&s, "/shared/data/colors.txt").await, "red\n");
}

#[tokio::test]
async fn variables() {
    let s = session().await;
    assert_eq!(output(&s, "x=5; echo $x").await, "5\n");
    assert_eq!(output(&s, "echo $neverset").await, "\n");
    output(&s, "unset x").await;
    assert_eq!(output(&s, "echo $x").await, "\n");
}

#[tokio::test]
async fn variable_concatenation_and_substitution() {
    let s = session().await;
    assert_eq!(
        output(&s, "name=reads; echo \"${name}_1.fq\" $(echo -n sub)").await,
        "reads_1.fq sub\n"
    );
    assert_eq!(output(&s, "n=$(echo -e 'a\\nb' | wc -l); echo -n $n").await, "2\n");
}

#[tokio::test]
async fn command_substitution_keeps_trailing_newline() {
    let s = session().await;
    output(&s, "echo -e 'l1\\nl2\\nl3' > f.txt").await;
    assert_eq!(output(&s, "echo -n $(head -n 3 f.txt) | wc -l").await, "3\n");
    assert_eq!(output(&s, "echo -n $(head -n 2 f.txt) | wc -l").await, "2\n");
    assert_eq!(output(&s, "echo [$(echo x)]").await, "[x\n]\n");
}

#[tokio::test]
async fn tilde_expansion() {
    let s = session().await;
    assert_eq!(output(&s, "echo ~ ~/x a~").await, "/shared/data /shared/data/x a~\n");
}

#[tokio::test]
async fn glob_expansion() {
    let s = session().await;
    output(&s, "touch a1.txt a2.txt b.txt; mkdir sub").await;
    assert_eq!(output(&s, "echo a*.txt").await, "a1.txt a2.txt\n");
    assert_eq!(output(&s, "echo ?.txt").await, "b.txt\n");
    assert_eq!(output(&s, "echo s*").await, "sub/\n");
    assert_eq!(output(&s, "echo '*.txt'").await, "*.txt\n");
}

#[tokio::test]
async fn glob_fallback() {
    let s = session().await;
    assert_eq!(output(&s, "echo *.bam").await, "*.bam\n");
    assert_eq!(output(&s, "echo nowhere/*.bam").await, "nowhere/*.bam\n");
}

#[tokio::test]
async fn mkdir_parents_is_idempotent() {
    let s = session().await;
    assert_eq!(output(&s, "mkdir -p a/b/c").await, "");
    assert_eq!(output(&s, "mkdir -p a/b/c").await, "");
    for dir in ["/shared/data/a", "/shared/data/a/b", "/shared/data/a/b/c"] {
        assert!(s.fs().is_dir(Path::new(dir)).await, "{}", dir);
    }
}

/// Filesystem that logs every removal before delegating to memory.
struct RemovalLog {
    inner: InMemoryFs,
    removals: Mutex<Vec<String>>,
}

impl RemovalLog {
    fn new() -> Self {
        Self {
            inner: InMemoryFs::new(),
            removals: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, op: &str, path: &Path) {
        let rel = path.strip_prefix("/shared/data").unwrap_or(path);
        self.removals.lock().unwrap().push(format!("{} {}", op, rel.display()));
    }

    fn removals(&self) -> Vec<String> {
        self.removals.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileSystem for RemovalLog {
    async fn read_file(&self, path: &Path) -> sandshell::Result<Vec<u8>> {
        self.inner.read_file(path).await
    }
    async fn write_file(&self, path: &Path, content: &[u8]) -> sandshell::Result<()> {
        self.inner.write_file(path, content).await
    }
    async fn mkdir(&self, path: &Path, recursive: bool) -> sandshell::Result<()> {
        self.inner.mkdir(path, recursive).await
    }
    async fn unlink(&self, path: &Path) -> sandshell::Result<()> {
        self.record("unlink", path);
        self.inner.unlink(path).await
    }
    async fn rmdir(&self, path: &Path) -> sandshell::Result<()> {
        self.record("rmdir", path);
        self.inner.rmdir(path).await
    }
    async fn stat(&self, path: &Path) -> sandshell::Result<Metadata> {
        self.inner.stat(path).await
    }
    async fn read_dir(&self, path: &Path) -> sandshell::Result<Vec<DirEntry>> {
        self.inner.read_dir(path).await
    }
    async fn exists(&self, path: &Path) -> sandshell::Result<bool> {
        self.inner.exists(path).await
    }
    async fn rename(&self, from: &Path, to: &Path) -> sandshell::Result<()> {
        self.inner.rename(from, to).await
    }
    async fn utime(&self, path: &Path, modified: SystemTime) -> sandshell::Result<()> {
        self.inner.utime(path, modified).await
    }
}

#[tokio::test]
async fn recursive_delete_removes_files_then_directories_deepest_first() {
    let fs = Arc::new(RemovalLog::new());
    let s = Session::builder().fs(fs.clone()).build().await.unwrap();
    output(&s, "mkdir -p d/a/deep d/b; touch d/f d/a/g d/a/deep/h d/b/i").await;

    assert_eq!(output(&s, "rm -r d").await, "");
    assert_eq!(
        fs.removals(),
        vec![
            "unlink d/f",
            "unlink d/a/g",
            "unlink d/a/deep/h",
            "unlink d/b/i",
            "rmdir d/a/deep",
            "rmdir d/b",
            "rmdir d/a",
            "rmdir d",
        ]
    );
    assert!(!s.fs().exists(Path::new("/shared/data/d")).await.unwrap());
}

#[tokio::test]
async fn rm_errors_are_per_path() {
    let s = session().await;
    output(&s, "touch keep.txt drop.txt").await;
    let (result, _) = run(&s, "rm missing drop.txt").await;
    assert_eq!(result.unwrap_err().to_string(), "missing: Cannot delete files");
    assert!(!s.fs().exists(Path::new("/shared/data/drop.txt")).await.unwrap());
    assert!(s.fs().exists(Path::new("/shared/data/keep.txt")).await.unwrap());
}

#[tokio::test]
async fn cd_and_previous_directory() {
    let s = session().await;
    output(&s, "mkdir -p work").await;
    assert_eq!(output(&s, "cd work; pwd").await, "/shared/data/work\n");
    assert_eq!(output(&s, "cd -; pwd").await, "/shared/data\n");
    assert_eq!(
        output(&s, "cd nowhere").await,
        "nowhere: No such file or directory\n"
    );
}

#[tokio::test]
async fn time_reports_runtime() {
    let s = session().await;
    let (result, side) = run(&s, "time echo hi").await;
    assert_eq!(result.unwrap(), "hi\n");
    assert!(side.starts_with("Runtime: ") && side.ends_with("ms\n"), "{}", side);
}

#[tokio::test]
async fn process_substitution() {
    let s = session().await;
    assert_eq!(
        output(&s, "cat <(echo left) <(echo right)").await,
        "left\nright\n"
    );
}

#[tokio::test]
async fn unsupported_constructs() {
    let s = session().await;
    for (line, message) in [
        ("(echo hi)", "Error: subshell is not supported."),
        ("for i in 1 2; do echo $i; done", "Error: for is not supported."),
        ("echo hi 2> err.txt", "Error: 2> redirection is not supported."),
        ("pwd 2>&1", "Error: 2>&1 redirection is not supported."),
    ] {
        let (result, _) = run(&s, line).await;
        assert_eq!(result.unwrap_err().to_string(), message, "{}", line);
    }
}

#[tokio::test]
async fn parse_errors_are_uniform() {
    let s = session().await;
    for line in ["echo 'open", "echo $((1 + 2))", "cat <<EOF", "| cat"] {
        let (result, _) = run(&s, line).await;
        assert_eq!(result.unwrap_err().to_string(), "Unrecognized command", "{}", line);
    }
}

#[tokio::test]
async fn sessions_are_isolated() {
    let a = session().await;
    let b = session().await;
    output(&a, "x=1; touch only-a.txt").await;
    assert_eq!(output(&b, "echo $x").await, "\n");
    assert!(!b.fs().exists(Path::new("/shared/data/only-a.txt")).await.unwrap());
}

#[tokio::test]
async fn history_builtin_sees_caller_entries() {
    let s = Session::builder()
        .history(["ls", "pwd"])
        .build()
        .await
        .unwrap();
    s.history().push("history");
    assert_eq!(output(&s, "history").await, "1\tls\n2\tpwd\n3\thistory\n");
}

#[tokio::test]
async fn mktemp_uses_scratch_dir() {
    let s = Session::builder()
        .scratch_suffixes(Box::new(sandshell::SequentialSuffix::starting_at(42)))
        .build()
        .await
        .unwrap();
    assert_eq!(output(&s, "mktemp").await, "/shared/tmp/tmp42\n");
    assert_eq!(output(&s, "f=$(mktemp); echo hi > $f; cat $f").await, "hi\n");
}

#[tokio::test]
async fn sink_shared_across_clones() {
    let s = session().await;
    let buffer = Arc::new(BufferSink::new());
    let sink: SharedSink = buffer.clone();
    s.clone().exec("unknowncmd || true_cmd_missing || echo ok", &sink).await.unwrap();
    assert_eq!(
        buffer.contents(),
        "unknowncmd: command not found\ntrue_cmd_missing: command not found\n"
    );
}
