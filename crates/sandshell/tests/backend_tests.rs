//! Integration tests for the execution backend seam
//!
//! Registers scripted tools and a stub fetcher to observe exactly what the
//! interpreter hands to the backend.

use pretty_assertions::assert_eq;
use sandshell::{
    BufferSink, Fetcher, MountSource, Session, SessionConfig, SharedSink, Tool, ToolContext,
    ToolOutput, async_trait,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Writes a fixed stderr line and echoes its arguments on stdout.
struct Noisy;

#[async_trait]
impl Tool for Noisy {
    async fn run(&self, ctx: ToolContext<'_>) -> sandshell::Result<ToolOutput> {
        Ok(ToolOutput {
            stdout: format!("{}\n", ctx.args.join(" ")),
            stderr: "warning: low coverage\n".to_string(),
        })
    }
}

/// Records every invocation: arguments and piped input.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(Vec<String>, Option<String>)>>>,
}

#[async_trait]
impl Tool for Recorder {
    async fn run(&self, ctx: ToolContext<'_>) -> sandshell::Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((ctx.args.to_vec(), ctx.stdin.clone()));
        Ok(ToolOutput::stdout("recorded\n"))
    }
}

struct StubFetcher;

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> sandshell::Result<Vec<u8>> {
        match url {
            "http://tutorials.test/data/basics/orders.tsv" => Ok(b"id\tqty\n1\t5\n".to_vec()),
            "http://tutorials.test/data/basics/raw/reads.fq" => Ok(b"@r1\nACGT\n".to_vec()),
            "https://example.com/genome.fa" => Ok(b">chr1\nACGT\n".to_vec()),
            _ => Err(sandshell::Error::Network(format!("404 for {}", url))),
        }
    }
}

async fn run(session: &Session, line: &str) -> (sandshell::Result<String>, String) {
    let buffer = BufferSink::shared();
    let sink: SharedSink = buffer.clone();
    let result = session.exec(line, &sink).await;
    session.wait_jobs().await;
    (result, buffer.contents())
}

#[tokio::test]
async fn stderr_goes_to_sink() {
    let s = Session::builder()
        .tool("noisy", Box::new(Noisy))
        .build()
        .await
        .unwrap();
    let (result, side) = run(&s, "noisy a b").await;
    assert_eq!(result.unwrap(), "a b\n");
    assert_eq!(side, "warning: low coverage\n");
}

#[tokio::test]
async fn stderr_merged_with_dup_redirect() {
    let s = Session::builder()
        .tool("noisy", Box::new(Noisy))
        .build()
        .await
        .unwrap();
    let (result, side) = run(&s, "noisy a 2>&1").await;
    assert_eq!(result.unwrap(), "warning: low coverage\na\n");
    assert_eq!(side, "");

    let (result, side) = run(&s, "noisy a 2>&1 > both.txt").await;
    assert_eq!(result.unwrap(), "");
    assert_eq!(side, "");
    let bytes = s.fs().read_file(Path::new("/shared/data/both.txt")).await.unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), "warning: low coverage\na\n");
}

#[tokio::test]
async fn pipe_feeds_stdin_to_target_only() {
    let recorder = Recorder::default();
    let s = Session::builder()
        .tool("rec", Box::new(recorder.clone()))
        .build()
        .await
        .unwrap();

    let (result, _) = run(&s, "echo data | rec first; rec second").await;
    assert_eq!(result.unwrap(), "recorded\nrecorded\n");

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            (vec!["first".to_string()], Some("data\n".to_string())),
            (vec!["second".to_string()], None),
        ]
    );
}

#[tokio::test]
async fn aliases_rewrite_command_names() {
    let recorder = Recorder::default();
    let s = Session::builder()
        .tool("gawk", Box::new(recorder.clone()))
        .tool("bowtie2-align-s", Box::new(recorder.clone()))
        .build()
        .await
        .unwrap();

    run(&s, "awk '{print $1}' f.tsv").await.0.unwrap();
    run(&s, "bowtie2 -x ref").await.0.unwrap();
    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls[0].0, ["{print $1}", "f.tsv"]);
    assert_eq!(calls[1].0, ["-x", "ref"]);
}

#[tokio::test]
async fn ll_lists_long_format() {
    let s = Session::builder().build().await.unwrap();
    run(&s, "touch a.txt").await.0.unwrap();
    let out = run(&s, "ll").await.0.unwrap();
    assert!(out.starts_with("-rw-r--r-- 1 guest guest"), "{}", out);
    assert!(out.ends_with(" a.txt\n"), "{}", out);
}

#[tokio::test]
async fn samtools_output_redirect_becomes_flag() {
    let recorder = Recorder::default();
    let s = Session::builder()
        .tool("samtools", Box::new(recorder.clone()))
        .build()
        .await
        .unwrap();

    let (result, _) = run(&s, "samtools sort reads.bam > sorted.bam").await;
    assert_eq!(result.unwrap(), "recorded\n");
    assert!(!s.fs().exists(Path::new("/shared/data/sorted.bam")).await.unwrap());

    run(&s, "samtools idxstats reads.bam > stats.txt").await.0.unwrap();
    assert!(s.fs().exists(Path::new("/shared/data/stats.txt")).await.unwrap());

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls[0].0, ["sort", "reads.bam", "-o", "sorted.bam"]);
    assert_eq!(calls[1].0, ["idxstats", "reads.bam"]);
}

#[tokio::test]
async fn curl_through_fetcher() {
    let s = Session::builder()
        .fetcher(Arc::new(StubFetcher))
        .build()
        .await
        .unwrap();

    assert_eq!(
        run(&s, "curl https://example.com/genome.fa").await.0.unwrap(),
        ">chr1\nACGT\n"
    );
    assert_eq!(
        run(&s, "curl -O https://example.com/genome.fa && head -n 1 genome.fa")
            .await
            .0
            .unwrap(),
        ">chr1\n"
    );
    let (result, _) = run(&s, "curl https://example.com/missing").await;
    assert_eq!(
        result.unwrap_err().to_string(),
        "network error: 404 for https://example.com/missing"
    );
}

#[tokio::test]
async fn config_preloads_files_by_url() {
    let config = SessionConfig::from_json(
        r#"{
            "pwd": "basics",
            "files": ["data/basics/orders.tsv", "data/basics/raw/reads.fq"],
            "init": "GREETING=hello"
        }"#,
    )
    .unwrap();
    let s = Session::builder()
        .config(config)
        .base_url("http://tutorials.test/")
        .fetcher(Arc::new(StubFetcher))
        .build()
        .await
        .unwrap();

    assert_eq!(s.cwd(), Path::new("/shared/data/tutorials/basics"));
    assert_eq!(run(&s, "cat orders.tsv | wc -l").await.0.unwrap(), "2\n");
    assert_eq!(run(&s, "head -n 1 raw/reads.fq").await.0.unwrap(), "@r1\n");
    assert_eq!(run(&s, "echo $GREETING").await.0.unwrap(), "hello\n");
}

#[tokio::test]
async fn preload_bytes_without_network() {
    let s = Session::builder()
        .cwd("offline")
        .preload(
            "seq.fa",
            MountSource::Bytes {
                name: "seq.fa".into(),
                data: b">s\nAC\n".to_vec(),
            },
        )
        .build()
        .await
        .unwrap();
    assert_eq!(run(&s, "ls").await.0.unwrap(), "seq.fa\n");
}
