//! Sandshell CLI - run command lines against a virtual filesystem
//!
//! Usage:
//!   sandshell -c 'echo hello'             # Execute a command line
//!   sandshell --config tutorial.json      # Prepare a tutorial, then REPL
//!   sandshell                             # Interactive REPL

use anyhow::{Context, Result};
use clap::Parser;
use sandshell::{FnSink, OutputSink, Session, SessionConfig, SharedSink};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Sandshell - sandboxed command interpreter
#[derive(Parser, Debug)]
#[command(name = "sandshell")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Execute the given command line and exit
    #[arg(short = 'c')]
    command: Option<String>,

    /// Session configuration (JSON with tools, files, pwd, init, env)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tutorial directory to start in
    #[arg(long)]
    cwd: Option<String>,

    /// Base URL configured files are fetched from
    #[arg(long)]
    base_url: Option<String>,

    /// Log interpreter events to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(path: &Path) -> Result<SessionConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    SessionConfig::from_json(&json).with_context(|| format!("Invalid config: {}", path.display()))
}

async fn build_session(args: &Args) -> Result<Session> {
    let mut builder = Session::builder();
    if let Some(path) = &args.config {
        builder = builder.config(load_config(path)?);
    }
    if let Some(cwd) = &args.cwd {
        builder = builder.cwd(cwd.clone());
    }
    if let Some(url) = &args.base_url {
        builder = builder.base_url(url.clone());
    }
    #[cfg(feature = "http_client")]
    {
        let client = sandshell::HttpClient::new().context("Failed to create HTTP client")?;
        builder = builder.fetcher(Arc::new(client));
    }
    builder.build().await.context("Failed to prepare session")
}

/// Run one line, printing its output or its error.
async fn run_line(session: &Session, line: &str, sink: &SharedSink) -> bool {
    match session.exec(line, sink).await {
        Ok(output) => {
            print!("{}", output);
            true
        }
        Err(err) => {
            println!("{}", err);
            false
        }
    }
}

fn prompt(session: &Session) -> Result<()> {
    print!("guest@sandbox:{}$ ", session.cwd().display());
    std::io::stdout().flush().context("Failed to write prompt")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let session = build_session(&args).await?;
    let sink: SharedSink = Arc::new(FnSink::new(|text: &str| eprint!("{}", text)));

    if let Some(line) = &args.command {
        let ok = run_line(&session, line, &sink).await;
        session.wait_jobs().await;
        sink.close();
        std::process::exit(if ok { 0 } else { 1 });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(&session)?;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line == "exit" {
            break;
        }
        if !line.is_empty() {
            session.history().push(line);
            run_line(&session, line, &sink).await;
        }
        prompt(&session)?;
    }

    session.wait_jobs().await;
    sink.close();
    Ok(())
}
