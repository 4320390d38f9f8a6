//! Interpreter for parsed command lines
//!
//! [`Interpreter::execute`] walks a [`Node`] tree, resolves arguments,
//! dispatches each command to a built-in or the execution backend, and
//! implements pipes, redirects, `&&`/`||` chains, `time` and background
//! jobs.

mod env;
mod glob;
mod jobs;
mod resolve;
mod sink;
mod transform;

pub use env::Environment;
pub use glob::{expand as expand_glob, translate as translate_glob};
pub use jobs::{FIRST_JOB_ID, FIRST_PID, Job, JobTracker};
pub use resolve::{Value, expand_tilde};
pub use sink::{BufferSink, FnSink, NullSink, OutputSink, SharedSink};
pub use transform::transform;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::backend::ExecutionBackend;
use crate::builtins::{self, Builtin, Context, History, ParsedArgs, ScratchDir};
use crate::error::{Error, Result};
use crate::fs::{read_text, resolve_path, write_text};
use crate::logging::LogConfig;
use crate::network::Fetcher;
use crate::parser::{Assignment, CommandNode, ControlOp, Node, Redirect, RedirectOp, SequenceEntry};

/// Session state the interpreter starts from.
pub struct InterpreterOptions {
    /// Initial variables
    pub env: Environment,
    /// Command history shown by `history`
    pub history: History,
    /// Temporary file allocator for `mktemp` and `<(...)`
    pub scratch: ScratchDir,
    /// Network access for `curl`
    pub fetcher: Option<Arc<dyn Fetcher>>,
    /// What may appear in log events
    pub log: LogConfig,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            env: Environment::new(),
            history: History::new(),
            scratch: ScratchDir::new(),
            fetcher: None,
            log: LogConfig::default(),
        }
    }
}

struct Shared {
    env: Environment,
    jobs: JobTracker,
    backend: Arc<dyn ExecutionBackend>,
    builtins: HashMap<&'static str, Box<dyn Builtin>>,
    /// Directory `cd -` returns to
    previous_dir: Mutex<Option<PathBuf>>,
    history: History,
    scratch: ScratchDir,
    fetcher: Option<Arc<dyn Fetcher>>,
    log: LogConfig,
}

/// The command interpreter.
///
/// Cloning is cheap and every clone shares the same session state, which is
/// how background jobs keep working on the session after being spawned.
#[derive(Clone)]
pub struct Interpreter {
    shared: Arc<Shared>,
}

impl Interpreter {
    /// Create an interpreter with default options.
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self::with_options(backend, InterpreterOptions::default())
    }

    /// Create an interpreter with the given session state.
    pub fn with_options(backend: Arc<dyn ExecutionBackend>, options: InterpreterOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                env: options.env,
                jobs: JobTracker::new(),
                backend,
                builtins: builtins::default_builtins(),
                previous_dir: Mutex::new(None),
                history: options.history,
                scratch: options.scratch,
                fetcher: options.fetcher,
                log: options.log,
            }),
        }
    }

    /// The session's variables.
    pub fn env(&self) -> &Environment {
        &self.shared.env
    }

    /// The session's background jobs.
    pub fn jobs(&self) -> &JobTracker {
        &self.shared.jobs
    }

    /// The execution backend.
    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.shared.backend
    }

    /// The command history buffer.
    pub fn history(&self) -> &History {
        &self.shared.history
    }

    /// What may appear in log events.
    pub fn log_config(&self) -> &LogConfig {
        &self.shared.log
    }

    /// Whether `name` is handled in-process.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.shared.builtins.contains_key(name)
    }

    /// Execute a node and return its captured output.
    pub fn execute<'a>(&'a self, node: &'a Node, sink: &'a SharedSink) -> BoxFuture<'a, Result<String>> {
        async move {
            match node {
                Node::Sequence(entries) => self.execute_sequence(entries, sink).await,
                Node::Time(inner) => {
                    let start = Instant::now();
                    let output = self.execute(inner, sink).await?;
                    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                    sink.write(&format!("Runtime: {:.2}ms\n", elapsed));
                    Ok(output)
                }
                Node::Assignment(assignment) => self.execute_assignment(assignment, sink).await,
                Node::Command(cmd) => self.execute_command(cmd, sink, None).await,
                Node::Subshell(_) => Err(Error::unsupported("subshell")),
                Node::Compound { keyword } if keyword == "[[" => {
                    Err(Error::unsupported("test expression"))
                }
                Node::Compound { keyword } => Err(Error::unsupported(keyword.clone())),
                other => Err(Error::unsupported(format!("{} statement", other.kind()))),
            }
        }
        .boxed()
    }

    async fn execute_sequence(&self, entries: &[SequenceEntry], sink: &SharedSink) -> Result<String> {
        let mut output = String::new();
        for entry in entries {
            if entry.control == ControlOp::Background {
                self.launch_background(entry.node.clone(), sink);
                continue;
            }
            output.push_str(&self.execute(&entry.node, sink).await?);
        }
        Ok(output)
    }

    /// Run `node` as a detached job.
    ///
    /// The "launched" notice is written before this returns; the job's
    /// output and its "done" notice follow whenever the task completes.
    fn launch_background(&self, node: Node, sink: &SharedSink) {
        let job = self.shared.jobs.allocate();
        tracing::debug!(job = job.id, pid = job.pid, "launching background job");
        sink.write(&format!("[{}] {} launched\n", job.id, job.pid));

        let interpreter = self.clone();
        let sink = Arc::clone(sink);
        let handle = tokio::spawn(async move {
            match interpreter.execute(&node, &sink).await {
                Ok(output) => sink.write(&output),
                Err(err) => sink.write(&error_line(&err)),
            }
            sink.write(&format!("[{}] {} done\n", job.id, job.pid));
            interpreter.shared.jobs.finish(job.id);
            tracing::debug!(job = job.id, "background job finished");
        });
        self.shared.jobs.attach(job.id, handle);
    }

    async fn execute_assignment(&self, assignment: &Assignment, sink: &SharedSink) -> Result<String> {
        let value = match &assignment.value {
            Some(node) => self.resolve_string(node, sink).await?,
            None => String::new(),
        };
        tracing::debug!(
            name = %assignment.name,
            value = %self.shared.log.variable_value(&assignment.name, &value),
            "assign"
        );
        self.shared.env.set(assignment.name.clone(), value);
        Ok(String::new())
    }

    /// Execute a command, recovering from its failure when it is followed
    /// by `||`.
    fn execute_command<'a>(
        &'a self,
        cmd: &'a CommandNode,
        sink: &'a SharedSink,
        stdin: Option<String>,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let cmd = transform(cmd);
            match self.run_command(&cmd, sink, stdin).await {
                Ok(output) => Ok(output),
                Err(err) => match (&cmd.control, &cmd.next) {
                    (Some(ControlOp::Or), Some(next)) => {
                        tracing::debug!(error = %err, "recovering with ||");
                        sink.write(&error_line(&err));
                        self.execute(next, sink).await
                    }
                    _ => Err(err),
                },
            }
        }
        .boxed()
    }

    async fn run_command(&self, cmd: &CommandNode, sink: &SharedSink, stdin: Option<String>) -> Result<String> {
        let name = self.resolve_string(&cmd.name, sink).await?.trim().to_string();
        let mut args = Vec::with_capacity(cmd.args.len());
        for arg in &cmd.args {
            args.extend(self.resolve(arg, sink).await?.into_vec());
        }

        let mut redirects: &[Redirect] = &cmd.redirects;
        let mut output = if let Some(builtin) = self.shared.builtins.get(name.as_str()) {
            tracing::debug!(command = %name, args = args.len(), "dispatching built-in");
            let parsed = ParsedArgs::parse(&args, builtin.boolean_flags());
            let mut output = builtin.execute(self.builtin_context(&parsed)).await?;
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output
        } else {
            tracing::debug!(command = %name, args = args.len(), "dispatching to backend");
            let backend = &self.shared.backend;
            backend.set_stdin(stdin);
            let result = backend.execute(&name, &args).await?;
            if redirects.first().is_some_and(Redirect::merges_stderr) {
                redirects = &redirects[1..];
                result.stderr + &result.stdout
            } else {
                if !result.stderr.is_empty() {
                    sink.write(&result.stderr);
                }
                result.stdout
            }
        };

        // Only the first redirect is honored
        match redirects.first() {
            None => {}
            Some(Redirect::Pipe(target)) => {
                tracing::debug!(bytes = output.len(), "piping output");
                return self.execute_piped(target, output, sink).await;
            }
            Some(Redirect::File {
                fd: 1,
                op: op @ (RedirectOp::Truncate | RedirectOp::Append),
                target,
            }) => {
                let raw = self.resolve_string(target, sink).await?;
                self.write_redirect(&raw, *op, &output).await?;
                output.clear();
            }
            Some(other) => {
                return Err(Error::unsupported(format!("{} redirection", other.kind())));
            }
        }

        if let Some(next) = &cmd.next {
            if cmd.control != Some(ControlOp::Or) {
                output.push_str(&self.execute(next, sink).await?);
            }
        }
        Ok(output)
    }

    /// Feed `input` to the pipe target.
    async fn execute_piped(&self, target: &Node, input: String, sink: &SharedSink) -> Result<String> {
        match target {
            Node::Command(cmd) => self.execute_command(cmd, sink, Some(input)).await,
            other => self.execute(other, sink).await,
        }
    }

    async fn write_redirect(&self, raw: &str, op: RedirectOp, output: &str) -> Result<()> {
        let fs = self.shared.backend.fs();
        let path = resolve_path(&self.shared.backend.cwd(), raw);
        tracing::debug!(path = %path.display(), %op, bytes = output.len(), "redirecting output");

        let mut contents = String::new();
        if op == RedirectOp::Append && fs.exists(&path).await? {
            contents = read_text(fs.as_ref(), &path)
                .await
                .map_err(|e| builtins::path_error(raw, e))?;
        }
        contents.push_str(output);
        write_text(fs.as_ref(), &path, &contents)
            .await
            .map_err(|e| builtins::path_error(raw, e))
    }

    fn builtin_context<'a>(&'a self, args: &'a ParsedArgs) -> Context<'a> {
        Context {
            args,
            env: &self.shared.env,
            backend: &self.shared.backend,
            previous_dir: &self.shared.previous_dir,
            history: &self.shared.history,
            scratch: &self.shared.scratch,
            fetcher: self.shared.fetcher.as_ref(),
        }
    }
}

/// Text written to the sink for an error that does not abort the caller.
pub fn error_line(err: &Error) -> String {
    let mut line = err.to_string();
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::VirtualBackend;
    use crate::fs::InMemoryFs;
    use crate::parser::parse;

    fn interpreter() -> Interpreter {
        let backend = VirtualBackend::new(Arc::new(InMemoryFs::new())).with_default_tools();
        Interpreter::with_options(
            Arc::new(backend),
            InterpreterOptions {
                env: Environment::with_vars([("HOME", "/shared/data"), ("USER", "guest")]),
                ..Default::default()
            },
        )
    }

    async fn run(interp: &Interpreter, line: &str) -> (Result<String>, String) {
        let buffer = BufferSink::shared();
        let sink: SharedSink = buffer.clone();
        let node = parse(line).unwrap();
        let result = interp.execute(&node, &sink).await;
        interp.jobs().wait_all().await;
        (result, buffer.contents())
    }

    #[tokio::test]
    async fn test_sequence() {
        let interp = interpreter();
        let (out, _) = run(&interp, "echo 1; echo 2; echo 3").await;
        assert_eq!(out.unwrap(), "1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_time_passes_output_through() {
        let interp = interpreter();
        let (out, side) = run(&interp, "time echo hi").await;
        assert_eq!(out.unwrap(), "hi\n");
        assert!(side.starts_with("Runtime: "), "{}", side);
        assert!(side.ends_with("ms\n"));
    }

    #[tokio::test]
    async fn test_or_recovery_reports_error() {
        let interp = interpreter();
        let (out, side) = run(&interp, "nosuchtool || echo 2").await;
        assert_eq!(out.unwrap(), "2\n");
        assert_eq!(side, "nosuchtool: command not found\n");
    }

    #[tokio::test]
    async fn test_and_stops_on_failure() {
        let interp = interpreter();
        let (out, _) = run(&interp, "nosuchtool && echo 2").await;
        assert!(matches!(out, Err(Error::UnknownCommand(_))));
    }

    #[tokio::test]
    async fn test_or_skips_next_on_success() {
        let interp = interpreter();
        let (out, _) = run(&interp, "echo 1 || echo 2").await;
        assert_eq!(out.unwrap(), "1\n");
    }

    #[tokio::test]
    async fn test_builtin_output_gets_newline() {
        let interp = interpreter();
        let (out, _) = run(&interp, "whoami").await;
        assert_eq!(out.unwrap(), "guest\n");
        let (out, _) = run(&interp, "unset nothing").await;
        assert_eq!(out.unwrap(), "");
    }

    #[tokio::test]
    async fn test_subshell_and_compound_rejected() {
        let interp = interpreter();
        let (out, _) = run(&interp, "(echo hi)").await;
        assert_eq!(out.unwrap_err().to_string(), "Error: subshell is not supported.");
        let (out, _) = run(&interp, "if true; then echo; fi").await;
        assert_eq!(out.unwrap_err().to_string(), "Error: if is not supported.");
        let (out, _) = run(&interp, "[[ -f x ]]").await;
        assert_eq!(
            out.unwrap_err().to_string(),
            "Error: test expression is not supported."
        );
    }

    #[tokio::test]
    async fn test_unsupported_redirects() {
        let interp = interpreter();
        let (out, _) = run(&interp, "echo hi 2> err.txt").await;
        assert_eq!(
            out.unwrap_err().to_string(),
            "Error: 2> redirection is not supported."
        );
        let (out, _) = run(&interp, "cat < in.txt").await;
        assert_eq!(
            out.unwrap_err().to_string(),
            "Error: < redirection is not supported."
        );
    }

    #[tokio::test]
    async fn test_merge_stderr_into_pipe() {
        let interp = interpreter();
        // ls reports the missing path on stderr and still lists the rest
        let (out, side) = run(&interp, "ls /tmp /missing 2>&1 | cat").await;
        assert_eq!(side, "");
        let out = out.unwrap();
        assert!(out.starts_with("ls: cannot access '/missing'"), "{}", out);
    }

    #[tokio::test]
    async fn test_stderr_goes_to_sink() {
        let interp = interpreter();
        let (out, side) = run(&interp, "ls /tmp /missing").await;
        assert_eq!(out.unwrap(), "/tmp:\n");
        assert_eq!(side, "ls: cannot access '/missing': No such file or directory\n");
    }

    #[tokio::test]
    async fn test_command_substitution_and_concatenation() {
        let interp = interpreter();
        let (out, _) = run(&interp, "d=$(pwd); echo \"$d/out.txt\"").await;
        assert_eq!(out.unwrap(), "/home/user\n/out.txt\n");
    }

    #[tokio::test]
    async fn test_process_substitution_creates_temp_file() {
        let interp = interpreter();
        let (out, _) = run(&interp, "cat <(echo from-process)").await;
        assert_eq!(out.unwrap(), "from-process\n");
    }

    #[tokio::test]
    async fn test_output_process_substitution_rejected() {
        let interp = interpreter();
        let (out, _) = run(&interp, "echo hi >(cat)").await;
        assert_eq!(
            out.unwrap_err().to_string(),
            "Error: output process substitution is not supported."
        );
    }

    #[tokio::test]
    async fn test_pipe_input_not_visible_to_argument_substitution() {
        let interp = interpreter();
        let (out, _) = run(&interp, "echo piped | grep $(echo -n pipe)").await;
        assert_eq!(out.unwrap(), "piped\n");
    }
}
