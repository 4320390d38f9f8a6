//! Default tool catalog
//!
//! A coreutils subset that tutorials and tests rely on. Argument handling is
//! deliberately small; these are not GNU-compatible.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use regex::RegexBuilder;
use std::collections::HashMap;

use super::{Tool, ToolContext, ToolOutput};
use crate::error::{Error, Result};
use crate::fs::{FileType, Metadata, resolve_path};

/// Default number of lines for head/tail
const DEFAULT_LINES: usize = 10;

/// The default tools, keyed by name.
pub fn default_tools() -> HashMap<String, Box<dyn Tool>> {
    let mut tools: HashMap<String, Box<dyn Tool>> = HashMap::new();
    tools.insert("echo".to_string(), Box::new(Echo));
    tools.insert("cat".to_string(), Box::new(Cat));
    tools.insert("ls".to_string(), Box::new(Ls));
    tools.insert("head".to_string(), Box::new(Head));
    tools.insert("tail".to_string(), Box::new(Tail));
    tools.insert("wc".to_string(), Box::new(Wc));
    tools.insert("grep".to_string(), Box::new(Grep));
    tools.insert("sort".to_string(), Box::new(Sort));
    tools.insert("uniq".to_string(), Box::new(Uniq));
    tools.insert("cut".to_string(), Box::new(Cut));
    tools
}

/// Read the named files in order, or stdin when there are none.
/// `-` stands for stdin.
async fn read_inputs(tool: &str, ctx: &ToolContext<'_>, files: &[&str]) -> Result<String> {
    if files.is_empty() {
        return Ok(ctx.stdin.clone().unwrap_or_default());
    }

    let mut text = String::new();
    for file in files {
        if *file == "-" {
            text.push_str(ctx.stdin.as_deref().unwrap_or_default());
            continue;
        }
        let path = resolve_path(&ctx.cwd, file);
        match ctx.fs.read_file(&path).await {
            Ok(content) => text.push_str(&String::from_utf8_lossy(&content)),
            Err(_) if ctx.fs.is_dir(&path).await => {
                return Err(Error::execution(format!("{}: {}: Is a directory", tool, file)));
            }
            Err(_) => {
                return Err(Error::execution(format!(
                    "{}: {}: No such file or directory",
                    tool, file
                )));
            }
        }
    }
    Ok(text)
}

/// Join lines back into text with a trailing newline.
fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

/// The echo tool - display a line of text.
///
/// Usage: echo [-n] [-e] [STRING...]
pub struct Echo;

#[async_trait]
impl Tool for Echo {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let mut newline = true;
        let mut escapes = false;
        let mut start = 0;

        for arg in ctx.args {
            match arg.as_str() {
                "-n" => newline = false,
                "-e" => escapes = true,
                "-ne" | "-en" => {
                    newline = false;
                    escapes = true;
                }
                _ => break,
            }
            start += 1;
        }

        let mut text = ctx.args[start..].join(" ");
        if escapes {
            text = interpret_escapes(&text);
        }
        if newline {
            text.push('\n');
        }
        Ok(ToolOutput::stdout(text))
    }
}

fn interpret_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('e') => out.push('\x1b'),
            Some('\\') => out.push('\\'),
            Some('x') => {
                let mut code = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(d) => {
                            code = code * 16 + d;
                            digits += 1;
                            chars.next();
                        }
                        None => break,
                    }
                }
                match char::from_u32(code).filter(|_| digits > 0) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str("\\x"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// The cat tool - concatenate files.
///
/// Usage: cat [FILE...]
pub struct Cat;

#[async_trait]
impl Tool for Cat {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let files: Vec<&str> = ctx.args.iter().map(String::as_str).collect();
        let text = read_inputs("cat", &ctx, &files).await?;
        Ok(ToolOutput::stdout(text))
    }
}

/// The ls tool - list directory contents.
///
/// Usage: ls [-l] [-a] [PATH...]
pub struct Ls;

impl Ls {
    fn long_line(name: &str, metadata: &Metadata) -> String {
        let kind = match metadata.file_type {
            FileType::Directory => 'd',
            FileType::File => '-',
        };
        let modified: DateTime<Local> = metadata.modified.into();
        format!(
            "{}{} 1 guest guest {:>8} {} {}",
            kind,
            mode_string(metadata.mode),
            metadata.size,
            modified.format("%b %e %H:%M"),
            name
        )
    }
}

fn mode_string(mode: u32) -> String {
    let mut s = String::with_capacity(9);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[async_trait]
impl Tool for Ls {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let mut long = false;
        let mut all = false;
        let mut paths = Vec::new();
        for arg in ctx.args {
            if arg.starts_with('-') && arg.len() > 1 {
                long |= arg.contains('l');
                all |= arg.contains('a');
            } else {
                paths.push(arg.as_str());
            }
        }
        if paths.is_empty() {
            paths.push(".");
        }

        let mut output = String::new();
        let mut errors = Vec::new();
        let multiple = paths.len() > 1;

        for (i, arg) in paths.iter().enumerate() {
            let path = resolve_path(&ctx.cwd, arg);
            let Ok(metadata) = ctx.fs.stat(&path).await else {
                errors.push(format!(
                    "ls: cannot access '{}': No such file or directory",
                    arg
                ));
                continue;
            };

            if metadata.file_type.is_file() {
                if long {
                    output.push_str(&Self::long_line(arg, &metadata));
                    output.push('\n');
                } else {
                    output.push_str(arg);
                    output.push('\n');
                }
                continue;
            }

            if multiple {
                if i > 0 {
                    output.push('\n');
                }
                output.push_str(&format!("{}:\n", arg));
            }
            for entry in ctx.fs.read_dir(&path).await? {
                if !all && entry.name.starts_with('.') {
                    continue;
                }
                if long {
                    output.push_str(&Self::long_line(&entry.name, &entry.metadata));
                } else {
                    output.push_str(&entry.name);
                }
                output.push('\n');
            }
        }

        if !errors.is_empty() && output.is_empty() {
            return Err(Error::execution(errors.join("\n")));
        }
        Ok(ToolOutput {
            stdout: output,
            stderr: join_lines(&errors),
        })
    }
}

/// Parse `-n NUM`, `-nNUM` and `-NUM`, returning the count and the files.
fn parse_count_args<'a>(tool: &str, args: &'a [String]) -> Result<(usize, Vec<&'a str>)> {
    let mut count = DEFAULT_LINES;
    let mut files = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let value = if arg == "-n" {
            Some(iter.next().map(String::as_str).unwrap_or_default())
        } else if let Some(rest) = arg.strip_prefix("-n") {
            Some(rest)
        } else if arg.len() > 1 && arg.starts_with('-') {
            Some(&arg[1..])
        } else {
            files.push(arg.as_str());
            None
        };

        if let Some(value) = value {
            count = value.trim_start_matches('+').parse().map_err(|_| {
                Error::execution(format!("{}: invalid number of lines: '{}'", tool, value))
            })?;
        }
    }

    Ok((count, files))
}

/// The head tool - output the first lines of input.
///
/// Usage: head [-n NUM] [FILE...]
pub struct Head;

#[async_trait]
impl Tool for Head {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let (count, files) = parse_count_args("head", ctx.args)?;
        let text = read_inputs("head", &ctx, &files).await?;
        let lines: Vec<&str> = text.lines().take(count).collect();
        Ok(ToolOutput::stdout(join_lines(&lines)))
    }
}

/// The tail tool - output the last lines of input.
///
/// Usage: tail [-n NUM] [FILE...]
pub struct Tail;

#[async_trait]
impl Tool for Tail {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let (count, files) = parse_count_args("tail", ctx.args)?;
        let text = read_inputs("tail", &ctx, &files).await?;
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(count);
        Ok(ToolOutput::stdout(join_lines(&lines[start..])))
    }
}

/// The wc tool - count lines, words and bytes.
///
/// Usage: wc [-l] [-w] [-c] [FILE...]
pub struct Wc;

#[async_trait]
impl Tool for Wc {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let mut lines = false;
        let mut words = false;
        let mut bytes = false;
        let mut files = Vec::new();

        for arg in ctx.args {
            if arg.starts_with('-') && arg.len() > 1 {
                lines |= arg.contains('l');
                words |= arg.contains('w');
                bytes |= arg.contains('c');
            } else {
                files.push(arg.as_str());
            }
        }
        if !lines && !words && !bytes {
            lines = true;
            words = true;
            bytes = true;
        }

        let mut rows: Vec<(String, Option<&str>)> = Vec::new();
        let count = |text: &str| {
            let mut fields = Vec::new();
            if lines {
                fields.push(text.matches('\n').count().to_string());
            }
            if words {
                fields.push(text.split_whitespace().count().to_string());
            }
            if bytes {
                fields.push(text.len().to_string());
            }
            fields.join(" ")
        };

        if files.is_empty() {
            let text = read_inputs("wc", &ctx, &[]).await?;
            rows.push((count(&text), None));
        } else {
            for file in files.iter().copied() {
                let text = read_inputs("wc", &ctx, &[file]).await?;
                rows.push((count(&text), Some(file)));
            }
        }

        let out: Vec<String> = rows
            .into_iter()
            .map(|(counts, file)| match file {
                Some(file) => format!("{} {}", counts, file),
                None => counts,
            })
            .collect();
        Ok(ToolOutput::stdout(join_lines(&out)))
    }
}

/// The grep tool - print lines matching a pattern.
///
/// Usage: grep [-v] [-i] [-c] PATTERN [FILE...]
pub struct Grep;

#[async_trait]
impl Tool for Grep {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let mut invert = false;
        let mut ignore_case = false;
        let mut count_only = false;
        let mut operands = Vec::new();

        for arg in ctx.args {
            if arg.starts_with('-') && arg.len() > 1 && operands.is_empty() {
                invert |= arg.contains('v');
                ignore_case |= arg.contains('i');
                count_only |= arg.contains('c');
            } else {
                operands.push(arg.as_str());
            }
        }

        let Some((pattern, files)) = operands.split_first() else {
            return Err(Error::execution("usage: grep [-v] [-i] [-c] PATTERN [FILE...]"));
        };
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| Error::execution(format!("grep: invalid pattern: {}", e)))?;

        let mut out = Vec::new();
        let sources: Vec<Option<&str>> = if files.is_empty() {
            vec![None]
        } else {
            files.iter().map(|f| Some(*f)).collect()
        };
        let prefix = sources.len() > 1;

        for source in sources {
            let text = match source {
                Some(file) => read_inputs("grep", &ctx, &[file]).await?,
                None => read_inputs("grep", &ctx, &[]).await?,
            };
            let matched: Vec<&str> = text
                .lines()
                .filter(|line| regex.is_match(line) != invert)
                .collect();

            let label = match source {
                Some(file) if prefix => format!("{}:", file),
                _ => String::new(),
            };
            if count_only {
                out.push(format!("{}{}", label, matched.len()));
            } else {
                out.extend(matched.into_iter().map(|line| format!("{}{}", label, line)));
            }
        }

        Ok(ToolOutput::stdout(join_lines(&out)))
    }
}

/// The sort tool - sort lines.
///
/// Usage: sort [-r] [-n] [-u] [FILE...]
pub struct Sort;

#[async_trait]
impl Tool for Sort {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let mut reverse = false;
        let mut numeric = false;
        let mut unique = false;
        let mut files = Vec::new();

        for arg in ctx.args {
            if arg.starts_with('-') && arg.len() > 1 {
                reverse |= arg.contains('r');
                numeric |= arg.contains('n');
                unique |= arg.contains('u');
            } else {
                files.push(arg.as_str());
            }
        }

        let text = read_inputs("sort", &ctx, &files).await?;
        let mut lines: Vec<&str> = text.lines().collect();

        if numeric {
            let key = |line: &str| -> f64 {
                line.split_whitespace()
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0.0)
            };
            lines.sort_by(|a, b| key(a).total_cmp(&key(b)).then_with(|| a.cmp(b)));
        } else {
            lines.sort();
        }
        if unique {
            lines.dedup();
        }
        if reverse {
            lines.reverse();
        }

        Ok(ToolOutput::stdout(join_lines(&lines)))
    }
}

/// The uniq tool - collapse adjacent duplicate lines.
///
/// Usage: uniq [-c] [FILE]
pub struct Uniq;

#[async_trait]
impl Tool for Uniq {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let count = ctx.args.iter().any(|a| a == "-c");
        let files: Vec<&str> = ctx
            .args
            .iter()
            .filter(|a| !a.starts_with('-') || a.len() == 1)
            .map(String::as_str)
            .collect();

        let text = read_inputs("uniq", &ctx, &files).await?;
        let mut groups: Vec<(usize, &str)> = Vec::new();
        for line in text.lines() {
            match groups.last_mut() {
                Some((n, prev)) if *prev == line => *n += 1,
                _ => groups.push((1, line)),
            }
        }

        let out: Vec<String> = groups
            .into_iter()
            .map(|(n, line)| {
                if count {
                    format!("{:>7} {}", n, line)
                } else {
                    line.to_string()
                }
            })
            .collect();
        Ok(ToolOutput::stdout(join_lines(&out)))
    }
}

/// The cut tool - select fields from each line.
///
/// Usage: cut -f LIST [-d DELIM] [FILE...]
pub struct Cut;

#[async_trait]
impl Tool for Cut {
    async fn run(&self, ctx: ToolContext<'_>) -> Result<ToolOutput> {
        let mut fields_spec = None;
        let mut delimiter = "\t".to_string();
        let mut files = Vec::new();
        let mut iter = ctx.args.iter();

        while let Some(arg) = iter.next() {
            if arg == "-f" {
                fields_spec = iter.next().cloned();
            } else if let Some(spec) = arg.strip_prefix("-f") {
                fields_spec = Some(spec.to_string());
            } else if arg == "-d" {
                delimiter = iter.next().cloned().unwrap_or_default();
            } else if let Some(d) = arg.strip_prefix("-d") {
                delimiter = d.to_string();
            } else {
                files.push(arg.as_str());
            }
        }

        let spec = fields_spec
            .ok_or_else(|| Error::execution("cut: you must specify a list of fields"))?;
        let ranges = parse_field_list(&spec)?;
        if delimiter.is_empty() {
            return Err(Error::execution("cut: the delimiter must be a single character"));
        }

        let text = read_inputs("cut", &ctx, &files).await?;
        let out: Vec<String> = text
            .lines()
            .map(|line| {
                if !line.contains(delimiter.as_str()) {
                    return line.to_string();
                }
                line.split(delimiter.as_str())
                    .enumerate()
                    .filter(|(i, _)| ranges.iter().any(|(lo, hi)| i + 1 >= *lo && i + 1 <= *hi))
                    .map(|(_, field)| field)
                    .collect::<Vec<_>>()
                    .join(&delimiter)
            })
            .collect();
        Ok(ToolOutput::stdout(join_lines(&out)))
    }
}

/// Parse `1,3`, `2-4`, `-2` and `3-` into inclusive 1-based ranges.
fn parse_field_list(spec: &str) -> Result<Vec<(usize, usize)>> {
    let invalid = || Error::execution(format!("cut: invalid field list: '{}'", spec));
    spec.split(',')
        .map(|part| -> Result<(usize, usize)> {
            let parse = |s: &str| s.parse::<usize>().ok().filter(|n| *n > 0);
            match part.split_once('-') {
                Some(("", hi)) => Ok((1, parse(hi).ok_or_else(invalid)?)),
                Some((lo, "")) => Ok((parse(lo).ok_or_else(invalid)?, usize::MAX)),
                Some((lo, hi)) => Ok((
                    parse(lo).ok_or_else(invalid)?,
                    parse(hi).ok_or_else(invalid)?,
                )),
                None => {
                    let n = parse(part).ok_or_else(invalid)?;
                    Ok((n, n))
                }
            }
        })
        .collect()
}
