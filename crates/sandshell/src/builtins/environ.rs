//! Environment builtins - env, unset, whoami, history

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;

/// User reported when `USER` is unset or empty.
const DEFAULT_USER: &str = "guest";

/// The env builtin - list variables as sorted `NAME=value` lines.
pub struct Env;

#[async_trait]
impl Builtin for Env {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let lines: Vec<String> = ctx
            .env
            .snapshot()
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        Ok(lines.join("\n"))
    }
}

/// The unset builtin - remove variables.
pub struct Unset;

#[async_trait]
impl Builtin for Unset {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        for name in ctx.args.positional() {
            ctx.env.unset(name);
        }
        Ok(String::new())
    }
}

/// The whoami builtin.
pub struct Whoami;

#[async_trait]
impl Builtin for Whoami {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        Ok(ctx
            .env
            .get("USER")
            .filter(|user| !user.is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string()))
    }
}

/// The history builtin.
///
/// Usage: history [-c] [-d LINE]
///
/// Without options the entries are listed numbered from 1.
pub struct HistoryCmd;

#[async_trait]
impl Builtin for HistoryCmd {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        if ctx.args.flag("c") {
            ctx.history.clear();
            return Ok("History cleared.".to_string());
        }

        if ctx.args.flag("d") {
            let line = ctx.args.value("d").and_then(|v| v.parse::<usize>().ok());
            return Ok(match line {
                Some(line) if ctx.history.remove(line) => String::new(),
                _ => "Invalid history line number.".to_string(),
            });
        }

        let lines: Vec<String> = ctx
            .history
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("{}\t{}", i + 1, entry))
            .collect();
        Ok(lines.join("\n"))
    }

    fn boolean_flags(&self) -> &'static [&'static str] {
        &["c"]
    }
}
