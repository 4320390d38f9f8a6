//! Navigation builtins (cd, pwd)

use async_trait::async_trait;
use std::sync::PoisonError;

use super::{Builtin, Context};
use crate::error::Result;

/// The cd builtin - change directory.
///
/// `~` goes to `HOME`, `-` to the directory before the last successful
/// `cd`. A missing directory is reported as output, never as a failure.
pub struct Cd;

#[async_trait]
impl Builtin for Cd {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let previous = ctx
            .previous_dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let target = match ctx.args.first() {
            None | Some("~") => ctx.env.home(),
            Some("-") => match previous {
                Some(dir) => dir.to_string_lossy().into_owned(),
                None => "-".to_string(),
            },
            Some(dir) => dir.to_string(),
        };

        let old = ctx.cwd();
        if ctx.backend.cd(&ctx.resolve(&target)).await.is_err() {
            return Ok(format!("{}: No such file or directory", target));
        }
        *ctx.previous_dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(old);
        Ok(String::new())
    }
}

/// The pwd builtin - print working directory.
pub struct Pwd;

#[async_trait]
impl Builtin for Pwd {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        Ok(ctx.cwd().to_string_lossy().into_owned())
    }
}
