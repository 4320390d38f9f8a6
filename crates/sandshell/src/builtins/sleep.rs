//! Sleep builtin - pause execution for a number of seconds

use async_trait::async_trait;
use std::time::Duration;

use super::{Builtin, Context};
use crate::error::Result;

/// Used when the operand is missing, zero or not a number.
const DEFAULT_SECONDS: u64 = 1;

/// Whole seconds from the operand's leading digits (`2.5` sleeps 2).
fn parse_seconds(arg: Option<&str>) -> u64 {
    let digits: String = arg
        .unwrap_or_default()
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    match digits.parse::<u64>() {
        Ok(0) | Err(_) => DEFAULT_SECONDS,
        Ok(seconds) => seconds,
    }
}

/// The sleep builtin.
///
/// Usage: sleep [SECONDS]
pub struct Sleep;

#[async_trait]
impl Builtin for Sleep {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let seconds = parse_seconds(ctx.args.first());
        tracing::trace!(seconds, "sleeping");
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        Ok(String::new())
    }
}
