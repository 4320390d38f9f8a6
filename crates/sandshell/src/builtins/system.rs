//! System information builtins (hostname, uname)
//!
//! These return fixed sandbox values; nothing about the host is exposed.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;

/// Hardcoded sandbox hostname.
pub const SANDBOX_HOSTNAME: &str = "sandbox";

/// Hardcoded system name.
pub const SANDBOX_SYSTEM: &str = "sandbox.bio";

/// The hostname builtin.
pub struct Hostname;

#[async_trait]
impl Builtin for Hostname {
    async fn execute(&self, _ctx: Context<'_>) -> Result<String> {
        Ok(SANDBOX_HOSTNAME.to_string())
    }
}

/// The uname builtin.
pub struct Uname;

#[async_trait]
impl Builtin for Uname {
    async fn execute(&self, _ctx: Context<'_>) -> Result<String> {
        Ok(SANDBOX_SYSTEM.to_string())
    }
}
