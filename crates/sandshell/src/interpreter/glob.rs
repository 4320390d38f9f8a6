//! Single-segment wildcard expansion
//!
//! Only the last path segment of a pattern may contain wildcards. `*`
//! matches any run of characters, `?` exactly one; there are no bracket
//! classes. A pattern that matches nothing expands to itself.

use regex::Regex;
use std::path::Path;

use crate::fs::{FileSystem, resolve_path};

/// Translate a wildcard fragment into an anchored regex.
///
/// The regex also accepts the name followed by `/`, which is how directory
/// entries are listed.
pub fn translate(fragment: &str) -> Option<Regex> {
    let mut body = String::with_capacity(fragment.len() * 2);
    for c in fragment.chars() {
        match c {
            '*' => body.push_str(".*"),
            '?' => body.push('.'),
            other => body.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    Regex::new(&format!("^(?s:{})/?$", body)).ok()
}

/// Expand `pattern` against the filesystem.
///
/// Directory entries carry a trailing `/`. The result is never empty.
pub async fn expand(fs: &dyn FileSystem, cwd: &Path, pattern: &str) -> Vec<String> {
    let value = pattern.strip_suffix('/').unwrap_or(pattern);
    let base = match value.rfind('/') {
        Some(i) => &value[..=i],
        None => "",
    };
    let fragment = &value[base.len()..];
    let dir = resolve_path(cwd, if base.is_empty() { "." } else { base });

    let names: Vec<String> = match fs.read_dir(&dir).await {
        Ok(entries) => entries
            .into_iter()
            .map(|e| {
                if e.metadata.file_type.is_dir() {
                    format!("{}/", e.name)
                } else {
                    e.name
                }
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    let matches: Vec<String> = if fragment == "*" {
        names.iter().map(|name| format!("{}{}", base, name)).collect()
    } else {
        match translate(fragment) {
            Some(re) => names
                .iter()
                .filter(|name| re.is_match(name))
                .map(|name| format!("{}{}", base, name))
                .collect(),
            None => Vec::new(),
        }
    };
    tracing::trace!(pattern, matched = matches.len(), "glob expanded");

    if !matches.is_empty() {
        return matches;
    }
    if fragment.is_empty() {
        let base = if base.is_empty() { "." } else { base };
        return vec![base.to_string()];
    }
    vec![value.to_string()]
}
