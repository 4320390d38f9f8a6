//! Argument parsing for built-in commands
//!
//! Flags follow the minimist conventions: `-abc` sets three short flags,
//! `--name=value` and `--name value` set a long flag, and `--` ends flag
//! parsing. A flag that is not declared boolean takes the next operand as
//! its value.

use std::collections::HashMap;

/// Value of a parsed flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    /// Flag given without a value
    Set,
    /// Flag with a value (`-o out.txt`, `--name=x`)
    Value(String),
}

/// Parsed built-in arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    positional: Vec<String>,
    flags: HashMap<String, FlagValue>,
}

impl ParsedArgs {
    /// Parse `args`, treating the flags named in `booleans` as value-less.
    pub fn parse(args: &[String], booleans: &[&str]) -> Self {
        let mut parsed = Self::default();
        let mut iter = args.iter().peekable();

        while let Some(arg) = iter.next() {
            if arg == "--" {
                parsed.positional.extend(iter.by_ref().cloned());
                break;
            }

            if let Some(long) = arg.strip_prefix("--") {
                if let Some((name, value)) = long.split_once('=') {
                    parsed.set(name, FlagValue::Value(value.to_string()));
                } else if booleans.contains(&long) {
                    parsed.set(long, FlagValue::Set);
                } else {
                    let value = iter.next_if(|next| !next.starts_with('-')).cloned();
                    parsed.set(long, value.map_or(FlagValue::Set, FlagValue::Value));
                }
                continue;
            }

            let Some(short) = arg.strip_prefix('-').filter(|s| !s.is_empty()) else {
                parsed.positional.push(arg.clone());
                continue;
            };

            let chars: Vec<(usize, char)> = short.char_indices().collect();
            for (pos, &(offset, letter)) in chars.iter().enumerate() {
                let name = letter.to_string();
                let rest = &short[offset + letter.len_utf8()..];

                // `-d3`: the remainder after a letter is its value
                if !rest.is_empty() && !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    parsed.set(&name, FlagValue::Value(rest.to_string()));
                    break;
                }

                let last = pos + 1 == chars.len();
                if last && !booleans.contains(&name.as_str()) {
                    let value = iter.next_if(|next| !next.starts_with('-')).cloned();
                    parsed.set(&name, value.map_or(FlagValue::Set, FlagValue::Value));
                } else {
                    parsed.set(&name, FlagValue::Set);
                }
            }
        }

        parsed
    }

    fn set(&mut self, name: &str, value: FlagValue) {
        self.flags.insert(name.to_string(), value);
    }

    /// Operands that are not flags or flag values.
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// First operand.
    pub fn first(&self) -> Option<&str> {
        self.positional.first().map(String::as_str)
    }

    /// Whether the flag was given, with or without a value.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Value of the flag, if it was given one.
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.flags.get(name) {
            Some(FlagValue::Value(value)) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str], booleans: &[&str]) -> ParsedArgs {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ParsedArgs::parse(&args, booleans)
    }

    #[test]
    fn test_positionals() {
        let args = parse(&["a", "b"], &[]);
        assert_eq!(args.positional(), ["a", "b"]);
        assert_eq!(args.first(), Some("a"));
    }

    #[test]
    fn test_boolean_group_keeps_operands() {
        let args = parse(&["-rf", "dir", "file"], &["r", "f"]);
        assert!(args.flag("r"));
        assert!(args.flag("f"));
        assert_eq!(args.positional(), ["dir", "file"]);
    }

    #[test]
    fn test_non_boolean_takes_value() {
        let args = parse(&["http://x/a.txt", "-o", "out.txt"], &["O"]);
        assert_eq!(args.value("o"), Some("out.txt"));
        assert_eq!(args.positional(), ["http://x/a.txt"]);
    }

    #[test]
    fn test_attached_numeric_value() {
        let args = parse(&["-d3"], &["c"]);
        assert_eq!(args.value("d"), Some("3"));
        let args = parse(&["-d", "3"], &["c"]);
        assert_eq!(args.value("d"), Some("3"));
    }

    #[test]
    fn test_flag_without_value() {
        let args = parse(&["-c"], &[]);
        assert!(args.flag("c"));
        assert_eq!(args.value("c"), None);
    }

    #[test]
    fn test_long_flags() {
        let args = parse(&["--name=x", "--verbose", "--out", "f"], &["verbose"]);
        assert_eq!(args.value("name"), Some("x"));
        assert!(args.flag("verbose"));
        assert_eq!(args.value("out"), Some("f"));
        assert!(args.positional().is_empty());
    }

    #[test]
    fn test_double_dash_ends_flags() {
        let args = parse(&["-p", "--", "-x"], &["p"]);
        assert!(args.flag("p"));
        assert_eq!(args.positional(), ["-x"]);
    }

    #[test]
    fn test_lone_dash_is_operand() {
        let args = parse(&["-"], &[]);
        assert_eq!(args.positional(), ["-"]);
    }
}
