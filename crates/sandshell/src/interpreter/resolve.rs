//! Argument resolution

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::Interpreter;
use super::glob;
use super::sink::SharedSink;
use crate::error::{Error, Result};
use crate::fs::write_text;
use crate::parser::{Node, ProcessDirection};

/// A resolved argument: globs may produce several words.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Single(String),
    List(Vec<String>),
}

impl Value {
    /// Flatten into argument words.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Value::Single(s) => vec![s],
            Value::List(list) => list,
        }
    }

    /// Collapse into one string; list items are joined with spaces.
    pub fn into_string(self) -> String {
        match self {
            Value::Single(s) => s,
            Value::List(list) => list.join(" "),
        }
    }
}

/// Replace a leading `~` (alone or followed by `/`) with `home`.
pub fn expand_tilde(value: &str, home: &str) -> String {
    if value == "~" {
        return home.to_string();
    }
    match value.strip_prefix("~/") {
        Some(rest) => format!("{}/{}", home, rest),
        None => value.to_string(),
    }
}

impl Interpreter {
    /// Resolve an argument node.
    ///
    /// Substitutions execute their inner command with the same sink, so their
    /// side-channel output appears before the enclosing command's.
    pub fn resolve<'a>(&'a self, node: &'a Node, sink: &'a SharedSink) -> BoxFuture<'a, Result<Value>> {
        async move {
            let value = match node {
                Node::Literal(value) => Value::Single(expand_tilde(value, &self.env().home())),
                Node::Variable(name) => Value::Single(self.env().get(name).unwrap_or_default()),
                Node::Concatenation(pieces) => {
                    let mut joined = String::new();
                    for piece in pieces {
                        joined.push_str(&self.resolve(piece, sink).await?.into_string());
                    }
                    Value::Single(joined)
                }
                Node::CommandSubstitution(inner) => Value::Single(self.execute(inner, sink).await?),
                Node::ProcessSubstitution {
                    direction: ProcessDirection::Read,
                    inner,
                } => {
                    let output = self.execute(inner, sink).await?;
                    let fs = self.backend().fs();
                    let path = self.shared.scratch.allocate(fs.as_ref()).await?;
                    write_text(fs.as_ref(), &path, &output).await?;
                    Value::Single(path.to_string_lossy().into_owned())
                }
                Node::ProcessSubstitution {
                    direction: ProcessDirection::Write,
                    ..
                } => return Err(Error::unsupported("output process substitution")),
                Node::Glob(pattern) => {
                    let fs = self.backend().fs();
                    let cwd = self.backend().cwd();
                    Value::List(glob::expand(fs.as_ref(), &cwd, pattern).await)
                }
                other => return Err(Error::unsupported(format!("{} argument", other.kind()))),
            };
            tracing::trace!(kind = node.kind(), "resolved argument");
            Ok(value)
        }
        .boxed()
    }

    /// Resolve an argument node to a single string.
    pub async fn resolve_string(&self, node: &Node, sink: &SharedSink) -> Result<String> {
        Ok(self.resolve(node, sink).await?.into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("~", "/shared/data"), "/shared/data");
        assert_eq!(expand_tilde("~/x/y", "/shared/data"), "/shared/data/x/y");
        assert_eq!(expand_tilde("a~b", "/h"), "a~b");
        assert_eq!(expand_tilde("~user", "/h"), "~user");
    }

    #[test]
    fn test_value_flattening() {
        let list = Value::List(vec!["a".into(), "b".into()]);
        assert_eq!(list.clone().into_string(), "a b");
        assert_eq!(list.into_vec(), vec!["a", "b"]);
        assert_eq!(Value::Single("x".into()).into_vec(), vec!["x"]);
    }
}
