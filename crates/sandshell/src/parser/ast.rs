//! AST types for parsed command lines
//!
//! One sum type covers statements, commands and argument nodes, so the
//! interpreter dispatches with an exhaustive `match` instead of comparing
//! type tags at runtime.

use std::fmt;

/// A parsed unit of the command language.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ordered statements, each tagged with the operator that terminated it.
    Sequence(Vec<SequenceEntry>),

    /// `NAME=value`
    Assignment(Assignment),

    /// `time <chain>`
    Time(Box<Node>),

    /// A simple command with its redirects and `&&`/`||` continuation.
    Command(CommandNode),

    /// Literal text (quotes already removed).
    Literal(String),

    /// `$NAME` or `${NAME}`
    Variable(String),

    /// Adjacent pieces forming one word, e.g. `"$dir/out.txt"`.
    Concatenation(Vec<Node>),

    /// `$(...)` or backticks.
    CommandSubstitution(Box<Node>),

    /// `<(...)` or `>(...)`
    ProcessSubstitution {
        direction: ProcessDirection,
        inner: Box<Node>,
    },

    /// Unquoted word containing `*` or `?`.
    Glob(String),

    /// `( ... )` - parsed so it can be rejected with a precise error.
    Subshell(Vec<SequenceEntry>),

    /// `if`, `for`, `while`, `[[`, ... - parsed so it can be rejected.
    Compound { keyword: String },
}

impl Node {
    /// Shorthand for a literal node.
    pub fn literal(value: impl Into<String>) -> Self {
        Node::Literal(value.into())
    }

    /// Literal value, if this node is a plain literal.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Node::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Sequence(_) => "sequence",
            Node::Assignment(_) => "variableAssignment",
            Node::Time(_) => "time",
            Node::Command(_) => "command",
            Node::Literal(_) => "literal",
            Node::Variable(_) => "variable",
            Node::Concatenation(_) => "concatenation",
            Node::CommandSubstitution(_) => "commandSubstitution",
            Node::ProcessSubstitution { .. } => "processSubstitution",
            Node::Glob(_) => "glob",
            Node::Subshell(_) => "subshell",
            Node::Compound { .. } => "compound",
        }
    }
}

/// One statement in a [`Node::Sequence`].
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    pub node: Node,
    pub control: ControlOp,
}

/// Control operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    /// `;` or newline - run the next entry after this one completes
    Semicolon,
    /// `&&` - continue only if this command did not fail
    And,
    /// `||` - continue only if this command failed
    Or,
    /// `&` - run detached, continue immediately
    Background,
}

impl fmt::Display for ControlOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ControlOp::Semicolon => ";",
            ControlOp::And => "&&",
            ControlOp::Or => "||",
            ControlOp::Background => "&",
        };
        f.write_str(op)
    }
}

/// `NAME=value`; a missing value assigns the empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Option<Box<Node>>,
}

/// A simple command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandNode {
    /// Command name (usually a literal, but may be any argument node)
    pub name: Box<Node>,
    /// Command arguments
    pub args: Vec<Node>,
    /// Redirections, in source order. Only the first one is honored.
    pub redirects: Vec<Redirect>,
    /// Operator linking this command to `next` (`&&` or `||`)
    pub control: Option<ControlOp>,
    /// The command after `&&`/`||`
    pub next: Option<Box<Node>>,
}

impl CommandNode {
    /// A command with a literal name and literal arguments.
    pub fn simple<I, S>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Box::new(Node::literal(name)),
            args: args.into_iter().map(|a| Node::Literal(a.into())).collect(),
            redirects: Vec::new(),
            control: None,
            next: None,
        }
    }

    /// Literal command name, if the name is not an expansion.
    pub fn literal_name(&self) -> Option<&str> {
        self.name.as_literal()
    }
}

/// Redirections attached to a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Redirect {
    /// `| target`
    Pipe(Box<Node>),
    /// `>`, `>>`, `<` with an optional explicit fd (`2>`).
    File {
        fd: u32,
        op: RedirectOp,
        target: Box<Node>,
    },
    /// `N>&M`
    DuplicateFd { src: u32, dest: u32 },
}

impl Redirect {
    /// Whether this is the `2>&1` redirect that merges stderr into the output.
    pub fn merges_stderr(&self) -> bool {
        matches!(self, Redirect::DuplicateFd { src: 2, dest: 1 })
    }

    /// Name of the redirect kind, used in error messages.
    pub fn kind(&self) -> String {
        match self {
            Redirect::Pipe(_) => "pipe".to_string(),
            Redirect::File { fd, op, .. } if *fd == 1 || *op == RedirectOp::Input => op.to_string(),
            Redirect::File { fd, op, .. } => format!("{}{}", fd, op),
            Redirect::DuplicateFd { src, dest } => format!("{}>&{}", src, dest),
        }
    }
}

/// File redirection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    /// `>`
    Truncate,
    /// `>>`
    Append,
    /// `<`
    Input,
}

impl fmt::Display for RedirectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            RedirectOp::Truncate => ">",
            RedirectOp::Append => ">>",
            RedirectOp::Input => "<",
        };
        f.write_str(op)
    }
}

/// Direction of a process substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDirection {
    /// `<(cmd)` - the command's output is readable as a file
    Read,
    /// `>(cmd)` - unsupported
    Write,
}
