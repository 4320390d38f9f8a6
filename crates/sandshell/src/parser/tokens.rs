//! Token types for the lexer

use super::ast::ProcessDirection;

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A word, split into the pieces that make it up
    Word(Vec<WordPart>),

    /// Newline character
    Newline,

    /// Semicolon (;)
    Semicolon,

    /// Pipe (|)
    Pipe,

    /// And (&&)
    And,

    /// Or (||)
    Or,

    /// Background (&)
    Background,

    /// Redirect output (>)
    RedirectOut,

    /// Redirect output append (>>)
    RedirectAppend,

    /// Redirect input (<)
    RedirectIn,

    /// Redirect with file descriptor (e.g., 2>)
    RedirectFd(u32),

    /// Redirect and append with file descriptor (e.g., 2>>)
    RedirectFdAppend(u32),

    /// Duplicate fd to another (e.g., 2>&1)
    DupFd(u32, u32),

    /// Left parenthesis (()
    LeftParen,

    /// Right parenthesis ())
    RightParen,
}

impl Token {
    /// Text of a word made of a single unquoted piece (keywords, `time`).
    pub fn bare_word(&self) -> Option<&str> {
        match self {
            Token::Word(parts) => match parts.as_slice() {
                [WordPart::Unquoted(text)] => Some(text),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A piece of a word.
#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    /// Unquoted text; `*` and `?` here are wildcards
    Unquoted(String),
    /// Quoted or escaped text; taken literally
    Quoted(String),
    /// `$NAME` / `${NAME}`
    Variable(String),
    /// Source text of `$(...)` or backticks
    CommandSubstitution(String),
    /// Source text of `<(...)` / `>(...)`
    ProcessSubstitution(ProcessDirection, String),
}
