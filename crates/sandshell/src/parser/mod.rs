//! Parser module for Sandshell
//!
//! Implements a recursive descent parser over the token stream produced by
//! [`Lexer`]. The result is always a [`Node::Sequence`].

mod ast;
mod lexer;
mod tokens;

pub use ast::*;
pub use lexer::Lexer;
pub use tokens::{Token, WordPart};

use crate::error::{Error, Result};

/// Words that open a compound command.
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "for", "while", "until", "case", "function", "select", "{", "[[",
];

/// Parse a command line into a [`Node::Sequence`].
pub fn parse(input: &str) -> Result<Node> {
    Parser::new(input)?.parse()
}

/// Parser for command lines.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Tokenize the input and create a parser over it.
    pub fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
        })
    }

    /// Parse the whole input.
    pub fn parse(mut self) -> Result<Node> {
        let entries = self.parse_script(false)?;
        if let Some(token) = self.peek() {
            return Err(unexpected(token));
        }
        Ok(Node::Sequence(entries))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.pos += 1;
        }
    }

    fn parse_script(&mut self, nested: bool) -> Result<Vec<SequenceEntry>> {
        let mut entries = Vec::new();

        loop {
            self.skip_newlines();
            match self.peek() {
                None => break,
                Some(Token::RightParen) if nested => break,
                _ => {}
            }

            let node = self.parse_chain()?;
            let control = match self.peek() {
                Some(Token::Semicolon) | Some(Token::Newline) => {
                    self.advance();
                    ControlOp::Semicolon
                }
                Some(Token::Background) => {
                    self.advance();
                    ControlOp::Background
                }
                None => ControlOp::Semicolon,
                Some(Token::RightParen) if nested => ControlOp::Semicolon,
                Some(token) => return Err(unexpected(token)),
            };
            entries.push(SequenceEntry { node, control });
        }

        Ok(entries)
    }

    /// `pipeline (('&&' | '||') pipeline)*`
    fn parse_chain(&mut self) -> Result<Node> {
        let mut pipelines = vec![self.parse_pipeline()?];
        let mut ops = Vec::new();

        loop {
            let op = match self.peek() {
                Some(Token::And) => ControlOp::And,
                Some(Token::Or) => ControlOp::Or,
                _ => break,
            };
            self.advance();
            self.skip_newlines();
            ops.push(op);
            pipelines.push(self.parse_pipeline()?);
        }

        // Link right to left so each pipeline owns the rest of the chain
        let mut chain = pipelines.pop().ok_or_else(|| Error::Parse("empty chain".into()))?;
        while let (Some(prev), Some(op)) = (pipelines.pop(), ops.pop()) {
            chain = link(prev, op, chain)?;
        }
        Ok(chain)
    }

    /// `['time'] command ('|' command)*`
    fn parse_pipeline(&mut self) -> Result<Node> {
        if self.peek().and_then(Token::bare_word) == Some("time") {
            self.advance();
            let inner = self.parse_pipeline()?;
            return Ok(Node::Time(Box::new(inner)));
        }

        let mut stages = vec![self.parse_command()?];
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            self.skip_newlines();
            stages.push(self.parse_command()?);
        }

        let mut pipeline = stages.pop().ok_or_else(|| Error::Parse("empty pipeline".into()))?;
        while let Some(prev) = stages.pop() {
            pipeline = match prev {
                Node::Command(mut cmd) => {
                    cmd.redirects.push(Redirect::Pipe(Box::new(pipeline)));
                    Node::Command(cmd)
                }
                Node::Assignment(_) => {
                    return Err(Error::Parse("assignment in pipeline".into()));
                }
                // Rejected at execution time
                other => other,
            };
        }
        Ok(pipeline)
    }

    fn parse_command(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::LeftParen) => {
                self.advance();
                let entries = self.parse_script(true)?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(Node::Subshell(entries)),
                    Some(token) => Err(unexpected(&token)),
                    None => Err(Error::Parse("unterminated subshell".into())),
                }
            }
            Some(token @ Token::Word(parts)) => {
                if let Some(keyword) = token.bare_word().filter(|w| COMPOUND_KEYWORDS.contains(w)) {
                    let keyword = keyword.to_string();
                    // The body is never executed; consume the rest of the input
                    self.pos = self.tokens.len();
                    return Ok(Node::Compound { keyword });
                }
                if assignment_split(parts).is_some() {
                    return self.parse_assignments();
                }
                self.parse_simple_command()
            }
            Some(token) => Err(unexpected(token)),
            None => Err(Error::Parse("unexpected end of input".into())),
        }
    }

    fn parse_assignments(&mut self) -> Result<Node> {
        let mut assignments = Vec::new();

        while let Some(Token::Word(parts)) = self.peek() {
            let Some((name, value)) = assignment_split(parts) else {
                return Err(Error::Parse(
                    "environment prefix before a command".into(),
                ));
            };
            let value = if value.is_empty() {
                None
            } else {
                Some(Box::new(word_to_node(&value, false)?))
            };
            assignments.push(Node::Assignment(Assignment { name, value }));
            self.advance();
        }

        if assignments.len() == 1 {
            return assignments.pop().ok_or_else(|| Error::Parse("empty assignment".into()));
        }
        Ok(Node::Sequence(
            assignments
                .into_iter()
                .map(|node| SequenceEntry {
                    node,
                    control: ControlOp::Semicolon,
                })
                .collect(),
        ))
    }

    fn parse_simple_command(&mut self) -> Result<Node> {
        let mut words = Vec::new();
        let mut redirects = Vec::new();

        loop {
            let redirect = match self.peek() {
                Some(Token::Word(parts)) => {
                    let node = word_to_node(parts, true)?;
                    self.advance();
                    words.push(node);
                    continue;
                }
                Some(Token::RedirectOut) => (1, RedirectOp::Truncate),
                Some(Token::RedirectAppend) => (1, RedirectOp::Append),
                Some(Token::RedirectIn) => (0, RedirectOp::Input),
                Some(Token::RedirectFd(fd)) => (*fd, RedirectOp::Truncate),
                Some(Token::RedirectFdAppend(fd)) => (*fd, RedirectOp::Append),
                Some(Token::DupFd(src, dest)) => {
                    redirects.push(Redirect::DuplicateFd {
                        src: *src,
                        dest: *dest,
                    });
                    self.advance();
                    continue;
                }
                _ => break,
            };

            self.advance();
            let target = match self.advance() {
                Some(Token::Word(parts)) => word_to_node(&parts, false)?,
                _ => return Err(Error::Parse("missing redirect target".into())),
            };
            let (fd, op) = redirect;
            redirects.push(Redirect::File {
                fd,
                op,
                target: Box::new(target),
            });
        }

        if words.is_empty() {
            return Err(Error::Parse("missing command name".into()));
        }
        let name = words.remove(0);

        Ok(Node::Command(CommandNode {
            name: Box::new(name),
            args: words,
            redirects,
            control: None,
            next: None,
        }))
    }
}

fn unexpected(token: &Token) -> Error {
    Error::Parse(format!("unexpected token {:?}", token))
}

/// Attach `op next` to the last command of `prev`'s pipeline.
///
/// Assignments have no continuation slot, so `x=1 && cmd` is rejected;
/// `x=1; cmd` is the supported form.
fn link(prev: Node, op: ControlOp, next: Node) -> Result<Node> {
    match prev {
        Node::Command(mut cmd) => {
            attach_to_tail(&mut cmd, op, next);
            Ok(Node::Command(cmd))
        }
        Node::Time(inner) => Ok(Node::Time(Box::new(link(*inner, op, next)?))),
        Node::Assignment(_) | Node::Sequence(_) => {
            Err(Error::Parse(format!("assignment followed by {}", op)))
        }
        // Subshells and compound commands fail before the link matters
        other => Ok(other),
    }
}

fn attach_to_tail(cmd: &mut CommandNode, op: ControlOp, next: Node) {
    let pipe_target = cmd.redirects.iter_mut().find_map(|r| match r {
        Redirect::Pipe(target) => Some(target),
        _ => None,
    });
    match pipe_target.map(|target| target.as_mut()) {
        Some(Node::Command(target)) => attach_to_tail(target, op, next),
        _ => {
            cmd.control = Some(op);
            cmd.next = Some(Box::new(next));
        }
    }
}

/// Split `NAME=value` into the name and the value's word parts.
fn assignment_split(parts: &[WordPart]) -> Option<(String, Vec<WordPart>)> {
    let WordPart::Unquoted(first) = parts.first()? else {
        return None;
    };
    let (name, rest) = first.split_once('=')?;
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return None;
    }

    let mut value = Vec::with_capacity(parts.len());
    if !rest.is_empty() {
        value.push(WordPart::Unquoted(rest.to_string()));
    }
    value.extend_from_slice(&parts[1..]);
    Some((name.to_string(), value))
}

/// Convert a lexed word into an argument node.
fn word_to_node(parts: &[WordPart], allow_glob: bool) -> Result<Node> {
    let plain = parts
        .iter()
        .all(|p| matches!(p, WordPart::Unquoted(_) | WordPart::Quoted(_)));

    if plain {
        let mut text = String::new();
        let mut wildcard = false;
        for part in parts {
            match part {
                WordPart::Unquoted(s) => {
                    wildcard |= s.contains(['*', '?']);
                    text.push_str(s);
                }
                WordPart::Quoted(s) => text.push_str(s),
                _ => {}
            }
        }
        if wildcard && allow_glob {
            return Ok(Node::Glob(text));
        }
        return Ok(Node::Literal(text));
    }

    let mut pieces: Vec<Node> = Vec::new();
    for part in parts {
        let node = match part {
            WordPart::Unquoted(s) | WordPart::Quoted(s) => {
                if s.is_empty() {
                    continue;
                }
                if let Some(Node::Literal(prev)) = pieces.last_mut() {
                    prev.push_str(s);
                    continue;
                }
                Node::Literal(s.clone())
            }
            WordPart::Variable(name) => Node::Variable(name.clone()),
            WordPart::CommandSubstitution(source) => {
                Node::CommandSubstitution(Box::new(parse(source)?))
            }
            WordPart::ProcessSubstitution(direction, source) => Node::ProcessSubstitution {
                direction: *direction,
                inner: Box::new(parse(source)?),
            },
        };
        pieces.push(node);
    }

    match pieces.len() {
        0 => Ok(Node::Literal(String::new())),
        1 => Ok(pieces.remove(0)),
        _ => Ok(Node::Concatenation(pieces)),
    }
}
