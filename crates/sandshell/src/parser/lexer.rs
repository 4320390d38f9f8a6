//! Lexer for command lines
//!
//! Tokenizes input into operators and words. Words keep their quoting
//! structure as [`WordPart`]s so the parser can tell a quoted `*` from a
//! wildcard and find variable references.

use super::ast::ProcessDirection;
use super::tokens::{Token, WordPart};
use crate::error::{Error, Result};

/// Lexer for command lines.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Get the next token from the input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        let Some(ch) = self.peek_char() else {
            return Ok(None);
        };

        let token = match ch {
            '\n' => {
                self.advance();
                Token::Newline
            }
            ';' => {
                self.advance();
                Token::Semicolon
            }
            '|' => {
                self.advance();
                if self.eat('|') {
                    Token::Or
                } else {
                    Token::Pipe
                }
            }
            '&' => {
                self.advance();
                if self.eat('&') {
                    Token::And
                } else if self.peek_char() == Some('>') {
                    return Err(Error::Parse("&> redirection".to_string()));
                } else {
                    Token::Background
                }
            }
            '>' => {
                self.advance();
                if self.eat('>') {
                    Token::RedirectAppend
                } else if self.eat('(') {
                    let source = self.read_balanced_parens()?;
                    Token::Word(vec![WordPart::ProcessSubstitution(
                        ProcessDirection::Write,
                        source,
                    )])
                } else if self.eat('&') {
                    let dest = self.read_fd_number().unwrap_or(1);
                    Token::DupFd(1, dest)
                } else {
                    Token::RedirectOut
                }
            }
            '<' => {
                self.advance();
                if self.eat('(') {
                    let source = self.read_balanced_parens()?;
                    Token::Word(vec![WordPart::ProcessSubstitution(
                        ProcessDirection::Read,
                        source,
                    )])
                } else if self.peek_char() == Some('<') {
                    return Err(Error::Parse("here-documents".to_string()));
                } else {
                    Token::RedirectIn
                }
            }
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            '#' => {
                self.skip_comment();
                return self.next_token();
            }
            '0'..='9' => match self.read_fd_redirect() {
                Some(token) => token,
                None => self.read_word()?,
            },
            _ => self.read_word()?,
        };

        Ok(Some(token))
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '\\' {
                // \<newline> is line continuation
                let mut lookahead = self.chars.clone();
                lookahead.next();
                if lookahead.peek() == Some(&'\n') {
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Recognize `N>`, `N>>` and `N>&M` without consuming anything otherwise.
    fn read_fd_redirect(&mut self) -> Option<Token> {
        let mut lookahead = self.chars.clone();
        let fd = lookahead.next()?.to_digit(10)?;
        if lookahead.next()? != '>' {
            return None;
        }
        let token = match lookahead.peek() {
            Some('>') => {
                self.advance();
                self.advance();
                self.advance();
                Token::RedirectFdAppend(fd)
            }
            Some('&') => {
                self.advance();
                self.advance();
                self.advance();
                let dest = self.read_fd_number().unwrap_or(1);
                Token::DupFd(fd, dest)
            }
            _ => {
                self.advance();
                self.advance();
                Token::RedirectFd(fd)
            }
        };
        Some(token)
    }

    fn read_fd_number(&mut self) -> Option<u32> {
        let mut digits = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        digits.parse().ok()
    }

    fn read_word(&mut self) -> Result<Token> {
        let mut parts: Vec<WordPart> = Vec::new();
        let mut unquoted = String::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' | ';' | '|' | '&' | '<' | '>' | '(' | ')' => break,
                '\\' => {
                    self.advance();
                    match self.advance() {
                        Some('\n') => {}
                        Some(escaped) => {
                            flush(&mut parts, &mut unquoted);
                            push_quoted(&mut parts, escaped.to_string());
                        }
                        None => unquoted.push('\\'),
                    }
                }
                '\'' => {
                    self.advance();
                    flush(&mut parts, &mut unquoted);
                    let text = self.read_single_quoted()?;
                    push_quoted(&mut parts, text);
                }
                '"' => {
                    self.advance();
                    flush(&mut parts, &mut unquoted);
                    self.read_double_quoted(&mut parts)?;
                }
                '$' => {
                    self.advance();
                    match self.read_dollar()? {
                        Some(part) => {
                            flush(&mut parts, &mut unquoted);
                            parts.push(part);
                        }
                        None => unquoted.push('$'),
                    }
                }
                '`' => {
                    self.advance();
                    flush(&mut parts, &mut unquoted);
                    let source = self.read_backticks()?;
                    parts.push(WordPart::CommandSubstitution(source));
                }
                _ => {
                    unquoted.push(ch);
                    self.advance();
                }
            }
        }

        flush(&mut parts, &mut unquoted);
        Ok(Token::Word(parts))
    }

    fn read_single_quoted(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('\'') => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(Error::Parse("unterminated single quote".to_string())),
            }
        }
    }

    fn read_double_quoted(&mut self, parts: &mut Vec<WordPart>) -> Result<()> {
        let mut text = String::new();
        // An empty "" still produces a (quoted, empty) word piece
        push_quoted(parts, String::new());

        loop {
            match self.advance() {
                Some('"') => {
                    push_quoted(parts, text);
                    return Ok(());
                }
                Some('\\') => match self.advance() {
                    Some('\n') => {}
                    Some(c @ ('"' | '\\' | '$' | '`')) => text.push(c),
                    Some(c) => {
                        text.push('\\');
                        text.push(c);
                    }
                    None => break,
                },
                Some('$') => match self.read_dollar()? {
                    Some(part) => {
                        push_quoted(parts, std::mem::take(&mut text));
                        parts.push(part);
                    }
                    None => text.push('$'),
                },
                Some('`') => {
                    push_quoted(parts, std::mem::take(&mut text));
                    let source = self.read_backticks()?;
                    parts.push(WordPart::CommandSubstitution(source));
                }
                Some(c) => text.push(c),
                None => break,
            }
        }

        Err(Error::Parse("unterminated double quote".to_string()))
    }

    /// Read what follows a `$`. Returns `None` when the `$` is literal.
    fn read_dollar(&mut self) -> Result<Option<WordPart>> {
        match self.peek_char() {
            Some('{') => {
                self.advance();
                let mut name = String::new();
                loop {
                    match self.advance() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(Error::Parse("unterminated ${".to_string())),
                    }
                }
                if name.is_empty() {
                    return Err(Error::Parse("bad substitution".to_string()));
                }
                Ok(Some(WordPart::Variable(name)))
            }
            Some('(') => {
                self.advance();
                if self.peek_char() == Some('(') {
                    return Err(Error::Parse("arithmetic expansion".to_string()));
                }
                let source = self.read_balanced_parens()?;
                Ok(Some(WordPart::CommandSubstitution(source)))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Ok(Some(WordPart::Variable(name)))
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '?' | '#' | '@' | '*' | '$' | '!' | '-') => {
                self.advance();
                Ok(Some(WordPart::Variable(c.to_string())))
            }
            _ => Ok(None),
        }
    }

    /// Read up to the `)` matching an already consumed `(`.
    fn read_balanced_parens(&mut self) -> Result<String> {
        let mut source = String::new();
        let mut depth = 1;
        let mut quote: Option<char> = None;

        while let Some(c) = self.advance() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    } else if c == '\\' && q == '"' {
                        source.push(c);
                        if let Some(next) = self.advance() {
                            source.push(next);
                        }
                        continue;
                    }
                }
                None => match c {
                    '\'' | '"' => quote = Some(c),
                    '\\' => {
                        source.push(c);
                        if let Some(next) = self.advance() {
                            source.push(next);
                        }
                        continue;
                    }
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(source);
                        }
                    }
                    _ => {}
                },
            }
            source.push(c);
        }

        Err(Error::Parse("unterminated parenthesis".to_string()))
    }

    fn read_backticks(&mut self) -> Result<String> {
        let mut source = String::new();
        loop {
            match self.advance() {
                Some('`') => return Ok(source),
                Some('\\') => {
                    if let Some(next) = self.advance() {
                        if !matches!(next, '`' | '\\' | '$') {
                            source.push('\\');
                        }
                        source.push(next);
                    }
                }
                Some(c) => source.push(c),
                None => return Err(Error::Parse("unterminated backquote".to_string())),
            }
        }
    }
}

fn flush(parts: &mut Vec<WordPart>, unquoted: &mut String) {
    if unquoted.is_empty() {
        return;
    }
    let text = std::mem::take(unquoted);
    match parts.last_mut() {
        Some(WordPart::Unquoted(prev)) => prev.push_str(&text),
        _ => parts.push(WordPart::Unquoted(text)),
    }
}

fn push_quoted(parts: &mut Vec<WordPart>, text: String) {
    match parts.last_mut() {
        Some(WordPart::Quoted(prev)) => prev.push_str(&text),
        _ => parts.push(WordPart::Quoted(text)),
    }
}
