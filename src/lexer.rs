use std::{iter::Peekable, str::Chars};

use crate::{
    token::{Pos, Token, TokenKind, KEYWORDS},
    util::UpToExt,
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// A convenience function that lexes the whole input (up to and including the
/// [`TokenKind::Eof`] token) into a new buffer.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    tokens.extend(Lexer::new(src).up_to(Token::is_eof));
    tokens
}

/// Pull-style scanner. Each call to [`Lexer::next_token`] produces exactly one
/// token; once the input is exhausted, it keeps producing [`TokenKind::Eof`].
///
/// Trivia (whitespace and comments) is produced as well, so that callers can
/// decide whether to skip it.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    /// Position of the next character to be read.
    pos: Pos,
    /// Position of the first character of the current token.
    current_pos: Pos,
}

impl<'src> Lexer<'src> {
    /// Constructs a new lexer with the default state.
    pub fn new(src: &'src str) -> Lexer<'src> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            pos: Pos::new(1, 1),
            current_pos: Pos::new(1, 1),
        }
    }

    /// Scans and returns the next token.
    pub fn next_token(&mut self) -> Token {
        let kind = self.scan_token_kind();
        self.produce(kind)
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        self.mark();
        if self.is_exhausted() {
            return Eof;
        }
        match self.advance() {
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => match self.peek() {
                '/' => self.line_comment(),
                _ => Slash,
            },
            ':' => match self.peek() {
                '=' => self.advance_with(Assign),
                _ => Error(self::Error::UnexpectedChar),
            },
            '=' => match self.peek() {
                '=' => self.advance_with(Eq),
                _ => Assign,
            },
            '!' => match self.peek() {
                '=' => self.advance_with(NotEq),
                _ => Bang,
            },
            '<' => match self.peek() {
                '=' => self.advance_with(LessEq),
                '>' => self.advance_with(NotEq),
                _ => Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(GreaterEq),
                _ => Greater,
            },
            '|' => match self.peek() {
                '|' => self.advance_with(Or),
                _ => Error(self::Error::UnexpectedChar),
            },
            '&' => match self.peek() {
                '&' => self.advance_with(And),
                _ => Error(self::Error::UnexpectedChar),
            },
            '(' => LParen,
            ')' => RParen,
            ';' => Semicolon,
            '"' => self.string(),
            c if is_identifier_start(c) => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_whitespace() => self.whitespace(),
            _ => Error(self::Error::UnexpectedChar),
        }
    }

    /// Scans a string literal. Escapes are only validated here; they're
    /// resolved when the token text is produced (see [`extract::string`]).
    fn string(&mut self) -> TokenKind {
        // Whether the current character is being escaped
        let mut is_escaping = false;
        loop {
            if self.is_exhausted() {
                return TokenKind::Error(Error::UnclosedString);
            }
            match (is_escaping, self.advance()) {
                // An unescaped quotation mark marks the end of the string.
                (false, '"') => return TokenKind::StrLiteral,
                // A string can only contain a line break if it is escaped.
                (false, '\n') => return TokenKind::Error(Error::UnescapedLineBreak),
                (false, '\\') => is_escaping = true,
                (_, _) => is_escaping = false,
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        while is_identifier_suffix(self.peek()) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        // Something like `12ab` is neither a number nor an identifier.
        if is_identifier_suffix(self.peek()) {
            while is_identifier_suffix(self.peek()) {
                self.advance();
            }
            return TokenKind::Error(Error::MalformedNumber);
        }
        TokenKind::IntLiteral
    }

    fn whitespace(&mut self) -> TokenKind {
        while !self.is_exhausted() && self.peek().is_whitespace() {
            self.advance();
        }
        TokenKind::Whitespace
    }

    fn line_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '/');
        while !self.is_exhausted() && self.peek() != '\n' {
            self.advance();
        }
        TokenKind::Comment
    }
}

impl Lexer<'_> {
    /// Starts a new token "mark".
    fn mark(&mut self) {
        self.current_lo = self.cursor;
        self.current_pos = self.pos;
    }

    /// Returns the next character and advances the iterator.
    fn advance(&mut self) -> char {
        let Some(c) = self.iter.next() else {
            return '\0';
        };
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        c
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    fn is_exhausted(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        &self.src[self.current_lo..self.cursor]
    }

    /// Produces a token using the marked bounds.
    fn produce(&self, kind: TokenKind) -> Token {
        let text = match kind {
            TokenKind::StrLiteral => extract::string(self.substr()),
            _ => self.substr().into(),
        };
        Token::new(kind, text, self.current_pos)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        Some(self.next_token())
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_suffix(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected character")]
    UnexpectedChar,
    #[error("unclosed string")]
    UnclosedString,
    #[error("unescaped line break in string")]
    UnescapedLineBreak,
    #[error("malformed number")]
    MalformedNumber,
}

pub mod extract {
    /// Strips the surrounding quotes of a string literal and resolves its
    /// escape sequences, if any.
    pub fn string(raw: &str) -> Box<str> {
        debug_assert!(raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"'));
        let inner = &raw[1..raw.len() - 1];
        if inner.contains('\\') {
            perform_escape(inner).into_boxed_str()
        } else {
            inner.into()
        }
    }

    fn perform_escape(raw: &str) -> String {
        let mut buf = String::with_capacity(raw.len());
        let mut escaped = false;
        for char in raw.chars() {
            let char = match (escaped, char) {
                (true, 't') => '\t',
                (true, 'n') => '\n',
                (false, '\\') => {
                    escaped = true;
                    continue;
                }
                (_, char) => char,
            };
            escaped = false;
            buf.push(char);
        }
        buf
    }
}
