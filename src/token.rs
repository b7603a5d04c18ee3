use std::fmt;

use crate::lexer;

#[derive(Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Token {
    pub kind: TokenKind,
    /// The semantically relevant text: the identifier name, the digits of a
    /// number, the (unescaped) contents of a string or the operator spelling.
    pub text: Box<str>,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<Box<str>>, pos: Pos) -> Token {
        Token {
            kind,
            text: text.into(),
            pos,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {:?}, {})", self.kind, self.text, self.pos)
    }
}

/// A source position. Both fields are 1-based.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub const fn new(line: u32, column: u32) -> Pos {
        Pos { line, column }
    }

    pub fn wrap<T>(self, inner: T) -> Located<T> {
        Located { pos: self, inner }
    }
}

impl fmt::Debug for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({self})")
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Some value (usually an error) tagged with the source position it refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Located<T> {
    pub pos: Pos,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Located<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.inner)
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for Located<T> {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Declare,
    Integer,
    String,
    If,
    Else,
    While,
    End,
    Print,

    Identifier,
    IntLiteral,
    StrLiteral,

    /// `:=` or `=`
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    /// `==`
    Eq,
    /// `!=` or `<>`
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    /// `!`
    Bang,
    /// `||`
    Or,
    /// `&&`
    And,
    LParen,
    RParen,
    Semicolon,

    Whitespace,
    Comment,
    Eof,
    Error(lexer::Error),
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TokenKind::Error(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let s = match self {
            Declare => "`declare`",
            Integer => "`integer`",
            String => "`string`",
            If => "`if`",
            Else => "`else`",
            While => "`while`",
            End => "`end`",
            Print => "`print`",
            Identifier => "identifier",
            IntLiteral => "integer literal",
            StrLiteral => "string literal",
            Assign => "`:=`",
            Plus => "`+`",
            Minus => "`-`",
            Star => "`*`",
            Slash => "`/`",
            Eq => "`==`",
            NotEq => "`<>`",
            Less => "`<`",
            LessEq => "`<=`",
            Greater => "`>`",
            GreaterEq => "`>=`",
            Bang => "`!`",
            Or => "`||`",
            And => "`&&`",
            LParen => "`(`",
            RParen => "`)`",
            Semicolon => "`;`",
            Whitespace => "whitespace",
            Comment => "comment",
            Eof => "end of file",
            Error(_) => "invalid token",
        };
        f.write_str(s)
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "declare" => TokenKind::Declare,
    "integer" => TokenKind::Integer,
    "string" => TokenKind::String,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "end" => TokenKind::End,
    "print" => TokenKind::Print,
};
