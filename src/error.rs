use crate::{
    code, lexer, parser,
    token::{Located, Pos},
    vm,
};

/// Any error that aborts a compilation or a run. Every variant carries the
/// source position it refers to.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] Located<lexer::Error>),
    #[error(transparent)]
    Syntax(#[from] Located<parser::Error>),
    #[error(transparent)]
    Code(#[from] Located<code::Error>),
    #[error(transparent)]
    Runtime(#[from] Located<vm::Error>),
}

impl Error {
    pub fn pos(&self) -> Pos {
        match self {
            Error::Lexical(e) => e.pos,
            Error::Syntax(e) => e.pos,
            Error::Code(e) => e.pos,
            Error::Runtime(e) => e.pos,
        }
    }
}
