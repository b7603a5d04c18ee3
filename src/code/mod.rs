//! The intermediate representation (IR) and its builder.
//!
//! A [`Program`] is an append-only arena of [`Instr`]uctions. Execution starts
//! at the first instruction and, unless a jump says otherwise, continues with
//! the one appended right after it. Jump-carrying instructions refer to their
//! targets through [`InstrId`] handles, which are patched in place once the
//! target becomes known (see [`builder::Builder`]).

use std::{fmt, rc::Rc};

use crate::{
    token::Pos,
    util::idx::{Arena, Idx},
};

use self::symbols::{SymbolTable, VarId};

pub mod builder;
pub mod listing;
pub mod symbols;

pub type InstrId = Idx<Instr>;

/// The closed classification of values and instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No runtime value. Also marks an assignment destination.
    Void,
    Integer,
    String,
    Boolean,
}

impl Kind {
    /// Fixed-width (5 columns) tag used by the listing.
    pub const fn tag(self) -> &'static str {
        match self {
            Kind::Void => "     ",
            Kind::Integer => "int  ",
            Kind::String => "str  ",
            Kind::Boolean => "bool ",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kind::Void => "void",
            Kind::Integer => "integer",
            Kind::String => "string",
            Kind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    String(Rc<str>),
    Boolean(bool),
}

impl Value {
    /// The value a freshly declared variable of the given kind holds.
    pub fn default_of(kind: Kind) -> Value {
        match kind {
            Kind::String => Value::String(Rc::from("")),
            Kind::Boolean => Value::Boolean(false),
            Kind::Integer | Kind::Void => Value::Integer(0),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Integer(_) => Kind::Integer,
            Value::String(_) => Kind::String,
            Value::Boolean(_) => Kind::Boolean,
        }
    }
}

/// The textual form, as written by `print`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => fmt::Display::fmt(i, f),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => fmt::Display::fmt(b, f),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Integer addition or, if either operand is a string, concatenation.
    Add,
    Sub,
    Negate,
    Mul,
    Div,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Not,
    Or,
    And,
}

impl Operator {
    /// Looks up an operator by any of its accepted spellings.
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        OPERATORS.get(symbol).copied()
    }

    /// The canonical spelling, also used as the listing mnemonic.
    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Negate => "-1",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Eq => "==",
            Operator::NotEq => "<>",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
            Operator::Not => "!",
            Operator::Or => "||",
            Operator::And => "&&",
        }
    }
}

pub static OPERATORS: phf::Map<&'static str, Operator> = phf::phf_map! {
    "+" => Operator::Add,
    "-" => Operator::Sub,
    "-1" => Operator::Negate,
    "*" => Operator::Mul,
    "/" => Operator::Div,
    "==" => Operator::Eq,
    "!=" => Operator::NotEq,
    "<>" => Operator::NotEq,
    "<" => Operator::Less,
    "<=" => Operator::LessEq,
    ">" => Operator::Greater,
    ">=" => Operator::GreaterEq,
    "!" => Operator::Not,
    "||" => Operator::Or,
    "&&" => Operator::And,
};

/// An operation together with its operand, if any.
///
/// Jump operands are `None` until backpatched.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Declare(VarId),
    Assign,
    Print,
    /// Pops a boolean; jumps to the target if it is false.
    If(Option<InstrId>),
    Else,
    /// Loop head marker.
    While(Option<InstrId>),
    Goto(Option<InstrId>),
    End,
    /// Pushes the variable: its identity if the instruction is [`Kind::Void`]
    /// (assignment target), its current value otherwise.
    Variable(VarId),
    Constant(Value),
    Operator(Operator),
}

impl Op {
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Op::Declare(_) => "decl",
            Op::Assign => ":=",
            Op::Print => "print",
            Op::If(_) => "if",
            Op::Else => "else",
            Op::While(_) => "while",
            Op::Goto(_) => "goto",
            Op::End => "end",
            Op::Variable(_) => "var",
            Op::Constant(_) => "cte",
            Op::Operator(op) => op.symbol(),
        }
    }

    /// The jump operand of jump-carrying operations.
    pub fn jump_target(&self) -> Option<InstrId> {
        match *self {
            Op::If(target) | Op::While(target) | Op::Goto(target) => target,
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instr {
    /// Position of the construct that emitted this instruction.
    pub pos: Pos,
    pub kind: Kind,
    pub op: Op,
}

/// A finished program. Only [`builder::Builder`] creates programs, and only
/// once all jumps are resolved.
pub struct Program {
    instrs: Arena<Instr>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Where execution starts.
    pub fn first(&self) -> Option<InstrId> {
        self.instrs.first()
    }

    /// The instruction that follows `id` in the chain, if any.
    pub fn next(&self, id: InstrId) -> Option<InstrId> {
        self.instrs.next(id)
    }

    pub fn get(&self, id: InstrId) -> &Instr {
        self.instrs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instr)> {
        self.instrs.iter()
    }

    /// Renders the human-readable listing.
    pub fn render(&self, symbols: &SymbolTable) -> String {
        listing::print_program_string(symbols, self)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.instrs, f)
    }
}

/// Errors raised while building a program.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("variable {name} is already declared")]
    DuplicateDeclaration { name: Box<str> },
    #[error("variable {name} is not declared")]
    UndeclaredVariable { name: Box<str> },
    #[error("invalid integer literal {text}")]
    InvalidInteger { text: Box<str> },
    #[error("unbalanced control construct: {0}")]
    UnbalancedControlConstruct(Imbalance),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Imbalance {
    #[error("`if` without `end`")]
    UnterminatedIf,
    #[error("`else` without `end`")]
    UnterminatedElse,
    #[error("`while` without `end`")]
    UnterminatedWhile,
    #[error("`else` without `if`")]
    ElseWithoutIf,
    #[error("`end` without an open block")]
    EndWithoutBlock,
}
