//! The stack machine that executes a [`Program`].

use std::{io, rc::Rc};

use crate::{
    code::{
        symbols::{SymbolTable, VarId},
        Instr, InstrId, Kind, Op, Operator, Program, Value,
    },
    token::Located,
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// An operand stack entry.
#[derive(Clone, Debug, PartialEq)]
enum Operand {
    Value(Value),
    /// An assignment destination: the variable's identity, not its value.
    Target(VarId),
}

impl Operand {
    fn kind(&self) -> Kind {
        match self {
            Operand::Value(value) => value.kind(),
            Operand::Target(_) => Kind::Void,
        }
    }
}

/// Executes a program to completion, writing one line per `print` to `out`.
///
/// Variables are read from and written to the symbol table produced alongside
/// the program. Any fault aborts the run.
pub struct Vm<'p, W> {
    program: &'p Program,
    symbols: &'p mut SymbolTable,
    out: W,
    stack: Vec<Operand>,
}

impl<'p, W: io::Write> Vm<'p, W> {
    pub fn new(program: &'p Program, symbols: &'p mut SymbolTable, out: W) -> Vm<'p, W> {
        Vm {
            program,
            symbols,
            out,
            stack: Vec::with_capacity(16),
        }
    }

    pub fn run(&mut self) -> Result<(), Located<Error>> {
        let program = self.program;
        let mut current = program.first();
        let mut steps: u64 = 0;
        while let Some(id) = current {
            let instr = program.get(id);
            log::trace!("step {id:>5}: {:?} (stack depth {})", instr.op, self.stack.len());
            current = self.step(id, instr).map_err(|error| instr.pos.wrap(error))?;
            steps += 1;
        }
        log::debug!("run finished after {steps} steps");
        Ok(())
    }

    /// Executes a single instruction, returning the one to execute next.
    fn step(&mut self, id: InstrId, instr: &Instr) -> Result<Option<InstrId>> {
        match &instr.op {
            Op::Declare(_) | Op::Else | Op::While(_) | Op::End => {}
            Op::Assign => {
                let value = self.pop_value()?;
                let Operand::Target(var) = self.pop()? else {
                    return Err(Error::NotAnAssignmentTarget);
                };
                let variable = self.symbols.get_mut(var);
                if value.kind() != variable.kind {
                    return Err(mismatch(variable.kind.name(), value.kind()));
                }
                variable.value = value;
            }
            Op::Print => {
                let value = self.pop_value()?;
                writeln!(self.out, "{value}")?;
            }
            Op::If(target) => {
                if !self.pop_boolean()? {
                    return resolved(*target).map(Some);
                }
            }
            Op::Goto(target) => return resolved(*target).map(Some),
            Op::Variable(var) => {
                let operand = match instr.kind {
                    Kind::Void => Operand::Target(*var),
                    _ => Operand::Value(self.symbols.get(*var).value.clone()),
                };
                self.stack.push(operand);
            }
            Op::Constant(value) => self.stack.push(Operand::Value(value.clone())),
            Op::Operator(op) => {
                let value = self.operate(*op)?;
                self.stack.push(Operand::Value(value));
            }
        }
        Ok(self.program.next(id))
    }

    fn operate(&mut self, op: Operator) -> Result<Value> {
        let value = match op {
            Operator::Add => self.add()?,
            Operator::Sub => self.arithmetic(|lhs, rhs| Ok(lhs.wrapping_sub(rhs)))?,
            Operator::Mul => self.arithmetic(|lhs, rhs| Ok(lhs.wrapping_mul(rhs)))?,
            Operator::Div => self.arithmetic(|lhs, rhs| {
                if rhs == 0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(lhs.wrapping_div(rhs))
            })?,
            Operator::Negate => Value::Integer(self.pop_integer()?.wrapping_neg()),
            Operator::Eq => self.compare(i64::eq)?,
            Operator::NotEq => self.compare(i64::ne)?,
            Operator::Less => self.compare(i64::lt)?,
            Operator::LessEq => self.compare(i64::le)?,
            Operator::Greater => self.compare(i64::gt)?,
            Operator::GreaterEq => self.compare(i64::ge)?,
            Operator::Not => Value::Boolean(!self.pop_boolean()?),
            Operator::Or => {
                let rhs = self.pop_boolean()?;
                let lhs = self.pop_boolean()?;
                Value::Boolean(lhs || rhs)
            }
            Operator::And => {
                let rhs = self.pop_boolean()?;
                let lhs = self.pop_boolean()?;
                Value::Boolean(lhs && rhs)
            }
        };
        Ok(value)
    }

    /// Integer addition, or concatenation of the textual forms if either
    /// operand is a string.
    fn add(&mut self) -> Result<Value> {
        let rhs = self.pop_value()?;
        let lhs = self.pop_value()?;
        match (lhs, rhs) {
            (Value::Integer(lhs), Value::Integer(rhs)) => Ok(Value::Integer(lhs.wrapping_add(rhs))),
            (lhs @ Value::String(_), rhs) | (lhs, rhs @ Value::String(_)) => {
                Ok(Value::String(Rc::from(format!("{lhs}{rhs}"))))
            }
            (Value::Integer(_), other) | (other, _) => Err(mismatch("integer", other.kind())),
        }
    }

    fn arithmetic(&mut self, f: impl FnOnce(i64, i64) -> Result<i64>) -> Result<Value> {
        let rhs = self.pop_integer()?;
        let lhs = self.pop_integer()?;
        f(lhs, rhs).map(Value::Integer)
    }

    fn compare(&mut self, f: fn(&i64, &i64) -> bool) -> Result<Value> {
        let rhs = self.pop_integer()?;
        let lhs = self.pop_integer()?;
        Ok(Value::Boolean(f(&lhs, &rhs)))
    }
}

// Utility functions.
impl<W> Vm<'_, W> {
    fn pop(&mut self) -> Result<Operand> {
        self.stack.pop().ok_or(Error::StackUnderflow)
    }

    fn pop_value(&mut self) -> Result<Value> {
        match self.pop()? {
            Operand::Value(value) => Ok(value),
            target @ Operand::Target(_) => Err(mismatch("a value", target.kind())),
        }
    }

    fn pop_integer(&mut self) -> Result<i64> {
        match self.pop()? {
            Operand::Value(Value::Integer(i)) => Ok(i),
            other => Err(mismatch("integer", other.kind())),
        }
    }

    fn pop_boolean(&mut self) -> Result<bool> {
        match self.pop()? {
            Operand::Value(Value::Boolean(b)) => Ok(b),
            other => Err(mismatch("boolean", other.kind())),
        }
    }
}

fn mismatch(expected: &'static str, actual: Kind) -> Error {
    Error::TypeMismatch { expected, actual }
}

fn resolved(target: Option<InstrId>) -> Result<InstrId> {
    target.ok_or(Error::UnresolvedJump)
}

/// Errors raised while executing a program.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("assignment destination is not a variable")]
    NotAnAssignmentTarget,
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: Kind,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("jump to an unresolved target")]
    UnresolvedJump,
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
