use std::rc::Rc;

use crate::{
    code::{
        symbols::{SymbolTable, VarId},
        Error, Imbalance, Instr, InstrId, Kind, Op, Operator, Program, Value,
    },
    token::{Located, Pos, Token},
    util::idx::Arena,
};

type Result<T, E = Located<Error>> = std::result::Result<T, E>;

/// Translates construct-level emission calls into instructions.
///
/// Every call receives the token that names the construct being emitted, so
/// that instructions (and therefore diagnostics) carry its position.
///
/// Control constructs are resolved through a stack of instructions awaiting a
/// jump target:
///
/// - `if`: [`if_head`] after the condition, the then-branch, optionally
///   [`else_clause`] and the else-branch, then [`block_end`];
/// - `while`: [`while_head`] *before* the condition, the condition,
///   [`if_head`], the body, then [`block_end`], which notices the loop head
///   below the pending `IF` and emits the backward jump.
///
/// [`if_head`]: Builder::if_head
/// [`else_clause`]: Builder::else_clause
/// [`while_head`]: Builder::while_head
/// [`block_end`]: Builder::block_end
pub struct Builder {
    symbols: SymbolTable,
    instrs: Arena<Instr>,
    /// Instructions awaiting a jump target, innermost last.
    control: Vec<InstrId>,
}

impl Builder {
    pub fn with_capacity(capacity: usize) -> Builder {
        Builder {
            symbols: SymbolTable::with_capacity(capacity / 8),
            instrs: Arena::with_capacity(capacity),
            control: Vec::with_capacity(8),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn declare_integer(&mut self, token: &Token) -> Result<()> {
        self.declare(token, Kind::Integer)
    }

    pub fn declare_string(&mut self, token: &Token) -> Result<()> {
        self.declare(token, Kind::String)
    }

    /// Emits the destination of an assignment.
    pub fn assignment_target(&mut self, token: &Token) -> Result<()> {
        let var = self.lookup(token)?;
        self.add(token.pos, Kind::Void, Op::Variable(var));
        Ok(())
    }

    /// Emits a read of the variable's current value.
    pub fn expression_variable(&mut self, token: &Token) -> Result<()> {
        let var = self.lookup(token)?;
        let kind = self.symbols.get(var).kind;
        self.add(token.pos, kind, Op::Variable(var));
        Ok(())
    }

    pub fn integer_literal(&mut self, token: &Token) -> Result<()> {
        let Ok(value) = token.text.parse::<i64>() else {
            let error = Error::InvalidInteger {
                text: token.text.clone(),
            };
            return Err(token.pos.wrap(error));
        };
        self.add(token.pos, Kind::Integer, Op::Constant(Value::Integer(value)));
        Ok(())
    }

    pub fn string_literal(&mut self, token: &Token) {
        let value = Value::String(Rc::from(&*token.text));
        self.add(token.pos, Kind::String, Op::Constant(value));
    }

    /// Emits the operator with the given spelling (see [`Operator::symbol`]
    /// and [`super::OPERATORS`]).
    ///
    /// Panics on an unknown spelling: the caller must only pass spellings of
    /// the operators it recognized.
    pub fn operator(&mut self, token: &Token, symbol: &str) {
        let Some(op) = Operator::from_symbol(symbol) else {
            panic!("unknown operator spelling {symbol:?}");
        };
        self.add(token.pos, Kind::Void, Op::Operator(op));
    }

    pub fn assign(&mut self, token: &Token) {
        self.add(token.pos, Kind::Void, Op::Assign);
    }

    pub fn print(&mut self, token: &Token) {
        self.add(token.pos, Kind::Void, Op::Print);
    }

    pub fn if_head(&mut self, token: &Token) {
        let head = self.add(token.pos, Kind::Void, Op::If(None));
        self.control.push(head);
    }

    /// Closes the then-branch: emits the jump over the else-branch (resolved
    /// by the matching [`Builder::block_end`]) and the `ELSE` marker, which
    /// becomes the target of the pending `IF`.
    pub fn else_clause(&mut self, token: &Token) -> Result<()> {
        let head = match self.control.last() {
            Some(&head) if matches!(self.instrs.get(head).op, Op::If(_)) => head,
            _ => return Err(unbalanced(token.pos, Imbalance::ElseWithoutIf)),
        };
        self.control.pop();

        let skip_else = self.add(token.pos, Kind::Void, Op::Goto(None));
        let marker = self.add(token.pos, Kind::Void, Op::Else);
        self.patch(head, marker);
        self.control.push(skip_else);
        Ok(())
    }

    pub fn while_head(&mut self, token: &Token) {
        let head = self.add(token.pos, Kind::Void, Op::While(None));
        self.control.push(head);
    }

    /// Terminates the innermost open block, resolving its pending jump to the
    /// emitted `END`. If the block is a loop body, the backward jump to the
    /// loop head is emitted first.
    pub fn block_end(&mut self, token: &Token) -> Result<()> {
        let Some(pending) = self.control.pop() else {
            return Err(unbalanced(token.pos, Imbalance::EndWithoutBlock));
        };

        let loop_head = self
            .control
            .last()
            .copied()
            .filter(|&head| matches!(self.instrs.get(head).op, Op::While(_)));
        if let Some(head) = loop_head {
            self.control.pop();
            self.add(token.pos, Kind::Void, Op::Goto(Some(head)));
        }

        let end = self.add(token.pos, Kind::Void, Op::End);
        self.patch(pending, end);
        Ok(())
    }

    /// Finishes the construction, failing if any control construct is left
    /// open. The symbol table is handed back for the execution phase.
    pub fn finish(self) -> Result<(Program, SymbolTable)> {
        if let Some(error) = self.open_construct() {
            return Err(error);
        }
        log::debug!(
            "built program with {} instructions and {} variables",
            self.instrs.len(),
            self.symbols.len(),
        );
        let program = Program {
            instrs: self.instrs,
        };
        Ok((program, self.symbols))
    }
}

// Utility functions.
impl Builder {
    /// Appends an instruction to the program.
    fn add(&mut self, pos: Pos, kind: Kind, op: Op) -> InstrId {
        log::trace!("emit {:>5}: {} {op:?} at {pos}", self.instrs.len(), kind.tag());
        self.instrs.push(Instr { pos, kind, op })
    }

    /// Resolves the jump operand of `at` to `target`.
    fn patch(&mut self, at: InstrId, target: InstrId) {
        log::trace!("backpatch {at} -> {target}");
        match &mut self.instrs.get_mut(at).op {
            Op::If(slot) | Op::While(slot) | Op::Goto(slot) => {
                debug_assert!(slot.is_none(), "jump patched twice");
                *slot = Some(target);
            }
            other => unreachable!("only jumps await a target, got {other:?}"),
        }
    }

    fn declare(&mut self, token: &Token, kind: Kind) -> Result<()> {
        let Ok(var) = self.symbols.declare(&token.text, kind) else {
            let error = Error::DuplicateDeclaration {
                name: token.text.clone(),
            };
            return Err(token.pos.wrap(error));
        };
        self.add(token.pos, kind, Op::Declare(var));
        Ok(())
    }

    fn lookup(&self, token: &Token) -> Result<VarId> {
        self.symbols.lookup(&token.text).ok_or_else(|| {
            let error = Error::UndeclaredVariable {
                name: token.text.clone(),
            };
            token.pos.wrap(error)
        })
    }

    /// Reports the innermost construct that is still awaiting its `end`.
    fn open_construct(&self) -> Option<Located<Error>> {
        let (&top, rest) = self.control.split_last()?;
        let below = rest.last().map(|&id| self.instrs.get(id));
        let top = self.instrs.get(top);
        let (pos, imbalance) = match (&top.op, below) {
            (Op::If(_), Some(head @ Instr { op: Op::While(_), .. })) => {
                (head.pos, Imbalance::UnterminatedWhile)
            }
            (Op::If(_), _) => (top.pos, Imbalance::UnterminatedIf),
            (Op::Goto(_), _) => (top.pos, Imbalance::UnterminatedElse),
            (Op::While(_), _) => (top.pos, Imbalance::UnterminatedWhile),
            (other, _) => unreachable!("only jumps await a target, got {other:?}"),
        };
        Some(unbalanced(pos, imbalance))
    }
}

fn unbalanced(pos: Pos, imbalance: Imbalance) -> Located<Error> {
    pos.wrap(Error::UnbalancedControlConstruct(imbalance))
}
