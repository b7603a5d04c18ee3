use std::fmt::{self, Write};

use crate::code::{symbols::SymbolTable, Instr, InstrId, Op, Program, Value};

const MNEMONIC_WIDTH: usize = 6;

pub fn print_program_string(symbols: &SymbolTable, program: &Program) -> String {
    let mut buf = String::with_capacity(program.len() * 24);
    print_program(&mut buf, symbols, program).expect("writing to a string is infallible");
    buf
}

/// Writes one line per instruction:
///
/// ```text
/// index:  <kind tag><mnemonic><operand>
/// ```
///
/// The index is right-aligned in 5 columns, the kind tag takes 5 columns and
/// the mnemonic is padded to 6. Trailing blanks are trimmed.
pub fn print_program(w: &mut impl Write, symbols: &SymbolTable, program: &Program) -> fmt::Result {
    let mut line = String::with_capacity(64);
    for (id, instr) in program.iter() {
        line.clear();
        print_instr(&mut line, symbols, id, instr)?;
        writeln!(w, "{}", line.trim_end())?;
    }
    Ok(())
}

fn print_instr(w: &mut impl Write, symbols: &SymbolTable, id: InstrId, instr: &Instr) -> fmt::Result {
    write!(w, "{:>5}:  ", id.index())?;

    // Variables are tagged with their declared kind, even when used as an
    // assignment destination.
    let kind = match instr.op {
        Op::Declare(var) | Op::Variable(var) => symbols.get(var).kind,
        _ => instr.kind,
    };
    write!(w, "{}{:<width$}", kind.tag(), instr.op.mnemonic(), width = MNEMONIC_WIDTH)?;

    match &instr.op {
        Op::Declare(var) | Op::Variable(var) => w.write_str(&symbols.get(*var).name),
        Op::If(Some(target)) | Op::While(Some(target)) | Op::Goto(Some(target)) => {
            write!(w, "{}", target.index())
        }
        Op::Constant(Value::String(s)) => write!(w, "\"{s}\""),
        Op::Constant(value) => write!(w, "{value}"),
        _ => Ok(()),
    }
}
