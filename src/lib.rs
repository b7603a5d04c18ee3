use std::io;

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser drives the code builder, one call per recognized construct.
pub mod parser;

/// The intermediate representation, its builder and its listing.
pub mod code;

/// The virtual machine executes a built program.
pub mod vm;

pub mod error;
pub mod token;
pub mod util;

/// Builds and runs the program, writing its output to `out`.
pub fn run(src: &str, out: impl io::Write) -> Result<(), error::Error> {
    let (program, mut symbols) = parser::parse_program(src)?;
    vm::Vm::new(&program, &mut symbols, out).run()?;
    Ok(())
}
