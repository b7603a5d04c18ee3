use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use tal::{error::Error, lexer::Lexer, parser, token::Token, util::UpToExt, vm::Vm};

#[derive(Parser)]
#[command(version, about = "Compiles and runs a tal program")]
struct Args {
    /// The source file.
    file: PathBuf,

    /// Prints an intermediate form. `tokens` stops right after scanning.
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Builds the program without running it.
    #[arg(long)]
    no_run: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
enum Emit {
    Tokens,
    Listing,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let src = match fs::read_to_string(&args.file) {
        Ok(src) => src,
        Err(error) => {
            eprintln!("error: failed to read {}: {error}", args.file.display());
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &src) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Flush whatever the program printed before failing.
            io::stdout().flush().ok();
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, src: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();

    if args.emit == Some(Emit::Tokens) {
        for token in Lexer::new(src).up_to(Token::is_eof) {
            if !token.kind.is_trivia() {
                writeln!(stdout, "{} {} {:?}", token.pos, token.kind, token.text)?;
            }
        }
        return Ok(());
    }

    let (program, mut symbols) = parser::parse_program(src)?;
    log::info!("{}: {} instructions", args.file.display(), program.len());

    if args.emit == Some(Emit::Listing) {
        writeln!(stdout, "Executable code:")?;
        stdout.write_all(program.render(&symbols).as_bytes())?;
        if !args.no_run {
            writeln!(stdout, "Execution:")?;
        }
    }
    if args.no_run {
        return Ok(());
    }

    Vm::new(&program, &mut symbols, &mut stdout)
        .run()
        .map_err(Error::from)?;
    stdout.flush()?;
    Ok(())
}
