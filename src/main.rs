use clap::{crate_version, App, Arg};
use poopy::{Diagnostic, ErrorClass, Interpreter};
use std::fs;
use std::io::{self, Write};
use std::process;
use thiserror::Error;

const PROMPT: &str = "\u{1F4A9}> ";
const INTRO: &str = "Welcome to poopy! Type a statement, or end input to leave.";
const OUTRO: &str = "Flushed. Bye!";

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{}", .0.render())]
    Script(#[from] Diagnostic),
    #[error(transparent)]
    Console(#[from] io::Error),
}

impl CliError {
    // sysexits.h
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Read { .. } => 66,
            CliError::Script(diagnostic) => match diagnostic.class() {
                ErrorClass::Lexical | ErrorClass::Syntax => 65,
                ErrorClass::Name | ErrorClass::Runtime | ErrorClass::Value => 70,
            },
            CliError::Console(_) => 74,
        }
    }
}

fn main() {
    env_logger::init();
    let matches = App::new("poopy")
        .version(crate_version!())
        .about("Runs poopy scripts, or an interactive prompt when no file is given")
        .arg(
            Arg::with_name("file")
                .short("f")
                .long("file")
                .value_name("FILE")
                .help("Script to run")
                .takes_value(true),
        )
        .get_matches();

    let result = match matches.value_of("file") {
        Some(path) => run_file(path),
        None => run_prompt(),
    };
    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(err.exit_code());
    }
}

fn run_file(path: &str) -> Result<(), CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_string(),
        source,
    })?;
    let mut interpreter = Interpreter::new();
    interpreter.run(path, &source)?;
    Ok(())
}

fn run_prompt() -> Result<(), CliError> {
    let mut interpreter = Interpreter::new();
    println!("{}", INTRO);
    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;
        let line = match interpreter.read_line()? {
            Some(line) => line,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        match interpreter.run("<stdin>", &line) {
            Ok(value) => {
                let shown: Vec<String> = value
                    .as_list()
                    .unwrap_or_default()
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
                    .collect();
                if !shown.is_empty() {
                    println!("{}", shown.join(", "));
                }
            }
            Err(diagnostic) => eprintln!("{}", diagnostic.render()),
        }
    }
    println!();
    println!("{}", OUTRO);
    Ok(())
}
