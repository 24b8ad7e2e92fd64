//! # Command Line Interface
//!
//! Reads the source (file or stdin), parses, generates, and writes the
//! listing to stdout or the `-o` path.  The debug dumps behind `-ast`,
//! `-sym` and `-asm` go to stderr so they compose with pipelines.
//!
//! Exit codes: 0 on success, 1 on read failures, syntax errors or fatal
//! compile errors, 2 on command line usage errors.

use std::io::Read;
use env_logger;
use log::error;
use a2c::codegen::Generator;
use a2c::lang;
mod cli;

fn read_source(path: &str) -> Result<String,Box<dyn std::error::Error>> {
    if path == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    Ok(std::fs::read_to_string(path)?)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = cli::normalize_args(std::env::args().collect());
    let matches = cli::build_cli().get_matches_from(args);
    let path = matches.get_one::<String>("file").expect("clap requires the file argument");

    let source = match read_source(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("fatal: failed to read {}: {}",path,err);
            std::process::exit(1);
        }
    };

    let program = match lang::parser::parse(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}",err);
            std::process::exit(1);
        }
    };

    if matches.get_flag("ast") {
        if let Err(err) = lang::ast::write_ast(&mut std::io::stderr(),&source,&program) {
            error!("could not dump the syntax tree: {}",err);
        }
    }

    let mut gen = Generator::new();
    let result = gen.generate(&program);

    if matches.get_flag("sym") {
        if let Err(err) = gen.symbols().dump(&mut std::io::stderr()) {
            error!("could not dump the symbol table: {}",err);
        }
    }
    if matches.get_flag("asm") {
        eprint!("{}",gen.assembly().to_text());
    }

    if let Err(err) = result {
        eprintln!("fatal: {}",err);
        std::process::exit(1);
    }

    match matches.get_one::<String>("output") {
        Some(out) => {
            if let Err(err) = std::fs::write(out,gen.assembly().to_text()) {
                eprintln!("fatal: failed to write {}: {}",out,err);
                std::process::exit(1);
            }
        },
        None => print!("{}",gen.assembly().to_text())
    }
}
