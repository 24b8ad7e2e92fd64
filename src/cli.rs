//! # Command line definition
//!
//! One command, no subcommands.  The historical single-dash long flags
//! (`-asm`, `-ast`, `-sym`) are accepted by normalising the argument list
//! before clap sees it.

use clap::{arg, crate_version, Arg, ArgAction, Command, ValueHint};

pub fn build_cli() -> Command {
    let long_help = "compile translates A2 source into Merlin-dialect 6502 assembly.
The listing goes to stdout unless -o is given; diagnostics go to stderr.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
compile to stdout:     `compile prog.a2`
compile a pipeline:    `cat prog.a2 | compile - > prog.s`
inspect the symbols:   `compile -sym prog.a2 > prog.s`";
    Command::new("compile")
        .about("Compile an A2 file into 6502 assembly")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(
            Arg::new("asm")
                .long("asm")
                .action(ArgAction::SetTrue)
                .help("write assembly to stderr"),
        )
        .arg(
            Arg::new("ast")
                .long("ast")
                .action(ArgAction::SetTrue)
                .help("show the parsed, abstract syntax tree"),
        )
        .arg(
            Arg::new("sym")
                .long("sym")
                .action(ArgAction::SetTrue)
                .help("dump the symbol table"),
        )
        .arg(
            arg!(-o --output <PATH> "write assembly to the given path")
                .value_hint(ValueHint::FilePath)
                .required(false),
        )
        .arg(
            Arg::new("file")
                .help("A2 source file, or `-` for stdin")
                .value_hint(ValueHint::FilePath)
                .required(true),
        )
}

/// map the single-dash spellings onto clap's long flags
pub fn normalize_args(args: Vec<String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-asm" => "--asm".to_string(),
            "-ast" => "--ast".to_string(),
            "-sym" => "--sym".to_string(),
            _ => arg.clone(),
        })
        .collect()
}
