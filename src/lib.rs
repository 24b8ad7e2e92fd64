//! # `a2c` main library
//!
//! This library compiles the A2 language into textual 6502 assembly in the
//! Merlin dialect, targeting the Apple II.  A2 is a small, statically typed,
//! imperative language: a program is a block of declarations (`use`),
//! variables (`var`), definitions (`let`), assignments, conditionals, loops,
//! calls and inline assembly.  Subroutines declare typed inputs and outputs
//! that may be bound to fixed addresses or to the 6502 registers.
//!
//! ## Architecture
//!
//! Compilation flows through four stages:
//! * `lang` parses source text into an AST (`lang::ast`); the parser is a
//!   backtracking recursive descent over the raw bytes, one method per
//!   grammar production.
//! * `symbols` is the typed, scope-aware symbol table: primitives, aliases,
//!   pointers, arrays, groups (records), subroutines with their input and
//!   output sub-groups, literals and the register pseudo-symbols.  It also
//!   owns layout (offsets and sizes) and label generation.
//! * `codegen` walks the AST with a stack of lexical scopes and lowers each
//!   statement to macro-level operations against the `asm::operand` model.
//! * `asm` accumulates the code and data instruction streams, expands the
//!   macro operations into 6502 sequences, runs a small peephole pass, and
//!   serializes Merlin-style text.
//!
//! The generated program carries no runtime; it relies on host ROM vectors
//! (`COUT`, `RDKEY`, and friends) declared by the source being compiled.
//!
//! All fatal conditions surface as boxed errors; the CLI front end decides
//! how to present them.  Warnings go through the `log` facade.

pub mod text;
pub mod symbols;
pub mod asm;
pub mod codegen;
pub mod lang;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;
