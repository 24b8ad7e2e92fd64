//! # A2 language front end
//!
//! The grammar is a PEG: each production either consumes input and returns a
//! node, or fails and the caller backtracks.  `parser` holds the productions,
//! `ast` the tree they build.  The AST and the assembly text format are the
//! compiler's two boundary contracts; everything in between is free to
//! change.

pub mod ast;
pub mod parser;

use thiserror::Error;

#[derive(Error,Debug)]
pub enum Error {
    #[error("syntax error around line {line}\n{snippet}")]
    Syntax { line: usize, snippet: String }
}

/// 1-based line number of a byte offset
pub fn line_of(src: &str, pos: usize) -> usize {
    1 + src.as_bytes()[..pos.min(src.len())].iter().filter(|b| **b==b'\n').count()
}

/// the source line containing `pos` and the one after it, for error context
pub fn lines_around(src: &str, pos: usize) -> String {
    let pos = pos.min(src.len());
    let start = match src[..pos].rfind('\n') {
        Some(i) => i+1,
        None => 0
    };
    let end = match src[pos..].find('\n') {
        Some(i) => pos+i,
        None => src.len()
    };
    let next_end = match src[(end+1).min(src.len())..].find('\n') {
        Some(i) => end+1+i,
        None => src.len()
    };
    src[start..next_end].to_string()
}
