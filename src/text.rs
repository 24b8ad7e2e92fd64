//! # Text utilities
//!
//! Small formatters for operand and label text.  Everything here returns an
//! owned `String`; the assembly builder stores the strings it is handed.

use crate::lang::ast::{IdentPhrase,Numerical};

/// hex byte operand, e.g. `$0F`
pub fn hex_byte(x: u8) -> String {
    format!("${:02X}",x)
}

/// hex word operand, e.g. `$FDED`
pub fn hex_word(x: u16) -> String {
    format!("${:04X}",x)
}

/// shortest hex rendering: `$XX` up to $FF, `$XXXX` above
pub fn hex_num(x: u16) -> String {
    match x {
        x if x <= 0xFF => hex_byte(x as u8),
        x => hex_word(x)
    }
}

/// character operand in the Apple II high-ASCII convention (bit 7 set),
/// e.g. `A` becomes `$C1`
pub fn asciich(ch: u8) -> String {
    hex_byte(ch | 0x80)
}

pub fn quoted(text: &str) -> String {
    format!("\"{}\"",text)
}

/// low-byte prefix, `<label`
pub fn lo(value: &str) -> String {
    format!("<{}",value)
}

/// high-byte prefix, `>label`
pub fn hi(value: &str) -> String {
    format!(">{}",value)
}

pub fn immediate(value: String) -> String {
    format!("#{}",value)
}

pub fn indirect_y(value: &str) -> String {
    format!("({}),Y",value)
}

pub fn absolute_x(value: &str) -> String {
    format!("{},X",value)
}

pub fn absolute_y(value: &str) -> String {
    format!("{},Y",value)
}

/// `label+N`, or just `label` when the displacement is zero
pub fn offset(label: &str, off: i16) -> String {
    match off {
        0 => label.to_string(),
        off => format!("{}+{}",label,off)
    }
}

/// `Scope.Name` when a scope is given, otherwise `Name`
pub fn qualify(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) => format!("{}.{}",scope,name),
        None => name.to_string()
    }
}

/// operand text for a numerical AST node, `None` for a missing node
pub fn numerical(num: Option<&Numerical>) -> Option<String> {
    match num {
        Some(Numerical::Ident(name)) => Some(name.to_string()),
        Some(Numerical::Number(n)) => Some(hex_num(*n as u16)),
        None => None
    }
}

/// render an identifier phrase for diagnostics, e.g. `buf_i.len`
pub fn phrase(id: &IdentPhrase) -> String {
    let mut ans = id.identifier.to_string();
    if let Some(index) = numerical(id.subscript.as_ref()) {
        ans += "_";
        ans += &index;
    }
    if let Some(field) = id.field {
        ans += ".";
        ans += field;
    }
    ans
}
