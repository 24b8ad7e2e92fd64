//! # Operand model
//!
//! The tagged value the code generator uses to talk to the assembly builder.
//! An operand pairs an addressing mode with a 1- or 2-byte width; the macro
//! expansions in `expand` pick instruction sequences off of both.

use crate::text;
use crate::DYNERR;

#[derive(Clone,Debug,PartialEq)]
pub enum Operand {
    /// literal value; `number` is set when the numeric value is known to the
    /// compiler (enabling the small-constant optimizations)
    Immediate { lo: String, hi: Option<String>, size: u8, number: Option<u16> },
    /// a label
    Absolute { base: String, size: u8 },
    /// `base+offset` with a constant offset rendered into `offset`
    Offset { base: String, offset: String, size: u8 },
    /// `base,idx` where `offset` names a byte variable holding the index
    VariableOffset { base: String, offset: String, size: u8 },
    /// `(ptr),idx` through a zero-page pointer; `offset` may be an immediate,
    /// a variable, or `@Y` for an index already held in Y
    IndirectOffset { base: String, offset: String, size: u8 },
    /// CPU register or register pair, by letter
    Register { lo: char, hi: Option<char> }
}

impl Operand {
    pub fn imm(value: String, size: u8) -> Self {
        Self::Immediate { lo: value, hi: None, size, number: None }
    }
    pub fn imm_word(lo: String, hi: String) -> Self {
        Self::Immediate { lo, hi: Some(hi), size: 2, number: None }
    }
    /// immediate from a known number; chooses byte or word by magnitude
    pub fn imm_number(number: u16) -> Self {
        match number > 0xFF {
            true => Self::Immediate {
                lo: text::hex_byte(number as u8),
                hi: Some(text::hex_byte((number >> 8) as u8)),
                size: 2,
                number: Some(number)
            },
            false => Self::Immediate {
                lo: text::hex_byte(number as u8),
                hi: None,
                size: 1,
                number: Some(number)
            }
        }
    }
    pub fn absolute(base: &str, size: u8) -> Self {
        Self::Absolute { base: base.to_string(), size }
    }
    pub fn offset(base: &str, offset: String, is_variable: bool, size: u8) -> Self {
        match is_variable {
            true => Self::VariableOffset { base: base.to_string(), offset, size },
            false => Self::Offset { base: base.to_string(), offset, size }
        }
    }
    pub fn indirect(pointer: &str, offset: String, size: u8) -> Self {
        Self::IndirectOffset { base: pointer.to_string(), offset, size }
    }
    pub fn register(lo: char) -> Self {
        Self::Register { lo, hi: None }
    }
    pub fn register_pair(hi: char, lo: char) -> Self {
        Self::Register { lo, hi: Some(hi) }
    }
    pub fn size(&self) -> u8 {
        match self {
            Self::Immediate { size, .. } => *size,
            Self::Absolute { size, .. } => *size,
            Self::Offset { size, .. } => *size,
            Self::VariableOffset { size, .. } => *size,
            Self::IndirectOffset { size, .. } => *size,
            Self::Register { hi, .. } => match hi {
                Some(_) => 2,
                None => 1
            }
        }
    }
    /// the numeric value, when this is an immediate the compiler can see
    pub fn number(&self) -> Option<u16> {
        match self {
            Self::Immediate { number, .. } => *number,
            _ => None
        }
    }
    /// The 8-bit accessor for the high byte of a word operand: the high
    /// immediate, or the same base displaced by one.  Registers have none.
    pub fn high_byte(&self) -> Result<Operand,DYNERR> {
        match self {
            Self::Immediate { hi, number, .. } => {
                let hi = hi.clone().ok_or_else(|| Box::new(super::Error::NoHighByte) as DYNERR)?;
                Ok(Self::Immediate { lo: hi, hi: None, size: 1, number: number.map(|n| n >> 8) })
            },
            Self::Absolute { base, .. } => {
                Ok(Self::Offset { base: base.clone(), offset: "1".to_string(), size: 1 })
            },
            Self::Offset { base, offset, .. } => {
                Ok(Self::Offset { base: base.clone(), offset: format!("{}+1",offset), size: 1 })
            },
            Self::VariableOffset { base, offset, .. } => {
                Ok(Self::VariableOffset { base: base.clone(), offset: format!("{}+1",offset), size: 1 })
            },
            Self::IndirectOffset { base, offset, .. } => {
                if offset.starts_with('@') {
                    return Err(Box::new(super::Error::RegisterIndexHighByte(offset.clone())));
                }
                Ok(Self::IndirectOffset { base: base.clone(), offset: format!("{}+1",offset), size: 1 })
            },
            Self::Register { .. } => Err(Box::new(super::Error::NoHighByte))
        }
    }
    /// render for trace comments, e.g. `#$05`, `buf+$03`, `(ptr),Y`, `@AX`
    pub fn text(&self) -> String {
        match self {
            Self::Immediate { lo, hi, .. } => match hi {
                Some(hi) => format!("#{},#{}",hi,lo),
                None => format!("#{}",lo)
            },
            Self::Absolute { base, .. } => base.clone(),
            Self::Offset { base, offset, .. } => format!("{}+{}",base,offset),
            Self::VariableOffset { base, offset, .. } => format!("{},{}",base,offset),
            Self::IndirectOffset { base, offset, .. } => format!("({}),{}",base,offset),
            Self::Register { lo, hi } => match hi {
                Some(hi) => format!("@{}{}",hi,lo),
                None => format!("@{}",lo)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_numbers_size_themselves() {
        let small = Operand::imm_number(5);
        assert_eq!(small.size(),1);
        assert_eq!(small.text(),"#$05");
        let big = Operand::imm_number(0x1234);
        assert_eq!(big.size(),2);
        assert_eq!(big.text(),"#$12,#$34");
        assert_eq!(big.number(),Some(0x1234));
    }

    #[test]
    fn high_bytes() {
        let word = Operand::imm_number(0x1234);
        assert_eq!(word.high_byte().expect("high").text(),"#$12");
        let abs = Operand::absolute("counter",2);
        assert_eq!(abs.high_byte().expect("high").text(),"counter+1");
        let off = Operand::offset("buf","$03".to_string(),false,2);
        assert_eq!(off.high_byte().expect("high").text(),"buf+$03+1");
        let ind = Operand::indirect("ptr","#$00".to_string(),2);
        assert_eq!(ind.high_byte().expect("high").text(),"(ptr),#$00+1");
        assert!(Operand::register('A').high_byte().is_err());
        assert!(Operand::indirect("ptr","@Y".to_string(),2).high_byte().is_err());
    }
}
