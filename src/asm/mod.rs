//! # Assembly builder
//!
//! An append-only pair of instruction streams, one for code and one for
//! data, plus a pending-label slot.  Labels coalesce: a second label arriving
//! while one is pending becomes an `EQU` alias, so any number of labels can
//! anchor to a single instruction.  After generation a peephole pass rewrites
//! tail calls (`JSR x` directly before an unlabelled `RTS` becomes `JMP x`)
//! and anchors a leftover pending label to a `NOP`.
//!
//! Emission is Merlin style: label in column one, tab, opcode, space,
//! operand.  Comments are `* ` lines, inline assembly passes through
//! untouched, and the data stream is written after the code stream.

pub mod operand;
mod expand;

use std::fmt;
use std::io::Write;
use thiserror::Error;
use log::warn;
use crate::STDRESULT;

#[derive(Error,Debug)]
pub enum Error {
    #[error("variable {0} cannot have size 0")]
    ZeroSize(String),
    #[error("bad operand sizes: {0} and {1}")]
    OperandSize(u8,u8),
    #[error("operand does not have a high byte")]
    NoHighByte,
    #[error("register index {0} does not have a high byte")]
    RegisterIndexHighByte(String),
    #[error("only Y can be used as the offset register: got {0}")]
    OffsetRegister(String),
    #[error("unsupported register transfer: {0} <- {1}")]
    Transfer(char,char),
    #[error("register arithmetic is unsupported for {0}")]
    RegisterArithmetic(String),
    #[error("register comparisons are unsupported")]
    RegisterComparison,
    #[error("cannot load a word into the same register twice: {0}")]
    RegisterConflict(char),
    #[error("unsupported word load into registers {0}{1}")]
    WordLoad(char,char),
    #[error("register to register word transfers are unsupported")]
    WordTransfer,
    #[error("cannot store to a register operand")]
    RegisterStore,
    #[error("cannot take the address of {0}")]
    BadAddressSource(String)
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum Op {
    Adc, And, Asc, Asl, Bcc, Bcs, Beq, Bne, Clc, Cmp, Cpx, Cpy,
    Dec, Dex, Dey, Eor, Equ, Hex, Inc, Inx, Iny, Jmp, Jsr, Lda,
    Ldx, Ldy, Nop, Ora, Pha, Pla, Rts, Sbc, Sec, Sta, Stx, Sty,
    Tax, Tay, Txa, Tya
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = match self {
            Self::Adc => "ADC", Self::And => "AND", Self::Asc => "ASC", Self::Asl => "ASL",
            Self::Bcc => "BCC", Self::Bcs => "BCS", Self::Beq => "BEQ", Self::Bne => "BNE",
            Self::Clc => "CLC", Self::Cmp => "CMP", Self::Cpx => "CPX", Self::Cpy => "CPY",
            Self::Dec => "DEC", Self::Dex => "DEX", Self::Dey => "DEY", Self::Eor => "EOR",
            Self::Equ => "EQU", Self::Hex => "HEX", Self::Inc => "INC", Self::Inx => "INX",
            Self::Iny => "INY", Self::Jmp => "JMP", Self::Jsr => "JSR", Self::Lda => "LDA",
            Self::Ldx => "LDX", Self::Ldy => "LDY", Self::Nop => "NOP", Self::Ora => "ORA",
            Self::Pha => "PHA", Self::Pla => "PLA", Self::Rts => "RTS", Self::Sbc => "SBC",
            Self::Sec => "SEC", Self::Sta => "STA", Self::Stx => "STX", Self::Sty => "STY",
            Self::Tax => "TAX", Self::Tay => "TAY", Self::Txa => "TXA", Self::Tya => "TYA"
        };
        write!(f,"{}",mnemonic)
    }
}

#[derive(Clone,Debug)]
pub enum Instruction {
    Op { label: Option<String>, op: Op, operand: Option<String> },
    Asm(String),
    Comment(String)
}

pub struct Assembly {
    code: Vec<Instruction>,
    data: Vec<Instruction>,
    pending: Option<String>
}

impl Assembly {
    pub fn new() -> Self {
        Self { code: Vec::new(), data: Vec::new(), pending: None }
    }
    fn push(&mut self, op: Op, operand: Option<String>) {
        let label = self.pending.take();
        self.code.push(Instruction::Op { label, op, operand });
    }
    /// Add a label at the current position.  With a label already pending,
    /// the new one becomes an `EQU` alias of it and the pending one stays.
    pub fn label(&mut self, label: &str) {
        match self.pending.clone() {
            None => self.pending = Some(label.to_string()),
            Some(pending) => {
                self.code.push(Instruction::Op {
                    label: Some(label.to_string()),
                    op: Op::Equ,
                    operand: Some(pending)
                });
            }
        }
    }
    /// the label awaiting an instruction, if any
    pub fn pending_label(&self) -> Option<&str> {
        self.pending.as_deref()
    }
    /// An emission that carries its own label must first alias any pending
    /// label to it, so both end up at the same address.
    fn flush_pending_alias(&mut self, own_label: &str) {
        if let Some(pending) = self.pending.take() {
            self.code.push(Instruction::Op {
                label: Some(pending),
                op: Op::Equ,
                operand: Some(own_label.to_string())
            });
        }
    }

    pub fn adc(&mut self, operand: String) { self.push(Op::Adc,Some(operand)); }
    pub fn and(&mut self, operand: String) { self.push(Op::And,Some(operand)); }
    pub fn asl(&mut self) { self.push(Op::Asl,None); }
    pub fn bcc(&mut self, operand: String) { self.push(Op::Bcc,Some(operand)); }
    pub fn bcs(&mut self, operand: String) { self.push(Op::Bcs,Some(operand)); }
    pub fn beq(&mut self, operand: String) { self.push(Op::Beq,Some(operand)); }
    pub fn bne(&mut self, operand: String) { self.push(Op::Bne,Some(operand)); }
    pub fn clc(&mut self) { self.push(Op::Clc,None); }
    pub fn cmp(&mut self, operand: String) { self.push(Op::Cmp,Some(operand)); }
    pub fn cpx(&mut self, operand: String) { self.push(Op::Cpx,Some(operand)); }
    pub fn cpy(&mut self, operand: String) { self.push(Op::Cpy,Some(operand)); }
    pub fn dec(&mut self, operand: String) { self.push(Op::Dec,Some(operand)); }
    pub fn dex(&mut self) { self.push(Op::Dex,None); }
    pub fn dey(&mut self) { self.push(Op::Dey,None); }
    pub fn eor(&mut self, operand: String) { self.push(Op::Eor,Some(operand)); }
    pub fn inc(&mut self, operand: String) { self.push(Op::Inc,Some(operand)); }
    pub fn inx(&mut self) { self.push(Op::Inx,None); }
    pub fn iny(&mut self) { self.push(Op::Iny,None); }
    pub fn jmp(&mut self, location: String) { self.push(Op::Jmp,Some(location)); }
    pub fn jsr(&mut self, name: String) { self.push(Op::Jsr,Some(name)); }
    pub fn lda(&mut self, operand: String) { self.push(Op::Lda,Some(operand)); }
    pub fn ldx(&mut self, operand: String) { self.push(Op::Ldx,Some(operand)); }
    pub fn ldy(&mut self, operand: String) { self.push(Op::Ldy,Some(operand)); }
    pub fn ora(&mut self, operand: String) { self.push(Op::Ora,Some(operand)); }
    pub fn pha(&mut self) { self.push(Op::Pha,None); }
    pub fn pla(&mut self) { self.push(Op::Pla,None); }
    pub fn rts(&mut self) { self.push(Op::Rts,None); }
    pub fn sbc(&mut self, operand: String) { self.push(Op::Sbc,Some(operand)); }
    pub fn sec(&mut self) { self.push(Op::Sec,None); }
    pub fn sta(&mut self, operand: String) { self.push(Op::Sta,Some(operand)); }
    pub fn stx(&mut self, operand: String) { self.push(Op::Stx,Some(operand)); }
    pub fn sty(&mut self, operand: String) { self.push(Op::Sty,Some(operand)); }
    pub fn tax(&mut self) { self.push(Op::Tax,None); }
    pub fn tay(&mut self) { self.push(Op::Tay,None); }
    pub fn txa(&mut self) { self.push(Op::Txa,None); }
    pub fn tya(&mut self) { self.push(Op::Tya,None); }

    /// Inline assembly passes through verbatim.  A pending label is anchored
    /// to a `NOP` first so it still names the spot ahead of the block.
    pub fn asm_block(&mut self, assembly: &str) {
        if let Some(pending) = self.pending.take() {
            self.code.push(Instruction::Op { label: Some(pending), op: Op::Nop, operand: None });
        }
        self.code.push(Instruction::Asm(assembly.to_string()));
    }
    pub fn rem(&mut self, comment: String) {
        self.code.push(Instruction::Comment(comment));
    }
    /// constant binding, `NAME EQU operand`
    pub fn equ(&mut self, name: &str, operand: String) {
        self.flush_pending_alias(name);
        self.code.push(Instruction::Op {
            label: Some(name.to_string()),
            op: Op::Equ,
            operand: Some(operand)
        });
    }
    /// ASCII data with a zero terminator; escape sequences are unsupported
    /// and only warn
    pub fn txt(&mut self, name: &str, text: &str) {
        if let Some(col) = text.find('\\') {
            warn!("escape sequences are unsupported:");
            warn!("  {}",text);
            warn!("  {}^^"," ".repeat(col));
        }
        self.data.push(Instruction::Op {
            label: Some(name.to_string()),
            op: Op::Asc,
            operand: Some(crate::text::quoted(text))
        });
        self.data.push(Instruction::Op { label: None, op: Op::Hex, operand: Some("00".to_string()) });
    }
    /// zero-initialised storage, broken across `HEX` lines of at most 32
    /// digits
    pub fn var(&mut self, name: &str, size: u16) -> STDRESULT {
        const MAX_PER_LINE: usize = 32;
        if size == 0 {
            return Err(Box::new(Error::ZeroSize(name.to_string())));
        }
        let mut zeros = size as usize * 2;
        let mut label = Some(name.to_string());
        while zeros > 0 {
            let line = zeros.min(MAX_PER_LINE);
            self.data.push(Instruction::Op {
                label: label.take(),
                op: Op::Hex,
                operand: Some("0".repeat(line))
            });
            zeros -= line;
        }
        Ok(())
    }
    /// Single peephole pass: an unlabelled `RTS` right after a `JSR` turns
    /// the call into a `JMP` (the `JSR`'s own label survives).  A pending
    /// label left over at the end anchors to a `NOP`.
    pub fn optimize(&mut self) {
        let mut i = 0;
        while i+1 < self.code.len() {
            let jsr = matches!(&self.code[i], Instruction::Op { op: Op::Jsr, .. });
            let bare_rts = matches!(&self.code[i+1], Instruction::Op { op: Op::Rts, label: None, .. });
            if jsr && bare_rts {
                if let Instruction::Op { op, .. } = &mut self.code[i] {
                    *op = Op::Jmp;
                }
                self.code.remove(i+1);
            } else {
                i += 1;
            }
        }
        if let Some(pending) = self.pending.take() {
            self.code.push(Instruction::Op { label: Some(pending), op: Op::Nop, operand: None });
        }
    }
    pub fn write(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for ins in self.code.iter().chain(self.data.iter()) {
            match ins {
                Instruction::Asm(assembly) => write!(w,"{}",assembly)?,
                Instruction::Comment(comment) => writeln!(w,"* {}",comment)?,
                Instruction::Op { label, op, operand } => {
                    write!(w,"{}\t{}",label.as_deref().unwrap_or(""),op)?;
                    if let Some(operand) = operand {
                        write!(w," {}",operand)?;
                    }
                    writeln!(w)?;
                }
            }
        }
        Ok(())
    }
    pub fn to_text(&self) -> String {
        let mut buf: Vec<u8> = Vec::new();
        self.write(&mut buf).expect("write to memory failed");
        String::from_utf8(buf).expect("assembly text was not utf8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_coalesce_onto_one_anchor() {
        let mut asm = Assembly::new();
        asm.label("first");
        asm.label("second");
        asm.rts();
        asm.optimize();
        let listing = asm.to_text();
        assert!(listing.contains("second\tEQU first"),"got: {}",listing);
        assert!(listing.contains("first\tRTS"),"got: {}",listing);
    }

    #[test]
    fn peephole_rewrites_tail_calls() {
        let mut asm = Assembly::new();
        asm.jsr("target".to_string());
        asm.rts();
        asm.optimize();
        let listing = asm.to_text();
        assert!(listing.contains("\tJMP target"),"got: {}",listing);
        assert!(!listing.contains("RTS"),"got: {}",listing);
    }

    #[test]
    fn peephole_keeps_labelled_returns() {
        let mut asm = Assembly::new();
        asm.jsr("target".to_string());
        asm.label("back");
        asm.rts();
        asm.optimize();
        let listing = asm.to_text();
        assert!(listing.contains("\tJSR target"),"got: {}",listing);
        assert!(listing.contains("back\tRTS"),"got: {}",listing);
    }

    #[test]
    fn trailing_label_anchors_to_nop() {
        let mut asm = Assembly::new();
        asm.rts();
        asm.label("end");
        asm.optimize();
        assert!(asm.to_text().contains("end\tNOP"));
    }

    #[test]
    fn comments_do_not_take_labels() {
        let mut asm = Assembly::new();
        asm.label("spot");
        asm.rem("a note".to_string());
        asm.lda("#$00".to_string());
        asm.optimize();
        let listing = asm.to_text();
        assert!(listing.contains("* a note\nspot\tLDA #$00"),"got: {}",listing);
    }

    #[test]
    fn reserved_storage_chunks_at_32_digits() {
        let mut asm = Assembly::new();
        asm.var("big",20).expect("var failed");
        let listing = asm.to_text();
        assert!(listing.contains(&format!("big\tHEX {}","0".repeat(32))),"got: {}",listing);
        assert!(listing.contains(&format!("\tHEX {}","0".repeat(8))),"got: {}",listing);
        assert!(asm.var("empty",0).is_err());
    }

    #[test]
    fn text_data_is_zero_terminated() {
        let mut asm = Assembly::new();
        asm.txt("greet","Hi");
        let listing = asm.to_text();
        assert!(listing.contains("greet\tASC \"Hi\"\n\tHEX 00"),"got: {}",listing);
    }

    #[test]
    fn inline_assembly_anchors_pending_label() {
        let mut asm = Assembly::new();
        asm.label("entry");
        asm.asm_block(" BRK\n");
        asm.optimize();
        let listing = asm.to_text();
        assert!(listing.contains("entry\tNOP\n BRK\n"),"got: {}",listing);
    }

    #[test]
    fn code_is_written_before_data() {
        let mut asm = Assembly::new();
        asm.var("counter",1).expect("var failed");
        asm.lda("#$01".to_string());
        asm.optimize();
        let listing = asm.to_text();
        let code_at = listing.find("LDA").expect("no code");
        let data_at = listing.find("counter").expect("no data");
        assert!(code_at < data_at,"got: {}",listing);
    }
}
