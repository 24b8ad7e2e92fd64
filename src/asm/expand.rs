//! # Macro expansions
//!
//! Each macro consumes a destination and a source operand (or a comparison
//! pair plus two branch targets) and emits a minimal 6502 sequence sized by
//! the operands' byte widths.  Every expansion leaves a trace comment naming
//! the macro and its operands, which makes generated listings self-reading.
//!
//! Conventions shared by the expansions:
//! * byte loads into X or Y from indirect sources route through A;
//! * word values travel in the (X,A) pair unless a register pair destination
//!   says otherwise;
//! * a `@Y` index means the subscript already sits in Y, so the `LDY` is
//!   skipped; Y is the only register usable that way;
//! * comparisons against a known immediate zero skip the `CMP #$00` when a
//!   preceding load already set the Z flag.

use log::warn;
use super::{Assembly,Op,Error};
use super::operand::Operand;
use crate::text;
use crate::STDRESULT;

const TRUNCATED: &str = "WARNING: VALUE TRUNCATED";

/// known-zero byte immediate for zero extension
fn zerob() -> Operand {
    Operand::Immediate { lo: "$00".to_string(), hi: None, size: 1, number: Some(0) }
}

impl Assembly {
    fn macro_rem(&mut self, name: &str, a: &Operand, b: Option<&Operand>) {
        let mut line = format!("{} {}",name,a.text());
        if let Some(b) = b {
            line += " ";
            line += &b.text();
        }
        self.rem(line);
    }
    fn emit_ld(&mut self, reg: char, operand: String) {
        match reg {
            'X' => self.ldx(operand),
            'Y' => self.ldy(operand),
            _ => self.lda(operand)
        }
    }
    fn emit_cp(&mut self, reg: char, operand: String) {
        match reg {
            'X' => self.cpx(operand),
            'Y' => self.cpy(operand),
            _ => self.cmp(operand)
        }
    }
    fn emit_math(&mut self, op: Op, operand: String) {
        self.push(op,Some(operand));
    }
    fn flag(&mut self, sub: bool) {
        match sub {
            true => self.sec(),
            false => self.clc()
        }
    }
    fn transfer(&mut self, dst: char, src: char) -> STDRESULT {
        match (dst,src) {
            ('A','X') => self.txa(),
            ('A','Y') => self.tya(),
            ('X','A') => self.tax(),
            ('Y','A') => self.tay(),
            ('X','Y') => { self.tya(); self.tax(); },
            ('Y','X') => { self.txa(); self.tay(); },
            (d,s) if d == s => {},
            (d,s) => return Err(Box::new(Error::Transfer(d,s)))
        }
        Ok(())
    }
    fn load_byte(&mut self, dst: char, src: &Operand) -> STDRESULT {
        match src {
            Operand::Immediate { lo, .. } => self.emit_ld(dst,format!("#{}",lo)),
            Operand::Absolute { base, .. } => self.emit_ld(dst,base.clone()),
            Operand::Offset { base, offset, .. } => self.emit_ld(dst,format!("{}+{}",base,offset)),
            Operand::VariableOffset { base, offset, .. } => {
                if dst == 'A' || dst == 'X' {
                    self.ldy(offset.clone());
                    self.emit_ld(dst,text::absolute_y(base));
                } else {
                    self.ldx(offset.clone());
                    self.emit_ld(dst,text::absolute_x(base));
                }
            },
            Operand::IndirectOffset { base, offset, .. } => {
                if offset.starts_with('@') {
                    if offset != "@Y" {
                        return Err(Box::new(Error::OffsetRegister(offset.clone())));
                    }
                } else {
                    self.ldy(offset.clone());
                }
                self.lda(text::indirect_y(base));
                match dst {
                    'Y' => self.tay(),
                    'X' => self.tax(),
                    _ => {}
                }
            },
            Operand::Register { lo, .. } => self.transfer(dst,*lo)?
        }
        Ok(())
    }
    fn load_word(&mut self, dst_hi: char, dst_lo: char, src: &Operand) -> STDRESULT {
        if dst_hi == dst_lo {
            return Err(Box::new(Error::RegisterConflict(dst_hi)));
        }
        match src {
            Operand::Immediate { lo, hi, .. } => {
                let hi = match hi {
                    Some(hi) => hi.clone(),
                    None => return Err(Box::new(Error::NoHighByte))
                };
                self.emit_ld(dst_lo,format!("#{}",lo));
                self.emit_ld(dst_hi,format!("#{}",hi));
            },
            Operand::Absolute { base, .. } => {
                self.emit_ld(dst_lo,base.clone());
                self.emit_ld(dst_hi,text::offset(base,1));
            },
            Operand::Offset { base, offset, .. } => {
                self.emit_ld(dst_lo,format!("{}+{}",base,offset));
                self.emit_ld(dst_hi,format!("{}+{}+1",base,offset));
            },
            Operand::VariableOffset { base, offset, .. } => {
                if dst_hi != 'X' || dst_lo != 'A' {
                    return Err(Box::new(Error::WordLoad(dst_hi,dst_lo)));
                }
                self.ldy(offset.clone());
                self.lda(text::absolute_y(base));
                self.ldx(format!("{}+1,Y",base));
            },
            Operand::IndirectOffset { base, offset, .. } => {
                self.ldy(offset.clone());
                let deref = text::indirect_y(base);
                match (dst_hi,dst_lo) {
                    ('X','A') => {
                        self.iny();
                        self.lda(deref.clone());
                        self.tax();
                        self.dey();
                        self.lda(deref);
                    },
                    ('Y','A') => {
                        self.lda(deref.clone());
                        self.pha();
                        self.iny();
                        self.lda(deref);
                        self.tay();
                        self.pla();
                    },
                    ('A','X') => {
                        self.lda(deref.clone());
                        self.tax();
                        self.iny();
                        self.lda(deref);
                    },
                    ('Y','X') => {
                        self.lda(deref.clone());
                        self.tax();
                        self.iny();
                        self.lda(deref);
                        self.tay();
                    },
                    ('A','Y') => {
                        self.iny();
                        self.lda(deref.clone());
                        self.pha();
                        self.dey();
                        self.lda(deref);
                        self.tay();
                        self.pla();
                    },
                    ('X','Y') => {
                        self.iny();
                        self.lda(deref.clone());
                        self.tax();
                        self.dey();
                        self.lda(deref);
                        self.tay();
                    },
                    (hi,lo) => return Err(Box::new(Error::WordLoad(hi,lo)))
                }
            },
            Operand::Register { .. } => return Err(Box::new(Error::WordTransfer))
        }
        Ok(())
    }
    fn store_byte(&mut self, dst: &Operand) -> STDRESULT {
        match dst {
            Operand::Immediate { lo, .. } => self.sta(format!("#{}",lo)),
            Operand::Absolute { base, .. } => self.sta(base.clone()),
            Operand::Offset { base, offset, .. } => self.sta(format!("{}+{}",base,offset)),
            Operand::VariableOffset { base, offset, .. } => {
                self.ldy(offset.clone());
                self.sta(text::absolute_y(base));
            },
            Operand::IndirectOffset { base, offset, .. } => {
                if offset.starts_with('@') {
                    if offset != "@Y" {
                        return Err(Box::new(Error::OffsetRegister(offset.clone())));
                    }
                } else {
                    self.ldy(offset.clone());
                }
                self.sta(text::indirect_y(base));
            },
            Operand::Register { .. } => return Err(Box::new(Error::RegisterStore))
        }
        Ok(())
    }
    /// store (X,A) into a word destination; assumes `store_byte` ran first
    /// and left Y holding the index for the offset forms
    fn store_word(&mut self, dst: &Operand) -> STDRESULT {
        self.store_byte(dst)?;
        match dst {
            Operand::Immediate { hi, .. } => {
                let hi = match hi {
                    Some(hi) => hi.clone(),
                    None => return Err(Box::new(Error::NoHighByte))
                };
                self.stx(format!("#{}",hi));
            },
            Operand::Absolute { base, .. } => self.stx(text::offset(base,1)),
            Operand::Offset { base, offset, .. } => self.stx(format!("{}+{}+1",base,offset)),
            Operand::VariableOffset { base, .. } => {
                self.iny();
                self.stx(text::absolute_y(base));
            },
            Operand::IndirectOffset { base, .. } => {
                self.iny();
                self.stx(text::indirect_y(base));
            },
            Operand::Register { .. } => return Err(Box::new(Error::RegisterStore))
        }
        Ok(())
    }
    /// apply an arithmetic or logic opcode to a source operand, with the
    /// same addressing shapes as the byte loads
    fn apply_byte(&mut self, op: Op, src: &Operand) -> STDRESULT {
        match src {
            Operand::Immediate { lo, .. } => self.emit_math(op,format!("#{}",lo)),
            Operand::Absolute { base, .. } => self.emit_math(op,base.clone()),
            Operand::Offset { base, offset, .. } => self.emit_math(op,format!("{}+{}",base,offset)),
            Operand::VariableOffset { base, offset, .. } => {
                self.ldy(offset.clone());
                self.emit_math(op,text::absolute_y(base));
            },
            Operand::IndirectOffset { base, offset, .. } => {
                if offset.starts_with('@') {
                    if offset != "@Y" {
                        return Err(Box::new(Error::OffsetRegister(offset.clone())));
                    }
                } else {
                    self.ldy(offset.clone());
                }
                self.emit_math(op,text::indirect_y(base));
            },
            Operand::Register { .. } => return Err(Box::new(Error::RegisterArithmetic(src.text())))
        }
        Ok(())
    }
    fn compare_byte(&mut self, reg: char, val: &Operand) -> STDRESULT {
        match val {
            Operand::Immediate { lo, .. } => self.emit_cp(reg,format!("#{}",lo)),
            Operand::Absolute { base, .. } => self.emit_cp(reg,base.clone()),
            Operand::Offset { base, offset, .. } => self.emit_cp(reg,format!("{}+{}",base,offset)),
            Operand::VariableOffset { base, offset, .. } => {
                // indexed compares go through the accumulator
                if reg == 'A' || reg == 'X' {
                    self.ldy(offset.clone());
                    self.cmp(text::absolute_y(base));
                } else {
                    self.ldx(offset.clone());
                    self.cmp(text::absolute_x(base));
                }
            },
            Operand::IndirectOffset { base, offset, .. } => {
                if offset.starts_with('@') && offset != "@Y" {
                    return Err(Box::new(Error::OffsetRegister(offset.clone())));
                }
                match reg {
                    'Y' => self.tya(),
                    'X' => self.txa(),
                    _ => {}
                }
                if !offset.starts_with('@') {
                    self.ldy(offset.clone());
                }
                self.cmp(text::indirect_y(base));
            },
            Operand::Register { .. } => return Err(Box::new(Error::RegisterComparison))
        }
        Ok(())
    }
    /// no reason to emit `CMP #$00` when the flags already say
    fn compare_byte_unless0(&mut self, reg: char, val: &Operand) -> STDRESULT {
        match val.number() {
            Some(0) => Ok(()),
            _ => self.compare_byte(reg,val)
        }
    }

    // ---- COPY ----

    fn copy_bb(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.macro_rem("COPYBB",dst,Some(src));
        if let Operand::Register { lo, .. } = dst {
            return self.load_byte(*lo,src);
        }
        self.load_byte('A',src)?;
        self.store_byte(dst)
    }
    fn copy_wb(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.macro_rem("COPYWB",dst,Some(src));
        if let Operand::Register { lo, hi: Some(hi) } = dst {
            self.load_byte(*lo,src)?;
            return self.load_byte(*hi,&zerob());
        }
        self.load_byte('A',src)?;
        self.load_byte('X',&zerob())?;
        self.store_word(dst)
    }
    fn copy_ww(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.macro_rem("COPYWW",dst,Some(src));
        if let Operand::Register { lo, hi: Some(hi) } = dst {
            return self.load_word(*hi,*lo,src);
        }
        self.load_word('X','A',src)?;
        self.store_word(dst)
    }
    /// dst := src
    pub fn copy(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        match (dst.size(),src.size()) {
            (1,s) => {
                self.copy_bb(dst,src)?;
                if s == 2 {
                    warn!("right-hand side will be truncated to a byte");
                    self.rem(TRUNCATED.to_string());
                }
                Ok(())
            },
            (2,1) => self.copy_wb(dst,src),
            (2,2) => self.copy_ww(dst,src),
            (d,s) => Err(Box::new(Error::OperandSize(d,s)))
        }
    }

    // ---- PLUS / LESS ----

    fn math_bb(&mut self, sub: bool, dst: &Operand, src: &Operand) -> STDRESULT {
        let name = match sub { true => "SUBBB", false => "ADDBB" };
        self.macro_rem(name,dst,Some(src));
        let op = match sub { true => Op::Sbc, false => Op::Adc };
        if let Operand::Register { lo, .. } = dst {
            if let Some(n) = src.number() {
                match (n,*lo) {
                    (0,_) => {
                        warn!("arithmetic with 0 removed");
                        self.rem(format!("Optimized out {}= 0",match sub { true => '-', false => '+' }));
                        return Ok(());
                    },
                    // 2 emits both increments unconditionally
                    (1,'X') | (2,'X') => {
                        for _ in 0..n {
                            match sub { true => self.dex(), false => self.inx() }
                        }
                        return Ok(());
                    },
                    (1,'Y') | (2,'Y') => {
                        for _ in 0..n {
                            match sub { true => self.dey(), false => self.iny() }
                        }
                        return Ok(());
                    },
                    _ => {}
                }
            }
            match lo {
                'X' => {
                    self.txa();
                    self.flag(sub);
                    self.apply_byte(op,src)?;
                    self.tax();
                },
                'Y' => {
                    self.tya();
                    self.flag(sub);
                    self.apply_byte(op,src)?;
                    self.tay();
                },
                'A' => {
                    self.flag(sub);
                    self.apply_byte(op,src)?;
                },
                _ => return Err(Box::new(Error::RegisterArithmetic(dst.text())))
            }
            return Ok(());
        }
        // constant folds for an addressable destination: 0 is dead code,
        // 1 and 2 fit INC/DEC (2 emits both, like the register form)
        if let Some(n) = src.number() {
            let target = match dst {
                Operand::Absolute { base, .. } => Some(base.clone()),
                Operand::Offset { base, offset, .. } => Some(format!("{}+{}",base,offset)),
                _ => None
            };
            if let Some(target) = target {
                match n {
                    0 => {
                        warn!("optimization: removing unused code: {} {}= 0",target,
                            match sub { true => '-', false => '+' });
                        return Ok(());
                    },
                    1 | 2 => {
                        for _ in 0..n {
                            match sub {
                                true => self.dec(target.clone()),
                                false => self.inc(target.clone())
                            }
                        }
                        return Ok(());
                    },
                    _ => {}
                }
            }
        }
        self.load_byte('A',dst)?;
        self.flag(sub);
        self.apply_byte(op,src)?;
        self.store_byte(dst)
    }
    fn math_wb(&mut self, sub: bool, dst: &Operand, src: &Operand) -> STDRESULT {
        let name = match sub { true => "SUBWB", false => "ADDWB" };
        self.macro_rem(name,dst,Some(src));
        let op = match sub { true => Op::Sbc, false => Op::Adc };
        let msb = dst.high_byte()?;
        self.flag(sub);
        self.load_byte('A',dst)?;
        self.apply_byte(op,src)?;
        self.store_byte(dst)?;
        self.load_byte('A',&msb)?;
        self.apply_byte(op,&zerob())?;
        self.store_byte(&msb)
    }
    fn math_ww(&mut self, sub: bool, dst: &Operand, src: &Operand) -> STDRESULT {
        let name = match sub { true => "SUBWW", false => "ADDWW" };
        self.macro_rem(name,dst,Some(src));
        let op = match sub { true => Op::Sbc, false => Op::Adc };
        let dst_msb = dst.high_byte()?;
        let src_msb = src.high_byte()?;
        self.flag(sub);
        self.load_byte('A',dst)?;
        self.apply_byte(op,src)?;
        self.store_byte(dst)?;
        self.load_byte('A',&dst_msb)?;
        self.apply_byte(op,&src_msb)?;
        self.store_byte(&dst_msb)
    }
    fn math(&mut self, sub: bool, dst: &Operand, src: &Operand) -> STDRESULT {
        match (dst.size(),src.size()) {
            (1,s) => {
                self.math_bb(sub,dst,src)?;
                if s == 2 {
                    warn!("right-hand side will be truncated to a byte");
                    self.rem(TRUNCATED.to_string());
                }
                Ok(())
            },
            (2,1) => self.math_wb(sub,dst,src),
            (2,2) => self.math_ww(sub,dst,src),
            (d,s) => Err(Box::new(Error::OperandSize(d,s)))
        }
    }
    /// dst += src
    pub fn plus(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.math(false,dst,src)
    }
    /// dst -= src
    pub fn less(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.math(true,dst,src)
    }

    // ---- BITAND / OR / XOR / NOT ----

    fn logic_bb(&mut self, op: Op, name: &str, dst: &Operand, src: &Operand) -> STDRESULT {
        self.macro_rem(&format!("{}BB",name),dst,Some(src));
        if let Operand::Register { lo, .. } = dst {
            match lo {
                'X' => {
                    self.txa();
                    self.apply_byte(op,src)?;
                    self.tax();
                },
                'Y' => {
                    self.tya();
                    self.apply_byte(op,src)?;
                    self.tay();
                },
                'A' => self.apply_byte(op,src)?,
                _ => return Err(Box::new(Error::RegisterArithmetic(dst.text())))
            }
            return Ok(());
        }
        self.load_byte('A',dst)?;
        self.apply_byte(op,src)?;
        self.store_byte(dst)
    }
    fn logic_wide(&mut self, op: Op, name: &str, dst: &Operand, src: &Operand, src_msb: &Operand) -> STDRESULT {
        self.macro_rem(name,dst,Some(src));
        let dst_msb = dst.high_byte()?;
        self.load_byte('A',dst)?;
        self.apply_byte(op,src)?;
        self.store_byte(dst)?;
        self.load_byte('A',&dst_msb)?;
        self.apply_byte(op,src_msb)?;
        self.store_byte(&dst_msb)
    }
    fn logic(&mut self, op: Op, name: &str, dst: &Operand, src: &Operand) -> STDRESULT {
        match (dst.size(),src.size()) {
            (1,s) => {
                self.logic_bb(op,name,dst,src)?;
                if s == 2 {
                    warn!("right-hand side will be truncated to a byte");
                    self.rem(TRUNCATED.to_string());
                }
                Ok(())
            },
            (2,1) => self.logic_wide(op,&format!("{}WB",name),dst,src,&zerob()),
            (2,2) => {
                let src_msb = src.high_byte()?;
                self.logic_wide(op,&format!("{}WW",name),dst,src,&src_msb)
            },
            (d,s) => Err(Box::new(Error::OperandSize(d,s)))
        }
    }
    /// dst &= src
    pub fn bit_and(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.logic(Op::And,"AND",dst,src)
    }
    /// dst |= src
    pub fn bit_or(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.logic(Op::Ora,"ORA",dst,src)
    }
    /// dst ^= src
    pub fn bit_xor(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.logic(Op::Eor,"EOR",dst,src)
    }
    fn not_bb(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        self.macro_rem("NOTBB",dst,Some(src));
        self.load_byte('A',src)?;
        self.eor("#$FF".to_string());
        if let Operand::Register { lo, .. } = dst {
            return self.transfer(*lo,'A');
        }
        self.store_byte(dst)
    }
    /// dst := ~src, byte-wise `EOR #$FF`
    pub fn bit_not(&mut self, dst: &Operand, src: &Operand) -> STDRESULT {
        match (dst.size(),src.size()) {
            (1,s) => {
                self.not_bb(dst,src)?;
                if s == 2 {
                    warn!("right-hand side will be truncated to a byte");
                    self.rem(TRUNCATED.to_string());
                }
                Ok(())
            },
            (2,s) => {
                let name = match s { 1 => "NOTWB", _ => "NOTWW" };
                self.macro_rem(name,dst,Some(src));
                let dst_msb = dst.high_byte()?;
                let src_msb = match s {
                    1 => zerob(),
                    _ => src.high_byte()?
                };
                self.load_byte('A',src)?;
                self.eor("#$FF".to_string());
                self.store_byte(dst)?;
                self.load_byte('A',&src_msb)?;
                self.eor("#$FF".to_string());
                self.store_byte(&dst_msb)
            },
            (d,s) => Err(Box::new(Error::OperandSize(d,s)))
        }
    }

    // ---- conditionals ----

    /// left == right: fall through to `done` unless equal
    pub fn if_eq(&mut self, left: &Operand, right: &Operand, then: &str, done: &str) -> STDRESULT {
        if left.size() == 1 && right.size() == 2 {
            return self.if_eq(right,left,then,done);
        }
        self.macro_rem("IFEQ",left,Some(right));
        self.rem(format!("  {} {}",then,done));
        match (left.size(),right.size()) {
            (1,1) => {
                if let Operand::Register { lo, .. } = left {
                    self.compare_byte(*lo,right)?;
                } else {
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.beq(then.to_string());
                self.jmp(done.to_string());
            },
            (2,1) => {
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&zerob())?;
                    self.bne(done.to_string());
                    self.compare_byte(*lo,right)?;
                } else {
                    let msb = left.high_byte()?;
                    self.load_byte('A',&msb)?;
                    // the load sets the Z flag
                    self.bne(done.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.beq(then.to_string());
                self.jmp(done.to_string());
            },
            (2,2) => {
                let rmsb = right.high_byte()?;
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&rmsb)?;
                    self.bne(done.to_string());
                    self.compare_byte(*lo,right)?;
                } else {
                    let lmsb = left.high_byte()?;
                    self.load_byte('A',&lmsb)?;
                    self.compare_byte('A',&rmsb)?;
                    self.bne(done.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.beq(then.to_string());
                self.jmp(done.to_string());
            },
            (d,s) => return Err(Box::new(Error::OperandSize(d,s)))
        }
        Ok(())
    }
    /// left <> right
    pub fn if_ne(&mut self, left: &Operand, right: &Operand, then: &str, done: &str) -> STDRESULT {
        if left.size() == 1 && right.size() == 2 {
            return self.if_ne(right,left,then,done);
        }
        self.macro_rem("IFNE",left,Some(right));
        self.rem(format!("  {} {}",then,done));
        match (left.size(),right.size()) {
            (1,1) => {
                if let Operand::Register { lo, .. } = left {
                    self.compare_byte(*lo,right)?;
                } else {
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.bne(then.to_string());
                self.jmp(done.to_string());
            },
            (2,1) => {
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&zerob())?;
                    self.bne(then.to_string());
                    self.compare_byte(*lo,right)?;
                } else {
                    let msb = left.high_byte()?;
                    self.load_byte('A',&msb)?;
                    // the load sets the Z flag
                    self.bne(then.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.bne(then.to_string());
                self.jmp(done.to_string());
            },
            (2,2) => {
                let rmsb = right.high_byte()?;
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&rmsb)?;
                    self.bne(then.to_string());
                    self.compare_byte(*lo,right)?;
                } else {
                    let lmsb = left.high_byte()?;
                    self.load_byte('A',&lmsb)?;
                    self.compare_byte_unless0('A',&rmsb)?;
                    self.bne(then.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.bne(then.to_string());
                self.jmp(done.to_string());
            },
            (d,s) => return Err(Box::new(Error::OperandSize(d,s)))
        }
        Ok(())
    }
    /// left >= right
    pub fn if_ge(&mut self, left: &Operand, right: &Operand, then: &str, done: &str) -> STDRESULT {
        self.macro_rem("IFGE",left,Some(right));
        self.rem(format!("  {} {}",then,done));
        match (left.size(),right.size()) {
            (1,1) => {
                if let Operand::Register { lo, .. } = left {
                    self.compare_byte(*lo,right)?;
                } else {
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.bcs(then.to_string());
                self.jmp(done.to_string());
            },
            (1,2) => {
                // a high byte above zero puts right past any byte value
                let msb = right.high_byte()?;
                self.load_byte('A',&msb)?;
                self.bne(done.to_string());
                self.load_byte('A',left)?;
                self.compare_byte_unless0('A',right)?;
                self.bcs(then.to_string());
                self.jmp(done.to_string());
            },
            (2,1) => {
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&zerob())?;
                    self.bne(then.to_string());
                    self.compare_byte_unless0(*lo,right)?;
                } else {
                    let msb = left.high_byte()?;
                    self.load_byte('A',&msb)?;
                    // high byte above zero means left > $FF >= right
                    self.bne(then.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.bcs(then.to_string());
                self.jmp(done.to_string());
            },
            (2,2) => {
                let rmsb = right.high_byte()?;
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&rmsb)?;
                    self.bne(done.to_string());
                    self.compare_byte(*lo,right)?;
                    self.bcs(then.to_string());
                    self.jmp(done.to_string());
                } else {
                    let lmsb = left.high_byte()?;
                    self.load_byte('A',&lmsb)?;
                    self.compare_byte_unless0('A',&rmsb)?;
                    self.bcc(done.to_string());
                    self.bne(then.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                    self.bcs(then.to_string());
                    self.jmp(done.to_string());
                }
            },
            (d,s) => return Err(Box::new(Error::OperandSize(d,s)))
        }
        Ok(())
    }
    /// left < right
    pub fn if_lt(&mut self, left: &Operand, right: &Operand, then: &str, done: &str) -> STDRESULT {
        if left.size() == 1 && right.size() == 2 {
            // the swapped form is shorter
            return self.if_ge(right,left,then,done);
        }
        self.macro_rem("IFLT",left,Some(right));
        self.rem(format!("  {} {}",then,done));
        match (left.size(),right.size()) {
            (1,1) => {
                if let Operand::Register { lo, .. } = left {
                    self.compare_byte(*lo,right)?;
                } else {
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.bcc(then.to_string());
                self.jmp(done.to_string());
            },
            (2,1) => {
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&zerob())?;
                    // high byte above zero means left > $FF, never below right
                    self.bne(done.to_string());
                    self.compare_byte(*lo,right)?;
                } else {
                    let msb = left.high_byte()?;
                    self.load_byte('A',&msb)?;
                    self.bne(done.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                }
                self.bcc(then.to_string());
                self.jmp(done.to_string());
            },
            (2,2) => {
                let rmsb = right.high_byte()?;
                if let Operand::Register { lo, hi: Some(hi) } = left {
                    self.compare_byte(*hi,&rmsb)?;
                    self.bne(done.to_string());
                    self.compare_byte(*lo,right)?;
                    self.bcc(then.to_string());
                    self.jmp(done.to_string());
                } else {
                    let lmsb = left.high_byte()?;
                    self.load_byte('A',&lmsb)?;
                    self.compare_byte_unless0('A',&rmsb)?;
                    self.bcc(then.to_string());
                    self.bne(done.to_string());
                    self.load_byte('A',left)?;
                    self.compare_byte_unless0('A',right)?;
                    self.bcc(then.to_string());
                    self.jmp(done.to_string());
                }
            },
            (d,s) => return Err(Box::new(Error::OperandSize(d,s)))
        }
        Ok(())
    }
    /// left <= right, via the shorter swapped form
    pub fn if_le(&mut self, left: &Operand, right: &Operand, then: &str, done: &str) -> STDRESULT {
        self.if_ge(right,left,then,done)
    }
    /// left > right, encoded as right < left
    pub fn if_gt(&mut self, left: &Operand, right: &Operand, then: &str, done: &str) -> STDRESULT {
        self.if_lt(right,left,then,done)
    }
    /// unconditional
    pub fn if_true(&mut self, then: &str, _done: &str) -> STDRESULT {
        self.rem("IFTT".to_string());
        self.jmp(then.to_string());
        Ok(())
    }

    // ---- ADDR ----

    fn load_addr(&mut self, src: &Operand) -> STDRESULT {
        match src {
            Operand::Absolute { base, .. } => {
                self.lda(text::immediate(text::lo(base)));
                self.ldx(text::immediate(text::hi(base)));
            },
            Operand::Offset { base, offset, .. } => {
                let displaced = format!("{}+{}",base,offset);
                self.lda(text::immediate(text::lo(&displaced)));
                self.ldx(text::immediate(text::hi(&displaced)));
            },
            Operand::VariableOffset { base, offset, .. } => {
                self.lda(text::immediate(text::lo(base)));
                self.ldx(text::immediate(text::hi(base)));
                self.clc();
                self.adc(offset.clone());
                self.bcc("#1".to_string());
                self.inx();
            },
            Operand::IndirectOffset { base, offset, .. } => {
                // start from the pointer's current value
                self.lda(base.clone());
                self.ldx(text::offset(base,1));
                self.clc();
                self.adc(offset.clone());
                self.bcc("#1".to_string());
                self.inx();
            },
            Operand::Immediate { .. } | Operand::Register { .. } => {
                return Err(Box::new(Error::BadAddressSource(src.text())));
            }
        }
        Ok(())
    }
    /// pointer := address of src; effective address travels in (X,A)
    pub fn addr(&mut self, pointer: &str, src: &Operand) -> STDRESULT {
        self.load_addr(src)?;
        self.stx(text::offset(pointer,1));
        self.sta(pointer.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(asm: Assembly) -> String {
        let mut asm = asm;
        asm.optimize();
        asm.to_text()
    }

    #[test]
    fn copy_byte_to_byte() {
        let mut asm = Assembly::new();
        asm.copy(&Operand::absolute("counter",1),&Operand::imm_number(0)).expect("copy");
        let text = listing(asm);
        assert!(text.contains("\tLDA #$00\n\tSTA counter"),"got: {}",text);
    }

    #[test]
    fn copy_zero_extends_bytes_into_words() {
        let mut asm = Assembly::new();
        asm.copy(&Operand::absolute("total",2),&Operand::absolute("count",1)).expect("copy");
        let text = listing(asm);
        assert!(text.contains("\tLDA count\n\tLDX #$00\n\tSTA total\n\tSTX total+1"),"got: {}",text);
    }

    #[test]
    fn copy_word_travels_in_xa() {
        let mut asm = Assembly::new();
        asm.copy(&Operand::absolute("dst",2),&Operand::absolute("src",2)).expect("copy");
        let text = listing(asm);
        assert!(text.contains("\tLDA src\n\tLDX src+1\n\tSTA dst\n\tSTX dst+1"),"got: {}",text);
    }

    #[test]
    fn copy_truncation_warns_in_listing() {
        let mut asm = Assembly::new();
        asm.copy(&Operand::absolute("small",1),&Operand::absolute("wide",2)).expect("copy");
        let text = listing(asm);
        assert!(text.contains("* WARNING: VALUE TRUNCATED"),"got: {}",text);
    }

    #[test]
    fn copy_into_y_from_indirect_goes_through_a() {
        let mut asm = Assembly::new();
        asm.copy(&Operand::register('Y'),&Operand::indirect("ptr","#$00".to_string(),1)).expect("copy");
        let text = listing(asm);
        assert!(text.contains("\tLDA (ptr),Y\n\tTAY"),"got: {}",text);
    }

    #[test]
    fn add_loads_destination_first() {
        let mut asm = Assembly::new();
        asm.plus(&Operand::absolute("x",1),&Operand::imm_number(5)).expect("plus");
        let text = listing(asm);
        assert!(text.contains("\tLDA x\n\tCLC\n\tADC #$05\n\tSTA x"),"got: {}",text);
    }

    #[test]
    fn subtract_borrows_through_the_destination() {
        let mut asm = Assembly::new();
        asm.less(&Operand::absolute("x",1),&Operand::imm_number(5)).expect("less");
        let text = listing(asm);
        assert!(text.contains("\tLDA x\n\tSEC\n\tSBC #$05\n\tSTA x"),"got: {}",text);
    }

    #[test]
    fn small_memory_adds_use_inc_and_dec() {
        let mut asm = Assembly::new();
        asm.plus(&Operand::absolute("count",1),&Operand::imm_number(1)).expect("plus");
        asm.plus(&Operand::absolute("count",1),&Operand::imm_number(2)).expect("plus");
        asm.less(&Operand::absolute("count",1),&Operand::imm_number(1)).expect("less");
        asm.less(&Operand::offset("pt","1".to_string(),false,1),&Operand::imm_number(2)).expect("less");
        let text = listing(asm);
        assert!(text.contains("\tINC count"),"got: {}",text);
        assert!(text.contains("\tINC count\n\tINC count"),"got: {}",text);
        assert!(text.contains("\tDEC count"),"got: {}",text);
        assert!(text.contains("\tDEC pt+1\n\tDEC pt+1"),"got: {}",text);
        assert!(!text.contains("ADC"),"got: {}",text);
        assert!(!text.contains("SBC"),"got: {}",text);
    }

    #[test]
    fn memory_add_zero_is_removed() {
        let mut asm = Assembly::new();
        asm.plus(&Operand::absolute("count",1),&Operand::imm_number(0)).expect("plus");
        let text = listing(asm);
        assert!(!text.contains("LDA"),"got: {}",text);
        assert!(!text.contains("ADC"),"got: {}",text);
        assert!(!text.contains("INC"),"got: {}",text);
    }

    #[test]
    fn word_add_propagates_carry() {
        let mut asm = Assembly::new();
        asm.plus(&Operand::absolute("total",2),&Operand::absolute("n",1)).expect("plus");
        let text = listing(asm);
        assert!(text.contains("\tCLC\n\tLDA total\n\tADC n\n\tSTA total\n\tLDA total+1\n\tADC #$00\n\tSTA total+1"),"got: {}",text);
    }

    #[test]
    fn add_zero_is_removed() {
        let mut asm = Assembly::new();
        asm.plus(&Operand::register('X'),&Operand::imm_number(0)).expect("plus");
        let text = listing(asm);
        assert!(text.contains("* Optimized out += 0"),"got: {}",text);
        assert!(!text.contains("ADC"),"got: {}",text);
    }

    #[test]
    fn small_register_adds_use_increments() {
        let mut asm = Assembly::new();
        asm.plus(&Operand::register('X'),&Operand::imm_number(1)).expect("plus");
        asm.plus(&Operand::register('Y'),&Operand::imm_number(2)).expect("plus");
        asm.less(&Operand::register('X'),&Operand::imm_number(1)).expect("less");
        let text = listing(asm);
        assert!(text.contains("\tINX"),"got: {}",text);
        assert!(text.contains("\tINY\n\tINY"),"got: {}",text);
        assert!(text.contains("\tDEX"),"got: {}",text);
        assert!(!text.contains("ADC"),"got: {}",text);
    }

    #[test]
    fn accumulator_adds_have_no_shortcut() {
        let mut asm = Assembly::new();
        asm.plus(&Operand::register('A'),&Operand::imm_number(1)).expect("plus");
        let text = listing(asm);
        assert!(text.contains("\tCLC\n\tADC #$01"),"got: {}",text);
    }

    #[test]
    fn logic_ops_use_the_bitwise_opcodes() {
        let mut asm = Assembly::new();
        asm.bit_and(&Operand::absolute("flags",1),&Operand::imm_number(0x0F)).expect("and");
        asm.bit_or(&Operand::absolute("flags",1),&Operand::imm_number(0x80)).expect("or");
        asm.bit_xor(&Operand::absolute("flags",1),&Operand::imm_number(0xFF)).expect("xor");
        asm.bit_not(&Operand::absolute("flags",1),&Operand::absolute("mask",1)).expect("not");
        let text = listing(asm);
        assert!(text.contains("\tAND #$0F"),"got: {}",text);
        assert!(text.contains("\tORA #$80"),"got: {}",text);
        assert!(text.contains("\tEOR #$FF\n\tSTA flags"),"got: {}",text);
        assert!(text.contains("\tLDA mask\n\tEOR #$FF"),"got: {}",text);
    }

    #[test]
    fn ifne_byte_skips_compare_against_zero() {
        let mut asm = Assembly::new();
        asm.if_ne(&Operand::absolute("x",1),&Operand::imm_number(0),"then","done").expect("ifne");
        let text = listing(asm);
        assert!(text.contains("\tLDA x\n\tBNE then\n\tJMP done"),"got: {}",text);
        assert!(!text.contains("CMP"),"got: {}",text);
    }

    #[test]
    fn ifeq_word_checks_high_byte_first() {
        let mut asm = Assembly::new();
        asm.if_eq(&Operand::absolute("total",2),&Operand::imm_number(3),"then","done").expect("ifeq");
        let text = listing(asm);
        assert!(text.contains("\tLDA total+1\n\tBNE done\n\tLDA total\n\tCMP #$03\n\tBEQ then\n\tJMP done"),"got: {}",text);
    }

    #[test]
    fn byte_word_comparisons_swap() {
        let mut asm = Assembly::new();
        // byte < word becomes word >= byte
        asm.if_lt(&Operand::absolute("b",1),&Operand::absolute("w",2),"then","done").expect("iflt");
        let text = listing(asm);
        assert!(text.contains("* IFGE w b"),"got: {}",text);
    }

    #[test]
    fn ifge_words_uses_carry_and_equality() {
        let mut asm = Assembly::new();
        asm.if_ge(&Operand::absolute("l",2),&Operand::absolute("r",2),"then","done").expect("ifge");
        let text = listing(asm);
        assert!(text.contains("\tLDA l+1\n\tCMP r+1\n\tBCC done\n\tBNE then\n\tLDA l\n\tCMP r\n\tBCS then\n\tJMP done"),"got: {}",text);
    }

    #[test]
    fn addr_takes_effective_addresses() {
        let mut asm = Assembly::new();
        asm.addr("ptr",&Operand::absolute("msg",2)).expect("addr");
        let text = listing(asm);
        assert!(text.contains("\tLDA #<msg\n\tLDX #>msg\n\tSTX ptr+1\n\tSTA ptr"),"got: {}",text);
    }

    #[test]
    fn addr_with_variable_offset_adds_with_carry() {
        let mut asm = Assembly::new();
        asm.addr("ptr",&Operand::offset("buf","i".to_string(),true,1)).expect("addr");
        let text = listing(asm);
        assert!(text.contains("\tLDA #<buf\n\tLDX #>buf\n\tCLC\n\tADC i\n\tBCC #1\n\tINX"),"got: {}",text);
    }
}
