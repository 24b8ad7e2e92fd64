//! # Code generator
//!
//! Recursive AST-directed translation into macro-level operations against
//! the operand model.  The generator owns the symbol table and the assembly
//! builder and keeps a stack of lexical scopes: subroutine frames qualify
//! name lookups, loop frames give `stop` and `repeat` their jump targets,
//! and the global scope is the empty stack.
//!
//! Value lowering is two-step: an identifier phrase (`name[_index][.field]`)
//! reduces to an operand, then the statement picks the macro (`COPY`,
//! `PLUS`, `IFxx`, ...) that consumes the operands.  Pointer assignments
//! divert early: pointing a pointer at a non-pointer becomes an `ADDR`
//! materialisation, and pointing it at its own address is dropped entirely.

use log::{warn,debug};
use thiserror::Error;
use crate::lang::ast::*;
use crate::symbols::{SymbolTable,SymId,Location,TypeInfo};
use crate::asm::Assembly;
use crate::asm::operand::Operand;
use crate::text;
use crate::{DYNERR,STDRESULT};

#[cfg(test)]
mod tests;

const RCH: &str = "unreachable was reached";

#[derive(Error,Debug)]
pub enum Error {
    #[error("cannot use stop outside of a loop")]
    StopOutsideLoop,
    #[error("cannot use repeat outside of a loop")]
    RepeatOutsideLoop,
    #[error("cannot nest subroutines: {0}")]
    NestedSubroutine(String),
    #[error("{0}: storage exceeds 255 bytes")]
    TooBig(String),
    #[error("only byte pointers can be indexed: {0}")]
    PointerIndex(String),
    #[error("variable index is not byte size: {0}")]
    IndexSize(String),
    #[error("expected an array: {0}")]
    ExpectedArray(String),
    #[error("bad byte offset: {0}")]
    BadByteOffset(i32),
    #[error("definition requires a name")]
    UnnamedDefinition,
    #[error("cannot define a name as a {0}")]
    UnsupportedDefinition(&'static str),
    #[error("cannot define a subroutine that has a declared location: {0}")]
    RedefinedLocated(String),
    #[error("group member {0} can not be register-bound")]
    GroupMemberRegister(String),
    #[error("0 is the only allowable offset for group member {0}")]
    GroupMemberOffset(String),
    #[error("outputs cannot have relative locations: {0}")]
    OutputOffset(String),
    #[error("cannot assign a call result to the group {0}")]
    GroupAssignment(String),
    #[error("subscripts and fields are not allowed in call targets: {0}")]
    CallPhrase(String),
    #[error("cannot take the address of {0}")]
    AddressOfValue(String),
    #[error("cannot take the address of register output {0}")]
    RegisterAddress(String),
    #[error("expected a simple value")]
    SimpleValue,
    #[error("text and tuple assignments are unsupported")]
    TextAssignment,
    #[error("unexpected value in {0}")]
    UnexpectedValue(&'static str),
    #[error("variable size cannot be 0: {0}")]
    ZeroSizeVariable(String),
    #[error("unhandled location for {0}")]
    BadLocation(String),
    #[error("unexpected size for {0}: {1}")]
    UnexpectedSize(String,u16),
    #[error("unhandled kind of type")]
    UnexpectedType
}

enum Scope {
    Subroutine(String),
    Loop { entry: String, done: String }
}

pub struct Generator {
    symbols: SymbolTable,
    asm: Assembly,
    scopes: Vec<Scope>
}

impl Generator {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            asm: Assembly::new(),
            scopes: Vec::new()
        }
    }
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
    pub fn assembly(&self) -> &Assembly {
        &self.asm
    }
    /// Walk the program and run the peephole pass.  The builder then holds
    /// the finished listing; serialize it with `assembly().write(..)`.
    pub fn generate(&mut self, program: &Program) -> STDRESULT {
        self.block(&program.block)?;
        self.asm.optimize();
        Ok(())
    }

    // ---- scopes ----

    fn enter_subroutine(&mut self, name: &str) {
        debug!("enter subroutine {}",name);
        self.scopes.push(Scope::Subroutine(name.to_string()));
    }
    fn enter_loop(&mut self, entry: String, done: String) {
        debug!("enter loop {}",entry);
        self.scopes.push(Scope::Loop { entry, done });
    }
    fn leave_scope(&mut self) {
        self.scopes.pop().expect(RCH);
    }
    fn current_subroutine(&self) -> Option<String> {
        for scope in self.scopes.iter().rev() {
            if let Scope::Subroutine(name) = scope {
                return Some(name.clone());
            }
        }
        None
    }
    fn current_loop(&self) -> Option<(String,String)> {
        for scope in self.scopes.iter().rev() {
            if let Scope::Loop { entry, done } = scope {
                return Some((entry.clone(),done.clone()));
            }
        }
        None
    }
    fn getsym(&self, name: &str) -> Result<SymId,DYNERR> {
        self.symbols.lookup_scoped(self.current_subroutine().as_deref(),name)
    }

    // ---- AST helpers ----

    fn location(&self, num: &Option<Numerical>) -> Result<Location,DYNERR> {
        match num {
            None => Ok(Location::None),
            Some(Numerical::Number(n)) => {
                let value = *n as u16;
                if *n != value as i32 {
                    warn!("location may be invalid: {} => {}",n,value);
                }
                Ok(Location::Fixed { value: Some(value), addr: text::hex_word(value) })
            },
            Some(Numerical::Ident(name)) => {
                match self.symbols.lookup_register(name)? {
                    Some(reg) => Ok(Location::Reg(reg)),
                    None => Ok(Location::Fixed { value: None, addr: name.to_string() })
                }
            }
        }
    }
    fn number(&self, num: &Numerical) -> Result<u16,DYNERR> {
        match num {
            Numerical::Number(n) => Ok(*n as u16),
            Numerical::Ident(name) => self.symbols.get_number(self.getsym(name)?)
        }
    }
    fn typeinfo(&self, typ: &Type) -> Result<TypeInfo,DYNERR> {
        match typ {
            Type::Array { base, size } => Ok(TypeInfo::array(base,self.number(size)?)),
            Type::Pointer(base) => Ok(TypeInfo::pointer(base)),
            Type::Ident(name) => Ok(TypeInfo::plain(name)),
            Type::Subroutine(_) => Err(Box::new(Error::UnexpectedType))
        }
    }
    /// render a subscript: literal numbers as `#$XX`, constants as `#name`,
    /// variables bare, register-held indices as `@A`/`@X`/`@Y`
    fn indextxt(&self, num: &Numerical) -> Result<String,DYNERR> {
        match num {
            Numerical::Ident(name) => {
                let sym = self.getsym(name)?;
                if let Some(reg) = self.symbols.get_register(sym) {
                    return Ok(format!("@{}",reg.name()));
                }
                let symname = self.symbols.get_name(sym).to_string();
                match self.symbols.is_literal(sym) {
                    true => Ok(text::immediate(symname)),
                    false => Ok(symname)
                }
            },
            Numerical::Number(n) => {
                if *n > 0xFF || *n < -128 {
                    return Err(Box::new(Error::BadByteOffset(*n)));
                }
                Ok(text::immediate(text::hex_byte(*n as u8)))
            }
        }
    }

    // ---- phrase reduction ----

    /// Convert an identifier phrase to an operand.
    fn reduce(&self, id: &IdentPhrase) -> Result<Operand,DYNERR> {
        let identsym = self.getsym(id.identifier)?;
        if let Some(reg) = self.symbols.get_register(identsym) {
            let letters = reg.name().as_bytes();
            return Ok(match reg.high() {
                Some(_) => Operand::register_pair(letters[0] as char,letters[1] as char),
                None => Operand::register(letters[0] as char)
            });
        }
        if id.subscript.is_none() && id.field.is_none() {
            let size = self.symbols.get_size(identsym);
            if size > 0xFF {
                return Err(Box::new(Error::TooBig(id.identifier.to_string())));
            }
            let name = self.symbols.get_name(identsym);
            return Ok(match self.symbols.is_literal(identsym) {
                true => Operand::imm(name.to_string(),size as u8),
                false => Operand::absolute(name,size as u8)
            });
        }
        if let Some(sub) = &id.subscript {
            let size = self.symbols.get_base_size(identsym) as u8;
            let name = self.symbols.get_name(identsym).to_string();
            if self.symbols.is_pointer(identsym) {
                if size != 1 {
                    return Err(Box::new(Error::PointerIndex(text::phrase(id))));
                }
                return Ok(Operand::indirect(&name,self.indextxt(sub)?,size));
            }
            let count = match self.symbols.get_item_count(identsym) {
                Some(count) if count > 0 => count,
                _ => return Err(Box::new(Error::ExpectedArray(text::phrase(id))))
            };
            return match sub {
                Numerical::Ident(idx) => {
                    let indexsym = self.getsym(idx)?;
                    if self.symbols.is_variable(indexsym) && self.symbols.get_size(indexsym) != 1 {
                        return Err(Box::new(Error::IndexSize(idx.to_string())));
                    }
                    if self.symbols.is_literal(indexsym) {
                        let n = self.symbols.get_number(indexsym)?;
                        if n >= count {
                            warn!("array index out of bounds: {}",text::phrase(id));
                        }
                        return Ok(Operand::offset(&name,text::hex_num(n),false,size));
                    }
                    let idxname = self.symbols.get_name(indexsym).to_string();
                    Ok(Operand::offset(&name,idxname,self.symbols.is_variable(indexsym),size))
                },
                Numerical::Number(n) => {
                    if *n < 0 || *n as u16 >= count {
                        warn!("array index out of bounds: {}",text::phrase(id));
                    }
                    Ok(Operand::offset(&name,text::hex_num(*n as u16),false,size))
                }
            };
        }
        let field = id.field.expect(RCH);
        let member = self.symbols.get_member(identsym,Some(field),0)?;
        let name = self.symbols.get_name(identsym).to_string();
        let offset = self.symbols.get_offset(member);
        let memsize = self.symbols.get_size(member) as u8;
        match self.symbols.is_pointer(identsym) {
            true => Ok(Operand::indirect(&name,format!("#{}",offset),memsize)),
            false => Ok(Operand::offset(&name,format!("{}",offset),false,memsize))
        }
    }
    /// operands usable in comparisons: phrases, numbers, characters
    fn reduce_simple(&self, value: &Value) -> Result<Operand,DYNERR> {
        match value {
            Value::Ident(id) => self.reduce(id),
            Value::Number(n) => Ok(Operand::imm_number(*n as u16)),
            Value::Char(c) => Ok(Operand::imm(text::asciich(*c),1)),
            _ => Err(Box::new(Error::SimpleValue))
        }
    }
    /// the right-hand side of an assignment; a call runs first and its first
    /// output becomes the source operand
    fn reduce_value(&mut self, lhs: &IdentPhrase, rhs: &Value) -> Result<Operand,DYNERR> {
        match rhs {
            Value::Ident(id) => self.reduce(id),
            Value::Char(c) => Ok(Operand::imm(text::asciich(*c),1)),
            Value::Number(n) => Ok(Operand::imm_number(*n as u16)),
            Value::Call(call) => {
                self.generate_call(call)?;
                if lhs.field.is_none() && lhs.subscript.is_none() {
                    let sym = self.getsym(lhs.identifier)?;
                    if self.symbols.is_group(sym) {
                        return Err(Box::new(Error::GroupAssignment(self.symbols.get_name(sym).to_string())));
                    }
                }
                let subsym = self.symbols.lookup_subroutine(call.ident.identifier,0)?;
                let output = self.symbols.get_output(subsym,None,0)?;
                let name = self.symbols.get_name(output).to_string();
                let phrase = IdentPhrase { identifier: &name, subscript: None, field: None, pos: 0 };
                self.reduce(&phrase)
            },
            Value::Text(_) | Value::Tuple(_) => Err(Box::new(Error::TextAssignment)),
            Value::Sub(_) | Value::Group(_) | Value::Type(_) => Err(Box::new(Error::UnexpectedValue("assignment")))
        }
    }

    // ---- statements ----

    fn generate_call(&mut self, call: &Call) -> STDRESULT {
        if call.ident.subscript.is_some() || call.ident.field.is_some() {
            return Err(Box::new(Error::CallPhrase(text::phrase(&call.ident))));
        }
        let subname = call.ident.identifier;
        let subsym = self.symbols.lookup_subroutine(subname,call.args.len())?;
        // memory-resident parameters first, so the register loads survive
        for (i,arg) in call.args.iter().enumerate() {
            let param = self.symbols.get_parameter(subsym,arg.name,i)?;
            if self.symbols.get_register(param).is_none() {
                self.set_argument(param,&arg.value)?;
            }
        }
        for (i,arg) in call.args.iter().enumerate() {
            let param = self.symbols.get_parameter(subsym,arg.name,i)?;
            if self.symbols.get_register(param).is_some() {
                self.set_argument(param,&arg.value)?;
            }
        }
        self.asm.jsr(subname.to_string());
        Ok(())
    }
    fn set_argument(&mut self, param: SymId, value: &Value) -> STDRESULT {
        let name = self.symbols.get_name(param).to_string();
        let phrase = IdentPhrase { identifier: &name, subscript: None, field: None, pos: 0 };
        self.generate_set(&phrase,value)
    }
    fn phrase_is_pointer(&self, id: &IdentPhrase) -> bool {
        if id.subscript.is_some() || id.field.is_some() {
            return false;
        }
        match self.getsym(id.identifier) {
            Ok(sym) => self.symbols.is_pointer(sym),
            Err(_) => false
        }
    }
    /// pointer := address of rhs
    fn generate_point(&mut self, pointer: &str, rhs: &Value) -> STDRESULT {
        let src = match rhs {
            Value::Text(txt) => {
                let name = self.define_text(None,txt)?;
                Operand::absolute(&name,2)
            },
            Value::Call(call) => {
                self.generate_call(call)?;
                let subsym = self.symbols.lookup_subroutine(call.ident.identifier,0)?;
                let output = self.symbols.get_output(subsym,None,0)?;
                if self.symbols.get_register(output).is_some() {
                    return Err(Box::new(Error::RegisterAddress(self.symbols.get_name(output).to_string())));
                }
                Operand::absolute(self.symbols.get_name(output),2)
            },
            Value::Ident(id) => self.reduce(id)?,
            Value::Char(c) => return Err(Box::new(Error::AddressOfValue(format!("literal character {}",*c as char)))),
            Value::Number(n) => return Err(Box::new(Error::AddressOfValue(format!("literal number {}",n)))),
            Value::Tuple(_) => return Err(Box::new(Error::AddressOfValue("a tuple".to_string()))),
            Value::Sub(_) | Value::Group(_) | Value::Type(_) => {
                return Err(Box::new(Error::UnexpectedValue("pointer assignment")));
            }
        };
        self.asm.addr(pointer,&src)
    }
    fn generate_set(&mut self, lhs: &IdentPhrase, rhs: &Value) -> STDRESULT {
        let src_is_pointer = match rhs {
            Value::Ident(id) => self.phrase_is_pointer(id),
            _ => false
        };
        if self.phrase_is_pointer(lhs) {
            let dst = self.getsym(lhs.identifier)?;
            if !src_is_pointer {
                let pointer = self.symbols.get_name(dst).to_string();
                return self.generate_point(&pointer,rhs);
            }
            if let Value::Ident(id) = rhs {
                let src = self.getsym(id.identifier)?;
                if let (Some(d),Some(s)) = (self.symbols.get_address(dst),self.symbols.get_address(src)) {
                    if d == s {
                        warn!("optimized out assigning pointer to itself: {} := {}",
                            self.symbols.get_name(dst),self.symbols.get_name(src));
                        return Ok(());
                    }
                }
            }
        }
        let dst = self.reduce(lhs)?;
        let src = self.reduce_value(lhs,rhs)?;
        self.asm.copy(&dst,&src)
    }
    fn generate_arithmetic(&mut self, lhs: &IdentPhrase, rhs: &Value, kind: AssignKind) -> STDRESULT {
        let dst = self.reduce(lhs)?;
        let src = self.reduce_value(lhs,rhs)?;
        match kind {
            AssignKind::Add => self.asm.plus(&dst,&src),
            AssignKind::Subtract => self.asm.less(&dst,&src),
            AssignKind::And => self.asm.bit_and(&dst,&src),
            AssignKind::Or => self.asm.bit_or(&dst,&src),
            AssignKind::Xor => self.asm.bit_xor(&dst,&src),
            AssignKind::Not => self.asm.bit_not(&dst,&src),
            AssignKind::Set => self.asm.copy(&dst,&src)
        }
    }
    fn generate_assignment(&mut self, assign: &Assignment) -> STDRESULT {
        match assign.kind {
            AssignKind::Set => self.generate_set(&assign.ident,&assign.value),
            kind => self.generate_arithmetic(&assign.ident,&assign.value,kind)
        }
    }
    fn branch(&mut self, compare: Compare, left: &Operand, right: &Operand, then: &str, done: &str) -> STDRESULT {
        match compare {
            Compare::Equal => self.asm.if_eq(left,right,then,done),
            Compare::NotEqual => self.asm.if_ne(left,right,then,done),
            Compare::Less => self.asm.if_lt(left,right,then,done),
            Compare::LessEqual => self.asm.if_le(left,right,then,done),
            Compare::Greater => self.asm.if_gt(left,right,then,done),
            Compare::GreaterEqual => self.asm.if_ge(left,right,then,done),
            Compare::Always => self.asm.if_true(then,done)
        }
    }
    /// `if` and `while` share a shape; loops add the back-jump and a scope
    /// frame for `stop`/`repeat`
    fn generate_conditional(&mut self, cond: &Conditional, is_loop: bool) -> STDRESULT {
        let scope = self.current_subroutine();
        let entry = match self.asm.pending_label() {
            Some(pending) => pending.to_string(),
            None => {
                let label = self.symbols.make_local_label(scope.as_deref());
                self.asm.label(&label);
                label
            }
        };
        let then = self.symbols.make_local_label(scope.as_deref());
        let done = self.symbols.make_local_label(scope.as_deref());
        if is_loop {
            self.enter_loop(entry.clone(),done.clone());
        }
        let left = self.reduce_simple(&cond.left)?;
        let right = self.reduce_simple(&cond.right)?;
        self.branch(cond.compare,&left,&right,&then,&done)?;
        self.asm.label(&then);
        self.block(&cond.then)?;
        if is_loop {
            self.asm.jmp(entry);
        }
        self.asm.label(&done);
        if is_loop {
            self.leave_scope();
        }
        Ok(())
    }

    // ---- declarations (`use`) ----

    fn declare_parameters(&mut self, subsym: SymId, params: &[Parameter]) -> STDRESULT {
        for param in params {
            let info = self.typeinfo(&param.typ)?;
            let loc = self.location(&param.loc)?;
            let id = self.symbols.add_parameter(subsym,param.name,info,loc)?;
            if !self.symbols.has_location(id) {
                let name = self.symbols.get_name(id).to_string();
                let size = self.symbols.get_size(id);
                self.asm.var(&name,size)?;
                continue;
            }
            if let Some(addr) = self.symbols.get_address(id) {
                let name = self.symbols.get_name(id).to_string();
                let addr = addr.to_string();
                self.asm.equ(&name,addr);
            }
        }
        Ok(())
    }
    fn declare_outputs(&mut self, subsym: SymId, params: &[Parameter]) -> STDRESULT {
        for param in params {
            let info = self.typeinfo(&param.typ)?;
            let loc = self.location(&param.loc)?;
            let id = self.symbols.add_output(subsym,param.name,info,loc.clone())?;
            match loc {
                Location::None => {
                    let name = self.symbols.get_name(id).to_string();
                    let size = self.symbols.get_size(id);
                    self.asm.var(&name,size)?;
                },
                Location::Fixed { addr, .. } => {
                    let name = self.symbols.get_name(id).to_string();
                    self.asm.equ(&name,addr);
                },
                Location::Reg(_) => {},
                Location::Offset(_) => {
                    return Err(Box::new(Error::OutputOffset(self.symbols.get_name(id).to_string())));
                }
            }
        }
        Ok(())
    }
    fn declare_subroutine(&mut self, name: &str, sub: &Subroutine, loc: &Option<Numerical>) -> STDRESULT {
        let loc = self.location(loc)?;
        let subsym = self.symbols.declare_subroutine(name.to_string(),loc)?;
        self.declare_parameters(subsym,&sub.input)?;
        self.declare_outputs(subsym,&sub.output)
    }
    fn generate_declaration(&mut self, decl: &Parameter) -> STDRESULT {
        let loc = self.location(&decl.loc)?;
        match &loc {
            Location::Fixed { addr, .. } => {
                let label = text::qualify(self.current_subroutine().as_deref(),decl.name);
                self.asm.equ(&label,addr.clone());
            },
            Location::None | Location::Reg(_) => {},
            Location::Offset(_) => return Err(Box::new(Error::BadLocation(decl.name.to_string())))
        }
        match &decl.typ {
            Type::Subroutine(sub) => {
                if let Some(scope) = self.current_subroutine() {
                    return Err(Box::new(Error::NestedSubroutine(format!("{} in {}",decl.name,scope))));
                }
                self.declare_subroutine(decl.name,sub,&decl.loc)
            },
            Type::Pointer(_) | Type::Array { .. } | Type::Ident(_) => {
                let info = self.typeinfo(&decl.typ)?;
                let loc = self.location(&decl.loc)?;
                let sub = self.symbols.try_lookup_subroutine(self.current_subroutine().as_deref());
                self.symbols.add_constant(sub,decl.name,info,loc)?;
                Ok(())
            }
        }
    }

    // ---- variables (`var`) ----

    fn generate_variable(&mut self, var: &Parameter) -> STDRESULT {
        let info = self.typeinfo(&var.typ)?;
        let loc = self.location(&var.loc)?;
        let sub = self.symbols.try_lookup_subroutine(self.current_subroutine().as_deref());
        let id = self.symbols.add_variable(sub,var.name,info,loc)?;
        if !self.symbols.has_location(id) {
            let size = self.symbols.get_size(id);
            if size == 0 {
                return Err(Box::new(Error::ZeroSizeVariable(var.name.to_string())));
            }
            let name = self.symbols.get_name(id).to_string();
            self.asm.var(&name,size)?;
            return Ok(());
        }
        if let Some(addr) = self.symbols.get_address(id) {
            let name = self.symbols.get_name(id).to_string();
            let addr = addr.to_string();
            self.asm.equ(&name,addr);
        }
        Ok(())
    }

    // ---- definitions (`let`) ----

    fn define_text(&mut self, label: Option<&str>, txt: &str) -> Result<String,DYNERR> {
        let name = label.map(|l| text::qualify(self.current_subroutine().as_deref(),l));
        let id = self.symbols.define_literal_text(name,txt.to_string())?;
        let outname = self.symbols.get_name(id).to_string();
        let stored = self.symbols.get_text(id)?.to_string();
        self.asm.txt(&outname,&stored);
        Ok(outname)
    }
    fn define_type(&mut self, name: &str, typ: &Type) -> STDRESULT {
        match typ {
            Type::Array { base, size } => {
                let length = self.number(size)?;
                self.symbols.alias_array(name.to_string(),base,length)?;
            },
            Type::Pointer(base) => {
                self.symbols.alias_pointer(name.to_string(),base)?;
            },
            Type::Ident(base) => {
                self.symbols.alias_type(name.to_string(),base)?;
            },
            Type::Subroutine(_) => return Err(Box::new(Error::UnexpectedType))
        }
        Ok(())
    }
    /// Groups are offset-addressed records: members may auto-pack or sit at
    /// an explicit offset, but never in a register or at an address.
    fn define_group(&mut self, name: &str, members: &[Parameter]) -> STDRESULT {
        let qual = text::qualify(self.current_subroutine().as_deref(),name);
        let group = self.symbols.declare_group(qual)?;
        for member in members {
            let loc = match self.location(&member.loc)? {
                Location::Reg(reg) => {
                    return Err(Box::new(Error::GroupMemberRegister(
                        format!("{}.{}: {}",name,member.name,reg.name()))));
                },
                Location::Fixed { value: Some(0), .. } => Location::Offset(0),
                Location::Fixed { .. } => {
                    return Err(Box::new(Error::GroupMemberOffset(format!("{}.{}",name,member.name))));
                },
                loc => loc
            };
            let info = self.typeinfo(&member.typ)?;
            self.symbols.add_member(group,member.name,info,loc)?;
        }
        Ok(())
    }
    fn define_subroutine(&mut self, name: &str, sub: &Subroutine) -> STDRESULT {
        self.enter_subroutine(name);
        match self.symbols.try_lookup(name) {
            None => self.declare_subroutine(name,sub,&None)?,
            Some(id) => {
                if self.symbols.has_location(id) {
                    return Err(Box::new(Error::RedefinedLocated(name.to_string())));
                }
                debug!("definition of {} reuses its declaration",name);
            }
        }
        self.asm.label(name);
        self.block(&sub.block)?;
        self.asm.rts();
        self.leave_scope();
        Ok(())
    }
    fn generate_literal_char(&mut self, name: &str, ch: u8) -> STDRESULT {
        let qual = text::qualify(self.current_subroutine().as_deref(),name);
        let id = self.symbols.define_literal_char(qual,ch)?;
        let outname = self.symbols.get_name(id).to_string();
        self.asm.equ(&outname,text::asciich(ch));
        Ok(())
    }
    fn generate_literal_number(&mut self, name: &str, number: i32) -> STDRESULT {
        let qual = text::qualify(self.current_subroutine().as_deref(),name);
        let id = self.symbols.define_literal_number(qual,number as u16)?;
        let outname = self.symbols.get_name(id).to_string();
        if self.symbols.is_callable(id) {
            self.asm.equ(&outname,text::hex_word(number as u16));
            return Ok(());
        }
        match self.symbols.get_size(id) {
            2 => self.asm.equ(&outname,text::hex_num(number as u16)),
            1 => self.asm.equ(&outname,text::hex_byte(number as u8)),
            size => return Err(Box::new(Error::UnexpectedSize(outname,size)))
        }
        Ok(())
    }
    fn generate_definition(&mut self, def: &Argument) -> STDRESULT {
        let name = match def.name {
            Some(name) => name,
            None => return Err(Box::new(Error::UnnamedDefinition))
        };
        match &def.value {
            Value::Number(n) => self.generate_literal_number(name,*n),
            Value::Text(txt) => {
                self.define_text(Some(name),txt)?;
                Ok(())
            },
            Value::Char(c) => self.generate_literal_char(name,*c),
            Value::Sub(sub) => self.define_subroutine(name,sub),
            Value::Group(members) => self.define_group(name,members),
            Value::Type(typ) => self.define_type(name,typ),
            Value::Call(_) => Err(Box::new(Error::UnsupportedDefinition("call"))),
            Value::Ident(_) => Err(Box::new(Error::UnsupportedDefinition("identifier"))),
            Value::Tuple(_) => Err(Box::new(Error::UnsupportedDefinition("tuple")))
        }
    }

    // ---- control ----

    fn generate_stop(&mut self) -> STDRESULT {
        let (_,done) = match self.current_loop() {
            Some(labels) => labels,
            None => return Err(Box::new(Error::StopOutsideLoop))
        };
        self.asm.rem("STOP".to_string());
        self.asm.jmp(done);
        Ok(())
    }
    fn generate_repeat(&mut self) -> STDRESULT {
        let (entry,_) = match self.current_loop() {
            Some(labels) => labels,
            None => return Err(Box::new(Error::RepeatOutsideLoop))
        };
        self.asm.rem("REPEAT".to_string());
        self.asm.jmp(entry);
        Ok(())
    }
    fn statement(&mut self, stmt: &Statement) -> STDRESULT {
        match stmt {
            Statement::Declaration(params) => {
                for param in params {
                    self.generate_declaration(param)?;
                }
                Ok(())
            },
            Statement::Variable(params) => {
                for param in params {
                    self.generate_variable(param)?;
                }
                Ok(())
            },
            Statement::Definition(args) => {
                for arg in args {
                    self.generate_definition(arg)?;
                }
                Ok(())
            },
            Statement::Call(call) => self.generate_call(call),
            Statement::Assign(assign) => self.generate_assignment(assign),
            Statement::If(cond) => self.generate_conditional(cond,false),
            Statement::While(cond) => self.generate_conditional(cond,true),
            Statement::Return => {
                self.asm.rts();
                Ok(())
            },
            Statement::Stop => self.generate_stop(),
            Statement::Repeat => self.generate_repeat(),
            Statement::Assembly { text, .. } => {
                self.asm.asm_block(text);
                Ok(())
            }
        }
    }
    fn block(&mut self, block: &Block) -> STDRESULT {
        for stmt in &block.statements {
            self.statement(stmt)?;
        }
        Ok(())
    }
}
