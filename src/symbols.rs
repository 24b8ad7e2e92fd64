//! # Symbol table
//!
//! A typed, scope-aware dictionary for the whole compilation.  The table
//! models primitive types, named aliases, pointers, arrays, groups (records),
//! subroutines with their input and output sub-groups, variables, constants,
//! literals, and the 6502 registers.  It computes layout (member offsets,
//! sizes, in-memory footprints), enforces placement rules such as pointers
//! living in the zero page, and hands out fresh labels.
//!
//! Symbols live in an arena (`Vec<Symbol>`) and refer to each other by index;
//! the cycles between a subroutine, its parameter groups and their members
//! are plain indices rather than owning pointers.  Names are globally unique;
//! subroutine-local names are qualified as `Sub.local` and keep a view of
//! their unqualified tail for member lookup.

use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;
use log::warn;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::text;
use crate::{DYNERR,STDRESULT};

const RCH: &str = "unreachable was reached";

pub type SymId = usize;

#[derive(Error,Debug)]
pub enum Error {
    #[error("name conflict: {0}")]
    NameConflict(String),
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("{0} is not a type")]
    NotAType(String),
    #[error("{0} is not a subroutine")]
    NotASubroutine(String),
    #[error("{0} does not have {1} parameters")]
    ParameterCount(String,usize),
    #[error("{0}: pointers must be in zero page (<= $FE)")]
    PointerPlacement(String),
    #[error("cannot redefine {0}")]
    Redefinition(String),
    #[error("unknown member {0}.{1}")]
    UnknownMember(String,String),
    #[error("group {0} does not have {1} members")]
    MemberCount(String,usize),
    #[error("{0} is not a number")]
    NotANumber(String),
    #[error("{0} is not a text literal")]
    NotAText(String)
}

/// 6502 registers and register pairs, bit-encoded: the low nibble is the low
/// register, the high nibble the high register, with A=1, X=2, Y=4.
#[derive(Clone,Copy,Debug,PartialEq,Eq,FromPrimitive)]
#[repr(u8)]
pub enum Register {
    A = 0x01,
    X = 0x02,
    Y = 0x04,
    AX = 0x12,
    AY = 0x14,
    XA = 0x21,
    XY = 0x24,
    YA = 0x41,
    YX = 0x42
}

impl Register {
    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::X => "X",
            Self::Y => "Y",
            Self::AX => "AX",
            Self::AY => "AY",
            Self::XA => "XA",
            Self::XY => "XY",
            Self::YA => "YA",
            Self::YX => "YX"
        }
    }
    /// low register of a pair, or the register itself
    pub fn low(&self) -> Register {
        Register::from_u8(*self as u8 & 0x0f).expect(RCH)
    }
    /// high register of a pair, `None` for a single register
    pub fn high(&self) -> Option<Register> {
        Register::from_u8((*self as u8 >> 4) & 0x0f)
    }
    pub fn size(&self) -> u8 {
        match (*self as u8) > (Register::Y as u8) {
            true => 2,
            false => 1
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub enum Location {
    None,
    /// fixed address; `value` is known for numeric locations, absent when the
    /// address is another label
    Fixed { value: Option<u16>, addr: String },
    /// byte offset within a group
    Offset(u8),
    Reg(Register)
}

#[derive(Clone,Debug,PartialEq)]
pub enum Literal {
    None,
    Num(u16),
    Char(u8),
    Text(String)
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum ParamKind {
    No,
    In,
    Out
}

/// resolved type information for a declaration site
#[derive(Clone,Debug)]
pub struct TypeInfo {
    pub name: String,
    pub is_pointer: bool,
    pub is_array: bool,
    pub count: u16
}

impl TypeInfo {
    pub fn plain(name: &str) -> Self {
        Self { name: name.to_string(), is_pointer: false, is_array: false, count: 0 }
    }
    pub fn pointer(name: &str) -> Self {
        Self { name: name.to_string(), is_pointer: true, is_array: false, count: 0 }
    }
    pub fn array(name: &str, count: u16) -> Self {
        Self { name: name.to_string(), is_pointer: false, is_array: true, count }
    }
}

struct Symbol {
    name: String,
    typ: Option<SymId>,
    /// size of type symbols; everything else computes through `typ`
    size: u16,
    loc: Location,
    is_type: bool,
    is_pointer: bool,
    is_array: bool,
    /// array element count or group member count
    count: u16,
    is_group: bool,
    members: Vec<SymId>,
    group: Option<SymId>,
    is_callable: bool,
    params: Option<SymId>,
    outputs: Option<SymId>,
    param_kind: ParamKind,
    subroutine: Option<SymId>,
    /// start of the unqualified tail of `name`, past the qualifying dot
    uq_split: Option<usize>,
    /// byte offset within the owning group
    offset: u16,
    literal: Literal,
    is_variable: bool
}

impl Symbol {
    fn new(name: String) -> Self {
        Self {
            name,
            typ: None,
            size: 0,
            loc: Location::None,
            is_type: false,
            is_pointer: false,
            is_array: false,
            count: 0,
            is_group: false,
            members: Vec::new(),
            group: None,
            is_callable: false,
            params: None,
            outputs: None,
            param_kind: ParamKind::No,
            subroutine: None,
            uq_split: None,
            offset: 0,
            literal: Literal::None,
            is_variable: false
        }
    }
}

pub struct SymbolTable {
    syms: Vec<Symbol>,
    index: HashMap<String,SymId>,
    labels: usize,
    byte_t: SymId,
    char_t: SymId,
    word_t: SymId
}

impl SymbolTable {
    /// table with the built-in types `byte`, `char`, `word`, the aliases
    /// `int`, `addr`, `text`, and the register symbols
    pub fn new() -> Self {
        let mut table = Self {
            syms: Vec::new(),
            index: HashMap::new(),
            labels: 0,
            byte_t: 0,
            char_t: 0,
            word_t: 0
        };
        table.byte_t = table.add_type("byte",1);
        table.char_t = table.add_type("char",1);
        table.word_t = table.add_type("word",2);
        table.alias_type("int".to_string(),"byte").expect(RCH);
        table.alias_type("addr".to_string(),"word").expect(RCH);
        table.alias_pointer("text".to_string(),"char").expect(RCH);
        for reg in [Register::A,Register::X,Register::Y,Register::AX,Register::AY,
                    Register::XA,Register::XY,Register::YA,Register::YX] {
            table.add_register(reg);
        }
        table
    }
    fn add(&mut self, name: String) -> Result<SymId,DYNERR> {
        if self.index.contains_key(&name) {
            return Err(Box::new(Error::NameConflict(name)));
        }
        let id = self.syms.len();
        self.index.insert(name.clone(),id);
        self.syms.push(Symbol::new(name));
        Ok(id)
    }
    fn add_type(&mut self, name: &str, size: u16) -> SymId {
        let id = self.add(name.to_string()).expect(RCH);
        self.syms[id].size = size;
        self.syms[id].is_type = true;
        id
    }
    fn add_register(&mut self, reg: Register) -> SymId {
        let id = self.add(reg.name().to_string()).expect(RCH);
        self.syms[id].loc = Location::Reg(reg);
        self.syms[id].typ = Some(match reg.high() {
            Some(_) => self.word_t,
            None => self.byte_t
        });
        id
    }
    fn check_zero_page(&self, id: SymId) -> STDRESULT {
        match &self.syms[id].loc {
            Location::Fixed { value: Some(v), .. } if *v >= 0xFF => {
                Err(Box::new(Error::PointerPlacement(self.syms[id].name.clone())))
            },
            Location::Fixed { .. } => Ok(()),
            _ => Err(Box::new(Error::PointerPlacement(self.syms[id].name.clone())))
        }
    }
    /// Shared routine behind parameters, outputs and group members: appends
    /// to the group's member list, assigns the offset, grows the group.
    fn make_member(&mut self, owner: SymId, name: &str, info: TypeInfo, loc: Location, kind: ParamKind) -> Result<SymId,DYNERR> {
        let prefix = self.syms[owner].name.clone();
        let typ = self.lookup_type(&info.name)?;
        let id = self.add(format!("{}.{}",prefix,name))?;
        let gid = match kind {
            ParamKind::No => owner,
            ParamKind::In => self.syms[owner].params.expect(RCH),
            ParamKind::Out => self.syms[owner].outputs.expect(RCH)
        };
        {
            let sym = &mut self.syms[id];
            sym.uq_split = Some(prefix.len()+1);
            sym.typ = Some(typ);
            sym.is_pointer = info.is_pointer;
            sym.is_array = info.is_array;
            sym.count = info.count;
            sym.is_variable = true;
            sym.param_kind = kind;
            sym.loc = loc;
            match kind {
                ParamKind::No => sym.group = Some(owner),
                _ => {
                    sym.subroutine = Some(owner);
                    sym.group = Some(gid);
                }
            }
        }
        if self.syms[id].is_pointer {
            self.check_zero_page(id)?;
        }
        let (explicit, off) = match self.syms[id].loc {
            Location::Offset(o) => (true, o as u16),
            _ => (false, self.syms[gid].size)
        };
        self.syms[id].offset = off;
        let msize = self.memsize(id);
        if explicit {
            let end = off + msize;
            if self.syms[gid].size < end {
                self.syms[gid].size = end;
            }
        } else {
            self.syms[gid].size += msize;
        }
        self.syms[gid].members.push(id);
        self.syms[gid].count += 1;
        Ok(id)
    }
    pub fn declare_group(&mut self, name: String) -> Result<SymId,DYNERR> {
        let id = self.add(name)?;
        self.syms[id].is_type = true;
        self.syms[id].is_group = true;
        Ok(id)
    }
    /// Creates the callable symbol along with its `Sub.<-` and `Sub.->`
    /// sub-groups for inputs and outputs.
    pub fn declare_subroutine(&mut self, name: String, loc: Location) -> Result<SymId,DYNERR> {
        let id = self.add(name.clone())?;
        self.syms[id].loc = loc;
        self.syms[id].is_callable = true;
        let params = self.declare_group(format!("{}.<-",name))?;
        let outputs = self.declare_group(format!("{}.->",name))?;
        self.syms[id].params = Some(params);
        self.syms[id].outputs = Some(outputs);
        Ok(id)
    }
    pub fn add_parameter(&mut self, sub: SymId, name: &str, info: TypeInfo, loc: Location) -> Result<SymId,DYNERR> {
        self.make_member(sub,name,info,loc,ParamKind::In)
    }
    pub fn add_output(&mut self, sub: SymId, name: &str, info: TypeInfo, loc: Location) -> Result<SymId,DYNERR> {
        self.make_member(sub,name,info,loc,ParamKind::Out)
    }
    pub fn add_member(&mut self, group: SymId, name: &str, info: TypeInfo, loc: Location) -> Result<SymId,DYNERR> {
        self.make_member(group,name,info,loc,ParamKind::No)
    }
    pub fn add_constant(&mut self, sub: Option<SymId>, name: &str, info: TypeInfo, loc: Location) -> Result<SymId,DYNERR> {
        let typ = self.lookup_type(&info.name)?;
        let id = match sub {
            Some(subid) => {
                let prefix = self.syms[subid].name.clone();
                let id = self.add(format!("{}.{}",prefix,name))?;
                self.syms[id].subroutine = Some(subid);
                self.syms[id].uq_split = Some(prefix.len()+1);
                id
            },
            None => self.add(name.to_string())?
        };
        let is_group = self.syms[typ].is_group;
        {
            let sym = &mut self.syms[id];
            sym.loc = loc;
            sym.typ = Some(typ);
            sym.is_pointer = info.is_pointer;
            sym.is_array = info.is_array;
            sym.count = info.count;
            sym.is_group = is_group;
        }
        if self.syms[id].is_pointer {
            self.check_zero_page(id)?;
        }
        Ok(id)
    }
    pub fn add_variable(&mut self, sub: Option<SymId>, name: &str, info: TypeInfo, loc: Location) -> Result<SymId,DYNERR> {
        let id = self.add_constant(sub,name,info,loc)?;
        self.syms[id].is_variable = true;
        Ok(id)
    }
    pub fn alias_type(&mut self, alias: String, base: &str) -> Result<SymId,DYNERR> {
        let typ = self.lookup_type(base)?;
        let id = self.add(alias)?;
        self.syms[id].is_type = true;
        self.syms[id].typ = Some(typ);
        self.syms[id].size = self.get_size(typ);
        Ok(id)
    }
    pub fn alias_pointer(&mut self, alias: String, base: &str) -> Result<SymId,DYNERR> {
        let id = self.alias_type(alias,base)?;
        self.syms[id].is_pointer = true;
        self.syms[id].size = 2;
        Ok(id)
    }
    pub fn alias_array(&mut self, alias: String, base: &str, length: u16) -> Result<SymId,DYNERR> {
        let id = self.alias_type(alias,base)?;
        self.syms[id].is_array = true;
        self.syms[id].count = length;
        Ok(id)
    }
    /// Define `name` as a character.  An existing symbol must be an un-valued
    /// placeholder; anything else is a redefinition.
    pub fn define_literal_char(&mut self, name: String, ch: u8) -> Result<SymId,DYNERR> {
        let id = match self.try_lookup(&name) {
            Some(id) => {
                if self.syms[id].literal != Literal::None {
                    return Err(Box::new(Error::Redefinition(name)));
                }
                id
            },
            None => self.add(name)?
        };
        let char_t = self.char_t;
        self.syms[id].literal = Literal::Char(ch);
        self.syms[id].typ = Some(char_t);
        Ok(id)
    }
    /// Define `name` as a number.  A callable placeholder takes the number as
    /// its fixed address; a placeholder with a declared byte type truncates
    /// values over $FF with a warning.
    pub fn define_literal_number(&mut self, name: String, value: u16) -> Result<SymId,DYNERR> {
        let mut value = value;
        let id = match self.try_lookup(&name) {
            Some(id) => {
                if self.syms[id].literal != Literal::None {
                    return Err(Box::new(Error::Redefinition(name)));
                }
                if value > 0xFF {
                    if let Some(typ) = self.syms[id].typ {
                        if self.get_size(typ) == 1 {
                            warn!("literal {} will be truncated to its declared size: {}",name,self.syms[typ].name);
                            value &= 0xFF;
                        }
                    }
                }
                if self.syms[id].is_callable {
                    self.syms[id].loc = Location::Fixed { value: Some(value), addr: text::hex_word(value) };
                    return Ok(id);
                }
                id
            },
            None => self.add(name)?
        };
        let typ = match value > 0xFF {
            true => self.word_t,
            false => self.byte_t
        };
        self.syms[id].literal = Literal::Num(value);
        self.syms[id].typ = Some(typ);
        self.syms[id].loc = Location::Fixed { value: Some(value), addr: text::hex_num(value) };
        Ok(id)
    }
    /// Define a text literal; an anonymous one gets a fresh label for a name.
    pub fn define_literal_text(&mut self, name: Option<String>, txt: String) -> Result<SymId,DYNERR> {
        let id = match name {
            Some(n) => match self.try_lookup(&n) {
                Some(id) => {
                    if self.syms[id].literal != Literal::None {
                        return Err(Box::new(Error::Redefinition(n)));
                    }
                    id
                },
                None => self.add(n)?
            },
            None => {
                let label = self.make_label();
                self.add(label)?
            }
        };
        let char_t = self.char_t;
        let count = txt.len() as u16 + 1;
        self.syms[id].typ = Some(char_t);
        self.syms[id].literal = Literal::Text(txt);
        self.syms[id].is_array = true;
        self.syms[id].count = count;
        Ok(id)
    }
    pub fn try_lookup(&self, name: &str) -> Option<SymId> {
        self.index.get(name).copied()
    }
    pub fn lookup(&self, name: &str) -> Result<SymId,DYNERR> {
        self.try_lookup(name).ok_or_else(|| Box::new(Error::UnknownSymbol(name.to_string())) as DYNERR)
    }
    /// `Sub.name` when a subroutine scope is given and defines it, the bare
    /// name otherwise
    pub fn lookup_scoped(&self, scope: Option<&str>, name: &str) -> Result<SymId,DYNERR> {
        if let Some(scope) = scope {
            if let Some(id) = self.try_lookup(&text::qualify(Some(scope),name)) {
                return Ok(id);
            }
        }
        self.lookup(name)
    }
    pub fn lookup_type(&self, name: &str) -> Result<SymId,DYNERR> {
        let id = self.lookup(name)?;
        match self.syms[id].is_type {
            true => Ok(id),
            false => Err(Box::new(Error::NotAType(name.to_string())))
        }
    }
    /// arity 0 skips the parameter-count check
    pub fn lookup_subroutine(&self, name: &str, num_params: usize) -> Result<SymId,DYNERR> {
        let id = self.lookup(name)?;
        if !self.syms[id].is_callable {
            return Err(Box::new(Error::NotASubroutine(name.to_string())));
        }
        if num_params != 0 {
            let count = self.syms[self.syms[id].params.expect(RCH)].count as usize;
            if num_params != count {
                return Err(Box::new(Error::ParameterCount(name.to_string(),num_params)));
            }
        }
        Ok(id)
    }
    pub fn try_lookup_subroutine(&self, name: Option<&str>) -> Option<SymId> {
        let id = self.try_lookup(name?)?;
        match self.syms[id].is_callable {
            true => Some(id),
            false => None
        }
    }
    pub fn lookup_register(&self, name: &str) -> Result<Option<Register>,DYNERR> {
        let id = self.lookup(name)?;
        Ok(self.get_register(id))
    }
    fn uqname(&self, id: SymId) -> Option<&str> {
        self.syms[id].uq_split.map(|split| &self.syms[id].name[split..])
    }
    fn member_search(&self, gid: SymId, name: Option<&str>, number: usize) -> Result<SymId,DYNERR> {
        let group = &self.syms[gid];
        match name {
            Some(n) if n.len() > 0 => {
                for member in &group.members {
                    if self.uqname(*member) == Some(n) {
                        return Ok(*member);
                    }
                }
                Err(Box::new(Error::UnknownMember(group.name.clone(),n.to_string())))
            },
            _ => group.members.get(number).copied()
                .ok_or_else(|| Box::new(Error::MemberCount(group.name.clone(),number+1)) as DYNERR)
        }
    }
    /// member of a group-typed symbol, by name when given, else by position
    pub fn get_member(&self, id: SymId, name: Option<&str>, number: usize) -> Result<SymId,DYNERR> {
        let gid = match self.syms[id].is_type {
            true => id,
            false => self.syms[id].typ.ok_or_else(|| {
                Box::new(Error::UnknownMember(self.syms[id].name.clone(),name.unwrap_or("").to_string())) as DYNERR
            })?
        };
        self.member_search(gid,name,number)
    }
    pub fn get_parameter(&self, sub: SymId, name: Option<&str>, number: usize) -> Result<SymId,DYNERR> {
        let gid = self.syms[sub].params
            .ok_or_else(|| Box::new(Error::NotASubroutine(self.syms[sub].name.clone())) as DYNERR)?;
        self.member_search(gid,name,number)
    }
    pub fn get_output(&self, sub: SymId, name: Option<&str>, number: usize) -> Result<SymId,DYNERR> {
        let gid = self.syms[sub].outputs
            .ok_or_else(|| Box::new(Error::NotASubroutine(self.syms[sub].name.clone())) as DYNERR)?;
        self.member_search(gid,name,number)
    }
    pub fn is_callable(&self, id: SymId) -> bool {
        self.syms[id].is_callable
    }
    pub fn is_group(&self, id: SymId) -> bool {
        self.syms[id].is_group
    }
    pub fn is_array(&self, id: SymId) -> bool {
        let mut cur = Some(id);
        while let Some(i) = cur {
            if self.syms[i].is_array {
                return true;
            }
            cur = self.syms[i].typ;
        }
        false
    }
    pub fn is_literal(&self, id: SymId) -> bool {
        self.syms[id].literal != Literal::None
    }
    pub fn is_variable(&self, id: SymId) -> bool {
        self.syms[id].is_variable
    }
    pub fn is_char(&self, id: SymId) -> bool {
        let mut cur = Some(id);
        while let Some(i) = cur {
            if i == self.char_t {
                return true;
            }
            cur = self.syms[i].typ;
        }
        false
    }
    pub fn is_word(&self, id: SymId) -> bool {
        let mut cur = Some(id);
        while let Some(i) = cur {
            if i == self.word_t {
                return true;
            }
            cur = self.syms[i].typ;
        }
        false
    }
    /// chases the type chain, so variables of pointer-alias types count
    pub fn is_pointer(&self, id: SymId) -> bool {
        let mut cur = Some(id);
        while let Some(i) = cur {
            if self.syms[i].is_pointer {
                return true;
            }
            cur = self.syms[i].typ;
        }
        false
    }
    pub fn get_name(&self, id: SymId) -> &str {
        &self.syms[id].name
    }
    pub fn get_address(&self, id: SymId) -> Option<&str> {
        match &self.syms[id].loc {
            Location::Fixed { addr, .. } => Some(addr),
            _ => None
        }
    }
    pub fn get_item_count(&self, id: SymId) -> Option<u16> {
        let sym = &self.syms[id];
        match sym.is_array || sym.is_group {
            true => Some(sym.count),
            false => None
        }
    }
    pub fn get_number(&self, id: SymId) -> Result<u16,DYNERR> {
        match self.syms[id].literal {
            Literal::Num(n) => Ok(n),
            _ => Err(Box::new(Error::NotANumber(self.syms[id].name.clone())))
        }
    }
    pub fn get_text(&self, id: SymId) -> Result<&str,DYNERR> {
        match &self.syms[id].literal {
            Literal::Text(t) => Ok(t),
            _ => Err(Box::new(Error::NotAText(self.syms[id].name.clone())))
        }
    }
    pub fn get_offset(&self, id: SymId) -> u16 {
        self.syms[id].offset
    }
    /// the group a member belongs to; for parameters and outputs this is the
    /// subroutine's `<-` or `->` sub-group
    pub fn get_group(&self, id: SymId) -> Option<SymId> {
        self.syms[id].group
    }
    /// the owning subroutine of a parameter, output or subroutine-local
    pub fn get_subroutine(&self, id: SymId) -> Option<SymId> {
        self.syms[id].subroutine
    }
    pub fn get_register(&self, id: SymId) -> Option<Register> {
        match self.syms[id].loc {
            Location::Reg(reg) => Some(reg),
            _ => None
        }
    }
    pub fn has_location(&self, id: SymId) -> bool {
        self.syms[id].loc != Location::None
    }
    /// declared size: arrays multiply their element size, pointers are
    /// always two bytes, everything else chases its type
    pub fn get_size(&self, id: SymId) -> u16 {
        let sym = &self.syms[id];
        if sym.is_pointer {
            return 2;
        }
        let base = match (sym.is_type, sym.typ) {
            (true,_) => sym.size,
            (false,Some(typ)) => self.get_size(typ),
            (false,None) => 0
        };
        match sym.is_array {
            true => base.saturating_mul(sym.count),
            false => base
        }
    }
    /// element size of an array or pointed-to size of a pointer, chasing
    /// through aliases
    pub fn get_base_size(&self, id: SymId) -> u16 {
        let mut cur = Some(id);
        while let Some(i) = cur {
            let sym = &self.syms[i];
            if sym.is_array || sym.is_pointer {
                return match sym.typ {
                    Some(typ) => self.get_size(typ),
                    None => 1
                };
            }
            cur = sym.typ;
        }
        warn!("{} is not an array or pointer; assuming byte elements",self.syms[id].name);
        1
    }
    /// in-memory footprint: register-resident symbols take no storage
    pub fn memsize(&self, id: SymId) -> u16 {
        match self.syms[id].loc {
            Location::Reg(_) => 0,
            _ => self.get_size(id)
        }
    }
    /// fresh globally unique label `A2_<n>`
    pub fn make_label(&mut self) -> String {
        let label = format!("A2_{}",self.labels);
        self.labels += 1;
        label
    }
    /// fresh label qualified by the enclosing scope
    pub fn make_local_label(&mut self, scope: Option<&str>) -> String {
        let label = self.make_label();
        text::qualify(scope,&label)
    }
    /// Fixed-width table dump for the `-sym` flag.
    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let mut maxname = "Name".len();
        let mut maxtype = "Type".len();
        for sym in &self.syms {
            if maxname < sym.name.len() {
                maxname = sym.name.len();
            }
            if sym.is_type && maxtype < sym.name.len() {
                maxtype = sym.name.len();
            }
        }
        maxtype += ":^255".len();
        let maxloc = "$0000".len();
        let sizes = "Size/Mem +Off";
        writeln!(w,"SYMBOL TABLE")?;
        writeln!(w," {:<w1$}  {:<w2$}  {:<w3$}  {}  {}  {}","Name","Type","Loc","()<=>",sizes,"Value",
            w1=maxname,w2=maxtype,w3=maxloc)?;
        for sym in &self.syms {
            write!(w," {:<w$}  ",sym.name,w=maxname)?;
            let mut typetxt = String::new();
            typetxt.push(match sym.is_type { true => ':', false => ' ' });
            match (sym.is_type && sym.is_group, sym.typ) {
                (true,_) => typetxt += "[]",
                (false,Some(typ)) => typetxt += &self.syms[typ].name,
                (false,None) => {}
            }
            typetxt.push(match sym.is_pointer || sym.is_array { true => '^', false => ' ' });
            if sym.is_array {
                typetxt += &format!("{:<3}",sym.count);
            }
            write!(w,"{:<w$}  ",typetxt,w=maxtype)?;
            match &sym.loc {
                Location::None => write!(w,"{:<w$}  ","",w=maxloc)?,
                Location::Reg(reg) => write!(w,"@{} {:<w$}",reg.name(),"",w=maxloc-reg.name().len())?,
                Location::Fixed { addr, .. } => write!(w,"{:<w$}  ",addr,w=maxloc)?,
                Location::Offset(off) => write!(w,"+${:02X}   ",off)?
            }
            write!(w,"{}",match sym.is_callable { true => "()", false => "  " })?;
            write!(w,"{}",match sym.param_kind {
                ParamKind::In => "<- ",
                ParamKind::Out => " ->",
                ParamKind::No => "   "
            })?;
            write!(w," ")?;
            if !sym.is_callable {
                let id = self.index[&sym.name];
                let size = self.get_size(id);
                let msize = self.memsize(id);
                write!(w,"  {:>3}",size)?;
                match size != msize {
                    true => write!(w,"/{:<3} ",msize)?,
                    false => write!(w,"     ")?
                }
                match sym.uq_split {
                    Some(_) => write!(w,"+{:<3}",sym.offset)?,
                    None => write!(w,"    ")?
                }
            } else {
                write!(w,"{:<13}","")?;
            }
            write!(w,"  ")?;
            match &sym.literal {
                Literal::Char(c) => write!(w,"'{}'",*c as char)?,
                Literal::Num(n) => {
                    write!(w,"${:X}",n)?;
                    if *n <= 0xFF {
                        write!(w," ({})",n)?;
                    }
                },
                Literal::Text(t) => write!(w,"\"{}\"",t)?,
                Literal::None => {}
            }
            if sym.is_variable {
                write!(w,"var")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_codes() {
        assert_eq!(Register::AX.low(),Register::X);
        assert_eq!(Register::AX.high(),Some(Register::A));
        assert_eq!(Register::AX.size(),2);
        assert_eq!(Register::YX.low(),Register::X);
        assert_eq!(Register::YX.high(),Some(Register::Y));
        assert_eq!(Register::Y.low(),Register::Y);
        assert_eq!(Register::Y.high(),None);
        assert_eq!(Register::Y.size(),1);
        assert_eq!(Register::XA.name(),"XA");
    }

    #[test]
    fn builtins_are_present() {
        let table = SymbolTable::new();
        for name in ["byte","char","word","int","addr","text","A","X","Y","AX","AY","XA","XY","YA","YX"] {
            assert!(table.try_lookup(name).is_some(),"missing builtin {}",name);
        }
        let text_t = table.lookup("text").expect("lookup failed");
        assert_eq!(table.get_size(text_t),2);
        assert!(table.is_pointer(text_t));
        assert!(table.is_char(text_t));
    }

    #[test]
    fn names_are_unique() {
        let mut table = SymbolTable::new();
        table.add_variable(None,"count",TypeInfo::plain("byte"),Location::None).expect("add failed");
        assert!(table.add_variable(None,"count",TypeInfo::plain("byte"),Location::None).is_err());
        // registers are symbols too
        assert!(table.add_variable(None,"A",TypeInfo::plain("byte"),Location::None).is_err());
    }

    #[test]
    fn group_layout_packs_members() {
        let mut table = SymbolTable::new();
        let group = table.declare_group("Point".to_string()).expect("declare failed");
        table.add_member(group,"x",TypeInfo::plain("byte"),Location::None).expect("x");
        table.add_member(group,"y",TypeInfo::plain("word"),Location::None).expect("y");
        let z = table.add_member(group,"z",TypeInfo::plain("byte"),Location::None).expect("z");
        assert_eq!(table.get_offset(table.get_member(group,Some("x"),0).expect("m")),0);
        assert_eq!(table.get_offset(table.get_member(group,Some("y"),0).expect("m")),1);
        assert_eq!(table.get_offset(z),3);
        assert_eq!(table.get_size(group),4);
        assert_eq!(table.get_item_count(group),Some(3));
    }

    #[test]
    fn group_layout_honors_explicit_offsets() {
        let mut table = SymbolTable::new();
        let group = table.declare_group("Regs".to_string()).expect("declare failed");
        table.add_member(group,"a",TypeInfo::plain("byte"),Location::Offset(4)).expect("a");
        assert_eq!(table.get_size(group),5);
        let b = table.add_member(group,"b",TypeInfo::plain("byte"),Location::None).expect("b");
        assert_eq!(table.get_offset(b),5);
        assert_eq!(table.get_size(group),6);
    }

    #[test]
    fn pointers_live_in_zero_page() {
        let mut table = SymbolTable::new();
        let loc = Location::Fixed { value: Some(0x30), addr: "$0030".to_string() };
        assert!(table.add_variable(None,"ok",TypeInfo::pointer("char"),loc).is_ok());
        let high = Location::Fixed { value: Some(0x300), addr: "$0300".to_string() };
        assert!(table.add_variable(None,"bad",TypeInfo::pointer("char"),high).is_err());
        assert!(table.add_variable(None,"floating",TypeInfo::pointer("char"),Location::None).is_err());
    }

    #[test]
    fn register_parameters_take_no_storage() {
        let mut table = SymbolTable::new();
        let sub = table.declare_subroutine("shift".to_string(),Location::None).expect("declare failed");
        let n = table.add_parameter(sub,"n",TypeInfo::plain("byte"),Location::Reg(Register::A)).expect("n");
        let m = table.add_parameter(sub,"m",TypeInfo::plain("byte"),Location::None).expect("m");
        assert_eq!(table.memsize(n),0);
        assert_eq!(table.get_size(n),1);
        assert_eq!(table.get_offset(m),0);
        let params = table.lookup("shift.<-").expect("params group");
        assert_eq!(table.get_size(params),1);
        assert_eq!(table.get_subroutine(n),Some(sub));
        assert_eq!(table.get_group(n),Some(params));
    }

    #[test]
    fn literal_rules() {
        let mut table = SymbolTable::new();
        let num = table.define_literal_number("five".to_string(),5).expect("num");
        assert_eq!(table.get_number(num).expect("number"),5);
        assert!(table.define_literal_number("five".to_string(),6).is_err());
        let sub = table.declare_subroutine("COUT".to_string(),Location::None).expect("sub");
        table.define_literal_number("COUT".to_string(),0xFDED).expect("addr");
        assert_eq!(table.get_address(sub),Some("$FDED"));
        assert!(!table.is_literal(sub));
        let wide = table.define_literal_number("wide".to_string(),0x1234).expect("wide");
        assert_eq!(table.get_size(wide),2);
    }

    #[test]
    fn scoped_lookup_prefers_local() {
        let mut table = SymbolTable::new();
        let sub = table.declare_subroutine("Print".to_string(),Location::None).expect("sub");
        table.add_variable(None,"len",TypeInfo::plain("byte"),Location::None).expect("global");
        table.add_variable(Some(sub),"len",TypeInfo::plain("byte"),Location::None).expect("local");
        let local = table.lookup_scoped(Some("Print"),"len").expect("scoped");
        assert_eq!(table.get_name(local),"Print.len");
        let global = table.lookup_scoped(None,"len").expect("bare");
        assert_eq!(table.get_name(global),"len");
    }

    #[test]
    fn labels_are_unique() {
        let mut table = SymbolTable::new();
        assert_eq!(table.make_label(),"A2_0");
        assert_eq!(table.make_label(),"A2_1");
        assert_eq!(table.make_local_label(Some("main")),"main.A2_2");
    }

    #[test]
    fn text_literals_are_char_arrays() {
        let mut table = SymbolTable::new();
        let id = table.define_literal_text(Some("greet".to_string()),"Hi".to_string()).expect("text");
        assert_eq!(table.get_text(id).expect("text"),"Hi");
        assert_eq!(table.get_size(id),3);
        assert!(table.is_array(id));
        let anon = table.define_literal_text(None,"ok".to_string()).expect("anon");
        assert!(table.get_name(anon).starts_with("A2_"));
    }

    #[test]
    fn base_sizes_chase_aliases() {
        let mut table = SymbolTable::new();
        let msg = table.add_variable(None,"msg",TypeInfo::plain("text"),
            Location::Fixed { value: Some(0x30), addr: "$0030".to_string() }).expect("msg");
        assert_eq!(table.get_base_size(msg),1);
        let buf = table.add_variable(None,"buf",TypeInfo::array("word",4),Location::None).expect("buf");
        assert_eq!(table.get_base_size(buf),2);
        assert_eq!(table.get_size(buf),8);
        assert!(table.is_array(buf));
    }
}
