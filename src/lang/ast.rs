//! # Abstract syntax tree
//!
//! The AST borrows string views straight out of the source buffer; owned
//! copies are taken at the symbol-table boundary.  All node kinds are closed
//! enums so the generator's matches stay exhaustive.
//!
//! `write_ast` renders the indented tree dump behind the `-ast` flag.

use std::io::Write;
use super::line_of;

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum Numerical<'a> {
    Number(i32),
    Ident(&'a str)
}

#[derive(Clone,Debug)]
pub struct IdentPhrase<'a> {
    pub identifier: &'a str,
    pub subscript: Option<Numerical<'a>>,
    pub field: Option<&'a str>,
    /// byte offset of the identifier in the source
    pub pos: usize
}

#[derive(Clone,Debug)]
pub enum Type<'a> {
    Subroutine(Subroutine<'a>),
    Array { base: &'a str, size: Numerical<'a> },
    Pointer(&'a str),
    Ident(&'a str)
}

#[derive(Clone,Debug)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub typ: Type<'a>,
    pub loc: Option<Numerical<'a>>,
    pub pos: usize
}

#[derive(Clone,Debug)]
pub struct Subroutine<'a> {
    pub input: Vec<Parameter<'a>>,
    pub output: Vec<Parameter<'a>>,
    pub block: Block<'a>
}

#[derive(Clone,Debug)]
pub struct Argument<'a> {
    pub name: Option<&'a str>,
    pub value: Value<'a>,
    pub pos: usize
}

#[derive(Clone,Debug)]
pub struct Call<'a> {
    pub ident: IdentPhrase<'a>,
    pub args: Vec<Argument<'a>>
}

#[derive(Clone,Debug)]
pub enum Value<'a> {
    Number(i32),
    Text(&'a str),
    Char(u8),
    Sub(Subroutine<'a>),
    Call(Call<'a>),
    Ident(IdentPhrase<'a>),
    Tuple(Vec<Argument<'a>>),
    Group(Vec<Parameter<'a>>),
    Type(Type<'a>)
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum AssignKind {
    Set,
    Add,
    Subtract,
    And,
    Or,
    Xor,
    Not
}

impl AssignKind {
    /// the operator character ahead of the `=` in source
    pub fn symbol(&self) -> char {
        match self {
            Self::Set => ':',
            Self::Add => '+',
            Self::Subtract => '-',
            Self::And => '&',
            Self::Or => '|',
            Self::Xor => '^',
            Self::Not => '!'
        }
    }
}

#[derive(Clone,Debug)]
pub struct Assignment<'a> {
    pub ident: IdentPhrase<'a>,
    pub kind: AssignKind,
    pub value: Value<'a>
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum Compare {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Always
}

impl Compare {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Always => "(always)"
        }
    }
}

#[derive(Clone,Debug)]
pub struct Conditional<'a> {
    pub left: Value<'a>,
    pub compare: Compare,
    pub right: Value<'a>,
    pub then: Block<'a>,
    pub pos: usize
}

#[derive(Clone,Debug)]
pub enum Statement<'a> {
    Declaration(Vec<Parameter<'a>>),
    Variable(Vec<Parameter<'a>>),
    Definition(Vec<Argument<'a>>),
    Call(Call<'a>),
    Assign(Assignment<'a>),
    If(Conditional<'a>),
    While(Conditional<'a>),
    Return,
    Stop,
    Repeat,
    Assembly { text: &'a str, pos: usize }
}

#[derive(Clone,Debug)]
pub struct Block<'a> {
    pub statements: Vec<Statement<'a>>
}

#[derive(Clone,Debug)]
pub struct Program<'a> {
    pub block: Block<'a>
}

fn pad(w: &mut dyn Write, indent: usize) -> std::io::Result<()> {
    write!(w,"{}","    ".repeat(indent))
}

fn write_string(w: &mut dyn Write, s: &str, prefix: &str, indent: usize) -> std::io::Result<()> {
    pad(w,indent)?;
    writeln!(w,"{} {}",prefix,s)
}

fn write_numerical(w: &mut dyn Write, num: &Numerical, prefix: &str, indent: usize) -> std::io::Result<()> {
    match num {
        Numerical::Ident(s) => write_string(w,s,prefix,indent),
        Numerical::Number(n) => {
            pad(w,indent)?;
            writeln!(w,"{} {}",prefix,n)
        }
    }
}

fn write_type(w: &mut dyn Write, src: &str, typ: &Type, indent: usize) -> std::io::Result<()> {
    match typ {
        Type::Array { base, size } => {
            pad(w,indent)?;
            writeln!(w,"Array")?;
            write_string(w,base,"Type",indent+1)?;
            write_numerical(w,size,"Size",indent+1)
        },
        Type::Pointer(base) => {
            pad(w,indent)?;
            writeln!(w,"Pointer")?;
            write_string(w,base,"Type",indent+1)
        },
        Type::Subroutine(sub) => write_subroutine(w,src,sub,indent),
        Type::Ident(name) => write_string(w,name,"Type",indent)
    }
}

fn write_ident_phrase(w: &mut dyn Write, id: &IdentPhrase, indent: usize) -> std::io::Result<()> {
    if id.subscript.is_none() && id.field.is_none() {
        return write_string(w,id.identifier,"Identifier",indent);
    }
    pad(w,indent)?;
    writeln!(w,"IdentPhrase")?;
    write_string(w,id.identifier,"Identifier",indent+1)?;
    if let Some(sub) = &id.subscript {
        write_numerical(w,sub,"Index",indent+1)?;
    }
    if let Some(field) = id.field {
        write_string(w,field,"Field",indent+1)?;
    }
    Ok(())
}

fn write_value(w: &mut dyn Write, src: &str, value: &Value, indent: usize) -> std::io::Result<()> {
    match value {
        Value::Ident(id) => write_ident_phrase(w,id,indent),
        Value::Number(n) => {
            pad(w,indent)?;
            writeln!(w,"Number {}",n)
        },
        Value::Text(t) => write_string(w,t,"Text",indent),
        Value::Char(c) => {
            pad(w,indent)?;
            writeln!(w,"Char {}",*c as char)
        },
        Value::Sub(sub) => write_subroutine(w,src,sub,indent),
        Value::Call(call) => write_call(w,src,call,indent),
        Value::Tuple(args) => {
            pad(w,indent)?;
            writeln!(w,"Tuple")?;
            write_arguments(w,src,args,"Item",indent+1)
        },
        Value::Group(members) => {
            pad(w,indent)?;
            writeln!(w,"Group")?;
            write_parameters(w,src,members,"Item",indent+1)
        },
        Value::Type(typ) => write_type(w,src,typ,indent)
    }
}

fn write_arguments(w: &mut dyn Write, src: &str, args: &[Argument], prefix: &str, indent: usize) -> std::io::Result<()> {
    for arg in args {
        pad(w,indent)?;
        writeln!(w,"{} line={}",prefix,line_of(src,arg.pos))?;
        match arg.name {
            Some(name) => write_string(w,name,"Name",indent+1)?,
            None => {
                pad(w,indent+1)?;
                writeln!(w,"Name (none)")?;
            }
        }
        write_value(w,src,&arg.value,indent+1)?;
    }
    Ok(())
}

fn write_parameters(w: &mut dyn Write, src: &str, params: &[Parameter], prefix: &str, indent: usize) -> std::io::Result<()> {
    for param in params {
        pad(w,indent)?;
        writeln!(w,"{} line={}",prefix,line_of(src,param.pos))?;
        write_string(w,param.name,"Name",indent+1)?;
        write_type(w,src,&param.typ,indent+1)?;
        if let Some(loc) = &param.loc {
            write_numerical(w,loc,"Location",indent+1)?;
        }
    }
    Ok(())
}

fn write_conditional(w: &mut dyn Write, src: &str, cond: &Conditional, kind: &str, indent: usize) -> std::io::Result<()> {
    pad(w,indent)?;
    writeln!(w,"{} line={}",kind,line_of(src,cond.pos))?;
    pad(w,indent+1)?;
    writeln!(w,"{}",cond.compare.symbol())?;
    write_value(w,src,&cond.left,indent+2)?;
    write_value(w,src,&cond.right,indent+2)?;
    pad(w,indent+1)?;
    writeln!(w,"Then")?;
    write_block(w,src,&cond.then,indent+2)
}

fn write_call(w: &mut dyn Write, src: &str, call: &Call, indent: usize) -> std::io::Result<()> {
    pad(w,indent)?;
    writeln!(w,"Call")?;
    write_ident_phrase(w,&call.ident,indent+1)?;
    if call.args.len() > 0 {
        write_arguments(w,src,&call.args,"Arg",indent+1)
    } else {
        pad(w,indent+1)?;
        writeln!(w,"Args (none)")
    }
}

fn write_subroutine(w: &mut dyn Write, src: &str, sub: &Subroutine, indent: usize) -> std::io::Result<()> {
    pad(w,indent)?;
    writeln!(w,"Subroutine")?;
    write_parameters(w,src,&sub.input,"<-",indent+1)?;
    write_parameters(w,src,&sub.output,"->",indent+1)?;
    write_block(w,src,&sub.block,indent+1)
}

fn write_block(w: &mut dyn Write, src: &str, block: &Block, indent: usize) -> std::io::Result<()> {
    for stmt in &block.statements {
        match stmt {
            Statement::Assembly { text, pos } => {
                pad(w,indent)?;
                writeln!(w,"Assembly line={} {{",line_of(src,*pos))?;
                writeln!(w,"{}",text)?;
                pad(w,indent)?;
                writeln!(w,"}}")?;
            },
            Statement::Assign(assign) => {
                pad(w,indent)?;
                writeln!(w,"Set {}= line={}",assign.kind.symbol(),line_of(src,assign.ident.pos))?;
                write_ident_phrase(w,&assign.ident,indent+1)?;
                write_value(w,src,&assign.value,indent+1)?;
            },
            Statement::Call(call) => write_call(w,src,call,indent)?,
            Statement::Declaration(params) => {
                pad(w,indent)?;
                writeln!(w,"Declaration")?;
                write_parameters(w,src,params,"Use",indent+1)?;
            },
            Statement::Variable(params) => {
                pad(w,indent)?;
                writeln!(w,"Variable")?;
                write_parameters(w,src,params,"Var",indent+1)?;
            },
            Statement::Definition(args) => {
                pad(w,indent)?;
                writeln!(w,"Definition")?;
                write_arguments(w,src,args,"Let",indent+1)?;
            },
            Statement::If(cond) => write_conditional(w,src,cond,"If",indent)?,
            Statement::While(cond) => write_conditional(w,src,cond,"While",indent)?,
            Statement::Return => {
                pad(w,indent)?;
                writeln!(w,"Return")?;
            },
            Statement::Stop => {
                pad(w,indent)?;
                writeln!(w,"Stop")?;
            },
            Statement::Repeat => {
                pad(w,indent)?;
                writeln!(w,"Repeat")?;
            }
        }
    }
    Ok(())
}

/// Dump the parsed tree, one node per line, 4-space indents.
pub fn write_ast(w: &mut dyn Write, src: &str, prog: &Program) -> std::io::Result<()> {
    writeln!(w,"Program line=1")?;
    write_block(w,src,&prog.block,1)
}
