//! # A2 parser
//!
//! Backtracking recursive descent with one method per grammar production.
//! Each production takes a byte position and returns the position after the
//! consumed text (trailing whitespace included) plus the parsed node, or
//! `None` when the production does not match.  The caller's position is
//! untouched on failure, which is all the backtracking there is.
//!
//! Inside bracketed lists a newline may stand in for the separating comma;
//! `;` starts a comment running to end of line.

use std::cell::Cell;
use super::ast::*;
use super::{line_of,lines_around};
use crate::DYNERR;

/// Parse a complete program.  The grammar demands at least one statement and
/// consumes the whole buffer; anything left over is a syntax error pointing
/// at the offending line.
pub fn parse(src: &str) -> Result<Program,DYNERR> {
    let parser = Parser::new(src);
    let start = parser.whitespace(0);
    match parser.statements(start) {
        Some((end,block)) if end >= src.len() => Ok(Program { block }),
        other => {
            let end = match other {
                Some((end,_)) => end,
                None => start
            };
            let off = parser.bad.get().unwrap_or(end);
            Err(Box::new(super::Error::Syntax {
                line: line_of(src,off),
                snippet: lines_around(src,off)
            }))
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    b: &'a [u8],
    /// position of text that looks like a missing separator
    bad: Cell<Option<usize>>
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, b: src.as_bytes(), bad: Cell::new(None) }
    }
    fn byte(&self, p: usize) -> Option<u8> {
        self.b.get(p).copied()
    }
    fn space(&self, p: usize) -> Option<usize> {
        match self.byte(p) {
            Some(b' ') | Some(b'\t') | Some(b'\n') => Some(p+1),
            _ => None
        }
    }
    fn comment(&self, p: usize) -> Option<usize> {
        if self.byte(p) != Some(b';') {
            return None;
        }
        let mut q = p;
        while let Some(c) = self.byte(q) {
            q += 1;
            if c == b'\n' {
                break;
            }
        }
        Some(q)
    }
    fn whitespace(&self, p: usize) -> usize {
        let mut q = p;
        loop {
            if let Some(r) = self.space(q) {
                q = r;
            } else if let Some(r) = self.comment(q) {
                q = r;
            } else {
                return q;
            }
        }
    }
    fn consume(&self, p: usize, expected: u8) -> Option<usize> {
        match self.byte(p) == Some(expected) {
            true => Some(self.whitespace(p+1)),
            false => None
        }
    }
    /// match a multi-character token; `space_required` demands at least one
    /// whitespace character after it (keywords like `use`, `stop`)
    fn token(&self, p: usize, tok: &str, space_required: bool) -> Option<usize> {
        if !self.src[p.min(self.src.len())..].starts_with(tok) {
            return None;
        }
        let q = p + tok.len();
        match space_required {
            false => Some(self.whitespace(q)),
            true => self.space(q).map(|r| self.whitespace(r))
        }
    }
    /// a comma, or a line break just behind the current position
    fn separator(&self, p: usize) -> Option<usize> {
        if self.byte(p) == Some(b',') {
            return self.consume(p,b',');
        }
        let mut i = p;
        while i > 0 && (self.b[i-1]==b' ' || self.b[i-1]==b'\t') {
            i -= 1;
        }
        if i > 0 && self.b[i-1] == b'\n' {
            return Some(p);
        }
        None
    }
    fn identifier(&self, p: usize) -> Option<(usize,&'a str)> {
        if !is_ident_start(self.byte(p)?) {
            return None;
        }
        let mut q = p+1;
        while let Some(c) = self.byte(q) {
            if !is_ident_cont(c) {
                break;
            }
            q += 1;
        }
        Some((self.whitespace(q), &self.src[p..q]))
    }
    fn digits(&self, p: usize, radix: u32) -> Option<(usize,&'a str)> {
        let mut q = p;
        while let Some(c) = self.byte(q) {
            if !(c as char).is_digit(radix) {
                break;
            }
            q += 1;
        }
        match q > p {
            true => Some((q, &self.src[p..q])),
            false => None
        }
    }
    fn number(&self, p: usize) -> Option<(usize,i32)> {
        match self.byte(p)? {
            b'$' => {
                let (q,s) = self.digits(p+1,16)?;
                let n = i64::from_str_radix(s,16).ok()?;
                Some((self.whitespace(q), n as i32))
            },
            b'%' => {
                let (q,s) = self.digits(p+1,2)?;
                let n = i64::from_str_radix(s,2).ok()?;
                Some((self.whitespace(q), n as i32))
            },
            b'-' => {
                let (q,s) = self.digits(p+1,10)?;
                let n = s.parse::<i64>().ok()?;
                Some((self.whitespace(q), (-n) as i32))
            },
            c if c.is_ascii_digit() => {
                let (q,s) = self.digits(p,10)?;
                let n = s.parse::<i64>().ok()?;
                Some((self.whitespace(q), n as i32))
            },
            _ => None
        }
    }
    fn numerical(&self, p: usize) -> Option<(usize,Numerical<'a>)> {
        if let Some((q,n)) = self.number(p) {
            return Some((q,Numerical::Number(n)));
        }
        if let Some((q,name)) = self.identifier(p) {
            return Some((q,Numerical::Ident(name)));
        }
        None
    }
    fn char_literal(&self, p: usize) -> Option<(usize,u8)> {
        if self.byte(p) != Some(b'`') {
            return None;
        }
        match self.byte(p+1)? {
            c if c >= b' ' && c <= b'~' => Some((self.whitespace(p+2), c)),
            _ => None
        }
    }
    fn text_literal(&self, p: usize) -> Option<(usize,&'a str)> {
        if self.byte(p) != Some(b'"') {
            return None;
        }
        let mut q = p+1;
        loop {
            match self.byte(q)? {
                b'"' => break,
                b'\\' => {
                    q += 1;
                    match self.byte(q)? {
                        b'"' | b'\\' | b'n' | b'r' | b't' => q += 1,
                        _ => return None
                    }
                },
                _ => q += 1
            }
        }
        Some((self.whitespace(q+1), &self.src[p+1..q]))
    }
    fn location(&self, p: usize) -> Option<(usize,Numerical<'a>)> {
        let q = self.consume(p,b'@')?;
        self.numerical(q)
    }
    fn subscript(&self, p: usize) -> Option<(usize,Numerical<'a>)> {
        let q = self.consume(p,b'_')?;
        self.numerical(q)
    }
    fn field_access(&self, p: usize) -> Option<(usize,&'a str)> {
        let q = self.consume(p,b'.')?;
        self.identifier(q)
    }
    fn ident_phrase(&self, p: usize) -> Option<(usize,IdentPhrase<'a>)> {
        let (mut q, identifier) = self.identifier(p)?;
        let subscript = match self.subscript(q) {
            Some((r,n)) => { q = r; Some(n) },
            None => None
        };
        let field = match self.field_access(q) {
            Some((r,f)) => { q = r; Some(f) },
            None => None
        };
        Some((q, IdentPhrase { identifier, subscript, field, pos: p }))
    }
    fn pointer(&self, p: usize) -> Option<(usize,&'a str)> {
        let (q, name) = self.identifier(p)?;
        if self.byte(q) == Some(b'^') && self.numerical(q+1).is_none() {
            return Some((self.whitespace(q+1), name));
        }
        None
    }
    fn array(&self, p: usize) -> Option<(usize,(&'a str,Numerical<'a>))> {
        let (q, name) = self.identifier(p)?;
        if self.byte(q) == Some(b'^') {
            let (r, size) = self.numerical(q+1)?;
            return Some((r,(name,size)));
        }
        None
    }
    fn subroutine_sig(&self, p: usize) -> Option<(usize,Subroutine<'a>)> {
        let mut q = self.token(p,"sub",false)?;
        let mut input = Vec::new();
        let mut output = Vec::new();
        if let Some(r) = self.token(q,"<-",false) {
            let (r,params) = self.parameters(r)?;
            input = params;
            q = r;
        }
        if let Some(r) = self.token(q,"->",false) {
            let (r,params) = self.parameters(r)?;
            output = params;
            q = r;
        }
        Some((q, Subroutine { input, output, block: Block { statements: Vec::new() } }))
    }
    fn type_(&self, p: usize) -> Option<(usize,Type<'a>)> {
        let p = self.consume(p,b':')?;
        if let Some((q,sub)) = self.subroutine_sig(p) {
            return Some((q,Type::Subroutine(sub)));
        }
        if let Some((q,name)) = self.pointer(p) {
            return Some((q,Type::Pointer(name)));
        }
        if let Some((q,(base,size))) = self.array(p) {
            return Some((q,Type::Array { base, size }));
        }
        if let Some((q,name)) = self.identifier(p) {
            return Some((q,Type::Ident(name)));
        }
        None
    }
    fn parameter(&self, p: usize) -> Option<(usize,Parameter<'a>)> {
        let (q, name) = self.identifier(p)?;
        let (q, typ) = self.type_(q)?;
        match self.location(q) {
            Some((r,loc)) => Some((r, Parameter { name, typ, loc: Some(loc), pos: p })),
            None => Some((q, Parameter { name, typ, loc: None, pos: p }))
        }
    }
    fn parameters(&self, p: usize) -> Option<(usize,Vec<Parameter<'a>>)> {
        if let Some(q) = self.consume(p,b'[') {
            if let Some(r) = self.consume(q,b']') {
                return Some((r,Vec::new()));
            }
            let (mut q, first) = self.parameter(q)?;
            let mut list = vec![first];
            loop {
                let Some(r) = self.separator(q) else { break };
                let Some((r,param)) = self.parameter(r) else { break };
                list.push(param);
                q = r;
            }
            if let Some(r) = self.separator(q) {
                q = r;
            }
            if self.byte(q) != Some(b']') {
                // probably missing a comma
                self.bad.set(Some(q));
                return None;
            }
            return self.consume(q,b']').map(|r| (r,list));
        }
        let (q, param) = self.parameter(p)?;
        Some((q, vec![param]))
    }
    fn argument(&self, p: usize) -> Option<(usize,Argument<'a>)> {
        if let Some((q,name)) = self.identifier(p) {
            if let Some(r) = self.consume(q,b'=') {
                if let Some((s,value)) = self.value(r) {
                    return Some((s, Argument { name: Some(name), value, pos: p }));
                }
            }
        }
        let (q, value) = self.value(p)?;
        Some((q, Argument { name: None, value, pos: p }))
    }
    fn arguments(&self, p: usize) -> Option<(usize,Vec<Argument<'a>>)> {
        if let Some(q) = self.consume(p,b'(') {
            if let Some(r) = self.consume(q,b')') {
                return Some((r,Vec::new()));
            }
            let mut list = Vec::new();
            let mut q = q;
            if let Some((r,first)) = self.argument(q) {
                list.push(first);
                q = r;
                loop {
                    let Some(r) = self.separator(q) else { break };
                    let Some((r,arg)) = self.argument(r) else { break };
                    list.push(arg);
                    q = r;
                }
            }
            if let Some(r) = self.separator(q) {
                q = r;
            }
            return self.consume(q,b')').map(|r| (r,list));
        }
        let (q, arg) = self.argument(p)?;
        Some((q, vec![arg]))
    }
    fn call(&self, p: usize) -> Option<(usize,Call<'a>)> {
        let (q, ident) = self.ident_phrase(p)?;
        if self.byte(q) == Some(b'(') {
            let (r, args) = self.arguments(q)?;
            return Some((r, Call { ident, args }));
        }
        None
    }
    fn tuple(&self, p: usize) -> Option<(usize,Vec<Argument<'a>>)> {
        match self.byte(p) == Some(b'(') {
            true => self.arguments(p),
            false => None
        }
    }
    fn group(&self, p: usize) -> Option<(usize,Vec<Parameter<'a>>)> {
        match self.byte(p) == Some(b'[') {
            true => self.parameters(p),
            false => None
        }
    }
    fn value(&self, p: usize) -> Option<(usize,Value<'a>)> {
        if let Some((q,n)) = self.number(p) {
            return Some((q,Value::Number(n)));
        }
        if let Some((q,t)) = self.text_literal(p) {
            return Some((q,Value::Text(t)));
        }
        if let Some((q,c)) = self.char_literal(p) {
            return Some((q,Value::Char(c)));
        }
        if let Some((q,mut sub)) = self.subroutine_sig(p) {
            if let Some((r,block)) = self.block(q) {
                sub.block = block;
                return Some((r,Value::Sub(sub)));
            }
        }
        if let Some((q,call)) = self.call(p) {
            return Some((q,Value::Call(call)));
        }
        if let Some((q,id)) = self.ident_phrase(p) {
            return Some((q,Value::Ident(id)));
        }
        if let Some((q,args)) = self.tuple(p) {
            return Some((q,Value::Tuple(args)));
        }
        if let Some((q,params)) = self.group(p) {
            return Some((q,Value::Group(params)));
        }
        if let Some((q,typ)) = self.type_(p) {
            return Some((q,Value::Type(typ)));
        }
        None
    }
    /// a value usable in a comparison: rules out blocks, groups, tuples and text
    fn simple_value(&self, p: usize) -> Option<(usize,Value<'a>)> {
        match self.byte(p)? {
            b':' | b'[' | b'{' | b'(' | b'"' => None,
            _ => self.value(p)
        }
    }
    fn compare(&self, p: usize) -> Option<(usize,Compare)> {
        for (tok,cmp) in [("<>",Compare::NotEqual),("==",Compare::Equal),("<=",Compare::LessEqual),(">=",Compare::GreaterEqual)] {
            if let Some(q) = self.token(p,tok,false) {
                return Some((q,cmp));
            }
        }
        if let Some(q) = self.consume(p,b'<') {
            return Some((q,Compare::Less));
        }
        if let Some(q) = self.consume(p,b'>') {
            return Some((q,Compare::Greater));
        }
        None
    }
    fn conditional(&self, p: usize, keyword: &str) -> Option<(usize,Conditional<'a>)> {
        let q = self.token(p,keyword,true)?;
        let (q, left) = self.simple_value(q)?;
        let (q, compare) = self.compare(q)?;
        let (q, right) = self.simple_value(q)?;
        let pos = q;
        let (r, then) = self.block(q)?;
        Some((r, Conditional { left, compare, right, then, pos }))
    }
    fn block(&self, p: usize) -> Option<(usize,Block<'a>)> {
        let q = self.consume(p,b'{')?;
        let (q, block) = match self.statements(q) {
            Some(x) => x,
            None => (q, Block { statements: Vec::new() })
        };
        self.consume(q,b'}').map(|r| (r,block))
    }
    fn assignment(&self, p: usize) -> Option<(usize,Assignment<'a>)> {
        let (q, ident) = self.ident_phrase(p)?;
        let kind = match self.byte(q)? {
            b':' => AssignKind::Set,
            b'+' => AssignKind::Add,
            b'-' => AssignKind::Subtract,
            b'&' => AssignKind::And,
            b'|' => AssignKind::Or,
            b'^' => AssignKind::Xor,
            b'!' => AssignKind::Not,
            _ => return None
        };
        let r = self.consume(q+1,b'=')?;
        let (s, value) = self.value(r)?;
        Some((s, Assignment { ident, kind, value }))
    }
    /// `asm { ... }`: whitespace-sensitive; spaces and one newline directly
    /// after the brace are discarded, then everything up to the first `}` is
    /// taken verbatim
    fn assembly(&self, p: usize) -> Option<(usize,(&'a str,usize))> {
        let q = self.token(p,"asm",false)?;
        if self.byte(q) != Some(b'{') {
            return None;
        }
        let mut q = q+1;
        while self.byte(q) == Some(b' ') {
            q += 1;
        }
        if self.byte(q) == Some(b'\n') {
            q += 1;
        }
        let start = q;
        while self.byte(q)? != b'}' {
            q += 1;
        }
        let r = self.consume(q,b'}')?;
        Some((r, (&self.src[start..q], start)))
    }
    fn statement(&self, p: usize) -> Option<(usize,Statement<'a>)> {
        if let Some(q) = self.token(p,"use",true) {
            if let Some((r,params)) = self.parameters(q) {
                return Some((r,Statement::Declaration(params)));
            }
        }
        if let Some(q) = self.token(p,"var",true) {
            if let Some((r,params)) = self.parameters(q) {
                return Some((r,Statement::Variable(params)));
            }
        }
        if let Some(q) = self.token(p,"let",true) {
            if let Some((r,args)) = self.arguments(q) {
                return Some((r,Statement::Definition(args)));
            }
        }
        if let Some((q,call)) = self.call(p) {
            return Some((q,Statement::Call(call)));
        }
        if let Some((q,assign)) = self.assignment(p) {
            return Some((q,Statement::Assign(assign)));
        }
        if let Some((q,cond)) = self.conditional(p,"if") {
            return Some((q,Statement::If(cond)));
        }
        if let Some((q,cond)) = self.conditional(p,"while") {
            return Some((q,Statement::While(cond)));
        }
        if let Some(q) = self.token(p,"->",false) {
            return Some((q,Statement::Return));
        }
        if let Some(q) = self.token(p,"stop",true) {
            return Some((q,Statement::Stop));
        }
        if let Some(q) = self.token(p,"repeat",true) {
            return Some((q,Statement::Repeat));
        }
        if let Some((q,(text,pos))) = self.assembly(p) {
            return Some((q,Statement::Assembly { text, pos }));
        }
        None
    }
    fn statements(&self, p: usize) -> Option<(usize,Block<'a>)> {
        let (mut q, first) = self.statement(p)?;
        let mut statements = vec![first];
        while let Some((r,stmt)) = self.statement(q) {
            statements.push(stmt);
            q = r;
        }
        Some((q, Block { statements }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_and_comments() {
        let prog = parse("; counters\nvar [count:byte, total:word@$300]\n").expect("parse failed");
        assert_eq!(prog.block.statements.len(),1);
        match &prog.block.statements[0] {
            Statement::Variable(params) => {
                assert_eq!(params.len(),2);
                assert_eq!(params[0].name,"count");
                assert!(params[0].loc.is_none());
                assert_eq!(params[1].name,"total");
                assert_eq!(params[1].loc,Some(Numerical::Number(0x300)));
            },
            _ => panic!("expected a variable statement")
        }
    }

    #[test]
    fn newline_separates_parameters() {
        let prog = parse("var [\n  a:byte\n  b:byte\n]\n").expect("parse failed");
        match &prog.block.statements[0] {
            Statement::Variable(params) => assert_eq!(params.len(),2),
            _ => panic!("expected a variable statement")
        }
    }

    #[test]
    fn number_radices() {
        let prog = parse("let (a = $FF, b = %1010, c = -2)\n").expect("parse failed");
        match &prog.block.statements[0] {
            Statement::Definition(args) => {
                let nums: Vec<i32> = args.iter().map(|a| match a.value {
                    Value::Number(n) => n,
                    _ => panic!("expected numbers")
                }).collect();
                assert_eq!(nums,vec![255,10,-2]);
            },
            _ => panic!("expected a definition")
        }
    }

    #[test]
    fn subroutine_with_io() {
        let prog = parse("let shift = sub <- [n:byte@A] -> [out:byte@A] {\n  ->\n}\n").expect("parse failed");
        match &prog.block.statements[0] {
            Statement::Definition(args) => match &args[0].value {
                Value::Sub(sub) => {
                    assert_eq!(sub.input.len(),1);
                    assert_eq!(sub.output.len(),1);
                    assert_eq!(sub.block.statements.len(),1);
                },
                _ => panic!("expected a subroutine")
            },
            _ => panic!("expected a definition")
        }
    }

    #[test]
    fn assignments_and_phrases() {
        let prog = parse("buf_3.len += 2\n").expect("parse failed");
        match &prog.block.statements[0] {
            Statement::Assign(assign) => {
                assert_eq!(assign.kind,AssignKind::Add);
                assert_eq!(assign.ident.identifier,"buf");
                assert_eq!(assign.ident.subscript,Some(Numerical::Number(3)));
                assert_eq!(assign.ident.field,Some("len"));
            },
            _ => panic!("expected an assignment")
        }
    }

    #[test]
    fn asm_block_is_verbatim() {
        let prog = parse("asm {\n LDA #$00\n JSR COUT\n}\n").expect("parse failed");
        match &prog.block.statements[0] {
            Statement::Assembly { text, .. } => assert_eq!(*text," LDA #$00\n JSR COUT\n"),
            _ => panic!("expected inline assembly")
        }
    }

    #[test]
    fn loop_with_controls() {
        let prog = parse("while x <> 0 {\n  x -= 1\n  stop \n  repeat \n}\n").expect("parse failed");
        match &prog.block.statements[0] {
            Statement::While(cond) => {
                assert_eq!(cond.compare,Compare::NotEqual);
                assert_eq!(cond.then.statements.len(),3);
            },
            _ => panic!("expected a loop")
        }
    }

    #[test]
    fn syntax_error_has_line() {
        let err = parse("var [a:byte\nb:@@]\n").expect_err("should not parse");
        let msg = err.to_string();
        assert!(msg.contains("syntax error around line"),"got: {}",msg);
    }

    #[test]
    fn bad_escape_rejected() {
        assert!(parse("let s = \"a\\q\"\n").is_err());
    }
}
