//! Generator tests: statement lowering traced all the way to listing text.

use super::Generator;
use crate::lang::parser::parse;

fn compile(src: &str) -> String {
    let program = parse(src).expect("parse failed");
    let mut gen = Generator::new();
    gen.generate(&program).expect("codegen failed");
    gen.assembly().to_text()
}

fn compile_err(src: &str) -> String {
    let program = parse(src).expect("parse failed");
    let mut gen = Generator::new();
    gen.generate(&program).expect_err("expected codegen to fail").to_string()
}

#[test]
fn variables_reserve_storage() {
    let listing = compile("var [counter:byte]\n");
    assert!(listing.contains("counter\tHEX 00"),"got: {}",listing);
}

#[test]
fn located_variables_bind_addresses() {
    let listing = compile("var [total:word@$300]\n");
    assert!(listing.contains("total\tEQU $0300"),"got: {}",listing);
    assert!(!listing.contains("HEX"),"got: {}",listing);
}

#[test]
fn numeric_literals_equ() {
    let listing = compile("let cNum = 5\n");
    assert!(listing.contains("cNum\tEQU $05"),"got: {}",listing);
}

#[test]
fn char_literals_are_high_ascii() {
    let listing = compile("let letterA = `A\n");
    assert!(listing.contains("letterA\tEQU $C1"),"got: {}",listing);
}

#[test]
fn text_literals_emit_terminated_data() {
    let listing = compile("let greet = \"Hi\"\n");
    assert!(listing.contains("greet\tASC \"Hi\"\n\tHEX 00"),"got: {}",listing);
}

#[test]
fn subroutines_store_through_the_accumulator() {
    let listing = compile("var [counter:byte]\nlet main = sub {\n  counter := 0\n}\n");
    assert!(listing.contains("main\tLDA #$00\n\tSTA counter\n\tRTS"),"got: {}",listing);
}

#[test]
fn loops_compare_and_branch() {
    let listing = compile("var [x:byte]\nwhile x <> 0 {\n  x -= 1\n}\n");
    assert!(listing.contains("A2_0\tLDA x\n\tBNE A2_1\n\tJMP A2_2"),"got: {}",listing);
    assert!(listing.contains("A2_1\tDEC x\n\tJMP A2_0"),"got: {}",listing);
    assert!(listing.contains("A2_2\tNOP"),"got: {}",listing);
}

#[test]
fn memory_counters_fold_to_inc_and_dec() {
    let listing = compile("var [x:byte]\nx += 1\nx += 2\nx -= 5\n");
    assert!(listing.contains("\tINC x"),"got: {}",listing);
    assert!(listing.contains("\tINC x\n\tINC x"),"got: {}",listing);
    assert!(listing.contains("\tLDA x\n\tSEC\n\tSBC #$05\n\tSTA x"),"got: {}",listing);
}

#[test]
fn loop_labels_qualify_inside_subroutines() {
    let listing = compile("var [x:byte]\nlet main = sub {\n  while x <> 0 {\n    x -= 1\n  }\n}\n");
    // the pending subroutine label doubles as the loop entry
    assert!(listing.contains("main\tLDA x\n\tBNE main.A2_0\n\tJMP main.A2_1"),"got: {}",listing);
    assert!(listing.contains("\tJMP main\nmain.A2_1\tRTS"),"got: {}",listing);
}

#[test]
fn tail_calls_become_jumps() {
    let listing = compile("let dec = sub {\n  ->\n}\ndec()\nlet noop = sub {\n  dec()\n}\n");
    assert!(listing.contains("noop\tJMP dec"),"got: {}",listing);
    assert!(listing.contains("\tJSR dec"),"got: {}",listing);
    assert!(!listing.contains("noop\tJSR dec"),"got: {}",listing);
}

#[test]
fn register_destinations_use_increments() {
    let listing = compile("let main = sub {\n  X := 0\n  X += 2\n  Y -= 1\n}\n");
    assert!(listing.contains("main\tLDX #$00"),"got: {}",listing);
    assert!(listing.contains("\tINX\n\tINX"),"got: {}",listing);
    assert!(listing.contains("\tDEY"),"got: {}",listing);
    assert!(!listing.contains("ADC"),"got: {}",listing);
    assert!(!listing.contains("SBC"),"got: {}",listing);
}

#[test]
fn stop_and_repeat_jump_to_loop_labels() {
    let listing = compile("var [x:byte]\nwhile x <> 0 {\n  stop \n  repeat \n}\n");
    // the then-label lands on the stop's jump
    assert!(listing.contains("* STOP\nA2_1\tJMP A2_2"),"got: {}",listing);
    assert!(listing.contains("* REPEAT\n\tJMP A2_0"),"got: {}",listing);
}

#[test]
fn stop_outside_loop_fails() {
    assert!(compile_err("stop \n").contains("outside of a loop"));
    assert!(compile_err("repeat \n").contains("outside of a loop"));
}

#[test]
fn calls_set_memory_arguments_before_registers() {
    let listing = compile("let put = sub <- [n:byte, r:byte@A] {\n  ->\n}\nput(1, 2)\n");
    assert!(listing.contains("put.n\tHEX 00"),"got: {}",listing);
    let mem = listing.find("STA put.n").expect("memory argument missing");
    let reg = listing.find("LDA #$02\n\tJSR put").expect("register argument missing");
    assert!(mem < reg,"got: {}",listing);
}

#[test]
fn named_arguments_resolve_parameters() {
    let listing = compile("var [dst:byte]\nlet put = sub <- [n:byte] {\n  dst := n\n}\nput(n = 7)\n");
    assert!(listing.contains("\tLDA #$07\n\tSTA put.n"),"got: {}",listing);
}

#[test]
fn pointers_point_at_text() {
    let listing = compile("var [msg:text@$30]\nmsg := \"Hello\"\n");
    assert!(listing.contains("msg\tEQU $0030"),"got: {}",listing);
    assert!(listing.contains("\tLDA #<A2_0\n\tLDX #>A2_0\n\tSTX msg+1\n\tSTA msg"),"got: {}",listing);
    assert!(listing.contains("A2_0\tASC \"Hello\"\n\tHEX 00"),"got: {}",listing);
}

#[test]
fn pointer_self_assignment_is_elided() {
    let listing = compile("var [p:char^@$30, q:char^@$30]\nq := p\n");
    assert!(!listing.contains("LDA"),"got: {}",listing);
}

#[test]
fn pointer_subscripts_use_indirection() {
    let listing = compile("var [p:char^@$30, c:byte]\nc := p_3\n");
    assert!(listing.contains("\tLDY #$03\n\tLDA (p),Y\n\tSTA c"),"got: {}",listing);
}

#[test]
fn array_subscripts_use_offsets() {
    let listing = compile("var [buf:byte^8, i:byte, c:byte]\nc := buf_2\nc := buf_i\n");
    assert!(listing.contains("\tLDA buf+$02\n\tSTA c"),"got: {}",listing);
    assert!(listing.contains("\tLDY i\n\tLDA buf,Y\n\tSTA c"),"got: {}",listing);
}

#[test]
fn group_fields_use_member_offsets() {
    let listing = compile("let Point = [x:byte, y:byte]\nvar [pt:Point]\npt.x := 1\npt.y := 2\n");
    assert!(listing.contains("pt\tHEX 0000"),"got: {}",listing);
    assert!(listing.contains("\tLDA #$01\n\tSTA pt+0"),"got: {}",listing);
    assert!(listing.contains("\tLDA #$02\n\tSTA pt+1"),"got: {}",listing);
}

#[test]
fn rom_declarations_bind_and_call() {
    let listing = compile("use [COUT:sub <- [ch:char@A] @$FDED]\nlet main = sub {\n  COUT(`A)\n}\n");
    assert!(listing.contains("COUT\tEQU $FDED"),"got: {}",listing);
    assert!(listing.contains("main\tLDA #$C1\n\tJMP COUT"),"got: {}",listing);
}

#[test]
fn inline_assembly_passes_through() {
    let listing = compile("let main = sub {\n  asm {\n LDA #$00\n JSR $FDED\n}\n}\n");
    assert!(listing.contains("main\tNOP\n LDA #$00\n JSR $FDED\n"),"got: {}",listing);
}

#[test]
fn arity_mismatch_fails() {
    let err = compile_err("let one = sub <- [n:byte] {\n  ->\n}\none()\none(1, 2)\n");
    assert!(err.contains("parameters"),"got: {}",err);
}

#[test]
fn unknown_symbols_fail() {
    assert!(compile_err("x := 1\n").contains("unknown symbol"));
}

#[test]
fn redefinition_fails() {
    assert!(compile_err("let a = 1\nlet a = 2\n").contains("cannot redefine"));
}

#[test]
fn pointers_outside_zero_page_fail() {
    assert!(compile_err("var [p:char^@$300]\n").contains("zero page"));
}

#[test]
fn nested_subroutines_fail() {
    let err = compile_err("let outer = sub {\n  use [inner:sub]\n}\n");
    assert!(err.contains("nest"),"got: {}",err);
}

#[test]
fn type_aliases_carry_size() {
    let listing = compile("let Triple = :byte^3\nvar [t:Triple]\n");
    assert!(listing.contains("t\tHEX 000000"),"got: {}",listing);
}

#[test]
fn compilation_is_deterministic() {
    let src = "var [x:byte]\nlet main = sub {\n  while x <> 0 {\n    x -= 1\n  }\n}\nmain()\n";
    assert_eq!(compile(src),compile(src));
}

#[test]
fn symbol_dump_lists_everything() {
    let program = parse("var [counter:byte]\nlet main = sub {\n  counter := 1\n}\n").expect("parse failed");
    let mut gen = Generator::new();
    gen.generate(&program).expect("codegen failed");
    let mut buf: Vec<u8> = Vec::new();
    gen.symbols().dump(&mut buf).expect("dump failed");
    let dump = String::from_utf8(buf).expect("not utf8");
    assert!(dump.contains("SYMBOL TABLE"),"got: {}",dump);
    assert!(dump.contains("counter"),"got: {}",dump);
    assert!(dump.contains("main.<-"),"got: {}",dump);
    assert!(dump.contains("main.->"),"got: {}",dump);
}
