use assert_cmd::cargo; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const HELLO: &str = "use [COUT:sub <- [ch:char@A] @$FDED]
var [count:byte]
let main = sub {
  count := 3
  while count <> 0 {
    COUT(`*)
    count -= 1
  }
}
";

#[test]
fn compile_variables_from_stdin() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-")
        .write_stdin("var [counter:byte]\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("counter\tHEX 00"));
    Ok(())
}

#[test]
fn compile_definitions_from_stdin() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-")
        .write_stdin("let cNum = 5\nlet letterA = `A\nlet greet = \"Hi\"\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("cNum\tEQU $05")
            .and(predicate::str::contains("letterA\tEQU $C1"))
            .and(predicate::str::contains("greet\tASC \"Hi\"")));
    Ok(())
}

#[test]
fn compile_a_whole_program() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-")
        .write_stdin(HELLO)
        .assert()
        .success()
        .stdout(predicate::str::contains("COUT\tEQU $FDED")
            .and(predicate::str::contains("\tJSR COUT"))
            .and(predicate::str::contains("count\tHEX 00"))
            .and(predicate::str::contains("\tLDA count")));
    Ok(())
}

#[test]
fn tail_call_is_rewritten() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-")
        .write_stdin("let dec = sub {\n  ->\n}\ndec()\nlet noop = sub {\n  dec()\n}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("noop\tJMP dec"));
    Ok(())
}

#[test]
fn compile_file_to_output_path() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("prog.a2");
    let out = dir.path().join("prog.s");
    std::fs::write(&src,"var [counter:byte]\nlet main = sub {\n  counter := 0\n}\n")?;
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-o").arg(&out).arg(&src).assert().success();
    let listing = std::fs::read_to_string(&out)?;
    assert!(listing.contains("main\tLDA #$00"));
    assert!(listing.contains("counter\tHEX 00"));
    Ok(())
}

#[test]
fn asm_flag_echoes_to_stderr() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-asm").arg("-")
        .write_stdin("var [counter:byte]\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("counter\tHEX 00"));
    Ok(())
}

#[test]
fn sym_flag_dumps_the_table() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-sym").arg("-")
        .write_stdin("var [counter:byte]\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("SYMBOL TABLE")
            .and(predicate::str::contains("counter")));
    Ok(())
}

#[test]
fn ast_flag_dumps_the_tree() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-ast").arg("-")
        .write_stdin("var [counter:byte]\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Program line=1")
            .and(predicate::str::contains("Variable")));
    Ok(())
}

#[test]
fn syntax_errors_point_at_the_line() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-")
        .write_stdin("var [counter:byte\nbad::]\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("syntax error around line"));
    Ok(())
}

#[test]
fn fatal_errors_exit_one() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("-")
        .write_stdin("x := 1\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("fatal:").and(predicate::str::contains("unknown symbol")));
    Ok(())
}

#[test]
fn unreadable_input_exits_one() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("no-such-file.a2")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("fatal:"));
    Ok(())
}

#[test]
fn missing_input_exits_two() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.assert().failure().code(2);
    Ok(())
}

#[test]
fn unknown_flag_exits_two() -> STDRESULT {
    let mut cmd = cargo::cargo_bin_cmd!("compile");
    cmd.arg("--bogus").assert().failure().code(2);
    Ok(())
}
