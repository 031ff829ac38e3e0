use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn jlang() -> Command {
    let mut cmd = Command::cargo_bin("jlang").expect("binary exists");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn jlang_runs_script_file() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("count.jl");
    fs::write(&script, "for (i = 0; i < 3; i = i + 1) write i;\n").expect("write script");

    jlang()
        .arg(&script)
        .assert()
        .success()
        .stdout("0\n1\n2\n");
}

#[test]
fn jlang_reads_stdin_without_script() {
    jlang()
        .write_stdin("fn sq(n) { return n * n; } write sq(7);")
        .assert()
        .success()
        .stdout("49\n");
}

#[test]
fn jlang_dumps_tree_instead_of_running() {
    jlang()
        .arg("--dump-ast")
        .write_stdin("write 1 / 0;")
        .assert()
        .success()
        .stdout("Code\n Write\n  DivideOperator\n   Integer 1\n   Integer 0\n");
}

#[test]
fn jlang_reports_semantic_error_and_keeps_output() {
    jlang()
        .write_stdin("write \"before\"; write 5 / 0;")
        .assert()
        .code(1)
        .stdout("before\n")
        .stderr(predicate::str::contains("Division by zero."));
}

#[test]
fn jlang_reports_syntax_error() {
    jlang()
        .write_stdin("write 1")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("expected `;` after write"));
}

#[test]
fn jlang_honours_max_call_depth() {
    jlang()
        .args(["--max-call-depth", "8"])
        .write_stdin("fn down(n) { down(n + 1); } down(0);")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("maximum call depth of 8"));
}

#[test]
fn jlang_recurses_to_the_default_limit() {
    jlang()
        .write_stdin("fn down(n) { if (n > 0) { down(n - 1); } } down(510); write \"done\";")
        .assert()
        .success()
        .stdout("done\n");
}

#[test]
fn jlang_fails_on_missing_script() {
    let dir = tempdir().expect("create temp dir");
    jlang()
        .arg(dir.path().join("absent.jl"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("I/O error"));
}
