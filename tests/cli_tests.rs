// パス: tests/cli_tests.rs
// 役割: unvc バイナリのフラグ処理・終了コード・出力先の検証
// 意図: 診断は標準エラー、成果物は指定先という契約をプロセス境界で確かめる
// 関連ファイル: src/bin/unvc.rs, src/lib.rs, tests/test_support.rs

use assert_cmd::Command;
use predicates::prelude::*;

const MAIN_SRC: &str = "function main : () -> _builtin_int32_\n\treturn 5\n";

fn unvc() -> Command {
    Command::cargo_bin("unvc").expect("binary")
}

#[test]
fn object_is_written_next_to_the_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("main.unv");
    std::fs::write(&input, MAIN_SRC).expect("write input");

    unvc().arg(&input).assert().success();

    let object = dir.path().join("main.o");
    let written = std::fs::read(&object).expect("object file");
    assert!(!written.is_empty());
}

#[test]
fn out_flag_overrides_the_object_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("main.unv");
    let output = dir.path().join("custom.o");
    std::fs::write(&input, MAIN_SRC).expect("write input");

    unvc().arg(&input).arg("-o").arg(&output).assert().success();
    assert!(output.exists());
}

#[test]
fn emit_ast_prints_the_tree_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("main.unv");
    std::fs::write(&input, MAIN_SRC).expect("write input");

    unvc()
        .arg(&input)
        .args(["-e", "ast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FuncDecl 'main'"));
}

#[test]
fn emit_ir_prints_clif_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("main.unv");
    std::fs::write(&input, MAIN_SRC).expect("write input");

    unvc()
        .arg(&input)
        .args(["-e", "ir"])
        .assert()
        .success()
        .stdout(predicate::str::contains("iconst.i32 5"));
}

#[test]
fn diagnostics_go_to_stderr_and_fail_the_process() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("bad.unv");
    std::fs::write(&input, "function f : () -> _builtin_bit_\n\treturn 2\n").expect("write input");

    unvc()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsigned integer literal out of range"));

    assert!(!dir.path().join("bad.o").exists());
}

#[test]
fn stdin_mode_reads_the_source_from_standard_input() {
    unvc()
        .arg("--stdin")
        .args(["-e", "ir"])
        .write_stdin(MAIN_SRC)
        .assert()
        .success()
        .stdout(predicate::str::contains("function u0:"));
}

#[test]
fn include_directories_are_searched_for_includes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let lib_dir = dir.path().join("lib");
    std::fs::create_dir(&lib_dir).expect("mkdir");
    std::fs::write(
        lib_dir.join("lib.unv"),
        "function five : () -> _builtin_int32_\n\treturn 5\n",
    )
    .expect("write lib");

    let input = dir.path().join("main.unv");
    std::fs::write(
        &input,
        "include \"lib.unv\"\nfunction main : () -> _builtin_int32_\n\treturn five()\n",
    )
    .expect("write input");

    unvc().arg(&input).arg("-i").arg(&lib_dir).assert().success();
    assert!(dir.path().join("main.o").exists());
}

#[test]
fn unreadable_input_reports_and_fails() {
    unvc()
        .arg("no_such_file.unv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read"));
}

#[test]
fn input_is_required_unless_stdin_is_given() {
    unvc().assert().failure();
}
