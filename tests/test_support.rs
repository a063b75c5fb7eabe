// パス: tests/test_support.rs
// 役割: 統合テスト共通の補助関数とアサーションを提供する
// 意図: 繰り返しがちな字句解析・構文解析・コンパイル操作を一元化しテストを簡潔に保つ
// 関連ファイル: tests/lexer_tests.rs, tests/parser_tests.rs, tests/codegen_tests.rs
#![allow(dead_code)]
use unv::ast::TranslationUnit;
use unv::diag::Diagnostics;
use unv::filesources::FileSources;
use unv::options::CompileOptions;
use unv::token::Token;
use unv::typesystem::TypeSystem;
use unv::{lexer, parser, Artifacts, CompileOutcome};

pub const TEST_FILE: &str = "test.unv";
pub const ERROR_LIMIT: usize = 20;

/// 字句解析し、診断が出ないことを検査してトークン列を返す。
pub fn lex_ok(src: &str) -> Vec<Token> {
    let mut diags = Diagnostics::new(TEST_FILE, src, ERROR_LIMIT);
    let tokens = lexer::lex(src, &mut diags).expect("lex");
    assert!(diags.entries().is_empty(), "diagnostics: {}", diags.render());
    tokens
}

/// 字句解析を失敗させて診断シンクを返す。
pub fn lex_err(src: &str) -> Diagnostics {
    let mut diags = Diagnostics::new(TEST_FILE, src, ERROR_LIMIT);
    assert!(lexer::lex(src, &mut diags).is_err(), "expected lex failure");
    diags
}

/// 字句解析と構文解析を通し、翻訳単位（致命エラーなら None）と
/// シンボル表・診断を返す。
pub fn parse_src(src: &str) -> (Option<TranslationUnit>, TypeSystem, Diagnostics) {
    let mut diags = Diagnostics::new(TEST_FILE, src, ERROR_LIMIT);
    let mut types = TypeSystem::new();
    let unit = lexer::lex(src, &mut diags)
        .and_then(|tokens| parser::parse(&tokens, &mut types, &mut diags))
        .ok();
    (unit, types, diags)
}

/// 診断ゼロでの構文解析を要求する。
pub fn parse_ok(src: &str) -> TranslationUnit {
    let (unit, _, diags) = parse_src(src);
    assert!(diags.entries().is_empty(), "diagnostics: {}", diags.render());
    unit.expect("parse")
}

/// インクルード無しの 1 ソースをコンパイルする。
pub fn compile_src(src: &str) -> CompileOutcome {
    let options = CompileOptions::default();
    let mut sources = FileSources::new(Vec::new());
    unv::compile(TEST_FILE, src, &options, &mut sources).expect("backend")
}

/// コンパイルが成功して成果物が出ることを検査する。
pub fn compile_ok(src: &str) -> Artifacts {
    let outcome = compile_src(src);
    assert!(
        !outcome.has_errors,
        "diagnostics:\n{}",
        outcome.reports.join("\n")
    );
    outcome.artifacts.expect("artifacts")
}

/// コンパイルがユーザエラーで失敗することを検査し、診断テキストを返す。
pub fn compile_err(src: &str) -> Vec<String> {
    let outcome = compile_src(src);
    assert!(outcome.has_errors, "expected diagnostics");
    outcome.reports
}

pub fn reports_contain(reports: &[String], needle: &str) -> bool {
    reports.iter().any(|r| r.contains(needle))
}
