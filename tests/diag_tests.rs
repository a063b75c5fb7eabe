// パス: tests/diag_tests.rs
// 役割: 診断の整形とエラー上限の検証
// 意図: キャレット表示の位置合わせと回復可能エラーの数え上げを固定する
// 関連ファイル: src/diag.rs, tests/test_support.rs

use unv::diag::Diagnostics;
use unv::token::{Position, Token, TokenKind};

fn token_at(line: usize, column: usize, text: &str) -> Token {
    Token::new(
        TokenKind::Identifier,
        Position::new(line, column),
        Position::new(line, column + text.len() - 1),
        text,
    )
}

#[test]
fn render_points_a_caret_at_the_token() {
    let mut diags = Diagnostics::new("demo.unv", "abc def\n", 20);
    diags.error(&token_at(1, 5, "def"), "boom").expect("under limit");

    let rendered = diags.render();
    assert!(rendered.contains("demo.unv:1:5 error: boom"));
    assert!(rendered.contains("abc def"));
    assert!(rendered.contains("    ^^^"));
}

#[test]
fn fatal_diagnostics_are_labelled() {
    let mut diags = Diagnostics::new("demo.unv", "abc\n", 20);
    let _ = diags.fatal(&token_at(1, 1, "abc"), "stop");
    assert!(diags.render().contains("fatal error: stop"));
    assert!(diags.has_errors());
}

#[test]
fn exceeding_the_error_limit_becomes_fatal() {
    let mut diags = Diagnostics::new("demo.unv", "abc\n", 1);
    diags.error(&token_at(1, 1, "a"), "first").expect("under limit");
    assert!(diags.error(&token_at(1, 2, "b"), "second").is_err());
    assert_eq!(diags.error_count(), 2);
}

/// 行をまたぐトークン（未終端コメントなど）は開始位置に 1 桁のキャレットを出す。
#[test]
fn token_spanning_lines_renders_a_single_caret() {
    let mut diags = Diagnostics::new("demo.unv", "abc /*\nx\n", 20);
    let tok = Token::new(
        TokenKind::Comment,
        Position::new(1, 5),
        Position::new(2, 1),
        "/*\nx",
    );
    let _ = diags.fatal(&tok, "unterminated comment");

    let rendered = diags.render();
    assert!(rendered.contains("demo.unv:1:5 fatal error: unterminated comment"));
    assert!(rendered.ends_with("\n    ^"));
}

#[test]
fn caret_does_not_extend_past_the_snippet() {
    let mut diags = Diagnostics::new("demo.unv", "ab\n", 20);
    let wide = Token::new(
        TokenKind::Identifier,
        Position::new(1, 1),
        Position::new(1, 10),
        "ab",
    );
    diags.error(&wide, "boom").expect("under limit");
    assert!(diags.render().ends_with("\nab\n^^"));
}

#[test]
fn tab_in_snippet_is_flattened_for_display() {
    let mut diags = Diagnostics::new("demo.unv", "\treturn\n", 20);
    diags.error(&token_at(1, 2, "return"), "boom").expect("under limit");
    assert!(diags.render().contains(" return"));
}

#[test]
fn new_sink_has_no_errors() {
    let diags = Diagnostics::new("demo.unv", "", 20);
    assert!(!diags.has_errors());
    assert_eq!(diags.error_count(), 0);
    assert!(diags.entries().is_empty());
}
