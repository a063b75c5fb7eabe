// パス: tests/lexer_tests.rs
// 役割: 字句解析の分類・位置・逐語復元の検証
// 意図: 数値リテラルの基数分類と符号・小数点の取り込みを重点的に押さえる
// 関連ファイル: src/lexer.rs, src/token.rs, tests/test_support.rs

#[path = "test_support.rs"]
mod test_support;

use test_support::{lex_err, lex_ok};
use unv::token::TokenKind;

/// 全トークンの text を連結すると入力が逐語的に復元できる。
#[test]
fn tokens_round_trip_to_source() {
    let src = "function main : () -> _builtin_int32_\n\t// comment\n\treturn 5\n";
    let tokens = lex_ok(src);
    let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(rebuilt, src);
}

#[test]
fn keywords_are_classified() {
    let tokens = lex_ok("function type if else return extern include namespace new true false");
    let kinds: Vec<TokenKind> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Whitespace && t.kind != TokenKind::EndOfFile)
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Function,
            TokenKind::Type,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::Return,
            TokenKind::Extern,
            TokenKind::Include,
            TokenKind::Namespace,
            TokenKind::New,
            TokenKind::True,
            TokenKind::False,
        ]
    );
}

#[test]
fn numeric_literals_are_classified_by_radix() {
    let cases = [
        ("5", TokenKind::DecLiteral),
        ("-5", TokenKind::DecLiteral),
        ("1.5", TokenKind::FloatLiteral),
        (".5", TokenKind::FloatLiteral),
        ("-.5", TokenKind::FloatLiteral),
        ("0x1F", TokenKind::HexLiteral),
        ("-0x1F", TokenKind::HexLiteral),
        ("0b101", TokenKind::BinLiteral),
        ("077", TokenKind::OctLiteral),
    ];
    for (src, expected) in cases {
        let tokens = lex_ok(src);
        assert_eq!(tokens[0].kind, expected, "source {src:?}");
        assert_eq!(tokens[0].text, src, "source {src:?}");
    }
}

/// 先頭が 0 のリテラルは 8 進として読まれ、8 進でない桁で切れる。
#[test]
fn leading_zero_literal_stops_at_non_octal_digit() {
    let tokens = lex_ok("08");
    assert_eq!(tokens[0].kind, TokenKind::OctLiteral);
    assert_eq!(tokens[0].text, "0");
    assert_eq!(tokens[1].kind, TokenKind::DecLiteral);
    assert_eq!(tokens[1].text, "8");
}

/// 空白区切りのマイナスは演算子、数字に隣接するマイナスはリテラルの符号。
#[test]
fn minus_is_operator_only_when_detached() {
    let tokens = lex_ok("a - 5");
    assert_eq!(tokens[2].kind, TokenKind::Minus);
    assert_eq!(tokens[4].kind, TokenKind::DecLiteral);

    let tokens = lex_ok("a -5");
    assert_eq!(tokens[2].kind, TokenKind::DecLiteral);
    assert_eq!(tokens[2].text, "-5");
}

#[test]
fn whitespace_runs_collapse_into_one_token() {
    let tokens = lex_ok("   a\t\tb");
    assert_eq!(tokens[0].kind, TokenKind::Whitespace);
    assert_eq!(tokens[0].width(), 3);
    assert_eq!(tokens[2].kind, TokenKind::Tab);
    assert_eq!(tokens[2].width(), 2);
}

#[test]
fn comments_are_kept_as_tokens() {
    let tokens = lex_ok("a // line\nb /* block */ c");
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Comment && t.text == "// line"));
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Comment && t.text == "/* block */"));
}

#[test]
fn positions_are_one_based_per_line() {
    let tokens = lex_ok("ab\ncd");
    assert_eq!(tokens[0].start.line, 1);
    assert_eq!(tokens[0].start.column, 1);
    let cd = &tokens[2];
    assert_eq!(cd.text, "cd");
    assert_eq!(cd.start.line, 2);
    assert_eq!(cd.start.column, 1);
    assert_eq!(cd.end.column, 2);
}

#[test]
fn unterminated_string_is_fatal() {
    let diags = lex_err("include \"oops\n");
    assert!(diags.contains("unterminated string literal"));

    let diags = lex_err("include \"oops");
    assert!(diags.contains("unterminated string literal"));
}

#[test]
fn unterminated_block_comment_is_fatal() {
    let diags = lex_err("/* never closed");
    assert!(diags.contains("unterminated comment"));
}

/// 未終端コメントが短い行へまたがっても診断として報告される。
#[test]
fn unterminated_comment_spanning_lines_is_fatal() {
    let diags = lex_err("abc /*\nx");
    assert!(diags.contains("unterminated comment"));
}

#[test]
fn unexpected_character_is_fatal() {
    let diags = lex_err("function @");
    assert!(diags.contains("unexpected character when tokenizing file"));
}

#[test]
fn end_of_file_token_is_appended() {
    let tokens = lex_ok("a");
    let last = tokens.last().expect("tokens");
    assert_eq!(last.kind, TokenKind::EndOfFile);
    assert!(last.text.is_empty());
}
