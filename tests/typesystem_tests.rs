// パス: tests/typesystem_tests.rs
// 役割: シンボル表の登録・別名解決・型推論・互換性検査の検証
// 意図: 別名が 1 段しか解決されないことと推論の失敗文言を固定する
// 関連ファイル: src/typesystem.rs, tests/test_support.rs

#[path = "test_support.rs"]
mod test_support;

use test_support::{parse_src, ERROR_LIMIT, TEST_FILE};
use unv::ast::{BinaryExpr, BinaryOp, Expr, LiteralExpr, VarExpr};
use unv::diag::Diagnostics;
use unv::token::{Position, Token, TokenKind};
use unv::typesystem::{TypeKind, TypeSystem};

fn ident(text: &str) -> Token {
    Token::new(
        TokenKind::Identifier,
        Position::new(1, 1),
        Position::new(1, text.len()),
        text,
    )
}

fn literal(text: &str) -> Expr {
    Expr::Literal(LiteralExpr {
        literal: Token::new(
            TokenKind::DecLiteral,
            Position::new(1, 1),
            Position::new(1, text.len()),
            text,
        ),
    })
}

fn var(name: &str) -> Expr {
    Expr::Var(VarExpr { name: ident(name) })
}

fn diags() -> Diagnostics {
    Diagnostics::new(TEST_FILE, "", ERROR_LIMIT)
}

#[test]
fn builtins_are_preregistered() {
    let types = TypeSystem::new();
    let signed = types.resolve("_builtin_int32_").expect("builtin");
    assert_eq!(types.entry(signed).kind, TypeKind::Builtin);
    assert!(types.entry(signed).signed_int);

    let unsigned = types.resolve("_builtin_uint32_").expect("builtin");
    assert!(!types.entry(unsigned).signed_int);
}

#[test]
fn duplicate_type_declaration_is_reported() {
    let (_, _, diags) = parse_src("type A : _builtin_int32_\ntype A : _builtin_int32_\n");
    assert!(diags.contains("type declaration previously declared"));
}

#[test]
fn duplicate_function_declaration_is_reported() {
    let (_, _, diags) = parse_src(
        "function f : () -> _builtin_int32_\n\treturn 1\nfunction f : () -> _builtin_int32_\n\treturn 2\n",
    );
    assert!(diags.contains("function declaration previously declared"));
}

#[test]
fn type_declaration_needs_at_least_one_object() {
    let (_, _, diags) = parse_src("type Empty : ()\n");
    assert!(diags.contains("type declaration must declare a type"));
}

/// 別名の別名は 1 段だけ解決され、基底の組み込み型までは辿らない。
#[test]
fn alias_of_alias_resolves_one_step_only() {
    let (_, types, diags) = parse_src("type A : _builtin_uint32_\ntype B : A\n");
    assert!(diags.entries().is_empty(), "{}", diags.render());

    let b = types.resolve("B").expect("B");
    let a = types.resolve("A").expect("A");
    let builtin = types.resolve("_builtin_uint32_").expect("builtin");

    assert_eq!(types.underlying(b), a);
    assert_eq!(types.entry(types.underlying(b)).kind, TypeKind::Alias);
    assert_eq!(types.underlying(a), builtin);
}

#[test]
fn resolve_and_check_follows_one_alias_step() {
    let (_, types, _) = parse_src("type A : _builtin_uint32_\ntype B : A\n");
    let mut diags = diags();
    let resolved = types.resolve_and_check(&ident("B"), &mut diags).expect("resolve");
    assert_eq!(Some(resolved), types.resolve("A"));
}

#[test]
fn unknown_type_reference_is_fatal() {
    let types = TypeSystem::new();
    let mut diags = diags();
    assert!(types.resolve_and_check(&ident("Nope"), &mut diags).is_err());
    assert!(diags.contains("type has not been declared"));
}

#[test]
fn literal_has_no_intrinsic_type() {
    let types = TypeSystem::new();
    let mut diags = diags();
    let inferred = types.infer(&literal("5"), &mut diags).expect("infer");
    assert!(inferred.is_none());
}

#[test]
fn binary_expression_with_two_literals_is_fatal() {
    let types = TypeSystem::new();
    let mut diags = diags();
    let expr = Expr::Binary(BinaryExpr {
        op: BinaryOp::Addition,
        lhs: Box::new(literal("1")),
        rhs: Box::new(literal("2")),
        start: ident("1"),
    });
    assert!(types.infer(&expr, &mut diags).is_err());
    assert!(diags.contains("both sides of binary expression are literal expressions"));
}

#[test]
fn binary_expression_takes_type_from_non_literal_side() {
    let mut types = TypeSystem::new();
    let i32_id = types.resolve("_builtin_int32_").expect("builtin");
    types.insert_named("x", i32_id);

    let mut diags = diags();
    let expr = Expr::Binary(BinaryExpr {
        op: BinaryOp::Addition,
        lhs: Box::new(literal("1")),
        rhs: Box::new(var("x")),
        start: ident("1"),
    });
    let inferred = types.infer(&expr, &mut diags).expect("infer");
    assert_eq!(inferred, Some(i32_id));
}

#[test]
fn unknown_variable_reference_is_fatal() {
    let types = TypeSystem::new();
    let mut diags = diags();
    assert!(types.infer(&var("ghost"), &mut diags).is_err());
    assert!(diags.contains("can not determine type for variable expression"));
}

#[test]
fn named_scope_is_cleared_between_functions() {
    let mut types = TypeSystem::new();
    let id = types.resolve("_builtin_int32_").expect("builtin");
    types.insert_named("x", id);
    assert_eq!(types.lookup_named("x"), Some(id));
    types.clear_named();
    assert_eq!(types.lookup_named("x"), None);
}

#[test]
fn signed_unsigned_mix_is_incompatible() {
    let mut types = TypeSystem::new();
    let signed = types.resolve("_builtin_int32_").expect("builtin");
    let unsigned = types.resolve("_builtin_uint32_").expect("builtin");
    types.insert_named("a", signed);
    types.insert_named("b", unsigned);

    let mut diags = diags();
    assert!(types.check_compatible(&var("a"), &var("b"), &mut diags).is_err());
    assert!(diags.contains("comparison of signed and unsigned integers not supported"));
}

#[test]
fn literal_operand_skips_compatibility_check() {
    let mut types = TypeSystem::new();
    let signed = types.resolve("_builtin_int32_").expect("builtin");
    types.insert_named("a", signed);

    let mut diags = diags();
    types
        .check_compatible(&var("a"), &literal("1"), &mut diags)
        .expect("literal side is unchecked");
    assert!(diags.entries().is_empty());
}

#[test]
fn import_copies_declarations_and_reports_collisions() {
    let (_, lib_types, _) = parse_src("type A : _builtin_int32_\n");

    // 衝突しない取り込み。
    let mut fresh = TypeSystem::new();
    let mut clean = diags();
    fresh
        .import(&lib_types, &ident("lib.unv"), &mut clean)
        .expect("import");
    assert!(fresh.resolve("A").is_some());
    assert!(clean.entries().is_empty());

    // 同名宣言がある側への取り込みは重複として数える。
    let (_, mut main_types, _) = parse_src("type A : _builtin_int32_\n");
    let mut collided = diags();
    main_types
        .import(&lib_types, &ident("lib.unv"), &mut collided)
        .expect("import");
    assert!(collided.contains("type declaration previously declared"));
}
