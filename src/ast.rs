// パス: src/ast.rs
// 役割: 翻訳単位を構成する宣言・文・式の抽象構文木定義
// 意図: 閉じた直和型と排他所有で木を表し、後段は網羅的 match で走査する
// 関連ファイル: src/parser.rs, src/typesystem.rs, src/codegen/cranelift.rs
//! 抽象構文木（AST）
//!
//! - 親ノードが子を排他的に所有する純粋な木で、共有も循環もない。
//! - 各式は診断のために自分の開始トークンを保持する。
//! - 2 項式の開始トークンは左オペランドの開始トークンを引き継ぐ
//!   （式の先頭を指す診断を出すため）。

use crate::token::Token;

/// 1 ファイル分の宣言の並び。インクルード・型・関数を宣言順に保持する。
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub includes: Vec<IncludeDecl>,
    pub types: Vec<TypeDecl>,
    pub funcs: Vec<FuncDecl>,
}

/// `include "path"` 宣言。トークンは引用符込みの逐語テキストを持つ。
#[derive(Debug, Clone)]
pub struct IncludeDecl {
    pub path: Token,
}

impl IncludeDecl {
    /// 引用符を除いたインクルードパスを返す。
    pub fn path_text(&self) -> &str {
        self.path.text.trim_matches('"')
    }
}

/// 型宣言の種別。フィールドが 1 個なら別名、2 個以上なら構造体。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeclKind {
    Alias,
    Struct,
}

/// `type Name<T>? : (field:Type, ...)` 宣言。
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub kind: TypeDeclKind,
    pub name: Token,
    pub namespace: String,
    pub objects: Vec<TypeObject>,
    pub params: Vec<TypeParam>,
    pub attributes: Vec<Token>,
}

impl TypeDecl {
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name.text)
    }
}

/// フィールド・仮引数・戻り値を表す「名前付きかもしれない型参照」。
#[derive(Debug, Clone)]
pub struct TypeObject {
    pub name: Option<Token>,
    pub type_name: Token,
    pub params: Vec<TypeParam>,
}

impl TypeObject {
    pub fn binding_name(&self) -> Option<&str> {
        self.name.as_ref().map(|t| t.text.as_str())
    }
}

/// ジェネリックパラメータ名。構文上保持するのみで意味付けはまだ無い。
#[derive(Debug, Clone)]
pub struct TypeParam {
    pub name: Token,
}

/// `function name<T>? : (args) -> Return` 宣言と任意の本体。
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Token,
    pub namespace: String,
    pub objects: Vec<TypeObject>,
    pub return_type: TypeObject,
    pub params: Vec<TypeParam>,
    pub attributes: Vec<Token>,
    /// `extern` 属性付き宣言では `None`。
    pub body: Option<FuncDef>,
}

impl FuncDecl {
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name.text)
    }

    pub fn is_extern(&self) -> bool {
        self.attributes
            .iter()
            .any(|t| t.kind == crate::token::TokenKind::Extern)
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_owned()
    } else {
        format!("{namespace}::{name}")
    }
}

/// 関数本体。少なくとも 1 文を含む（パーサが保証する）。
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub stmts: Vec<Stmt>,
}

/// 文。
#[derive(Debug, Clone)]
pub enum Stmt {
    If(IfStmt),
    Return(ReturnStmt),
    VarDecl(VarDeclStmt),
}

/// else を持たない `if (cond) stmt`。
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then: Box<Stmt>,
}

/// `return expr`。
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub keyword: Token,
    pub expr: Expr,
}

/// `Type name = expr` 形式のローカル変数宣言。
#[derive(Debug, Clone)]
pub struct VarDeclStmt {
    pub type_name: Token,
    pub name: Token,
    pub expr: TypeCtorExpr,
}

/// 2 項演算子。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equality,
    NotEquality,
    LessThanOrEquality,
    GreaterThanOrEquality,
    LessThan,
    GreaterThan,
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Equality => "==",
            BinaryOp::NotEquality => "!=",
            BinaryOp::LessThanOrEquality => "<=",
            BinaryOp::GreaterThanOrEquality => ">=",
            BinaryOp::LessThan => "<",
            BinaryOp::GreaterThan => ">",
            BinaryOp::Addition => "+",
            BinaryOp::Subtraction => "-",
            BinaryOp::Multiplication => "*",
            BinaryOp::Division => "/",
        }
    }

    /// 比較演算子（結果が 1 ビット真偽値になるもの）か。
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equality
                | BinaryOp::NotEquality
                | BinaryOp::LessThanOrEquality
                | BinaryOp::GreaterThanOrEquality
                | BinaryOp::LessThan
                | BinaryOp::GreaterThan
        )
    }
}

/// 式。
#[derive(Debug, Clone)]
pub enum Expr {
    Binary(BinaryExpr),
    FuncCall(FuncCallExpr),
    TypeCtor(TypeCtorExpr),
    Var(VarExpr),
    Literal(LiteralExpr),
}

impl Expr {
    /// 診断が指すべき式の開始トークン。
    pub fn start(&self) -> &Token {
        match self {
            Expr::Binary(e) => &e.start,
            Expr::FuncCall(e) => &e.callee,
            Expr::TypeCtor(e) => match &e.type_name {
                Some(tok) => tok,
                None => e.args[0].start(),
            },
            Expr::Var(e) => &e.name,
            Expr::Literal(e) => &e.literal,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }
}

/// `lhs op rhs`。`start` は左オペランドの開始トークン。
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub start: Token,
}

/// `callee(arg, ...)`。
#[derive(Debug, Clone)]
pub struct FuncCallExpr {
    pub callee: Token,
    pub args: Vec<Expr>,
}

/// `new Type(args)`、または型注釈を持たない透過ラッパ。
///
/// 型注釈が無い場合 `args` はちょうど 1 要素で、変数宣言の初期化子の
/// 暗黙変換位置として働く。
#[derive(Debug, Clone)]
pub struct TypeCtorExpr {
    pub type_name: Option<Token>,
    pub args: Vec<Expr>,
}

/// 変数参照。
#[derive(Debug, Clone)]
pub struct VarExpr {
    pub name: Token,
}

/// リテラル。固有の型は持たず、文脈の型に対して検査される。
#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub literal: Token,
}
