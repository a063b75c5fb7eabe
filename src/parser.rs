// パス: src/parser.rs
// 役割: トークン列から AST を構築し、宣言を型システムへ登録する構文解析器
// 意図: 添字ベースの先読みとインデント計測で、改行区切りの文法を 1 パスで解く
// 関連ファイル: src/lexer.rs, src/ast.rs, src/typesystem.rs, src/diag.rs
//! 構文解析モジュール
//!
//! - 先読みは添字でのみ行い、コメント（と直前の空白）を透過的に読み飛ばす。
//! - インデントは最初に現れた空白幅を 1 スコープ単位として固定し、以後は
//!   その倍数だけを許す。タブの場合は文字数がそのままスコープ段数になる。
//! - 文法違反は「expecting X for Y」形式で報告し、その宣言の解析を打ち切って
//!   `Ok(None)` を返す。トップレベルのループは次のトークンから回復を試みる。
//! - 型・関数宣言は解析が完了した時点で型システムへ登録する。

use crate::ast::{
    BinaryExpr, BinaryOp, Expr, FuncCallExpr, FuncDecl, FuncDef, IfStmt, IncludeDecl, LiteralExpr,
    ReturnStmt, Stmt, TranslationUnit, TypeCtorExpr, TypeDecl, TypeDeclKind, TypeObject, TypeParam,
    VarDeclStmt, VarExpr,
};
use crate::diag::{Diagnostics, FatalError};
use crate::token::{Token, TokenKind};
use crate::typesystem::TypeSystem;

/// トークン列を解析して翻訳単位を返す。
///
/// 回復可能エラーはシンクへ記録して解析を続け、致命エラーのみ `Err` になる。
pub fn parse(
    tokens: &[Token],
    types: &mut TypeSystem,
    diags: &mut Diagnostics,
) -> Result<TranslationUnit, FatalError> {
    Parser::new(tokens, types, diags).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentKind {
    Spaces,
    Tabs,
}

struct Parser<'a> {
    tokens: &'a [Token],
    index: isize,
    indent: Option<IndentKind>,
    unit_spaces: usize,
    scope: usize,
    expected_scope: usize,
    namespace: String,
    context: Vec<&'static str>,
    types: &'a mut TypeSystem,
    diags: &'a mut Diagnostics,
    unit: TranslationUnit,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], types: &'a mut TypeSystem, diags: &'a mut Diagnostics) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| t.kind),
            Some(TokenKind::EndOfFile)
        ));
        Self {
            tokens,
            index: -1,
            indent: None,
            unit_spaces: 0,
            scope: 0,
            expected_scope: 0,
            namespace: String::new(),
            context: Vec::new(),
            types,
            diags,
            unit: TranslationUnit::default(),
        }
    }

    fn run(mut self) -> Result<TranslationUnit, FatalError> {
        let mut attributes: Vec<Token> = Vec::new();
        loop {
            let tok = self.advance(1);
            match tok.kind {
                TokenKind::EndOfFile => break,
                TokenKind::Newline => continue,
                TokenKind::Include => self.parse_include_decl()?,
                TokenKind::Namespace => self.parse_namespace()?,
                TokenKind::OpenSquare => attributes = self.parse_type_attrs()?,
                TokenKind::Type => {
                    let attr = std::mem::take(&mut attributes);
                    self.parse_type_decl(attr)?;
                }
                TokenKind::Function => {
                    let attr = std::mem::take(&mut attributes);
                    self.parse_func_decl(attr)?;
                }
                _ => {
                    return Err(self
                        .diags
                        .fatal(&tok, "unexpected token when parsing translation unit"));
                }
            }
        }
        Ok(self.unit)
    }

    // ----- トークンカーソル -----

    fn last(&self) -> usize {
        self.tokens.len() - 1
    }

    fn raw(&self, index: isize) -> &Token {
        let clamped = index.clamp(0, self.last() as isize) as usize;
        &self.tokens[clamped]
    }

    fn skippable(&self, index: isize) -> bool {
        let tok = self.raw(index);
        tok.kind == TokenKind::Comment
            || (tok.kind == TokenKind::Whitespace && self.raw(index + 1).kind == TokenKind::Comment)
    }

    /// カーソルを `count` トークン進めて新しい現在トークンを返す。
    /// コメントとその直前の空白は透過的に読み飛ばす。
    fn advance(&mut self, count: usize) -> Token {
        for _ in 0..count {
            self.index += 1;
            while (self.index as usize) < self.last() && self.skippable(self.index) {
                self.index += 1;
            }
            if self.index > self.last() as isize {
                self.index = self.last() as isize;
            }
        }
        self.current()
    }

    fn current(&self) -> Token {
        self.raw(self.index).clone()
    }

    /// 現在位置から `count` 個先のトークンを（消費せずに）覗く。
    fn look(&self, count: usize) -> Token {
        let mut index = self.index;
        for _ in 0..count {
            index += 1;
            while (index as usize) < self.last() && self.skippable(index) {
                index += 1;
            }
        }
        self.raw(index).clone()
    }

    fn at_last(&self) -> bool {
        self.look(1).kind == TokenKind::EndOfFile
    }

    // ----- 文脈と期待チェック -----

    fn with_context<T>(
        &mut self,
        name: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, FatalError>,
    ) -> Result<T, FatalError> {
        self.context.push(name);
        let result = f(self);
        self.context.pop();
        result
    }

    fn with_nested_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, FatalError>,
    ) -> Result<T, FatalError> {
        self.expected_scope += 1;
        let result = f(self);
        self.expected_scope -= 1;
        result
    }

    /// トークン種別が期待どおりか検査し、違えば回復可能エラーを記録する。
    fn expect(&mut self, tok: &Token, kind: TokenKind) -> Result<bool, FatalError> {
        if tok.kind == kind {
            return Ok(true);
        }
        let context = self.context.last().copied().unwrap_or("translation unit");
        self.diags
            .error(tok, format!("expecting {} for {}", kind.label(), context))?;
        Ok(false)
    }

    // ----- インデント -----

    fn check_leading_whitespace(&mut self, tok: &Token) -> Result<bool, FatalError> {
        if self.indent == Some(IndentKind::Tabs) {
            self.diags
                .error(tok, "unexpected ' ' when already using '\\t' for indentation")?;
            return Ok(false);
        }
        self.indent = Some(IndentKind::Spaces);
        let spaces = tok.width();
        if self.unit_spaces == 0 {
            self.unit_spaces = spaces;
        } else if spaces % self.unit_spaces != 0 {
            self.diags.error(
                tok,
                format!(
                    "number of spaces in indentation level is not divisable by {}",
                    self.unit_spaces
                ),
            )?;
            return Ok(false);
        }
        self.scope = spaces / self.unit_spaces;
        Ok(true)
    }

    fn check_leading_tab(&mut self, tok: &Token) -> Result<bool, FatalError> {
        if self.indent == Some(IndentKind::Spaces) {
            self.diags
                .error(tok, "unexpected '\\t' when already using ' ' for indentation")?;
            return Ok(false);
        }
        self.indent = Some(IndentKind::Tabs);
        self.scope = tok.width();
        Ok(true)
    }

    /// 行頭のインデントを消費して期待スコープと照合する。
    fn parse_indent(&mut self, expected: usize) -> Result<bool, FatalError> {
        let next = self.look(1).kind;
        if next != TokenKind::Whitespace && next != TokenKind::Tab {
            return Ok(false);
        }

        let tok = self.advance(1);
        let ok = match tok.kind {
            TokenKind::Whitespace => self.check_leading_whitespace(&tok)?,
            _ => self.check_leading_tab(&tok)?,
        };
        if !ok {
            return Ok(false);
        }

        if self.scope != expected {
            self.diags.error(&tok, "indentation level is incorrect")?;
            return Ok(false);
        }
        Ok(true)
    }

    // ----- 宣言 -----

    fn parse_include_decl(&mut self) -> Result<(), FatalError> {
        self.with_context("include declaration", |p| {
            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::StringLiteral)? {
                return Ok(());
            }

            p.unit.includes.push(IncludeDecl { path: tok });
            Ok(())
        })
    }

    // namespace Name::Space
    fn parse_namespace(&mut self) -> Result<(), FatalError> {
        self.with_context("namespace declaration", |p| {
            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            let mut namespace = String::new();
            loop {
                let tok = p.advance(1);
                if !p.expect(&tok, TokenKind::Identifier)? {
                    return Ok(());
                }
                namespace.push_str(&tok.text);

                if p.look(1).kind != TokenKind::Colon {
                    break;
                }
                let tok = p.advance(2);
                if !p.expect(&tok, TokenKind::Colon)? {
                    return Ok(());
                }
                namespace.push_str("::");
            }

            p.namespace = namespace;
            Ok(())
        })
    }

    // [attr(, attr)*]\n
    fn parse_type_attrs(&mut self) -> Result<Vec<Token>, FatalError> {
        self.with_context("type attribute", |p| {
            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Extern)? {
                return Ok(Vec::new());
            }

            let mut attributes = vec![tok];
            while p.look(1).kind == TokenKind::Comma {
                let tok = p.advance(2);
                if !p.expect(&tok, TokenKind::Whitespace)? {
                    return Ok(Vec::new());
                }
                let tok = p.advance(1);
                if !p.expect(&tok, TokenKind::Extern)? {
                    return Ok(Vec::new());
                }
                attributes.push(tok);
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::CloseSquare)? {
                return Ok(Vec::new());
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Newline)? {
                return Ok(Vec::new());
            }

            let next = p.look(1).kind;
            if next != TokenKind::Type && next != TokenKind::Function {
                return Err(p
                    .diags
                    .fatal(&tok, "expecting type or function to follow type attribute"));
            }

            Ok(attributes)
        })
    }

    // type Foo<T, U>? : (b1:Bar(, b2:Baz)*) | type Foo : Bar
    fn parse_type_decl(&mut self, attributes: Vec<Token>) -> Result<(), FatalError> {
        self.with_context("type declaration", |p| {
            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            let name = p.advance(1);
            if !p.expect(&name, TokenKind::Identifier)? {
                return Ok(());
            }

            if name.text.starts_with(|c: char| c.is_ascii_lowercase()) {
                p.diags
                    .error(&name, "type names must begin with an upper case char")?;
                return Ok(());
            }

            let mut tok = p.advance(1);

            let mut params = Vec::new();
            if tok.kind == TokenKind::LessThan {
                let next = p.look(1);
                if !p.expect(&next, TokenKind::Identifier)? {
                    return Ok(());
                }
                params = match p.parse_type_params()? {
                    Some(params) => params,
                    None => return Ok(()),
                };
                tok = p.advance(1);
            }

            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Colon)? {
                return Ok(());
            }

            let objects;
            let tok;
            if p.look(1).kind == TokenKind::Whitespace && p.look(2).kind == TokenKind::OpenParen {
                objects = match p.parse_type_objects()? {
                    Some(objects) => objects,
                    None => return Ok(()),
                };
                tok = p.advance(1);
            } else {
                let ws = p.advance(1);
                if !p.expect(&ws, TokenKind::Whitespace)? {
                    return Ok(());
                }

                let first = p.advance(1);
                let object = match p.parse_type_object()? {
                    Some(object) => object,
                    None => {
                        return Err(p
                            .diags
                            .fatal(&first, "expected single type for type alias declaration"));
                    }
                };
                objects = vec![object];
                tok = p.current();
            }

            if !p.expect(&tok, TokenKind::Newline)? {
                return Ok(());
            }

            let kind = if objects.len() < 2 {
                TypeDeclKind::Alias
            } else {
                TypeDeclKind::Struct
            };

            let decl = TypeDecl {
                kind,
                name,
                namespace: p.namespace.clone(),
                objects,
                params,
                attributes,
            };

            if !p.types.add_type(&decl, p.diags)? {
                return Ok(());
            }
            p.unit.types.push(decl);
            Ok(())
        })
    }

    // function foo<T, U>? : (a:Foo(, b:Bar)*)? -> Baz
    fn parse_func_decl(&mut self, attributes: Vec<Token>) -> Result<(), FatalError> {
        self.with_context("function declaration", |p| {
            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            let name = p.advance(1);
            if !p.expect(&name, TokenKind::Identifier)? {
                return Ok(());
            }

            if name.text.starts_with(|c: char| c.is_ascii_uppercase()) {
                p.diags
                    .error(&name, "function names must begin with a lower case char")?;
                return Ok(());
            }

            let mut tok = p.advance(1);

            let mut params = Vec::new();
            if tok.kind == TokenKind::LessThan {
                let next = p.look(1);
                if !p.expect(&next, TokenKind::Identifier)? {
                    return Ok(());
                }
                params = match p.parse_type_params()? {
                    Some(params) => params,
                    None => return Ok(()),
                };
                tok = p.advance(1);
            }

            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Colon)? {
                return Ok(());
            }

            let mut objects = Vec::new();
            if p.look(1).kind == TokenKind::Whitespace && p.look(2).kind == TokenKind::OpenParen {
                objects = match p.parse_type_objects()? {
                    Some(objects) => objects,
                    None => return Ok(()),
                };
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Minus)? {
                return Ok(());
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::GreaterThan)? {
                return Ok(());
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(());
            }

            p.advance(1);
            let return_type = match p.parse_type_object()? {
                Some(object) => object,
                None => return Ok(()),
            };

            let tok = p.current();
            if !p.expect(&tok, TokenKind::Newline)? {
                return Ok(());
            }

            let body;
            if attributes.iter().any(|t| t.kind == TokenKind::Extern) {
                p.parse_empty_func_def()?;
                body = None;
            } else {
                body = match p.parse_func_def()? {
                    Some(def) => Some(def),
                    None => return Ok(()),
                };
            }

            let decl = FuncDecl {
                name,
                namespace: p.namespace.clone(),
                objects,
                return_type,
                params,
                attributes,
                body,
            };

            if !p.types.add_function(&decl, p.diags)? {
                return Ok(());
            }
            p.unit.funcs.push(decl);
            Ok(())
        })
    }

    // ----- 型オブジェクト・ジェネリックパラメータ -----

    fn parse_type_objects(&mut self) -> Result<Option<Vec<TypeObject>>, FatalError> {
        let mut unnamed = false;
        let mut objects = Vec::new();
        let first = self.advance(3);
        if first.kind == TokenKind::Identifier {
            while let Some(object) = self.parse_type_object()? {
                if object.name.is_none() {
                    unnamed = true;
                }
                objects.push(object);
            }
        }

        let tok = self.current();
        if !self.expect(&tok, TokenKind::CloseParen)? {
            return Ok(None);
        }

        if unnamed && objects.len() > 1 {
            self.diags.error(
                &first,
                "a type object list must consist of named objects or only one unnamed object",
            )?;
            return Ok(None);
        }

        Ok(Some(objects))
    }

    fn parse_type_object(&mut self) -> Result<Option<TypeObject>, FatalError> {
        self.with_context("type object", |p| {
            let mut tok = p.current();
            if tok.kind == TokenKind::Comma {
                let ws = p.advance(1);
                if !p.expect(&ws, TokenKind::Whitespace)? {
                    return Ok(None);
                }
                tok = p.advance(1);
            } else if tok.kind == TokenKind::CloseParen {
                return Ok(None);
            }

            if !p.expect(&tok, TokenKind::Identifier)? {
                return Ok(None);
            }

            let identifier1 = tok;
            let mut identifier2 = None;

            let mut params = Vec::new();
            if p.look(1).kind == TokenKind::LessThan {
                p.advance(1);
                let next = p.look(1);
                if !p.expect(&next, TokenKind::Identifier)? {
                    return Ok(None);
                }
                params = match p.parse_type_params()? {
                    Some(params) => params,
                    None => return Ok(None),
                };
            } else if p.look(1).kind == TokenKind::Colon {
                let tok = p.advance(2);
                if !p.expect(&tok, TokenKind::Identifier)? {
                    return Ok(None);
                }
                identifier2 = Some(tok);

                if p.look(1).kind == TokenKind::LessThan {
                    p.advance(1);
                    let next = p.look(1);
                    if !p.expect(&next, TokenKind::Identifier)? {
                        return Ok(None);
                    }
                    params = match p.parse_type_params()? {
                        Some(params) => params,
                        None => return Ok(None),
                    };
                }
            }

            p.advance(1);

            let object = match identifier2 {
                Some(type_name) => TypeObject {
                    name: Some(identifier1),
                    type_name,
                    params,
                },
                None => TypeObject {
                    name: None,
                    type_name: identifier1,
                    params,
                },
            };
            Ok(Some(object))
        })
    }

    fn parse_type_params(&mut self) -> Result<Option<Vec<TypeParam>>, FatalError> {
        self.advance(1); // '<' を消費
        let mut params = Vec::new();
        while let Some(param) = self.parse_type_param()? {
            params.push(param);
        }

        let tok = self.current();
        if !self.expect(&tok, TokenKind::GreaterThan)? {
            return Ok(None);
        }
        Ok(Some(params))
    }

    fn parse_type_param(&mut self) -> Result<Option<TypeParam>, FatalError> {
        let mut tok = self.current();
        if tok.kind == TokenKind::Comma {
            let ws = self.advance(1);
            if !self.expect(&ws, TokenKind::Whitespace)? {
                return Ok(None);
            }
            tok = self.advance(1);
        } else if tok.kind == TokenKind::GreaterThan {
            return Ok(None);
        }

        if !self.expect(&tok, TokenKind::Identifier)? {
            return Ok(None);
        }

        self.advance(1);
        Ok(Some(TypeParam { name: tok }))
    }

    // ----- 関数本体と文 -----

    fn parse_func_def(&mut self) -> Result<Option<FuncDef>, FatalError> {
        self.with_context("function definition", |p| {
            p.with_nested_scope(|p| {
                let start = p.current();
                let mut stmts = Vec::new();
                while let Some(stmt) = p.parse_stmt()? {
                    stmts.push(stmt);
                }

                if stmts.is_empty() {
                    p.diags
                        .error(&start, "function must define at least one statement")?;
                    return Ok(None);
                }

                Ok(Some(FuncDef { stmts }))
            })
        })
    }

    /// extern 関数の本体位置を検査する。文があれば回復可能エラー。
    fn parse_empty_func_def(&mut self) -> Result<(), FatalError> {
        self.with_context("function definition", |p| {
            p.with_nested_scope(|p| {
                let start = p.current();
                let mut found = false;
                while p.parse_stmt()?.is_some() {
                    found = true;
                }
                if found {
                    p.diags.error(
                        &start,
                        "function with extern attribute must not define any statements",
                    )?;
                }
                Ok(())
            })
        })
    }

    fn parse_stmt(&mut self) -> Result<Option<Stmt>, FatalError> {
        self.with_context("statement", |p| {
            while p.current().kind == TokenKind::Newline && p.look(1).kind == TokenKind::Newline {
                p.advance(1);
            }

            if p.current().kind == TokenKind::Newline && !p.parse_indent(p.expected_scope)? {
                return Ok(None);
            }

            if p.at_last() {
                return Ok(None);
            }

            let tok = p.advance(1);
            match tok.kind {
                TokenKind::If => p.parse_if_stmt(),
                TokenKind::Return => p.parse_return_stmt(),
                TokenKind::Identifier => p.parse_var_decl_stmt(),
                _ => Ok(None),
            }
        })
    }

    fn parse_if_stmt(&mut self) -> Result<Option<Stmt>, FatalError> {
        self.with_context("if statement", |p| {
            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(None);
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::OpenParen)? {
                return Ok(None);
            }

            let condition = match p.parse_expr()? {
                Some(expr) => expr,
                None => return Ok(None),
            };

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::CloseParen)? {
                return Ok(None);
            }

            let tok = p.advance(1);

            let stmt = p.with_nested_scope(|p| p.parse_stmt())?;
            let then = match stmt {
                Some(stmt) => stmt,
                None => {
                    p.diags.error(&tok, "no statement following condition")?;
                    return Ok(None);
                }
            };

            Ok(Some(Stmt::If(IfStmt {
                condition,
                then: Box::new(then),
            })))
        })
    }

    fn parse_return_stmt(&mut self) -> Result<Option<Stmt>, FatalError> {
        self.with_context("return statement", |p| {
            let keyword = p.current();

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(None);
            }

            let expr = match p.parse_expr()? {
                Some(expr) => expr,
                None => return Ok(None),
            };

            // ファイル末尾の return は改行が無くてもよい。
            let tok = p.advance(1);
            if tok.kind != TokenKind::EndOfFile && !p.expect(&tok, TokenKind::Newline)? {
                return Ok(None);
            }

            Ok(Some(Stmt::Return(ReturnStmt { keyword, expr })))
        })
    }

    fn parse_var_decl_stmt(&mut self) -> Result<Option<Stmt>, FatalError> {
        self.with_context("variable declaration statement", |p| {
            let type_name = p.current();

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(None);
            }

            let name = p.advance(1);
            if !p.expect(&name, TokenKind::Identifier)? {
                return Ok(None);
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(None);
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Equals)? {
                return Ok(None);
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(None);
            }

            let expr = match p.parse_type_ctor_expr()? {
                Some(expr) => expr,
                None => {
                    p.diags
                        .error(&tok, "expected expression for variable initialization")?;
                    return Ok(None);
                }
            };

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::Newline)? {
                return Ok(None);
            }

            Ok(Some(Stmt::VarDecl(VarDeclStmt {
                type_name,
                name,
                expr,
            })))
        })
    }

    // ----- 式 -----

    fn parse_expr(&mut self) -> Result<Option<Expr>, FatalError> {
        self.with_context("expression", |p| {
            let lhs = match p.parse_basic_expr()? {
                Some(expr) => expr,
                None => return Ok(None),
            };
            p.parse_binary_op_expr(0, lhs)
        })
    }

    fn parse_basic_expr(&mut self) -> Result<Option<Expr>, FatalError> {
        self.with_context("basic expression", |p| {
            let tok = p.advance(1);
            let expr = match tok.kind {
                TokenKind::Identifier => {
                    if p.look(1).kind == TokenKind::OpenParen {
                        p.parse_func_call_expr()?
                    } else {
                        Some(Expr::Var(VarExpr { name: tok }))
                    }
                }
                TokenKind::BinLiteral
                | TokenKind::DecLiteral
                | TokenKind::False
                | TokenKind::FloatLiteral
                | TokenKind::HexLiteral
                | TokenKind::OctLiteral
                | TokenKind::StringLiteral
                | TokenKind::True => Some(Expr::Literal(LiteralExpr { literal: tok })),
                _ => None,
            };
            Ok(expr)
        })
    }

    /// 優先順位のぼり法による 2 項式の拡張。
    ///
    /// 比較が 1、加減算が 2、乗除算が 3。しきい値以上の演算子だけを
    /// 取り込み、`a + b * c` は `a + (b * c)` にまとまる。
    fn parse_binary_op_expr(
        &mut self,
        precedence: u8,
        mut lhs: Expr,
    ) -> Result<Option<Expr>, FatalError> {
        loop {
            if self.look(1).kind != TokenKind::Whitespace {
                return Ok(Some(lhs));
            }

            let mut new_precedence = precedence;
            let candidate = self.look(2);

            let op;
            let after;
            match candidate.kind {
                TokenKind::Equals
                    if self.look(3).kind == TokenKind::Equals && precedence <= 1 =>
                {
                    op = BinaryOp::Equality;
                    after = self.advance(4);
                }
                TokenKind::Bang if self.look(3).kind == TokenKind::Equals && precedence <= 1 => {
                    op = BinaryOp::NotEquality;
                    after = self.advance(4);
                }
                TokenKind::LessThan | TokenKind::GreaterThan
                    if self.look(3).kind == TokenKind::Equals && precedence <= 1 =>
                {
                    op = if candidate.kind == TokenKind::LessThan {
                        BinaryOp::LessThanOrEquality
                    } else {
                        BinaryOp::GreaterThanOrEquality
                    };
                    after = self.advance(4);
                }
                TokenKind::LessThan | TokenKind::GreaterThan if precedence <= 1 => {
                    op = if candidate.kind == TokenKind::LessThan {
                        BinaryOp::LessThan
                    } else {
                        BinaryOp::GreaterThan
                    };
                    after = self.advance(3);
                }
                TokenKind::Plus | TokenKind::Minus if precedence <= 2 => {
                    op = if candidate.kind == TokenKind::Plus {
                        BinaryOp::Addition
                    } else {
                        BinaryOp::Subtraction
                    };
                    after = self.advance(3);
                    new_precedence = 2;
                }
                TokenKind::Star | TokenKind::Slash if precedence <= 3 => {
                    op = if candidate.kind == TokenKind::Star {
                        BinaryOp::Multiplication
                    } else {
                        BinaryOp::Division
                    };
                    after = self.advance(3);
                    new_precedence = 3;
                }
                _ => return Ok(Some(lhs)),
            }

            if !self.expect(&after, TokenKind::Whitespace)? {
                return Ok(None);
            }

            let rhs = match self.parse_basic_expr()? {
                Some(expr) => expr,
                None => return Ok(None),
            };

            let rhs = match self.parse_binary_op_expr(new_precedence, rhs.clone())? {
                Some(expr) => expr,
                None => rhs,
            };

            let start = lhs.start().clone();
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                start,
            });
        }
    }

    fn parse_func_call_expr(&mut self) -> Result<Option<Expr>, FatalError> {
        self.with_context("function call expression", |p| {
            let callee = p.current();

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::OpenParen)? {
                return Ok(None);
            }

            let args = match p.parse_expr_list()? {
                Some(args) => args,
                None => return Ok(None),
            };

            Ok(Some(Expr::FuncCall(FuncCallExpr { callee, args })))
        })
    }

    fn parse_type_ctor_expr(&mut self) -> Result<Option<TypeCtorExpr>, FatalError> {
        self.with_context("type constructor expression", |p| {
            if p.look(1).kind != TokenKind::New {
                let expr = match p.parse_expr()? {
                    Some(expr) => expr,
                    None => {
                        let tok = p.current();
                        p.diags.error(
                            &tok,
                            "expecting a single valid expression to follow '=' without 'new' keyword",
                        )?;
                        return Ok(None);
                    }
                };
                return Ok(Some(TypeCtorExpr {
                    type_name: None,
                    args: vec![expr],
                }));
            }

            let tok = p.advance(2);
            if !p.expect(&tok, TokenKind::Whitespace)? {
                return Ok(None);
            }

            let type_name = p.advance(1);
            if !p.expect(&type_name, TokenKind::Identifier)? {
                return Ok(None);
            }

            let tok = p.advance(1);
            if !p.expect(&tok, TokenKind::OpenParen)? {
                return Ok(None);
            }

            let args = match p.parse_expr_list()? {
                Some(args) => args,
                None => return Ok(None),
            };

            Ok(Some(TypeCtorExpr {
                type_name: Some(type_name),
                args,
            }))
        })
    }

    /// `(` の直後から `)` まで、カンマ区切りの式の並びを読む。
    fn parse_expr_list(&mut self) -> Result<Option<Vec<Expr>>, FatalError> {
        let mut args = Vec::new();
        while let Some(expr) = self.parse_expr()? {
            args.push(expr);

            if self.look(1).kind == TokenKind::Comma {
                let tok = self.advance(2);
                if !self.expect(&tok, TokenKind::Whitespace)? {
                    return Ok(None);
                }
            }
        }

        // 最後の式の解析試行が閉じ括弧まで進めているので、ここでは進めない。
        let tok = self.current();
        if !self.expect(&tok, TokenKind::CloseParen)? {
            return Ok(None);
        }
        Ok(Some(args))
    }
}
