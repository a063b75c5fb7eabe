// パス: src/astprinter.rs
// 役割: 構文木をインデント付きテキストへ整形するダンプ出力
// 意図: --emit=ast の出力として木構造を深さ 2 桁のインデントで可視化する
// 関連ファイル: src/ast.rs, src/lib.rs, src/bin/unvc.rs
//! AST ダンプ
//!
//! 各ノードを 1 行で出力し、深さごとに 2 桁インデントする。ノード名の後ろに
//! 識別に役立つトークンテキストを付ける。

use crate::ast::{Expr, FuncDecl, Stmt, TranslationUnit, TypeCtorExpr, TypeDecl, TypeObject};

/// 翻訳単位全体を整形して返す。
pub fn print(unit: &TranslationUnit) -> String {
    let mut printer = AstPrinter::default();
    printer.unit(unit);
    printer.out
}

#[derive(Default)]
struct AstPrinter {
    out: String,
    scope: usize,
}

impl AstPrinter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.scope {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.scope += 1;
        f(self);
        self.scope -= 1;
    }

    fn unit(&mut self, unit: &TranslationUnit) {
        self.line("TranslationUnit");
        self.nested(|p| {
            for include in &unit.includes {
                p.line(&format!("IncludeDecl {}", include.path.text));
            }
            for decl in &unit.types {
                p.type_decl(decl);
            }
            for func in &unit.funcs {
                p.func_decl(func);
            }
        });
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.line(&format!("TypeDecl '{}'", decl.qualified_name()));
        self.nested(|p| {
            for object in &decl.objects {
                p.type_object(object);
            }
        });
    }

    fn type_object(&mut self, object: &TypeObject) {
        match object.binding_name() {
            Some(name) => self.line(&format!(
                "TypeObject '{}' : '{}'",
                name, object.type_name.text
            )),
            None => self.line(&format!("TypeObject '{}'", object.type_name.text)),
        }
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        self.line(&format!("FuncDecl '{}'", func.qualified_name()));
        self.nested(|p| {
            for object in &func.objects {
                p.type_object(object);
            }
            p.type_object(&func.return_type);
            if let Some(body) = &func.body {
                p.line("FuncDef");
                p.nested(|p| {
                    for stmt in &body.stmts {
                        p.stmt(stmt);
                    }
                });
            }
        });
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If(s) => {
                self.line("IfStmt");
                self.nested(|p| {
                    p.expr(&s.condition);
                    p.stmt(&s.then);
                });
            }
            Stmt::Return(s) => {
                self.line("ReturnStmt");
                self.nested(|p| p.expr(&s.expr));
            }
            Stmt::VarDecl(s) => {
                self.line(&format!(
                    "VarDeclStmt '{}' : '{}'",
                    s.name.text, s.type_name.text
                ));
                self.nested(|p| p.type_ctor(&s.expr));
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary(e) => {
                self.line(&format!("BinaryExpr '{}'", e.op.symbol()));
                self.nested(|p| {
                    p.expr(&e.lhs);
                    p.expr(&e.rhs);
                });
            }
            Expr::FuncCall(e) => {
                self.line(&format!("FuncCallExpr '{}'", e.callee.text));
                self.nested(|p| {
                    for arg in &e.args {
                        p.expr(arg);
                    }
                });
            }
            Expr::TypeCtor(e) => self.type_ctor(e),
            Expr::Var(e) => self.line(&format!("VarExpr '{}'", e.name.text)),
            Expr::Literal(e) => self.line(&format!("LiteralExpr '{}'", e.literal.text)),
        }
    }

    fn type_ctor(&mut self, e: &TypeCtorExpr) {
        match &e.type_name {
            Some(tok) => self.line(&format!("TypeCtorExpr '{}'", tok.text)),
            None => self.line("TypeCtorExpr"),
        }
        self.nested(|p| {
            for arg in &e.args {
                p.expr(arg);
            }
        });
    }
}
