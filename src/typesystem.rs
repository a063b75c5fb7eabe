// パス: src/typesystem.rs
// 役割: 型・関数宣言のシンボル表と式の型推論・互換性検査
// 意図: エントリをアリーナに置き、Copy な TypeId で後段へ軽量に受け渡す
// 関連ファイル: src/ast.rs, src/parser.rs, src/codegen/cranelift.rs
//! 型システム
//!
//! - 宣言は修飾名をキーに 1 つの表で管理する。型と関数は同じ名前空間を
//!   共有し、重複は回復可能エラーとして拒否する。
//! - フィールドが 1 個の型宣言は別名（alias）になる。別名の解決は 1 段のみで、
//!   別名の別名は透過的に解決しない。
//! - リテラルは固有の型を持たないため、`infer` は `Ok(None)` を返す。
//!   文脈の型との突き合わせはコード生成側で行う。
//! - バックエンドの型ハンドルはコード生成の宣言パスが遅延して与える。

use std::collections::HashMap;

use cranelift_codegen::ir;

use crate::ast::{Expr, FuncDecl, TypeDecl, TypeDeclKind, TypeObject};
use crate::diag::{Diagnostics, FatalError};
use crate::token::Token;

/// 組み込み型の一覧。名前と符号付き整数かどうか。
pub const BUILTINS: &[(&str, bool)] = &[
    ("_builtin_bit_", false),
    ("_builtin_uint8_", false),
    ("_builtin_int8_", true),
    ("_builtin_uint16_", false),
    ("_builtin_int16_", true),
    ("_builtin_uint32_", false),
    ("_builtin_int32_", true),
    ("_builtin_uint64_", false),
    ("_builtin_int64_", true),
    ("_builtin_float_", false),
    ("_builtin_double_", false),
    ("_builtin_uint8_array_", false),
];

/// アリーナ内のエントリを指すハンドル。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// エントリの分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Builtin,
    Alias,
    Struct,
    Function,
}

/// シンボル表の 1 エントリ。
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub name: String,
    pub kind: TypeKind,
    pub signed_int: bool,
    /// 構造体のフィールド、または関数の仮引数。
    pub objects: Vec<TypeObject>,
    /// 関数のみ持つ戻り値の型参照。
    pub return_type: Option<TypeObject>,
    /// バックエンドの型ハンドル。宣言パスで与えられるまで `None`。
    pub handle: Option<ir::Type>,
}

/// 翻訳単位ごとのシンボル表。
#[derive(Debug)]
pub struct TypeSystem {
    entries: Vec<TypeEntry>,
    by_name: HashMap<String, TypeId>,
    aliases: HashMap<String, String>,
    named: HashMap<String, TypeId>,
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSystem {
    pub fn new() -> Self {
        let mut system = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            aliases: HashMap::new(),
            named: HashMap::new(),
        };
        for &(name, signed_int) in BUILTINS {
            system.insert(TypeEntry {
                name: name.to_owned(),
                kind: TypeKind::Builtin,
                signed_int,
                objects: Vec::new(),
                return_type: None,
                handle: None,
            });
        }
        system
    }

    fn insert(&mut self, entry: TypeEntry) -> TypeId {
        let id = TypeId(self.entries.len());
        self.by_name.insert(entry.name.clone(), id);
        self.entries.push(entry);
        id
    }

    pub fn entry(&self, id: TypeId) -> &TypeEntry {
        &self.entries[id.0]
    }

    pub fn set_handle(&mut self, id: TypeId, handle: ir::Type) {
        self.entries[id.0].handle = Some(handle);
    }

    /// 型宣言を登録する。回復可能な拒否は `Ok(false)`。
    pub fn add_type(
        &mut self,
        decl: &TypeDecl,
        diags: &mut Diagnostics,
    ) -> Result<bool, FatalError> {
        let name = decl.qualified_name();
        if self.by_name.contains_key(&name) {
            diags.error(&decl.name, "type declaration previously declared")?;
            return Ok(false);
        }

        if decl.objects.is_empty() {
            diags.error(&decl.name, "type declaration must declare a type")?;
            return Ok(false);
        }

        if decl.kind == TypeDeclKind::Alias {
            if self.aliases.contains_key(&name) {
                diags.error(&decl.name, "alias for name previously declared")?;
                return Ok(false);
            }
            self.aliases
                .insert(name.clone(), decl.objects[0].type_name.text.clone());
        }

        self.insert(TypeEntry {
            name,
            kind: match decl.kind {
                TypeDeclKind::Alias => TypeKind::Alias,
                TypeDeclKind::Struct => TypeKind::Struct,
            },
            signed_int: false,
            objects: decl.objects.clone(),
            return_type: None,
            handle: None,
        });
        Ok(true)
    }

    /// 関数宣言を登録する。回復可能な拒否は `Ok(false)`。
    pub fn add_function(
        &mut self,
        decl: &FuncDecl,
        diags: &mut Diagnostics,
    ) -> Result<bool, FatalError> {
        let name = decl.qualified_name();
        if self.by_name.contains_key(&name) {
            diags.error(&decl.name, "function declaration previously declared")?;
            return Ok(false);
        }

        self.insert(TypeEntry {
            name,
            kind: TypeKind::Function,
            signed_int: false,
            objects: decl.objects.clone(),
            return_type: Some(decl.return_type.clone()),
            handle: None,
        });
        Ok(true)
    }

    /// 名前の直接引き。別名の間接参照はしない。
    pub fn resolve(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// 別名エントリなら指し先のエントリを返す。それ以外は自身。解決は 1 段のみ。
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let entry = self.entry(id);
        if entry.kind == TypeKind::Alias {
            if let Some(name) = self.aliases.get(&entry.name) {
                if let Some(resolved) = self.resolve(name) {
                    return resolved;
                }
            }
        }
        id
    }

    /// 別名を 1 段解決してから引く。未宣言なら致命エラー。
    pub fn resolve_and_check(
        &self,
        tok: &Token,
        diags: &mut Diagnostics,
    ) -> Result<TypeId, FatalError> {
        let name = match self.aliases.get(&tok.text) {
            Some(underlying) => underlying.as_str(),
            None => tok.text.as_str(),
        };
        match self.by_name.get(name) {
            Some(&id) => Ok(id),
            None => Err(diags.fatal(tok, "type has not been declared")),
        }
    }

    /// 式の型を構造的に推論する。リテラルは固有型を持たず `Ok(None)`。
    pub fn infer(&self, expr: &Expr, diags: &mut Diagnostics) -> Result<Option<TypeId>, FatalError> {
        match expr {
            Expr::Binary(e) => {
                if e.lhs.is_literal() && e.rhs.is_literal() {
                    return Err(diags.fatal(
                        e.lhs.start(),
                        "both sides of binary expression are literal expressions",
                    ));
                }
                if let Some(id) = self.infer(&e.lhs, diags)? {
                    return Ok(Some(id));
                }
                if let Some(id) = self.infer(&e.rhs, diags)? {
                    return Ok(Some(id));
                }
                Err(diags.fatal(e.lhs.start(), "can not determine type for binary expression"))
            }
            Expr::FuncCall(e) => {
                let callee = self.resolve_and_check(&e.callee, diags)?;
                if let Some(ret) = &self.entry(callee).return_type {
                    if let Some(id) = self.resolve(&ret.type_name.text) {
                        return Ok(Some(id));
                    }
                }
                Err(diags.fatal(
                    &e.callee,
                    "can not determine type for function call expression",
                ))
            }
            Expr::Literal(_) => Ok(None),
            Expr::Var(e) => match self.named.get(&e.name.text) {
                Some(&id) => Ok(Some(id)),
                None => Err(diags.fatal(
                    &e.name,
                    "can not determine type for variable expression",
                )),
            },
            Expr::TypeCtor(e) => match &e.type_name {
                Some(tok) => Ok(Some(self.resolve_and_check(tok, diags)?)),
                None => self.infer(&e.args[0], diags),
            },
        }
    }

    /// 2 項式の両オペランドの型互換性を検査する。
    ///
    /// どちらかが推論不能（リテラル）なら検査しない。分類か符号が異なれば
    /// 致命エラー。
    pub fn check_compatible(
        &self,
        lhs: &Expr,
        rhs: &Expr,
        diags: &mut Diagnostics,
    ) -> Result<(), FatalError> {
        let Some(lhs_id) = self.infer(lhs, diags)? else {
            return Ok(());
        };
        let Some(rhs_id) = self.infer(rhs, diags)? else {
            return Ok(());
        };

        let lhs_entry = self.entry(lhs_id);
        let rhs_entry = self.entry(rhs_id);
        if lhs_entry.kind != rhs_entry.kind {
            return Err(diags.fatal(
                lhs.start(),
                "type incompatibility for binary expression operands",
            ));
        }
        if lhs_entry.signed_int != rhs_entry.signed_int {
            return Err(diags.fatal(
                lhs.start(),
                "comparison of signed and unsigned integers not supported",
            ));
        }
        Ok(())
    }

    /// 関数本体ごとの変数スコープを空にする。
    pub fn clear_named(&mut self) {
        self.named.clear();
    }

    /// 変数名を型へ束縛する。
    pub fn insert_named(&mut self, name: impl Into<String>, id: TypeId) {
        self.named.insert(name.into(), id);
    }

    pub fn lookup_named(&self, name: &str) -> Option<TypeId> {
        self.named.get(name).copied()
    }

    /// インクルード先の単位の表を取り込む。名前衝突は重複宣言と同じ扱い。
    pub fn import(
        &mut self,
        other: &TypeSystem,
        include_tok: &Token,
        diags: &mut Diagnostics,
    ) -> Result<(), FatalError> {
        for entry in &other.entries {
            if entry.kind == TypeKind::Builtin {
                continue;
            }
            if self.by_name.contains_key(&entry.name) {
                let message = match entry.kind {
                    TypeKind::Function => "function declaration previously declared",
                    _ => "type declaration previously declared",
                };
                diags.error(include_tok, message)?;
                continue;
            }
            if let Some(underlying) = other.aliases.get(&entry.name) {
                self.aliases.insert(entry.name.clone(), underlying.clone());
            }
            self.insert(entry.clone());
        }
        Ok(())
    }
}
