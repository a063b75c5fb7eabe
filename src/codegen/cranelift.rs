// パス: src/codegen/cranelift.rs
// 役割: 型検査済み AST を Cranelift IR へ 2 パスで降下させるコード生成器
// 意図: 宣言パスでシグネチャと型ハンドルを確定し、本体パスで命令列を埋める
// 関連ファイル: src/codegen/mod.rs, src/typesystem.rs, src/ast.rs, src/filesources.rs
//! Cranelift バックエンド
//!
//! - 2 パス構成。宣言パスは全宣言のハンドル・シグネチャを登録し（インクルード
//!   先の単位もここで同じモジュールへコンパイルする）、本体パスが関数本体を
//!   降下させる。
//! - 降下した値は機械型の `Value` と論理型の `TypeId` の組で持ち回る。比較の
//!   結果は 1 ビット真偽値型になる（機械表現は I8）。
//! - リテラルは文脈の型に対して基数変換とレンジ検査を行ってから定数化する。
//! - 除算と構造体の値化など、対応しない構文は致命診断で打ち切る。

use std::collections::{HashMap, HashSet};

use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{
    types, AbiParam, Function as ClifFunction, InstBuilder, Signature, UserFuncName, Value,
};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::verifier;
use cranelift_codegen::isa;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{default_libcall_names, FuncOrDataId, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};

use crate::ast::{
    BinaryExpr, BinaryOp, Expr, FuncCallExpr, FuncDecl, IfStmt, IncludeDecl, LiteralExpr,
    ReturnStmt, Stmt, TranslationUnit, TypeCtorExpr, TypeDecl, VarDeclStmt, VarExpr,
};
use crate::codegen::{CodegenError, CodegenResult};
use crate::diag::Diagnostics;
use crate::filesources::FileSources;
use crate::token::{Token, TokenKind};
use crate::typesystem::{TypeId, TypeSystem};
use crate::{lexer, parser};

/// 1 翻訳単位の生成結果。
pub struct GeneratedModule {
    /// 各関数の CLIF テキストを連結したもの。インクルード先の分が先に並ぶ。
    pub ir_text: String,
    /// ネイティブオブジェクトのバイト列。
    pub object: Vec<u8>,
}

/// 翻訳単位をホスト ISA のオブジェクトへ降下させる。
///
/// インクルード先の単位で出た診断は整形済みテキストとして
/// `included_reports` に積まれる。
pub fn generate(
    unit: &TranslationUnit,
    types: &mut TypeSystem,
    diags: &mut Diagnostics,
    sources: &mut FileSources,
    included_reports: &mut Vec<String>,
    error_limit: usize,
) -> CodegenResult<GeneratedModule> {
    let isa = build_isa()?;
    let builder = ObjectBuilder::new(isa, diags.file_name().to_owned(), default_libcall_names())?;
    let mut module = ObjectModule::new(builder);
    let mut defined = HashSet::new();

    let ir_text = CodeGen::new(
        unit,
        types,
        diags,
        sources,
        &mut module,
        included_reports,
        &mut defined,
        error_limit,
    )
    .run()?;

    let object = module
        .finish()
        .emit()
        .map_err(|e| CodegenError::Emit(e.to_string()))?;

    Ok(GeneratedModule { ir_text, object })
}

fn build_isa() -> CodegenResult<std::sync::Arc<dyn isa::TargetIsa>> {
    let isa_builder =
        cranelift_native::builder().map_err(|e| CodegenError::Isa(e.to_string()))?;
    let mut flag_builder = settings::builder();
    flag_builder
        .set("opt_level", "none")
        .map_err(|e| CodegenError::Isa(e.to_string()))?;
    let isa = isa_builder.finish(settings::Flags::new(flag_builder))?;
    Ok(isa)
}

/// 降下済みの値。機械値とその論理型。
#[derive(Debug, Clone, Copy)]
struct Lowered {
    value: Value,
    info: TypeId,
}

struct CodeGen<'a> {
    unit: &'a TranslationUnit,
    types: &'a mut TypeSystem,
    diags: &'a mut Diagnostics,
    sources: &'a mut FileSources,
    module: &'a mut ObjectModule,
    included_reports: &'a mut Vec<String>,
    /// モジュール内で本体を定義済みの関数名。インクルード先の単位と共有する。
    defined: &'a mut HashSet<String>,
    error_limit: usize,
    vars: HashMap<String, Value>,
    ir_text: String,
    bit: TypeId,
}

impl<'a> CodeGen<'a> {
    fn new(
        unit: &'a TranslationUnit,
        types: &'a mut TypeSystem,
        diags: &'a mut Diagnostics,
        sources: &'a mut FileSources,
        module: &'a mut ObjectModule,
        included_reports: &'a mut Vec<String>,
        defined: &'a mut HashSet<String>,
        error_limit: usize,
    ) -> Self {
        register_builtin_handles(types);
        let bit = types
            .resolve("_builtin_bit_")
            .unwrap_or_else(|| unreachable!("builtin table always registers the bit type"));
        Self {
            unit,
            types,
            diags,
            sources,
            module,
            included_reports,
            defined,
            error_limit,
            vars: HashMap::new(),
            ir_text: String::new(),
            bit,
        }
    }

    /// 宣言パスと本体パスを順に実行し、CLIF テキストを返す。
    fn run(mut self) -> CodegenResult<String> {
        for include in &self.unit.includes {
            self.compile_include(include)?;
        }
        for decl in &self.unit.types {
            self.register_type_decl(decl)?;
        }
        for func in &self.unit.funcs {
            self.register_func_decl(func)?;
        }

        for func in &self.unit.funcs {
            if func.body.is_some() {
                self.lower_func(func)?;
            }
        }

        Ok(self.ir_text)
    }

    // ----- 宣言パス -----

    /// インクルード先の単位を字句解析からコンパイルまで行い、同じモジュールへ
    /// 降下させた上で型表を取り込む。
    fn compile_include(&mut self, include: &IncludeDecl) -> CodegenResult<()> {
        let source = match self.sources.load(include.path_text()) {
            Some(source) => source,
            None => {
                return Err(self
                    .diags
                    .fatal(&include.path, "Could not find or open include file")
                    .into());
            }
        };

        let mut sub_diags = Diagnostics::new(&source.name, &source.contents, self.error_limit);
        let mut sub_types = TypeSystem::new();

        let result = (|| -> CodegenResult<String> {
            let tokens = lexer::lex(&source.contents, &mut sub_diags)?;
            let sub_unit = parser::parse(&tokens, &mut sub_types, &mut sub_diags)?;
            CodeGen::new(
                &sub_unit,
                &mut sub_types,
                &mut sub_diags,
                &mut *self.sources,
                &mut *self.module,
                &mut *self.included_reports,
                &mut *self.defined,
                self.error_limit,
            )
            .run()
        })();

        if !sub_diags.entries().is_empty() {
            self.included_reports.push(sub_diags.render());
        }
        let ir = result?;
        self.ir_text.push_str(&ir);

        self.types
            .import(&sub_types, &include.path, self.diags)?;
        self.diags.add_errors(sub_diags.error_count());
        Ok(())
    }

    /// 宣言された型名に対応する機械型を引く。値表現を持たない型は致命エラー。
    fn value_type(&mut self, tok: &Token) -> CodegenResult<cranelift_codegen::ir::Type> {
        let id = self.types.resolve_and_check(tok, self.diags)?;
        match self.types.entry(id).handle {
            Some(ty) => Ok(ty),
            None => Err(self
                .diags
                .fatal(tok, "type can not be used as a value")
                .into()),
        }
    }

    fn register_type_decl(&mut self, decl: &TypeDecl) -> CodegenResult<()> {
        let Some(id) = self.types.resolve(&decl.qualified_name()) else {
            return Ok(());
        };
        let handle = self.value_type(&decl.name)?;
        self.types.set_handle(id, handle);
        Ok(())
    }

    fn register_func_decl(&mut self, decl: &FuncDecl) -> CodegenResult<()> {
        // インクルード先の単位と衝突した名前は重複として診断済み。最初の
        // 宣言を残し、上書きはしない。
        if self.declared_func(&decl.name.text).is_some() {
            return Ok(());
        }

        let mut sig = Signature::new(self.module.isa().default_call_conv());
        for object in &decl.objects {
            let ty = self.value_type(&object.type_name)?;
            sig.params.push(AbiParam::new(ty));
        }
        let ret = self.value_type(&decl.return_type.type_name)?;
        sig.returns.push(AbiParam::new(ret));

        let linkage = if decl.is_extern() {
            Linkage::Import
        } else {
            Linkage::Export
        };
        self.module
            .declare_function(&decl.name.text, linkage, &sig)?;
        Ok(())
    }

    /// モジュールに宣言済みの関数を名前で引く。インクルード先の単位が宣言した
    /// 関数もここで見える。
    fn declared_func(&self, name: &str) -> Option<(cranelift_module::FuncId, Signature)> {
        match self.module.declarations().get_name(name) {
            Some(FuncOrDataId::Func(id)) => {
                let sig = self.module.declarations().get_function_decl(id).signature.clone();
                Some((id, sig))
            }
            _ => None,
        }
    }

    // ----- 本体パス -----

    fn lower_func(&mut self, func: &FuncDecl) -> CodegenResult<()> {
        let Some((func_id, sig)) = self.declared_func(&func.name.text) else {
            return Ok(());
        };
        let body = match &func.body {
            Some(body) => body,
            None => return Ok(()),
        };

        // 同名関数の本体はモジュール全体で最初の 1 つだけ定義する。重複名は
        // 登録かインクルード取り込みの時点で診断済み。
        if !self.defined.insert(func.name.text.clone()) {
            return Ok(());
        }

        // 終端 return の検査は降下より先に行う。本体が途中で致命エラーに
        // なっても欠落自体は報告される。
        if !matches!(body.stmts.last(), Some(Stmt::Return(_))) {
            return Err(self
                .diags
                .fatal(&func.name, "function must end with return statement")
                .into());
        }

        let mut ctx = self.module.make_context();
        ctx.func = ClifFunction::with_name_signature(UserFuncName::user(0, func_id.as_u32()), sig);
        let mut builder_ctx = FunctionBuilderContext::new();
        {
            let mut builder = FunctionBuilder::new(&mut ctx.func, &mut builder_ctx);
            let entry = builder.create_block();
            builder.append_block_params_for_function_params(entry);
            builder.switch_to_block(entry);
            builder.seal_block(entry);

            self.vars.clear();
            self.types.clear_named();
            for (index, object) in func.objects.iter().enumerate() {
                let name = object.binding_name().unwrap_or("").to_owned();
                let info = self.types.resolve_and_check(&object.type_name, self.diags)?;
                let value = builder.block_params(entry)[index];
                self.vars.insert(name.clone(), value);
                self.types.insert_named(name, info);
            }

            for stmt in &body.stmts {
                self.lower_stmt(stmt, func, &mut builder)?;
            }
            builder.finalize();
        }

        verifier::verify_function(&ctx.func, self.module.isa())
            .map_err(cranelift_codegen::CodegenError::Verifier)?;

        self.ir_text.push_str(&ctx.func.display().to_string());
        self.ir_text.push('\n');

        self.module.define_function(func_id, &mut ctx)?;
        Ok(())
    }

    /// 文を降下させる。戻り値は「終端命令を発行したか」。
    fn lower_stmt(
        &mut self,
        stmt: &Stmt,
        func: &FuncDecl,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<bool> {
        match stmt {
            Stmt::If(s) => self.lower_if_stmt(s, func, builder),
            Stmt::Return(s) => self.lower_return_stmt(s, func, builder),
            Stmt::VarDecl(s) => self.lower_var_decl_stmt(s, builder),
        }
    }

    fn lower_if_stmt(
        &mut self,
        stmt: &IfStmt,
        func: &FuncDecl,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<bool> {
        if stmt.condition.is_literal() {
            return Err(self
                .diags
                .fatal(
                    stmt.condition.start(),
                    "literal expression can not be used as the only expression of an if statement",
                )
                .into());
        }

        let info = self.types.infer(&stmt.condition, self.diags)?;
        let lowered = match info {
            Some(info) => self.lower_expr(&stmt.condition, Some(info), builder)?,
            None => None,
        };
        let condition = match lowered {
            Some(lowered) if self.types.underlying(lowered.info) == self.bit => lowered.value,
            _ => {
                return Err(self
                    .diags
                    .fatal(
                        stmt.condition.start(),
                        "expression in if statement does not evaluate to true or false",
                    )
                    .into());
            }
        };

        let then_block = builder.create_block();
        let cont_block = builder.create_block();
        builder.ins().brif(condition, then_block, &[], cont_block, &[]);

        builder.switch_to_block(then_block);
        builder.seal_block(then_block);
        let terminated = self.lower_stmt(&stmt.then, func, builder)?;
        if !terminated {
            builder.ins().jump(cont_block, &[]);
        }

        builder.switch_to_block(cont_block);
        builder.seal_block(cont_block);
        Ok(false)
    }

    fn lower_return_stmt(
        &mut self,
        stmt: &ReturnStmt,
        func: &FuncDecl,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<bool> {
        // 名前空間付き関数は裸の名前では引けないため、ここで止まる。
        if self.types.resolve(&func.name.text).is_none() {
            return Err(self
                .diags
                .fatal(&stmt.keyword, "return statement for function with unknown type")
                .into());
        }

        let info = self
            .types
            .resolve_and_check(&func.return_type.type_name, self.diags)?;
        match self.lower_expr(&stmt.expr, Some(info), builder)? {
            Some(lowered) => {
                builder.ins().return_(&[lowered.value]);
                Ok(true)
            }
            None => Err(self
                .diags
                .fatal(&stmt.keyword, "return statement of void is not allowed")
                .into()),
        }
    }

    fn lower_var_decl_stmt(
        &mut self,
        stmt: &VarDeclStmt,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<bool> {
        let info = self.types.resolve_and_check(&stmt.type_name, self.diags)?;
        let lowered = match self.lower_type_ctor(&stmt.expr, Some(info), builder)? {
            Some(lowered) => lowered,
            None => {
                return Err(self
                    .diags
                    .fatal(&stmt.name, "type constructor can not produce a value")
                    .into());
            }
        };

        let name = stmt.name.text.clone();
        self.vars.insert(name.clone(), lowered.value);
        self.types.insert_named(name, info);
        Ok(false)
    }

    // ----- 式 -----

    fn lower_expr(
        &mut self,
        expr: &Expr,
        info: Option<TypeId>,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Option<Lowered>> {
        match expr {
            Expr::Binary(e) => Ok(Some(self.lower_binary(e, info, builder)?)),
            Expr::FuncCall(e) => Ok(Some(self.lower_func_call(e, info, builder)?)),
            Expr::Literal(e) => Ok(Some(self.lower_literal(e, info, builder)?)),
            Expr::Var(e) => Ok(Some(self.lower_var(e, info, builder)?)),
            Expr::TypeCtor(e) => self.lower_type_ctor(e, info, builder),
        }
    }

    /// 2 項式の降下。リテラルでない側を先に降ろし、リテラル側は相手から
    /// 借りた型に対して検査しながら降ろす。
    fn lower_binary(
        &mut self,
        expr: &BinaryExpr,
        _info: Option<TypeId>,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Lowered> {
        if expr.lhs.is_literal() && expr.rhs.is_literal() {
            return Err(self
                .diags
                .fatal(
                    expr.lhs.start(),
                    "we do not support binary expressions involving two literals",
                )
                .into());
        }

        // オペランドの型は文脈ではなくリテラルでない側から決める。比較の
        // 結果型（1 ビット真偽値）がオペランドへ漏れてはいけない。
        let op_info = if !expr.lhs.is_literal() {
            self.types.infer(&expr.lhs, self.diags)?
        } else {
            self.types.infer(&expr.rhs, self.diags)?
        };
        let Some(op_info) = op_info else {
            return Err(self
                .diags
                .fatal(expr.lhs.start(), "can not determine type for binary expression")
                .into());
        };

        let mut lhs = None;
        let mut rhs = None;
        if !expr.lhs.is_literal() {
            lhs = self.lower_expr(&expr.lhs, Some(op_info), builder)?;
        }
        if !expr.rhs.is_literal() {
            rhs = self.lower_expr(&expr.rhs, Some(op_info), builder)?;
        }

        let lhs = match lhs {
            Some(lowered) => lowered,
            None => self.lower_required(&expr.lhs, Some(op_info), builder)?,
        };
        let rhs = match rhs {
            Some(lowered) => lowered,
            None => self.lower_required(&expr.rhs, Some(op_info), builder)?,
        };

        self.types
            .check_compatible(&expr.lhs, &expr.rhs, self.diags)?;

        let entry = self.types.entry(op_info);
        let handle = match entry.handle {
            Some(ty) => ty,
            None => {
                return Err(self
                    .diags
                    .fatal(expr.lhs.start(), "type can not be used as a value")
                    .into());
            }
        };
        let is_integer = handle.is_int();
        let is_float = handle == types::F32 || handle == types::F64;
        let is_signed = entry.signed_int;

        let l = lhs.value;
        let r = rhs.value;
        if expr.op.is_comparison() {
            let value = if is_integer {
                let cc = match (expr.op, is_signed) {
                    (BinaryOp::Equality, _) => IntCC::Equal,
                    (BinaryOp::NotEquality, _) => IntCC::NotEqual,
                    (BinaryOp::LessThanOrEquality, true) => IntCC::SignedLessThanOrEqual,
                    (BinaryOp::LessThanOrEquality, false) => IntCC::UnsignedLessThanOrEqual,
                    (BinaryOp::GreaterThanOrEquality, true) => IntCC::SignedGreaterThanOrEqual,
                    (BinaryOp::GreaterThanOrEquality, false) => IntCC::UnsignedGreaterThanOrEqual,
                    (BinaryOp::LessThan, true) => IntCC::SignedLessThan,
                    (BinaryOp::LessThan, false) => IntCC::UnsignedLessThan,
                    (BinaryOp::GreaterThan, true) => IntCC::SignedGreaterThan,
                    (BinaryOp::GreaterThan, false) => IntCC::UnsignedGreaterThan,
                    _ => unreachable!("comparison operator"),
                };
                builder.ins().icmp(cc, l, r)
            } else if is_float {
                let cc = match expr.op {
                    BinaryOp::Equality => FloatCC::Equal,
                    BinaryOp::NotEquality => FloatCC::OrderedNotEqual,
                    BinaryOp::LessThanOrEquality => FloatCC::LessThanOrEqual,
                    BinaryOp::GreaterThanOrEquality => FloatCC::GreaterThanOrEqual,
                    BinaryOp::LessThan => FloatCC::LessThan,
                    BinaryOp::GreaterThan => FloatCC::GreaterThan,
                    _ => unreachable!("comparison operator"),
                };
                builder.ins().fcmp(cc, l, r)
            } else {
                return Err(self
                    .diags
                    .fatal(
                        expr.lhs.start(),
                        "type incompatibility for binary expression operands",
                    )
                    .into());
            };
            return Ok(Lowered {
                value,
                info: self.bit,
            });
        }

        let value = match (expr.op, is_integer) {
            (BinaryOp::Addition, true) => builder.ins().iadd(l, r),
            (BinaryOp::Subtraction, true) => builder.ins().isub(l, r),
            (BinaryOp::Multiplication, true) => builder.ins().imul(l, r),
            (BinaryOp::Addition, false) if is_float => builder.ins().fadd(l, r),
            (BinaryOp::Subtraction, false) if is_float => builder.ins().fsub(l, r),
            (BinaryOp::Multiplication, false) if is_float => builder.ins().fmul(l, r),
            (BinaryOp::Division, _) => {
                return Err(self
                    .diags
                    .fatal(expr.lhs.start(), "division is not supported")
                    .into());
            }
            _ => {
                return Err(self
                    .diags
                    .fatal(
                        expr.lhs.start(),
                        "type incompatibility for binary expression operands",
                    )
                    .into());
            }
        };
        Ok(Lowered {
            value,
            info: op_info,
        })
    }

    /// 値を必ず要求する位置の降下。void になる式は致命エラー。
    fn lower_required(
        &mut self,
        expr: &Expr,
        info: Option<TypeId>,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Lowered> {
        match self.lower_expr(expr, info, builder)? {
            Some(lowered) => Ok(lowered),
            None => Err(self
                .diags
                .fatal(expr.start(), "expression does not produce a value")
                .into()),
        }
    }

    fn lower_func_call(
        &mut self,
        expr: &FuncCallExpr,
        info: Option<TypeId>,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Lowered> {
        let info = match info {
            Some(info) => Some(info),
            None => self
                .types
                .infer(&Expr::FuncCall(expr.clone()), self.diags)?,
        };

        let Some((func_id, sig)) = self.declared_func(&expr.callee.text) else {
            return Err(self
                .diags
                .fatal(&expr.callee, "unknown function reference")
                .into());
        };

        let callee_info = self.types.resolve_and_check(&expr.callee, self.diags)?;
        let callee_entry = self.types.entry(callee_info).clone();

        let return_info = callee_entry
            .return_type
            .as_ref()
            .and_then(|ret| self.types.resolve(&ret.type_name.text));
        let Some(return_info) = return_info else {
            return Err(self
                .diags
                .fatal(&expr.callee, "can not determine type for function call expression")
                .into());
        };

        let expected_handle = info.and_then(|id| self.types.entry(id).handle);
        if expected_handle != self.types.entry(return_info).handle
            || sig.returns.first().map(|p| p.value_type)
                != self.types.entry(return_info).handle
        {
            return Err(self
                .diags
                .fatal(&expr.callee, "function return type does not match caller")
                .into());
        }

        if callee_entry.objects.len() != expr.args.len() {
            return Err(self
                .diags
                .fatal(&expr.callee, "incorrect number of arguments passed")
                .into());
        }

        let mut args = Vec::with_capacity(expr.args.len());
        for (object, arg) in callee_entry.objects.iter().zip(&expr.args) {
            let param_info = self.types.resolve_and_check(&object.type_name, self.diags)?;
            let lowered = self.lower_required(arg, Some(param_info), builder)?;
            args.push(lowered.value);
        }

        let func_ref = self.module.declare_func_in_func(func_id, builder.func);
        let call = builder.ins().call(func_ref, &args);
        let value = builder.inst_results(call)[0];
        Ok(Lowered {
            value,
            info: return_info,
        })
    }

    fn lower_literal(
        &mut self,
        expr: &LiteralExpr,
        info: Option<TypeId>,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Lowered> {
        let literal = &expr.literal;

        if literal.kind == TokenKind::True || literal.kind == TokenKind::False {
            let value = builder
                .ins()
                .iconst(types::I8, (literal.kind == TokenKind::True) as i64);
            return Ok(Lowered {
                value,
                info: self.bit,
            });
        }

        let Some(info) = info else {
            return Err(self
                .diags
                .fatal(literal, "can not determine type for literal expression")
                .into());
        };

        match literal.kind {
            TokenKind::StringLiteral => Err(self
                .diags
                .fatal(literal, "string literal can not be used as a value")
                .into()),
            TokenKind::FloatLiteral => self.lower_float_literal(literal, info, builder),
            TokenKind::BinLiteral
            | TokenKind::DecLiteral
            | TokenKind::HexLiteral
            | TokenKind::OctLiteral => self.lower_integer_literal(literal, info, builder),
            _ => Err(self
                .diags
                .fatal(literal, "can not determine type for literal expression")
                .into()),
        }
    }

    fn lower_float_literal(
        &mut self,
        literal: &Token,
        info: TypeId,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Lowered> {
        let handle = self.types.entry(info).handle;
        let value = match handle {
            Some(types::F32) => {
                let parsed = literal.text.parse::<f32>();
                match parsed {
                    Ok(v) if v.is_finite() => builder.ins().f32const(v),
                    _ => {
                        return Err(self
                            .diags
                            .fatal(literal, "float literal out of range")
                            .into());
                    }
                }
            }
            Some(types::F64) => {
                let parsed = literal.text.parse::<f64>();
                match parsed {
                    Ok(v) if v.is_finite() => builder.ins().f64const(v),
                    _ => {
                        return Err(self
                            .diags
                            .fatal(literal, "double literal out of range")
                            .into());
                    }
                }
            }
            _ => {
                return Err(self
                    .diags
                    .fatal(literal, "expression for float literal has incompatible type")
                    .into());
            }
        };
        Ok(Lowered { value, info })
    }

    fn lower_integer_literal(
        &mut self,
        literal: &Token,
        info: TypeId,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Lowered> {
        let entry = self.types.entry(info);
        let handle = match entry.handle {
            Some(ty) if ty.is_int() => ty,
            _ => {
                return Err(self
                    .diags
                    .fatal(literal, "expression for integer literal has incompatible type")
                    .into());
            }
        };
        let signed = entry.signed_int;
        let bits = self.logical_bits(info, handle);

        let digits = integer_digits(literal);
        let base = integer_base(literal.kind);

        let value = if !signed {
            let parsed = u64::from_str_radix(&digits, base);
            match parsed {
                Ok(n) if fits_unsigned(n, bits) => {
                    builder.ins().iconst(handle, mask_to_width(n as i64, handle))
                }
                _ => {
                    return Err(self
                        .diags
                        .fatal(literal, "unsigned integer literal out of range")
                        .into());
                }
            }
        } else {
            let parsed = i64::from_str_radix(&digits, base);
            match parsed {
                Ok(n) if fits_signed(n, bits) => {
                    builder.ins().iconst(handle, mask_to_width(n, handle))
                }
                _ => {
                    return Err(self
                        .diags
                        .fatal(literal, "signed integer literal out of range")
                        .into());
                }
            }
        };
        Ok(Lowered { value, info })
    }

    /// 型の論理ビット幅。1 ビット真偽値型は機械表現が I8 でも幅 1 で数える。
    fn logical_bits(&self, info: TypeId, handle: cranelift_codegen::ir::Type) -> u32 {
        if self.types.underlying(info) == self.bit {
            1
        } else {
            handle.bits()
        }
    }

    fn lower_type_ctor(
        &mut self,
        expr: &TypeCtorExpr,
        info: Option<TypeId>,
        builder: &mut FunctionBuilder,
    ) -> CodegenResult<Option<Lowered>> {
        match &expr.type_name {
            None => self.lower_expr(&expr.args[0], info, builder),
            Some(_) => Ok(None),
        }
    }

    fn lower_var(
        &mut self,
        expr: &VarExpr,
        info: Option<TypeId>,
        _builder: &mut FunctionBuilder,
    ) -> CodegenResult<Lowered> {
        let name = &expr.name.text;
        let value = match self.vars.get(name) {
            Some(&value) => value,
            None => {
                return Err(self.diags.fatal(&expr.name, "unknown variable name").into());
            }
        };

        let Some(recorded) = self.types.lookup_named(name) else {
            return Err(self.diags.fatal(&expr.name, "unknown variable type").into());
        };
        if let Some(expected) = info {
            if self.types.entry(expected).handle != self.types.entry(recorded).handle {
                return Err(self.diags.fatal(&expr.name, "unknown variable type").into());
            }
        }
        Ok(Lowered {
            value,
            info: recorded,
        })
    }
}

/// 組み込み型へ機械型ハンドルを与える。1 ビット真偽値は I8 で表現し、
/// 幅の検査は論理幅で別途行う。
fn register_builtin_handles(types_table: &mut TypeSystem) {
    let handles: &[(&str, cranelift_codegen::ir::Type)] = &[
        ("_builtin_bit_", types::I8),
        ("_builtin_uint8_", types::I8),
        ("_builtin_int8_", types::I8),
        ("_builtin_uint16_", types::I16),
        ("_builtin_int16_", types::I16),
        ("_builtin_uint32_", types::I32),
        ("_builtin_int32_", types::I32),
        ("_builtin_uint64_", types::I64),
        ("_builtin_int64_", types::I64),
        ("_builtin_float_", types::F32),
        ("_builtin_double_", types::F64),
    ];
    for &(name, handle) in handles {
        if let Some(id) = types_table.resolve(name) {
            types_table.set_handle(id, handle);
        }
    }
}

/// 2 進・16 進リテラルから基数接頭辞を取り除く。先頭の符号は保存する。
fn integer_digits(literal: &Token) -> String {
    let text = literal.text.as_str();
    match literal.kind {
        TokenKind::BinLiteral | TokenKind::HexLiteral => {
            if let Some(rest) = text.strip_prefix('-') {
                format!("-{}", &rest[2..])
            } else {
                text[2..].to_owned()
            }
        }
        _ => text.to_owned(),
    }
}

fn integer_base(kind: TokenKind) -> u32 {
    match kind {
        TokenKind::BinLiteral => 2,
        TokenKind::OctLiteral => 8,
        TokenKind::HexLiteral => 16,
        _ => 10,
    }
}

/// `iconst` の即値は型幅より上のビットが立っていると検証器に拒否されるため、
/// 型幅でマスクした表現にそろえる。
fn mask_to_width(n: i64, handle: cranelift_codegen::ir::Type) -> i64 {
    let bits = handle.bits();
    if bits >= 64 {
        n
    } else {
        n & ((1i64 << bits) - 1)
    }
}

fn fits_unsigned(n: u64, bits: u32) -> bool {
    if bits >= 64 {
        return true;
    }
    u128::from(n) < (1u128 << bits)
}

/// 符号付き N ビットは大きさ 2^(N-1) までを受け付ける。
fn fits_signed(n: i64, bits: u32) -> bool {
    if bits >= 64 {
        return true;
    }
    let bound = 1i128 << (bits - 1);
    let n = i128::from(n);
    (-bound..=bound).contains(&n)
}
