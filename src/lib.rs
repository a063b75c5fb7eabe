// パス: src/lib.rs
// 役割: モジュール束ねと翻訳単位 1 つ分のコンパイル駆動
// 意図: 字句解析から降下までを 1 関数に直列化し、CLI から成果物の選択だけ行う
// 関連ファイル: src/lexer.rs, src/parser.rs, src/codegen/mod.rs, src/bin/unvc.rs
//! unv コンパイラ
//!
//! インデントでブロックを区切る静的型付き言語 unv のフロントエンドと
//! Cranelift バックエンド。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - ユーザエラーは診断シンクに集約し、ライブラリ内でプロセスを終了させない。
//! - 1 翻訳単位 = 1 ソースファイル。インクルード先は同じオブジェクトへ
//!   降下される。

pub mod ast;
pub mod astprinter;
pub mod codegen;
pub mod diag;
pub mod filesources;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod token;
pub mod typesystem;

use crate::codegen::cranelift::{self as backend};
use crate::codegen::CodegenError;
use crate::diag::Diagnostics;
use crate::filesources::FileSources;
use crate::options::CompileOptions;
use crate::typesystem::TypeSystem;

pub use crate::options::EmitKind;

/// コンパイル成功時の成果物一式。CLI が `--emit` に応じて選んで書き出す。
#[derive(Debug)]
pub struct Artifacts {
    pub ast_text: String,
    pub ir_text: String,
    pub object: Vec<u8>,
}

/// 翻訳単位 1 つ分のコンパイル結果。
///
/// ユーザエラーによる失敗も `Ok` で返り、`artifacts` が `None` になる。
/// `Err` はバックエンドの内部失敗のみ。
#[derive(Debug)]
pub struct CompileOutcome {
    /// 整形済み診断テキスト。インクルード先の単位の分が先に並ぶ。
    pub reports: Vec<String>,
    pub has_errors: bool,
    pub artifacts: Option<Artifacts>,
}

/// 1 ソースを字句解析・構文解析・コード生成まで駆動する。
pub fn compile(
    file_name: &str,
    source: &str,
    options: &CompileOptions,
    sources: &mut FileSources,
) -> Result<CompileOutcome, CodegenError> {
    let mut diags = Diagnostics::new(file_name, source, options.error_limit);
    let mut types = TypeSystem::new();
    let mut included_reports = Vec::new();

    let result = (|| -> Result<Artifacts, CodegenError> {
        let tokens = lexer::lex(source, &mut diags)?;
        let unit = parser::parse(&tokens, &mut types, &mut diags)?;
        let ast_text = astprinter::print(&unit);
        let generated = backend::generate(
            &unit,
            &mut types,
            &mut diags,
            sources,
            &mut included_reports,
            options.error_limit,
        )?;
        Ok(Artifacts {
            ast_text,
            ir_text: generated.ir_text,
            object: generated.object,
        })
    })();

    let mut reports = included_reports;
    if !diags.entries().is_empty() {
        reports.push(diags.render());
    }

    match result {
        Ok(artifacts) => Ok(CompileOutcome {
            reports,
            has_errors: diags.has_errors(),
            artifacts: Some(artifacts),
        }),
        Err(CodegenError::Fatal(_)) => Ok(CompileOutcome {
            reports,
            has_errors: true,
            artifacts: None,
        }),
        Err(err) => Err(err),
    }
}
