// パス: src/codegen/mod.rs
// 役割: コード生成のエラー型と結果エイリアスを定義し、バックエンド実装を束ねる
// 意図: 診断由来の中断とバックエンド内部の失敗を 1 つの Result で伝搬させる
// 関連ファイル: src/codegen/cranelift.rs, src/diag.rs, src/lib.rs

pub mod cranelift;

use std::io;

use thiserror::Error;

use crate::diag::FatalError;

/// コード生成で発生しうるエラー種別。
///
/// `Fatal` は診断シンクに記録済みのユーザエラー、それ以外はバックエンドの
/// 内部失敗を表す。
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cranelift module error: {0}")]
    Module(#[from] cranelift_module::ModuleError),
    #[error("Cranelift codegen error: {0}")]
    Codegen(#[from] cranelift_codegen::CodegenError),
    #[error("failed to initialize host ISA: {0}")]
    Isa(String),
    #[error("failed to emit object: {0}")]
    Emit(String),
}

/// コード生成の結果を表す型。
pub type CodegenResult<T> = Result<T, CodegenError>;
