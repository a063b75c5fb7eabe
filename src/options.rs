// パス: src/options.rs
// 役割: コンパイル 1 回分の設定値の定義
// 意図: CLI のフラグ解釈とライブラリ本体を設定構造体で分離する
// 関連ファイル: src/bin/unvc.rs, src/lib.rs, src/filesources.rs

use std::path::PathBuf;

use clap::ValueEnum;

/// 出力する成果物の種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmitKind {
    /// 構文木のテキストダンプ。
    Ast,
    /// 各関数の CLIF テキスト。
    Ir,
    /// ネイティブオブジェクトファイル。
    Object,
}

/// 翻訳単位 1 つ分のコンパイル設定。
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// インクルード探索ディレクトリ。指定順に探索する。
    pub include_dirs: Vec<PathBuf>,
    /// 回復可能エラーの上限。超えた時点で翻訳単位を中断する。
    pub error_limit: usize,
    pub emit: EmitKind,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            include_dirs: Vec::new(),
            error_limit: 20,
            emit: EmitKind::Object,
        }
    }
}
