// パス: src/diag.rs
// 役割: ソーススパン付き診断の収集・整形と致命エラーの伝搬
// 意図: 回復可能エラーは数え上げ、致命エラーは Result で即座に中断させる
// 関連ファイル: src/parser.rs, src/typesystem.rs, src/codegen/cranelift.rs
//! 診断シンク
//!
//! - 2 段階の深刻度を扱う。`Error` は数え上げて翻訳単位のコンパイルを続行し、
//!   `Fatal` は現在の単位を即座に中断する。
//! - 回復可能エラーが上限（`error_limit`）を超えた場合も中断に切り替える。
//! - ライブラリ内でプロセスを終了させることはない。中断は `FatalError` 値の
//!   伝搬で表現し、終了コードの決定は CLI 側に委ねる。

use thiserror::Error;

use crate::token::Token;

/// 診断の深刻度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Fatal,
}

/// 現在の翻訳単位のコンパイルを中断させるマーカー。
///
/// 対応する診断は発生時点でシンクに記録済みのため、この値自体は
/// メッセージを持たない。
#[derive(Debug, Clone, Copy, Error)]
#[error("compilation aborted by fatal diagnostic")]
pub struct FatalError;

/// 記録された 1 件の診断。
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub width: usize,
    pub snippet: String,
}

impl Diagnostic {
    /// `file:line:col` ヘッダとキャレット付きの文脈行に整形する。
    pub fn render(&self, file_name: &str) -> String {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Fatal => "fatal error",
        };
        let context = self.snippet.replace('\t', " ");
        // キャレットは文脈行の残り桁数を超えて伸ばさない。
        let available = context
            .chars()
            .count()
            .saturating_sub(self.column.saturating_sub(1));
        let caret = " ".repeat(self.column.saturating_sub(1))
            + &"^".repeat(self.width.clamp(1, available.max(1)));
        format!(
            "{}:{}:{} {}: {}\n{}\n{}",
            file_name, self.line, self.column, label, self.message, context, caret
        )
    }
}

/// 翻訳単位ごとの診断シンク。
#[derive(Debug)]
pub struct Diagnostics {
    file_name: String,
    lines: Vec<String>,
    error_limit: usize,
    entries: Vec<Diagnostic>,
    error_count: usize,
}

impl Diagnostics {
    pub fn new(file_name: impl Into<String>, source: &str, error_limit: usize) -> Self {
        Self {
            file_name: file_name.into(),
            lines: source.lines().map(str::to_owned).collect(),
            error_limit,
            entries: Vec::new(),
            error_count: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// 回復可能エラーを記録する。上限超過時は中断に切り替わる。
    pub fn error(&mut self, tok: &Token, message: impl Into<String>) -> Result<(), FatalError> {
        self.push(Severity::Error, tok, message.into());
        self.error_count += 1;
        if self.error_count > self.error_limit {
            return Err(FatalError);
        }
        Ok(())
    }

    /// 致命エラーを記録し、呼び出し元が `return Err(..)` できる値を返す。
    pub fn fatal(&mut self, tok: &Token, message: impl Into<String>) -> FatalError {
        self.push(Severity::Fatal, tok, message.into());
        FatalError
    }

    fn push(&mut self, severity: Severity, tok: &Token, message: String) {
        let snippet = self
            .lines
            .get(tok.start.line.saturating_sub(1))
            .cloned()
            .unwrap_or_default();
        self.entries.push(Diagnostic {
            severity,
            message,
            line: tok.start.line,
            column: tok.start.column,
            width: tok.width(),
            snippet,
        });
    }

    /// インクルード先の単位で数えたエラーを取り込む。
    pub fn add_errors(&mut self, count: usize) {
        self.error_count += count;
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || self.entries.iter().any(|d| d.severity == Severity::Fatal)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// 記録済みメッセージに部分一致するものがあるか返す。主にテスト用。
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }

    /// 全診断を表示用に連結する。
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|d| d.render(&self.file_name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
