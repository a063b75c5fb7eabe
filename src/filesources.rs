// パス: src/filesources.rs
// 役割: インクルードパスを探索してソースファイルを読み込むキャッシュ
// 意図: 同じファイルを複数回インクルードしても読み込みは 1 回で済ませる
// 関連ファイル: src/codegen/cranelift.rs, src/lib.rs, src/bin/unvc.rs
//! ソースファイルローダ
//!
//! 裸のパス、次に登録済みインクルードディレクトリの順で探索する。見つかった
//! ファイルは正規化パスをキーにキャッシュする。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 読み込み済みの 1 ソースファイル。
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// 診断で表示するファイル名。指定されたままのパス表記。
    pub name: String,
    pub contents: String,
}

/// インクルード探索とファイルキャッシュ。
#[derive(Debug, Default)]
pub struct FileSources {
    include_dirs: Vec<PathBuf>,
    cache: HashMap<PathBuf, SourceFile>,
}

impl FileSources {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_dirs,
            cache: HashMap::new(),
        }
    }

    /// 名前を解決してファイルを読み込む。見つからなければ `None`。
    pub fn load(&mut self, name: &str) -> Option<SourceFile> {
        if let Some(source) = self.try_load(Path::new(name), name) {
            return Some(source);
        }
        let dirs = self.include_dirs.clone();
        for dir in &dirs {
            let candidate = dir.join(name);
            if let Some(source) = self.try_load(&candidate, name) {
                return Some(source);
            }
        }
        None
    }

    fn try_load(&mut self, path: &Path, display_name: &str) -> Option<SourceFile> {
        let key = fs::canonicalize(path).ok()?;
        if let Some(source) = self.cache.get(&key) {
            return Some(source.clone());
        }
        let contents = fs::read_to_string(&key).ok()?;
        let source = SourceFile {
            name: display_name.to_owned(),
            contents,
        };
        self.cache.insert(key, source.clone());
        Some(source)
    }
}
