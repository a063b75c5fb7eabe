// パス: src/bin/unvc.rs
// 役割: unv コンパイラのコマンドラインエントリポイント
// 意図: フラグ解釈と成果物の書き出しだけを担い、コンパイル本体はライブラリに委ねる
// 関連ファイル: src/lib.rs, src/options.rs, src/filesources.rs

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use unv::filesources::FileSources;
use unv::options::{CompileOptions, EmitKind};

/// unv 言語のコンパイラ。
#[derive(Debug, Parser)]
#[command(name = "unvc", version, about = "Compiler for the unv language")]
struct Cli {
    /// コンパイルするソースファイル。
    #[arg(required_unless_present = "stdin")]
    files: Vec<PathBuf>,

    /// インクルード探索ディレクトリを追加する。
    #[arg(short = 'i', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// 回復可能エラーの上限。超えるとその翻訳単位を中断する。
    #[arg(long, value_name = "N", default_value_t = 20)]
    error_limit: usize,

    /// 出力先パス。入力が 1 つの場合のみ有効。
    #[arg(short, long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// 出力する成果物の種類。
    #[arg(short, long, value_enum, default_value_t = EmitKind::Object)]
    emit: EmitKind,

    /// 標準入力からソースを読む。
    #[arg(long)]
    stdin: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("unvc: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let options = CompileOptions {
        include_dirs: cli.include.clone(),
        error_limit: cli.error_limit,
        emit: cli.emit,
    };
    let mut sources = FileSources::new(cli.include.clone());
    let mut ok = true;

    if cli.stdin {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        ok &= compile_unit(cli, &options, &mut sources, "<stdin>", &source, None)?;
    }

    for file in &cli.files {
        let source = fs::read_to_string(file)
            .map_err(|e| format!("could not read {}: {e}", file.display()))?;
        let name = file.display().to_string();
        ok &= compile_unit(cli, &options, &mut sources, &name, &source, Some(file))?;
    }

    Ok(ok)
}

/// 1 翻訳単位をコンパイルし、診断を標準エラーへ、成果物を出力先へ書く。
fn compile_unit(
    cli: &Cli,
    options: &CompileOptions,
    sources: &mut FileSources,
    name: &str,
    source: &str,
    input: Option<&Path>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let outcome = unv::compile(name, source, options, sources)?;
    for report in &outcome.reports {
        eprintln!("{report}");
    }
    if outcome.has_errors {
        return Ok(false);
    }
    let Some(artifacts) = outcome.artifacts else {
        return Ok(false);
    };

    match cli.emit {
        EmitKind::Ast => write_text(cli.out.as_deref(), &artifacts.ast_text)?,
        EmitKind::Ir => write_text(cli.out.as_deref(), &artifacts.ir_text)?,
        EmitKind::Object => {
            let path = object_path(cli.out.as_deref(), input);
            fs::write(&path, &artifacts.object)
                .map_err(|e| format!("could not write {}: {e}", path.display()))?;
        }
    }
    Ok(true)
}

/// テキスト成果物は `-o` 指定が無ければ標準出力へ出す。
fn write_text(out: Option<&Path>, text: &str) -> io::Result<()> {
    match out {
        Some(path) => fs::write(path, text),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

/// オブジェクトの出力先。指定が無ければ入力名の拡張子を `.o` に替える。
fn object_path(out: Option<&Path>, input: Option<&Path>) -> PathBuf {
    if let Some(path) = out {
        return path.to_owned();
    }
    match input {
        Some(input) => input.with_extension("o"),
        None => PathBuf::from("out.o"),
    }
}
