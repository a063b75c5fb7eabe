// パス: src/token.rs
// 役割: トークン種別と位置情報付きトークンレコードの定義
// 意図: 字句解析の出力と構文解析の入力を結ぶ共通語彙を提供する
// 関連ファイル: src/lexer.rs, src/parser.rs, src/diag.rs
//! トークン定義
//!
//! - 空白・タブ・改行・コメントもトークンとして保持する。インデント計測と
//!   トークン列の逐語的な復元（round-trip）がこれに依存する。
//! - 数値リテラルは基数（2/8/10/16 進）と小数点の有無で種別を分ける。
//! - 位置は 1 始まりの行・桁で記録し、診断のキャレット表示に使う。

use std::fmt;

/// トークンの分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // 空白類
    Whitespace,
    Tab,
    Newline,
    // 区切り記号
    Bang,
    Star,
    OpenParen,
    CloseParen,
    Plus,
    Colon,
    LessThan,
    GreaterThan,
    Minus,
    Equals,
    OpenSquare,
    CloseSquare,
    Comma,
    Period,
    Slash,
    // コメント
    Comment,
    // キーワード
    Else,
    Extern,
    False,
    Function,
    If,
    Include,
    Namespace,
    New,
    Return,
    True,
    Type,
    // 識別子とリテラル
    Identifier,
    BinLiteral,
    DecLiteral,
    FloatLiteral,
    HexLiteral,
    OctLiteral,
    StringLiteral,
    EndOfFile,
}

impl TokenKind {
    /// 「expecting X for Y」形式の診断に使う表示名を返す。
    pub fn label(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "' '",
            TokenKind::Tab => "'\\t'",
            TokenKind::Newline => "'\\n'",
            TokenKind::Bang => "'!'",
            TokenKind::Star => "'*'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Plus => "'+'",
            TokenKind::Colon => "':'",
            TokenKind::LessThan => "'<'",
            TokenKind::GreaterThan => "'>'",
            TokenKind::Minus => "'-'",
            TokenKind::Equals => "'='",
            TokenKind::OpenSquare => "'['",
            TokenKind::CloseSquare => "']'",
            TokenKind::Comma => "','",
            TokenKind::Period => "'.'",
            TokenKind::Slash => "'/'",
            TokenKind::Comment => "'comment'",
            TokenKind::Else => "'else'",
            TokenKind::Extern => "'extern'",
            TokenKind::False => "'false'",
            TokenKind::Function => "'function'",
            TokenKind::If => "'if'",
            TokenKind::Include => "'include'",
            TokenKind::Namespace => "'namespace'",
            TokenKind::New => "'new'",
            TokenKind::Return => "'return'",
            TokenKind::True => "'true'",
            TokenKind::Type => "'type'",
            TokenKind::Identifier => "'identifier'",
            TokenKind::BinLiteral => "'bin literal'",
            TokenKind::DecLiteral => "'int literal'",
            TokenKind::FloatLiteral => "'float literal'",
            TokenKind::HexLiteral => "'hex literal'",
            TokenKind::OctLiteral => "'oct literal'",
            TokenKind::StringLiteral => "'string literal'",
            TokenKind::EndOfFile => "'end of file'",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 1 始まりの行・桁で表すソース位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// 種別・範囲・逐語テキストを持つトークン。
///
/// `text` は元ソースの切り出しそのもので、全トークンの `text` を連結すると
/// 入力を逐語的に復元できる（`EndOfFile` は空文字列）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Position,
    pub end: Position,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, start: Position, end: Position, text: impl Into<String>) -> Self {
        Self {
            kind,
            start,
            end,
            text: text.into(),
        }
    }

    /// トークンが指す範囲の桁数。空白・タブのラン長計測に使う。
    ///
    /// 行をまたぐトークン（未終端コメントなど）は開始行の桁数を特定できない
    /// ため 1 とする。
    pub fn width(&self) -> usize {
        if self.end.line != self.start.line {
            return 1;
        }
        self.end.column - self.start.column + 1
    }
}
