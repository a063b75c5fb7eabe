// パス: src/lexer.rs
// 役割: ソーステキストを位置情報付きトークン列へ変換する字句解析器
// 意図: 空白やコメントも含めて逐語的に走査し、インデント計測の材料を残す
// 関連ファイル: src/token.rs, src/parser.rs, tests/lexer_tests.rs
//! 字句解析モジュール
//!
//! - 空白・タブはラン長をまとめて 1 トークンにする（インデント幅の計測は
//!   トークンの桁範囲で行う）。
//! - 数値リテラルは先頭の符号と小数点を取り込み、基数で種別を分類する。
//!   `-5` は単独の 10 進リテラルであり、`Minus` と `5` には分かれない。
//! - 全トークンの `text` を連結すると入力を逐語的に復元できる。
//! - 識別子を切り出してからキーワード表で分類する。

use crate::diag::{Diagnostics, FatalError};
use crate::token::{Position, Token, TokenKind};

/// ソース全体を走査してトークン列を返す。末尾に `EndOfFile` を付加する。
pub fn lex(source: &str, diags: &mut Diagnostics) -> Result<Vec<Token>, FatalError> {
    Lexer::new(source).run(diags)
}

struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    prev: Position,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            prev: Position::new(1, 1),
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn bump(&mut self) -> char {
        let ch = self.chars[self.index];
        self.prev = self.pos();
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn text_since(&self, start_index: usize) -> String {
        self.chars[start_index..self.index].iter().collect()
    }

    fn push(&mut self, kind: TokenKind, start: Position, start_index: usize) {
        let text = self.text_since(start_index);
        self.tokens.push(Token::new(kind, start, self.prev, text));
    }

    fn run(mut self, diags: &mut Diagnostics) -> Result<Vec<Token>, FatalError> {
        while let Some(ch) = self.peek(0) {
            let start = self.pos();
            let start_index = self.index;
            match ch {
                ' ' => {
                    self.consume_run(' ');
                    self.push(TokenKind::Whitespace, start, start_index);
                }
                '\t' => {
                    self.consume_run('\t');
                    self.push(TokenKind::Tab, start, start_index);
                }
                '\n' => {
                    self.bump();
                    self.push(TokenKind::Newline, start, start_index);
                }
                '!' => self.single(TokenKind::Bang, start, start_index),
                '*' => self.single(TokenKind::Star, start, start_index),
                '(' => self.single(TokenKind::OpenParen, start, start_index),
                ')' => self.single(TokenKind::CloseParen, start, start_index),
                '+' => self.single(TokenKind::Plus, start, start_index),
                ':' => self.single(TokenKind::Colon, start, start_index),
                '<' => self.single(TokenKind::LessThan, start, start_index),
                '>' => self.single(TokenKind::GreaterThan, start, start_index),
                '=' => self.single(TokenKind::Equals, start, start_index),
                '[' => self.single(TokenKind::OpenSquare, start, start_index),
                ']' => self.single(TokenKind::CloseSquare, start, start_index),
                ',' => self.single(TokenKind::Comma, start, start_index),
                '"' => self.string_literal(start, start_index, diags)?,
                '-' => {
                    if self.at_numeric_literal() {
                        self.numeric_literal(start, start_index);
                    } else {
                        self.single(TokenKind::Minus, start, start_index);
                    }
                }
                '.' => {
                    if self.at_numeric_literal() {
                        self.numeric_literal(start, start_index);
                    } else {
                        self.single(TokenKind::Period, start, start_index);
                    }
                }
                '/' => match self.peek(1) {
                    Some('*') => self.c_comment(start, start_index, diags)?,
                    Some('/') => {
                        while self.peek(0).is_some_and(|c| c != '\n') {
                            self.bump();
                        }
                        self.push(TokenKind::Comment, start, start_index);
                    }
                    _ => self.single(TokenKind::Slash, start, start_index),
                },
                c if c.is_ascii_alphabetic() || c == '_' => {
                    while self
                        .peek(0)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        self.bump();
                    }
                    let kind = keyword_kind(&self.text_since(start_index));
                    self.push(kind, start, start_index);
                }
                c if c.is_ascii_digit() => self.numeric_literal(start, start_index),
                _ => {
                    let tok = Token::new(TokenKind::EndOfFile, start, start, ch.to_string());
                    return Err(diags.fatal(&tok, "unexpected character when tokenizing file"));
                }
            }
        }

        let end = self.pos();
        self.tokens
            .push(Token::new(TokenKind::EndOfFile, end, end, ""));
        Ok(self.tokens)
    }

    fn single(&mut self, kind: TokenKind, start: Position, start_index: usize) {
        self.bump();
        self.push(kind, start, start_index);
    }

    fn consume_run(&mut self, ch: char) {
        while self.peek(0) == Some(ch) {
            self.bump();
        }
    }

    fn string_literal(
        &mut self,
        start: Position,
        start_index: usize,
        diags: &mut Diagnostics,
    ) -> Result<(), FatalError> {
        self.bump(); // 開き引用符
        loop {
            match self.peek(0) {
                Some('"') => {
                    self.bump();
                    self.push(TokenKind::StringLiteral, start, start_index);
                    return Ok(());
                }
                Some('\n') | None => {
                    let tok = Token::new(TokenKind::StringLiteral, start, self.prev, "");
                    return Err(diags.fatal(&tok, "unterminated string literal"));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn c_comment(
        &mut self,
        start: Position,
        start_index: usize,
        diags: &mut Diagnostics,
    ) -> Result<(), FatalError> {
        self.bump(); // '/'
        self.bump(); // '*'
        loop {
            match self.peek(0) {
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    self.push(TokenKind::Comment, start, start_index);
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    let tok = Token::new(TokenKind::Comment, start, self.prev, "");
                    return Err(diags.fatal(&tok, "unterminated comment"));
                }
            }
        }
    }

    /// 現在位置が数値リテラルの開始か。`-5` `.5` `-.5` の形も含む。
    fn at_numeric_literal(&self) -> bool {
        let d = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
        match self.peek(0) {
            Some(c) if c.is_ascii_digit() => true,
            Some('-') => d(self.peek(1)) || (self.peek(1) == Some('.') && d(self.peek(2))),
            Some('.') => d(self.peek(1)),
            _ => false,
        }
    }

    fn numeric_literal(&mut self, start: Position, start_index: usize) {
        let mut found_point = false;
        if self.peek(0) == Some('-') {
            self.bump();
        }
        if self.peek(0) == Some('.') {
            found_point = true;
            self.bump();
        }

        if !found_point && self.peek(0) == Some('0') {
            match self.peek(1) {
                Some('x') | Some('X') if self.peek(2).is_some_and(|c| c.is_ascii_hexdigit()) => {
                    self.bump();
                    self.bump();
                    while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.bump();
                    }
                    self.push(TokenKind::HexLiteral, start, start_index);
                }
                Some('b') | Some('B') if self.peek(2).is_some_and(is_bin_digit) => {
                    self.bump();
                    self.bump();
                    while self.peek(0).is_some_and(is_bin_digit) {
                        self.bump();
                    }
                    self.push(TokenKind::BinLiteral, start, start_index);
                }
                _ => self.digits_with_point(start, start_index, is_oct_digit, TokenKind::OctLiteral),
            }
        } else if found_point {
            self.bump();
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            self.push(TokenKind::FloatLiteral, start, start_index);
        } else {
            self.digits_with_point(start, start_index, |c| c.is_ascii_digit(), TokenKind::DecLiteral);
        }
    }

    /// 整数部を読み、途中で 1 回だけ小数点を許して float へ昇格させる。
    fn digits_with_point(
        &mut self,
        start: Position,
        start_index: usize,
        is_digit: fn(char) -> bool,
        int_kind: TokenKind,
    ) {
        let mut found_point = false;
        self.bump(); // 先頭の数字
        loop {
            match self.peek(0) {
                Some('.') if !found_point && self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                    found_point = true;
                    self.bump();
                }
                Some(c) if !found_point && is_digit(c) => {
                    self.bump();
                }
                Some(c) if found_point && c.is_ascii_digit() => {
                    self.bump();
                }
                _ => break,
            }
        }
        let kind = if found_point {
            TokenKind::FloatLiteral
        } else {
            int_kind
        };
        self.push(kind, start, start_index);
    }
}

fn is_bin_digit(c: char) -> bool {
    c == '0' || c == '1'
}

fn is_oct_digit(c: char) -> bool {
    ('0'..='7').contains(&c)
}

fn keyword_kind(text: &str) -> TokenKind {
    match text {
        "else" => TokenKind::Else,
        "extern" => TokenKind::Extern,
        "false" => TokenKind::False,
        "function" => TokenKind::Function,
        "if" => TokenKind::If,
        "include" => TokenKind::Include,
        "namespace" => TokenKind::Namespace,
        "new" => TokenKind::New,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "type" => TokenKind::Type,
        _ => TokenKind::Identifier,
    }
}
