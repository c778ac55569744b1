//! パターンライブラリ
//!
//! 単位トークン（マイクロ・ミリ・グラム・リットル・IU）、ギリシャ文字の崩れ、
//! � (U+FFFD) の文脈ルールの正規表現定義。

use lazy_static::lazy_static;
use regex::Regex;

/// OCRで失われた文字の代わりに現れる置換文字
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// マイクログラム記号
pub const MICRO_SYMBOL: &str = "㎍";

/// 単位トークンの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// 数値 + ug/mcg
    MicroAscii,
    /// 数値 + ㎍
    MicroSymbol,
    /// 数値 + mg
    MilliAscii,
    /// 数値 + ㎎
    MilliSymbol,
    /// 数値 + g
    GramAscii,
    /// 数値 + ml
    MlAscii,
    /// 数値 + ㎖
    MlSymbol,
    /// 数値 + IU
    IuAscii,
    /// α β γ μ
    GreekLetter,
    /// a- / alpha
    AlphaLike,
    /// b- / beta
    BetaLike,
    /// g- / gamma
    GammaLike,
    /// 単位記号が付いていない μ
    MuAlone,
}

impl TokenKind {
    /// 数値を捕捉するパターンか
    pub fn captures_number(&self) -> bool {
        matches!(
            self,
            TokenKind::MicroAscii
                | TokenKind::MicroSymbol
                | TokenKind::MilliAscii
                | TokenKind::MilliSymbol
                | TokenKind::GramAscii
                | TokenKind::MlAscii
                | TokenKind::MlSymbol
                | TokenKind::IuAscii
        )
    }
}

lazy_static! {
    /// セル補正用: 数値 + ug/mcg
    pub static ref ASCII_MICRO_RE: Regex =
        Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(mcg|ug)\b").unwrap();

    /// セル補正用: 数値 + g（直後に英字が続くものは呼び出し側で除外）
    pub static ref GRAM_VALUE_RE: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*g").unwrap();

    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();

    /// 参照文書スキャン用パターン（スキャン順）
    pub static ref SCAN_PATTERNS: Vec<(TokenKind, Regex)> = vec![
        (TokenKind::MicroAscii, Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:ug|mcg)\b").unwrap()),
        (TokenKind::MicroSymbol, Regex::new(r"\b(\d+(?:\.\d+)?)\s*㎍").unwrap()),
        (TokenKind::MilliAscii, Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*mg\b").unwrap()),
        (TokenKind::MilliSymbol, Regex::new(r"\b(\d+(?:\.\d+)?)\s*㎎").unwrap()),
        (TokenKind::GramAscii, Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*g\b").unwrap()),
        (TokenKind::MlAscii, Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*ml\b").unwrap()),
        (TokenKind::MlSymbol, Regex::new(r"\b(\d+(?:\.\d+)?)\s*㎖").unwrap()),
        (TokenKind::IuAscii, Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*iu\b").unwrap()),
        (TokenKind::GreekLetter, Regex::new(r"[αβγμ]").unwrap()),
    ];

    /// ギリシャ文字が a/b/g に崩れた疑い
    pub static ref GREEK_SIGNATURES: Vec<(TokenKind, Regex)> = vec![
        (TokenKind::AlphaLike, Regex::new(r"(?i)\b(?:a-|alpha\b)").unwrap()),
        (TokenKind::BetaLike, Regex::new(r"(?i)\b(?:b-|beta\b)").unwrap()),
        (TokenKind::GammaLike, Regex::new(r"(?i)\b(?:g-|gamma\b)").unwrap()),
        (TokenKind::MuAlone, Regex::new(r"\bμ\b").unwrap()),
    ];
}

/// gram トークンの直後がASCII英字か（mg, gamma などの一部を除外する）
pub fn followed_by_ascii_letter(text: &str, end: usize) -> bool {
    text[end..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
}

/// 連続する空白を1つの半角スペースに畳む
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").into_owned()
}

/// マッチ位置（バイト）の前後 `window` 文字を文脈として切り出す
pub fn context_around(text: &str, start: usize, end: usize, window: usize) -> String {
    let left: Vec<char> = text[..start].chars().rev().take(window).collect();
    let left: String = left.into_iter().rev().collect();
    let right: String = text[end..].chars().take(window).collect();
    let snippet = format!("{}{}{}", left, &text[start..end], right);
    collapse_whitespace(&snippet).trim().to_string()
}

/// 文字列をエスケープし、空白部分を `\s+` にゆるめた正規表現断片にする
pub fn relax_whitespace(text: &str) -> String {
    text.split(' ')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}
