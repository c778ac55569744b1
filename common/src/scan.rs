//! セル値の文字スキャン
//!
//! - � を含むセルの全件リスト
//! - 疑わしい文字（記号・ギリシャ文字・ハングル/ASCII以外）の頻度とサンプル

use crate::patterns::REPLACEMENT_CHAR;
use crate::types::{excerpt, Cell};
use serde::Serialize;
use std::collections::HashMap;

/// 必ず数える文字
pub const TARGET_CHARS: &[char] = &[
    '\u{FFFD}', '㎍', '㎎', '㎖', 'α', 'β', 'γ', 'μ', '°', '±', '≤', '≥', '·', '×', '–', '—', '™', '®',
];

const MAX_SAMPLES_PER_CHAR: usize = 5;
const SAMPLE_EXCERPT_CHARS: usize = 160;

/// � を含むセル1件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidCharRow {
    pub sheet: String,
    pub row: usize,
    pub column: String,
    pub value: String,
    pub count_in_cell: usize,
}

/// � を含むセルを列挙する
pub fn find_invalid_chars(cells: &[Cell]) -> Vec<InvalidCharRow> {
    cells
        .iter()
        .filter_map(|cell| {
            let value = cell.value.as_deref()?;
            let count = value.matches(REPLACEMENT_CHAR).count();
            (count > 0).then(|| InvalidCharRow {
                sheet: cell.reference.sheet.clone(),
                row: cell.reference.row,
                column: cell.reference.column.clone(),
                value: value.to_string(),
                count_in_cell: count,
            })
        })
        .collect()
}

fn is_hangul(c: char) -> bool {
    matches!(c as u32, 0xAC00..=0xD7A3 | 0x1100..=0x11FF | 0x3130..=0x318F)
}

fn is_basic_ascii(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7E)
}

/// 頻度を数える対象か
pub fn is_suspicious_char(c: char) -> bool {
    if TARGET_CHARS.contains(&c) {
        return true;
    }
    !(is_hangul(c) || is_basic_ascii(c))
}

/// コードポイント表記 `U+XXXX`
pub fn codepoint(c: char) -> String {
    format!("U+{:04X}", c as u32)
}

/// 文字ごとの出現数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharFrequency {
    pub codepoint: String,
    #[serde(rename = "char")]
    pub character: char,
    pub count: usize,
    pub name_hint: String,
}

/// 文字ごとのサンプル
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharSample {
    pub sheet: String,
    pub row: usize,
    pub column: String,
    #[serde(rename = "char")]
    pub character: char,
    pub codepoint: String,
    pub value_excerpt: String,
}

/// 疑わしい文字のスキャン結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharScan {
    /// 出現数の多い順（同数は初出順）
    pub frequencies: Vec<CharFrequency>,
    /// 初出順の文字ごとに最大5件
    pub samples: Vec<CharSample>,
}

/// 疑わしい文字の頻度を数える
pub fn scan_suspicious_chars(cells: &[Cell]) -> CharScan {
    let mut order: Vec<char> = Vec::new();
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut samples: HashMap<char, Vec<CharSample>> = HashMap::new();

    for cell in cells {
        let Some(value) = cell.value.as_deref() else { continue };
        for c in value.chars().filter(|c| is_suspicious_char(*c)) {
            let count = counts.entry(c).or_insert_with(|| {
                order.push(c);
                0
            });
            *count += 1;

            let list = samples.entry(c).or_default();
            if list.len() < MAX_SAMPLES_PER_CHAR {
                list.push(CharSample {
                    sheet: cell.reference.sheet.clone(),
                    row: cell.reference.row,
                    column: cell.reference.column.clone(),
                    character: c,
                    codepoint: codepoint(c),
                    value_excerpt: excerpt(value, SAMPLE_EXCERPT_CHARS),
                });
            }
        }
    }

    let mut frequencies: Vec<CharFrequency> = order
        .iter()
        .map(|&c| CharFrequency {
            codepoint: codepoint(c),
            character: c,
            count: counts.get(&c).copied().unwrap_or(0),
            name_hint: if c == REPLACEMENT_CHAR {
                "REPLACEMENT CHARACTER".to_string()
            } else {
                String::new()
            },
        })
        .collect();
    // 安定ソートなので同数は初出順のまま
    frequencies.sort_by(|a, b| b.count.cmp(&a.count));

    let samples = order
        .iter()
        .flat_map(|c| samples.remove(c).unwrap_or_default())
        .collect();

    CharScan { frequencies, samples }
}
