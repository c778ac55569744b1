//! 補助入力の読み込み
//!
//! - 参照文書のページテキスト（JSON配列 または \f 区切りのテキスト）
//! - 手動マッピングCSV（before,after[,notes]）
//! - 事前のOCR異常スキャンCSV

use crate::error::{require_file, Result, SentinelError};
use sentinel_common::{AnomalyRow, MappingPair, ReferenceDocument};
use serde::Deserialize;
use std::path::Path;

const BOM: char = '\u{FEFF}';
const FORM_FEED: char = '\u{000C}';

/// 先頭のBOMを除いた文字列を読む
fn read_text(path: &Path) -> Result<String> {
    require_file(path)?;
    let content = std::fs::read_to_string(path)?;
    Ok(match content.strip_prefix(BOM) {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

/// ページテキストの並びを解釈する
///
/// `[` で始まれば JSON の文字列配列、それ以外は改ページ文字で区切る。
pub fn parse_pages(content: &str) -> Result<Vec<String>> {
    if content.trim_start().starts_with('[') {
        let pages: Vec<String> = serde_json::from_str(content)?;
        return Ok(pages);
    }

    let mut pages: Vec<String> = content.split(FORM_FEED).map(str::to_string).collect();
    // pdftotext は最終ページの後にも \f を出力する
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    Ok(pages)
}

/// 参照文書を読み込む（1ページ目が page 1）
pub fn load_pages(path: &Path) -> Result<Vec<String>> {
    let content = read_text(path)?;
    let pages = parse_pages(&content)?;
    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(SentinelError::InvalidInput(format!(
            "参照文書にテキストがありません: {}",
            path.display()
        )));
    }
    tracing::info!(pages = pages.len(), path = %path.display(), "参照文書を読み込みました");
    Ok(pages)
}

pub fn load_reference(path: &Path, case_insensitive: bool) -> Result<ReferenceDocument> {
    Ok(ReferenceDocument::new(load_pages(path)?, case_insensitive))
}

#[derive(Debug, Deserialize)]
struct MappingRow {
    #[serde(default)]
    before: String,
    #[serde(default)]
    after: String,
}

pub fn parse_mapping(content: &str) -> Result<Vec<MappingPair>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut pairs = Vec::new();
    for row in reader.deserialize::<MappingRow>() {
        let row = row?;
        if row.before.is_empty() {
            continue;
        }
        pairs.push(MappingPair::new(row.before, row.after));
    }
    Ok(pairs)
}

/// 手動マッピングCSVを読み込む（before が空の行は無視）
pub fn load_mapping(path: &Path) -> Result<Vec<MappingPair>> {
    let pairs = parse_mapping(&read_text(path)?)?;
    tracing::info!(pairs = pairs.len(), "マッピングを読み込みました");
    Ok(pairs)
}

pub fn parse_anomalies(content: &str) -> Result<Vec<AnomalyRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let rows = reader
        .deserialize::<AnomalyRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// 事前スキャンCSVを読み込む。ファイルが無ければ警告のみで空を返す。
pub fn load_anomalies(path: &Path) -> Result<Vec<AnomalyRow>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "OCR異常スキャンCSVがありません。ルールのみで実行します");
        return Ok(Vec::new());
    }
    let rows = parse_anomalies(&read_text(path)?)?;
    tracing::info!(rows = rows.len(), "OCR異常スキャンを読み込みました");
    Ok(rows)
}
