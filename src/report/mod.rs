//! CSV / Markdown レポート出力
//!
//! CSVはすべて UTF-8 (BOM付き) で書き出す。

pub mod summary;

pub use summary::{write_summary, SummaryInputs};

use crate::error::Result;
use sentinel_common::{
    AnomalyRow, CellScoreTable, CharFrequency, CharSample, InvalidCharRow, LogRecord, ReviewRecord,
};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const NORMALIZED_SUFFIX: &str = "_normalized.xlsx";
pub const CORRECTIONS_CSV: &str = "error_corrections.csv";
pub const REVIEW_CSV: &str = "review_list.csv";
pub const CANDIDATES_CSV: &str = "fffd_candidates.csv";
pub const SUMMARY_MD: &str = "summary_report.md";
pub const INVALID_CHAR_CSV: &str = "invalid_char_report.csv";
pub const FREQ_CSV: &str = "unicode_freq.csv";
pub const SAMPLES_CSV: &str = "unicode_samples.csv";
pub const ANOMALIES_CSV: &str = "ocr_unit_anomalies_scan.csv";

/// 行の並びをBOM付きCSVとして書き出す
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    file.write_all("\u{FEFF}".as_bytes())?;

    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "CSVを書き出しました");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CorrectionRow<'a> {
    pub sheet: &'a str,
    pub row: usize,
    pub column: &'a str,
    pub rule: &'static str,
    pub before: &'a str,
    pub after: &'a str,
    pub detail: &'a str,
    pub had_anomaly_match: bool,
}

impl<'a> From<&'a LogRecord> for CorrectionRow<'a> {
    fn from(log: &'a LogRecord) -> Self {
        Self {
            sheet: &log.cell.sheet,
            row: log.cell.row,
            column: &log.cell.column,
            rule: log.rule.as_str(),
            before: &log.before,
            after: &log.after,
            detail: &log.detail,
            had_anomaly_match: log.had_anomaly_match,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewRow<'a> {
    pub sheet: &'a str,
    pub row: usize,
    pub column: &'a str,
    pub rule: &'static str,
    pub before: &'a str,
    pub suggested: &'a str,
    pub detail: &'a str,
    pub cell_excerpt: &'a str,
}

impl<'a> From<&'a ReviewRecord> for ReviewRow<'a> {
    fn from(review: &'a ReviewRecord) -> Self {
        Self {
            sheet: &review.cell.sheet,
            row: review.cell.row,
            column: &review.cell.column,
            rule: review.rule.as_str(),
            before: &review.before,
            suggested: &review.suggested,
            detail: &review.detail,
            cell_excerpt: &review.context_excerpt,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidateRow<'a> {
    pub sheet: &'a str,
    pub row: usize,
    pub column: &'a str,
    /// セル内の何番目の � か（1始まり）
    pub occurrence: usize,
    pub value: &'a str,
    pub best_candidate: &'a str,
    pub candidate_scores: String,
    pub decision: &'a str,
}

impl<'a> From<&'a CellScoreTable> for CandidateRow<'a> {
    fn from(entry: &'a CellScoreTable) -> Self {
        Self {
            sheet: &entry.cell.sheet,
            row: entry.cell.row,
            column: &entry.cell.column,
            occurrence: entry.table.occurrence.ordinal + 1,
            value: &entry.value,
            best_candidate: entry.table.best().map(|s| s.candidate.as_str()).unwrap_or(""),
            candidate_scores: entry.table.format_scores(),
            decision: &entry.decision,
        }
    }
}

pub fn write_corrections(path: &Path, logs: &[LogRecord]) -> Result<()> {
    let rows: Vec<CorrectionRow> = logs.iter().map(CorrectionRow::from).collect();
    write_csv(path, &rows)
}

pub fn write_reviews(path: &Path, reviews: &[ReviewRecord]) -> Result<()> {
    let rows: Vec<ReviewRow> = reviews.iter().map(ReviewRow::from).collect();
    write_csv(path, &rows)
}

pub fn write_candidates(path: &Path, tables: &[CellScoreTable]) -> Result<()> {
    let rows: Vec<CandidateRow> = tables.iter().map(CandidateRow::from).collect();
    write_csv(path, &rows)
}

pub fn write_invalid_chars(path: &Path, rows: &[InvalidCharRow]) -> Result<()> {
    write_csv(path, rows)
}

pub fn write_frequencies(path: &Path, rows: &[CharFrequency]) -> Result<()> {
    write_csv(path, rows)
}

pub fn write_samples(path: &Path, rows: &[CharSample]) -> Result<()> {
    write_csv(path, rows)
}

pub fn write_anomalies(path: &Path, rows: &[AnomalyRow]) -> Result<()> {
    write_csv(path, rows)
}

/// `data/원본.xlsx` → `<out_dir>/원본_normalized.xlsx`
pub fn normalized_path(input: &Path, out_dir: &Path) -> std::path::PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_string());
    out_dir.join(format!("{}{}", stem, NORMALIZED_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_common::{CellRef, Rule};

    #[test]
    fn test_write_csv_has_bom_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CORRECTIONS_CSV);
        let logs = vec![LogRecord {
            cell: CellRef::new("S", 2, "내용"),
            rule: Rule::AsciiMicro,
            before: "20mcg".into(),
            after: "20 ㎍".into(),
            detail: "mcg -> ㎍".into(),
            had_anomaly_match: false,
        }];
        write_corrections(&path, &logs).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with('\u{FEFF}'));
        let mut lines = content.trim_start_matches('\u{FEFF}').lines();
        assert_eq!(
            lines.next(),
            Some("sheet,row,column,rule,before,after,detail,had_anomaly_match")
        );
        assert_eq!(lines.next(), Some("S,2,내용,ascii_micro,20mcg,20 ㎍,mcg -> ㎍,false"));
    }

    #[test]
    fn test_normalized_path() {
        let path = normalized_path(Path::new("data/요양심사약제.xlsx"), Path::new("out"));
        assert_eq!(path, Path::new("out/요양심사약제_normalized.xlsx"));
    }
}
