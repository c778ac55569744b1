//! 実行サマリ（Markdown）

use crate::error::Result;
use sentinel_common::{CorrectionReport, Rule};
use std::path::{Path, PathBuf};

const REVIEW_PREVIEW_ROWS: usize = 50;

/// サマリに載せる入出力パス
#[derive(Debug, Clone, Default)]
pub struct SummaryInputs {
    pub workbook: PathBuf,
    pub reference: Option<PathBuf>,
    pub anomalies: Option<PathBuf>,
    pub mapping: Option<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

fn optional_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!("`{}`", p.display()),
        None => "(なし)".to_string(),
    }
}

/// Markdown のテーブルセルとして安全な文字列にする
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn render_summary(inputs: &SummaryInputs, report: &CorrectionReport, timestamp: &str) -> String {
    let stats = &report.stats;
    let mut md = String::new();

    md.push_str("# PharmaLex Sentinel 補正レポート\n");
    md.push_str(&format!("- 実行時刻: {}\n", timestamp));
    md.push_str(&format!("- 入力ワークブック: `{}`\n", inputs.workbook.display()));
    md.push_str(&format!("- 参照文書: {}\n", optional_path(&inputs.reference)));
    md.push_str(&format!("- OCR異常スキャン: {}\n", optional_path(&inputs.anomalies)));
    md.push_str(&format!("- 手動マッピング: {}\n", optional_path(&inputs.mapping)));
    md.push('\n');

    md.push_str("## 処理概要\n");
    md.push_str(&format!("- 検査セル数: **{}**\n", stats.total_cells));
    md.push_str(&format!("- 変更セル数: **{}**\n", stats.changed_cells));
    md.push_str(&format!("- � を含むセル数: **{}**\n", stats.replacement_cells));
    md.push_str(&format!("- 自動補正ログ数: **{}**\n", report.logs.len()));
    md.push_str(&format!("- 要確認数: **{}**\n", report.reviews.len()));
    md.push('\n');

    md.push_str("## ルール別件数\n");
    md.push_str("| rule | applied | review |\n");
    md.push_str("|---|---:|---:|\n");
    let mut rules: Vec<Rule> = stats
        .applied_by_rule
        .keys()
        .chain(stats.deferred_by_rule.keys())
        .copied()
        .collect();
    rules.sort();
    rules.dedup();
    for rule in rules {
        let applied = stats.applied_by_rule.get(&rule).copied().unwrap_or(0);
        let deferred = stats.deferred_by_rule.get(&rule).copied().unwrap_or(0);
        md.push_str(&format!("| {} | {} | {} |\n", rule, applied, deferred));
    }
    md.push('\n');

    md.push_str(&format!("## 要確認（先頭{}件）\n", REVIEW_PREVIEW_ROWS));
    if report.reviews.is_empty() {
        md.push_str("- 要確認なし\n");
    } else {
        md.push_str("| sheet | row | column | rule | before | suggested | detail |\n");
        md.push_str("|---|---:|---|---|---|---|---|\n");
        for review in report.reviews.iter().take(REVIEW_PREVIEW_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                table_cell(&review.cell.sheet),
                review.cell.row,
                table_cell(&review.cell.column),
                review.rule,
                table_cell(&review.before),
                table_cell(&review.suggested),
                table_cell(&review.detail),
            ));
        }
    }
    md.push('\n');

    md.push_str("## 出力\n");
    for output in &inputs.outputs {
        md.push_str(&format!("- `{}`\n", output.display()));
    }

    md
}

/// 現在時刻入りのサマリを書き出す
pub fn write_summary(path: &Path, inputs: &SummaryInputs, report: &CorrectionReport) -> Result<()> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    std::fs::write(path, render_summary(inputs, report, &timestamp))?;
    Ok(())
}
