//! サブコマンドの処理本体
//!
//! コンソール表示は main 側で行い、ここでは入出力と補正エンジンの呼び出しだけを扱う。

use crate::error::{require_file, Result};
use crate::inputs::{load_anomalies, load_mapping, load_pages, load_reference};
use crate::report::{self, SummaryInputs};
use crate::workbook::{read_workbook, write_workbook};
use indicatif::{ProgressBar, ProgressStyle};
use sentinel_common::{
    find_invalid_chars, scan_pages, scan_suspicious_chars, AnomalyIndex, AnomalyRow,
    CorrectionReport, Corrector, EngineConfig, InvalidCharRow,
};
use std::path::{Path, PathBuf};

/// `run` の入力
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub workbook: PathBuf,
    pub reference: Option<PathBuf>,
    pub anomalies: Option<PathBuf>,
    pub mapping: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub show_progress: bool,
}

/// `run` の出力先と結果
#[derive(Debug)]
pub struct RunOutput {
    pub normalized: PathBuf,
    pub corrections: PathBuf,
    pub reviews: PathBuf,
    pub candidates: Option<PathBuf>,
    pub summary: PathBuf,
    pub sheets: usize,
    pub report: CorrectionReport,
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} セル ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// 補正パイプライン一式
///
/// 必須入力をすべて確認してから処理を始める。欠けていれば何も書き出さない。
pub fn run(options: &RunOptions, config: &EngineConfig) -> Result<RunOutput> {
    require_file(&options.workbook)?;
    if let Some(path) = &options.reference {
        require_file(path)?;
    }
    if let Some(path) = &options.mapping {
        require_file(path)?;
    }

    // 不正な正規表現はここで止める
    let corrector = Corrector::new(config)?;

    let book = read_workbook(&options.workbook)?;
    let reference = match &options.reference {
        Some(path) => Some(load_reference(path, config.case_insensitive)?),
        None => None,
    };
    let mapping = match &options.mapping {
        Some(path) => load_mapping(path)?,
        None => Vec::new(),
    };
    let anomaly_rows: Vec<AnomalyRow> = match &options.anomalies {
        Some(path) => load_anomalies(path)?,
        None => Vec::new(),
    };
    let anomalies = AnomalyIndex::from_rows(&anomaly_rows);
    tracing::info!(
        pages = reference.as_ref().map_or(0, |r| r.len()),
        mapping = mapping.len(),
        anomalies = anomalies.len(),
        "入力を読み込みました"
    );

    let mut corrector = corrector.with_mapping(&mapping).with_anomalies(&anomalies);
    if let Some(reference) = &reference {
        corrector = corrector.with_reference(reference);
    }

    let cells = book.cells();
    let bar = progress_bar(cells.len(), options.show_progress);
    let (corrected, report) = corrector.run_with(&cells, |_| bar.inc(1));
    bar.finish_and_clear();
    tracing::info!(
        cells = report.stats.total_cells,
        changed = report.stats.changed_cells,
        logs = report.logs.len(),
        reviews = report.reviews.len(),
        "補正が完了しました"
    );

    std::fs::create_dir_all(&options.output_dir)?;
    let normalized = report::normalized_path(&options.workbook, &options.output_dir);
    write_workbook(&book.with_cells(&corrected), &normalized)?;

    let corrections = options.output_dir.join(report::CORRECTIONS_CSV);
    report::write_corrections(&corrections, &report.logs)?;

    let reviews = options.output_dir.join(report::REVIEW_CSV);
    report::write_reviews(&reviews, &report.reviews)?;

    let candidates = if reference.is_some() {
        let path = options.output_dir.join(report::CANDIDATES_CSV);
        report::write_candidates(&path, &report.tables)?;
        Some(path)
    } else {
        None
    };

    let summary = options.output_dir.join(report::SUMMARY_MD);
    let mut outputs = vec![normalized.clone(), corrections.clone(), reviews.clone()];
    outputs.extend(candidates.clone());
    let summary_inputs = SummaryInputs {
        workbook: options.workbook.clone(),
        reference: options.reference.clone(),
        anomalies: options.anomalies.clone(),
        mapping: options.mapping.clone(),
        outputs,
    };
    report::write_summary(&summary, &summary_inputs, &report)?;

    Ok(RunOutput {
        normalized,
        corrections,
        reviews,
        candidates,
        summary,
        sheets: book.sheet_count(),
        report,
    })
}

/// � を含むセルの一覧を書き出す
pub fn scan_invalid(workbook: &Path, output: &Path) -> Result<Vec<InvalidCharRow>> {
    let book = read_workbook(workbook)?;
    let rows = find_invalid_chars(&book.cells());
    report::write_invalid_chars(output, &rows)?;
    Ok(rows)
}

/// 疑わしい文字の頻度とサンプルを書き出す。戻り値は (頻度表のパス, サンプルのパス, 文字種数)。
pub fn frequency(workbook: &Path, output_dir: &Path) -> Result<(PathBuf, PathBuf, usize)> {
    let book = read_workbook(workbook)?;
    let scan = scan_suspicious_chars(&book.cells());

    std::fs::create_dir_all(output_dir)?;
    let freq = output_dir.join(report::FREQ_CSV);
    let samples = output_dir.join(report::SAMPLES_CSV);
    report::write_frequencies(&freq, &scan.frequencies)?;
    report::write_samples(&samples, &scan.samples)?;
    Ok((freq, samples, scan.frequencies.len()))
}

/// 参照文書の単位・ギリシャ文字を分類して書き出す
pub fn scan_units(pages: &Path, output: &Path, config: &EngineConfig) -> Result<Vec<AnomalyRow>> {
    let pages = load_pages(pages)?;
    let rows: Vec<AnomalyRow> = scan_pages(&pages, config).iter().map(AnomalyRow::from).collect();
    report::write_anomalies(output, &rows)?;
    Ok(rows)
}

/// � ごとの候補スコア表だけを書き出す（ワークブックは変更しない）
pub fn candidates(
    workbook: &Path,
    reference: &Path,
    output: &Path,
    config: &EngineConfig,
) -> Result<usize> {
    require_file(workbook)?;
    require_file(reference)?;

    let corrector = Corrector::new(config)?;
    let book = read_workbook(workbook)?;
    let document = load_reference(reference, config.case_insensitive)?;
    let corrector = corrector.with_reference(&document);

    let (_, report) = corrector.run(&book.cells());
    report::write_candidates(output, &report.tables)?;
    Ok(report.tables.len())
}
