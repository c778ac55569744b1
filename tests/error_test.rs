//! エラーケーステスト
//!
//! 必須入力の欠落や不正な設定で、何も書き出さずに止まることを検証

use pharmalex_sentinel::error::SentinelError;
use pharmalex_sentinel::runner::{self, RunOptions};
use pharmalex_sentinel::workbook::{write_workbook, Sheet, Workbook};
use sentinel_common::EngineConfig;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn create_workbook(dir: &Path) -> PathBuf {
    let mut sheet = Sheet::new("Sheet1", vec!["내용".to_string()]);
    sheet.rows = vec![vec![Some("20mcg 정".to_string())]];
    let path = dir.join("in.xlsx");
    write_workbook(&Workbook { sheets: vec![sheet] }, &path).unwrap();
    path
}

/// 存在しないワークブック
#[test]
fn test_missing_workbook() {
    let dir = tempdir().expect("Failed to create temp dir");
    let options = RunOptions {
        workbook: dir.path().join("nothing.xlsx"),
        output_dir: dir.path().join("out"),
        ..Default::default()
    };

    let err = runner::run(&options, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, SentinelError::FileNotFound(_)));
    assert!(!dir.path().join("out").exists());
}

/// 参照文書を指定したのに存在しない場合は処理しない
#[test]
fn test_missing_reference_writes_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let options = RunOptions {
        workbook: create_workbook(dir.path()),
        reference: Some(dir.path().join("pages.json")),
        output_dir: dir.path().join("out"),
        ..Default::default()
    };

    let err = runner::run(&options, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, SentinelError::FileNotFound(ref p) if p.ends_with("pages.json")));
    assert!(!dir.path().join("out").exists());
}

/// 事前スキャンCSVが無いだけなら続行する
#[test]
fn test_missing_anomalies_is_not_fatal() {
    let dir = tempdir().expect("Failed to create temp dir");
    let options = RunOptions {
        workbook: create_workbook(dir.path()),
        anomalies: Some(dir.path().join("ocr_unit_anomalies_scan.csv")),
        output_dir: dir.path().join("out"),
        ..Default::default()
    };

    let output = runner::run(&options, &EngineConfig::default()).unwrap();
    assert_eq!(output.report.logs.len(), 1);
    assert!(!output.report.logs[0].had_anomaly_match);
}

/// 検査値パターンの正規表現が不正
#[test]
fn test_invalid_lab_pattern() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = EngineConfig {
        lab_negative_patterns: vec!["g/(dl".to_string()],
        ..Default::default()
    };
    let options = RunOptions {
        workbook: create_workbook(dir.path()),
        output_dir: dir.path().join("out"),
        ..Default::default()
    };

    let err = runner::run(&options, &config).unwrap_err();
    assert!(matches!(
        err,
        SentinelError::Common(sentinel_common::Error::Pattern(_))
    ));
    assert!(!dir.path().join("out").exists());
}

/// ワークブックとして読めないファイル
#[test]
fn test_not_a_workbook() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, "not a zip").unwrap();

    let err = runner::scan_invalid(&path, &dir.path().join("report.csv")).unwrap_err();
    assert!(matches!(err, SentinelError::Workbook(_)));
}

/// 空の参照文書
#[test]
fn test_blank_reference_pages() {
    let dir = tempdir().expect("Failed to create temp dir");
    let pages = dir.path().join("pages.txt");
    std::fs::write(&pages, "  \u{000C}\n").unwrap();

    let err = runner::scan_units(&pages, &dir.path().join("scan.csv"), &EngineConfig::default())
        .unwrap_err();
    assert!(matches!(err, SentinelError::InvalidInput(_)));
}

/// SentinelErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        SentinelError::Config("テスト設定エラー".to_string()),
        SentinelError::FileNotFound("in.xlsx".to_string()),
        SentinelError::InvalidInput("空".to_string()),
        SentinelError::Workbook("壊れたファイル".to_string()),
    ];

    for err in errors {
        let msg = err.to_string();
        assert!(!msg.is_empty(), "エラーメッセージが空: {:?}", err);
    }

    let err: SentinelError = sentinel_common::Error::Config("margin_ratio".into()).into();
    assert_eq!(err.to_string(), "Config error: margin_ratio");
}
