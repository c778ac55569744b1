//! ワークブック入出力とスキャン系コマンドの統合テスト

use pharmalex_sentinel::report;
use pharmalex_sentinel::runner;
use pharmalex_sentinel::workbook::{read_workbook, write_workbook, Sheet, Workbook};
use sentinel_common::EngineConfig;
use tempfile::tempdir;

fn two_sheet_book() -> Workbook {
    let mut first = Sheet::new("급여기준", vec!["성분명".to_string(), "내용".to_string()]);
    first.rows = vec![
        vec![Some("인터페론".to_string()), Some("1회 3\u{FFFD}g 투여".to_string())],
        vec![Some("알부민".to_string()), None],
    ];
    let mut second = Sheet::new("고시", vec!["번호".to_string(), "비고".to_string()]);
    second.rows = vec![vec![Some("1".to_string()), Some("α-차단제 ㎍ ㎍".to_string())]];
    Workbook {
        sheets: vec![first, second],
    }
}

#[test]
fn test_workbook_roundtrip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("book.xlsx");
    let book = two_sheet_book();

    write_workbook(&book, &path).expect("書き出し失敗");
    let loaded = read_workbook(&path).expect("読み込み失敗");

    assert_eq!(loaded.sheet_count(), 2);
    assert_eq!(loaded.sheets[0].name, "급여기준");
    assert_eq!(loaded.sheets[0].headers, vec!["성분명", "내용"]);
    assert_eq!(loaded.sheets[1].rows[0][1].as_deref(), Some("α-차단제 ㎍ ㎍"));

    let cells = loaded.cells();
    assert_eq!(cells[1].reference.to_string(), "급여기준!내용:2");
    assert_eq!(cells[1].value.as_deref(), Some("1회 3\u{FFFD}g 투여"));
}

#[test]
fn test_offset_table_keeps_position() {
    let dir = tempdir().expect("Failed to create temp dir");
    let first = dir.path().join("offset.xlsx");
    let mut sheet = Sheet::new("약제", vec!["코드".to_string(), "세부인정기준".to_string()]);
    sheet.header_row = 2;
    sheet.first_col = 1;
    sheet.rows = vec![vec![Some("C001".to_string()), Some("20mcg 정".to_string())]];
    write_workbook(&Workbook { sheets: vec![sheet] }, &first).unwrap();

    let loaded = read_workbook(&first).unwrap();
    assert_eq!(loaded.sheets[0].header_row, 2);
    assert_eq!(loaded.sheets[0].first_col, 1);
    assert_eq!(loaded.sheets[0].headers, vec!["코드", "세부인정기준"]);
    assert_eq!(loaded.cells()[0].reference.row, 4);

    // 書き戻しても位置がずれない
    let second = dir.path().join("offset_again.xlsx");
    write_workbook(&loaded, &second).unwrap();
    let reloaded = read_workbook(&second).unwrap();
    assert_eq!(reloaded, loaded);
}

#[test]
fn test_empty_trailing_cell_reads_as_none() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("book.xlsx");
    write_workbook(&two_sheet_book(), &path).unwrap();

    let loaded = read_workbook(&path).unwrap();
    let row = &loaded.sheets[0].rows[1];
    assert_eq!(row[0].as_deref(), Some("알부민"));
    assert!(row.get(1).cloned().flatten().is_none());
}

#[test]
fn test_scan_invalid_report() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("book.xlsx");
    write_workbook(&two_sheet_book(), &path).unwrap();
    let output = dir.path().join(report::INVALID_CHAR_CSV);

    let rows = runner::scan_invalid(&path, &output).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sheet, "급여기준");
    assert_eq!(rows[0].row, 2);
    assert_eq!(rows[0].column, "내용");
    assert_eq!(rows[0].count_in_cell, 1);

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("sheet,row,column,value,count_in_cell"));
}

#[test]
fn test_frequency_scan_outputs() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("book.xlsx");
    write_workbook(&two_sheet_book(), &path).unwrap();

    let (freq, samples, kinds) = runner::frequency(&path, &dir.path().join("scan")).unwrap();
    assert_eq!(kinds, 3);

    let freq = std::fs::read_to_string(freq).unwrap();
    let mut lines = freq.trim_start_matches('\u{FEFF}').lines();
    assert_eq!(lines.next(), Some("codepoint,char,count,name_hint"));
    assert_eq!(lines.next(), Some("U+338D,㎍,2,"));
    assert!(freq.contains("U+FFFD,\u{FFFD},1,REPLACEMENT CHARACTER"));

    let samples = std::fs::read_to_string(samples).unwrap();
    assert!(samples.contains("고시,2,비고,α,U+03B1"));
}

#[test]
fn test_candidates_command_leaves_workbook() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("book.xlsx");
    write_workbook(&two_sheet_book(), &path).unwrap();
    let reference = dir.path().join("pages.txt");
    std::fs::write(&reference, "1회 3㎍g 투여\u{000C}1회 3㎍g 투여 후 1회 3㎍g 투여").unwrap();
    let output = dir.path().join(report::CANDIDATES_CSV);

    let count = runner::candidates(&path, &reference, &output, &EngineConfig::default()).unwrap();
    assert_eq!(count, 1);

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("급여기준,2,내용,1,"));
    assert!(content.contains("㎍:3(p2×2, p1×1)"));

    let reloaded = read_workbook(&path).unwrap();
    assert_eq!(reloaded.sheets[0].rows[0][1].as_deref(), Some("1회 3\u{FFFD}g 투여"));
}
