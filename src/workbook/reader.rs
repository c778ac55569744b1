//! calamine によるワークブック読み込み

use super::{column_letter, Sheet, Workbook};
use crate::error::{require_file, Result, SentinelError};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// 全シートを読み込む
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    require_file(path)?;

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SentinelError::Workbook(format!("{}: {}", path.display(), e)))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| SentinelError::Workbook(format!("{}: {}", name, e)))?;

        let (header_row, first_col) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));
        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(first) => first
                .iter()
                .enumerate()
                .map(|(i, data)| cell_text(data).unwrap_or_else(|| column_letter(i)))
                .collect(),
            None => Vec::new(),
        };
        let rows: Vec<Vec<Option<String>>> = rows
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        tracing::debug!(sheet = %name, rows = rows.len(), columns = headers.len(), "シートを読み込みました");
        sheets.push(Sheet {
            name,
            headers,
            rows,
            header_row,
            first_col,
        });
    }

    Ok(Workbook { sheets })
}

/// セル値を文字列にする（空は None）
fn cell_text(data: &Data) -> Option<String> {
    match data {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String(String::new())), None);
        assert_eq!(cell_text(&Data::String("3g 주사".into())).as_deref(), Some("3g 주사"));
        assert_eq!(cell_text(&Data::Int(42)).as_deref(), Some("42"));
        assert_eq!(cell_text(&Data::Bool(true)).as_deref(), Some("true"));
    }

    #[test]
    fn test_missing_workbook() {
        let result = read_workbook(Path::new("/nonexistent/input.xlsx"));
        assert!(matches!(result, Err(SentinelError::FileNotFound(_))));
    }
}
