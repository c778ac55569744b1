//! ワークブックの入出力
//!
//! 各シートの使用範囲の先頭行を見出し（列名）、以降をデータとして扱う。
//! 使用範囲の開始位置は書き出し時にも保つ。

pub mod reader;
pub mod writer;

pub use reader::read_workbook;
pub use writer::write_workbook;

use sentinel_common::{Cell, CellRef};

/// シート1枚分の表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    /// 見出し行から数えたデータ行（見出しは含まない）
    pub rows: Vec<Vec<Option<String>>>,
    /// 見出し行の0始まり行番号
    pub header_row: usize,
    /// 先頭列の0始まり列番号
    pub first_col: usize,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
            header_row: 0,
            first_col: 0,
        }
    }

    /// データ行の表示用行番号（見出しが1行目なら先頭データは2）
    pub fn display_row(&self, index: usize) -> usize {
        self.header_row + index + 2
    }
}

/// 読み込んだワークブック
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// シート → 行 → 列 の順にセルを並べる
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for sheet in &self.sheets {
            for (index, row) in sheet.rows.iter().enumerate() {
                for (column, value) in sheet.headers.iter().zip(row.iter()) {
                    cells.push(Cell::new(
                        CellRef::new(sheet.name.clone(), sheet.display_row(index), column.clone()),
                        value.clone(),
                    ));
                }
            }
        }
        cells
    }

    /// 補正済みセルを書き戻した新しいワークブックを返す
    ///
    /// `cells` は `cells()` と同じ並びであること。足りない分は元の値のまま。
    pub fn with_cells(&self, cells: &[Cell]) -> Workbook {
        let mut values = cells.iter().map(|c| c.value.clone());
        let mut sheets = Vec::with_capacity(self.sheets.len());

        for sheet in &self.sheets {
            let mut rows = Vec::with_capacity(sheet.rows.len());
            for row in &sheet.rows {
                let mut out = Vec::with_capacity(row.len());
                for (col, original) in row.iter().enumerate() {
                    let value = if col < sheet.headers.len() {
                        values.next().unwrap_or_else(|| original.clone())
                    } else {
                        original.clone()
                    };
                    out.push(value);
                }
                rows.push(out);
            }
            sheets.push(Sheet {
                rows,
                ..sheet.clone()
            });
        }

        Workbook { sheets }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }
}

/// 0始まりの列番号を A, B, ..., Z, AA 形式にする
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Workbook {
        let mut sheet = Sheet::new("약제", vec!["코드".into(), "내용".into()]);
        sheet.rows = vec![
            vec![Some("A1".into()), Some("20mcg 정".into())],
            vec![Some("A2".into()), None],
        ];
        Workbook { sheets: vec![sheet] }
    }

    #[test]
    fn test_cells_order_and_rows() {
        let cells = sample().cells();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].reference, CellRef::new("약제", 2, "코드"));
        assert_eq!(cells[1].reference, CellRef::new("약제", 2, "내용"));
        assert_eq!(cells[3].reference.row, 3);
        assert_eq!(cells[3].value, None);
    }

    #[test]
    fn test_with_cells_replaces_values() {
        let book = sample();
        let mut cells = book.cells();
        cells[1].value = Some("20 ㎍ 정".into());
        let updated = book.with_cells(&cells);
        assert_eq!(updated.sheets[0].rows[0][1].as_deref(), Some("20 ㎍ 정"));
        assert_eq!(updated.sheets[0].rows[0][0].as_deref(), Some("A1"));
        assert_eq!(updated.sheets[0].rows[1][1], None);
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }
}
