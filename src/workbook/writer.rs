//! rust_xlsxwriter によるワークブック書き出し

use super::Workbook;
use crate::error::Result;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use std::path::Path;

/// シート構成・見出し・セル配置を保ったまま文字列として書き出す
pub fn write_workbook(book: &Workbook, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    for sheet in &book.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        let header_row = sheet.header_row as u32;
        let first_col = sheet.first_col as u16;

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(header_row, first_col + col as u16, header, &header_format)?;
        }

        for (index, row) in sheet.rows.iter().enumerate() {
            let row_num = header_row + 1 + index as u32;
            for (col, value) in row.iter().enumerate() {
                if let Some(text) = value {
                    worksheet.write_string(row_num, first_col + col as u16, text)?;
                }
            }
        }
    }

    // 0シートのブックは保存できないため空シートを1枚置く
    if book.sheets.is_empty() {
        workbook.add_worksheet();
    }

    workbook.save(path)?;
    Ok(())
}
