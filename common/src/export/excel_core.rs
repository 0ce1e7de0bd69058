//! Excel生成（共通ライブラリ）
//!
//! 名前付きの表をそれぞれ1シートとしてワークブックに書き出す。

use crate::error::Result;
use crate::table::NamedTable;
use crate::types::Cell;
use rust_xlsxwriter::*;
use std::path::Path;

/// 列幅の上限（文字数換算）
const MAX_COL_WIDTH: f64 = 60.0;

/// ワークブックをファイルに保存
pub fn save_workbook(sheets: &[NamedTable], path: &Path) -> Result<()> {
    let mut workbook = build_workbook(sheets)?;
    workbook.save(path)?;
    Ok(())
}

fn build_workbook(sheets: &[NamedTable]) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        let table = &sheet.table;
        for (col, header) in table.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Number(n) if n.is_finite() => {
                        worksheet.write_number(row_num, col, *n)?;
                    }
                    Cell::Number(_) => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row_num, col, s)?;
                    }
                }
            }
        }

        // 列幅: ヘッダーと短い値に合わせる（長文列は上限で打ち切り）
        for (col, header) in table.headers.iter().enumerate() {
            let widest = table
                .rows
                .iter()
                .filter_map(|r| r.get(col))
                .map(|c| c.as_text().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(8);
            let width = (widest as f64 + 2.0).min(MAX_COL_WIDTH);
            worksheet.set_column_width(col as u16, width)?;
        }

        worksheet.set_freeze_panes(1, 0)?;
    }

    Ok(workbook)
}
