//! 表ファイルの読み書き
//!
//! - xlsx/xls/ods: calamine
//! - csv: 引用符対応の行パーサー
//! - 書き出しは共通ライブラリの excel_core（rust_xlsxwriter）

use crate::error::{EvalError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use summary_eval_common::export::excel_core;
use summary_eval_common::{Cell, NamedTable, Table};

/// 拡張子から表ファイルを読み込む（ワークブックは先頭シート）
pub fn read_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(EvalError::FileNotFound(path.display().to_string()));
    }

    if is_csv(path) {
        let content = std::fs::read_to_string(path)?;
        return read_csv_str(&content);
    }

    let sheets = read_workbook(path)?;
    sheets
        .into_iter()
        .next()
        .map(|s| s.table)
        .ok_or_else(|| EvalError::InvalidTable(format!("シートがありません: {}", path.display())))
}

/// ワークブックの全シートを順序通りに読み込む
pub fn read_workbook(path: &Path) -> Result<Vec<NamedTable>> {
    if !path.exists() {
        return Err(EvalError::FileNotFound(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let mut rows = range.rows();

        let headers: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(|c| data_to_cell(c).as_text()).collect(),
            None => Vec::new(),
        };
        let mut table = Table::new(headers);
        for row in rows {
            let cells: Vec<Cell> = row.iter().map(data_to_cell).collect();
            if cells.iter().all(Cell::is_empty) {
                continue;
            }
            table.push_row(cells);
        }
        sheets.push(NamedTable::new(name, table));
    }

    Ok(sheets)
}

/// 表を保存（拡張子 .csv ならCSV、それ以外はxlsxの1シート）
pub fn write_table(table: &Table, sheet_name: &str, path: &Path) -> Result<()> {
    if is_csv(path) {
        create_parent_dir(path)?;
        std::fs::write(path, to_csv_string(table))?;
        return Ok(());
    }
    write_workbook(&[NamedTable::new(sheet_name, table.clone())], path)
}

/// 複数シートをxlsxとして保存
pub fn write_workbook(sheets: &[NamedTable], path: &Path) -> Result<()> {
    create_parent_dir(path)?;
    excel_core::save_workbook(sheets, path)?;
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// 列番号を取得（なければ MissingColumn）
pub fn require_column(table: &Table, name: &str, table_name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| EvalError::MissingColumn {
            table: table_name.to_string(),
            column: name.to_string(),
        })
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Float(f) => Cell::number(Some(*f)),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::text(b.to_string()),
        Data::Error(_) => Cell::Empty,
        other => Cell::text(other.to_string()),
    }
}

/// CSV文字列を読み込む（先頭行はヘッダー）
pub fn read_csv_str(content: &str) -> Result<Table> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = parse_csv_records(content)
        .into_iter()
        .filter(|r| !(r.len() == 1 && r[0].is_empty()));

    let header = records
        .next()
        .ok_or_else(|| EvalError::InvalidTable("CSVが空です".into()))?;
    let mut table = Table::new(header);

    for (record_no, fields) in records.enumerate() {
        if fields.len() > table.headers.len() {
            return Err(EvalError::InvalidTable(format!(
                "CSV {}件目のレコード: 列数 {} がヘッダー列数 {} を超えています",
                record_no + 1,
                fields.len(),
                table.headers.len()
            )));
        }
        table.push_row(fields.into_iter().map(Cell::text).collect());
    }

    Ok(table)
}

/// CSV全体をレコードに分割
///
/// 引用符内の改行・カンマはフィールドの一部。"" は引用符のエスケープ。
fn parse_csv_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
                records.push(std::mem::take(&mut fields));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field.trim().to_string());
        records.push(fields);
    }

    records
}

/// 表をCSV文字列に変換（必要なフィールドのみ引用符で囲む）
pub fn to_csv_string(table: &Table) -> String {
    let mut out = String::new();
    let header: Vec<String> = table.headers.iter().map(|h| quote_csv_field(h)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in &table.rows {
        let fields: Vec<String> = (0..table.headers.len())
            .map(|c| quote_csv_field(&row.get(c).map(|v| v.as_text()).unwrap_or_default()))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn quote_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) || value.trim() != value {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_records_quotes() {
        assert_eq!(parse_csv_records("a,b,c"), vec![vec!["a", "b", "c"]]);
        assert_eq!(
            parse_csv_records(r#""x, y",2,"say ""hi""""#),
            vec![vec!["x, y", "2", r#"say "hi""#]]
        );
        assert_eq!(parse_csv_records("a,,\r\nb,c,d\r\n"), vec![vec!["a", "", ""], vec!["b", "c", "d"]]);
    }

    #[test]
    fn test_quoted_newline_stays_in_field() {
        let csv = "YoutubeUrl,ref_ChatGPT,temp0.0\n\
                   https://youtu.be/abc12345678,\"first paragraph of reference\nsecond paragraph\",candidate summary long enough\n";
        let table = read_csv_str(csv).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.cell(0, 1).as_text(),
            "first paragraph of reference\nsecond paragraph"
        );
        assert_eq!(table.cell(0, 2).as_text(), "candidate summary long enough");
    }

    #[test]
    fn test_csv_string_roundtrip_with_special_fields() {
        let mut table = Table::with_headers(&["url", "text", "n"]);
        table.push_row(vec![
            Cell::from("abc12345678"),
            Cell::from("line one, \"quoted\"\nline two"),
            Cell::Number(3.0),
        ]);
        let restored = read_csv_str(&to_csv_string(&table)).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.cell(0, 1).as_text(), "line one, \"quoted\"\nline two");
        assert_eq!(restored.cell(0, 2).as_f64(), Some(3.0));
    }

    #[test]
    fn test_write_table_csv_extension_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.csv");
        let mut table = Table::with_headers(&["YoutubeUrl", "temp0.0"]);
        table.push_row(vec![Cell::from("abc12345678"), Cell::from("สรุป\nสองบรรทัด")]);

        write_table(&table, "mapper", &path).unwrap();
        let restored = read_table(&path).unwrap();
        assert_eq!(restored.headers, table.headers);
        assert_eq!(restored.cell(0, 1).as_text(), "สรุป\nสองบรรทัด");
    }

    #[test]
    fn test_read_csv_str() {
        let csv = "\u{feff}youtubeUrl,whisperTemp,summaryPath\nhttps://youtu.be/abc12345678,0.2,/app/outputs/a.txt\n\n";
        let table = read_csv_str(csv).unwrap();
        assert_eq!(table.headers, vec!["youtubeUrl", "whisperTemp", "summaryPath"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, 1).as_f64(), Some(0.2));
    }

    #[test]
    fn test_read_csv_too_many_fields() {
        let csv = "a,b\n1,2,3\n";
        assert!(matches!(read_csv_str(csv), Err(EvalError::InvalidTable(_))));
    }

    #[test]
    fn test_read_csv_empty() {
        assert!(matches!(read_csv_str(""), Err(EvalError::InvalidTable(_))));
    }

    #[test]
    fn test_require_column() {
        let table = Table::with_headers(&["a"]);
        assert_eq!(require_column(&table, "a", "t").unwrap(), 0);
        assert!(matches!(
            require_column(&table, "b", "t"),
            Err(EvalError::MissingColumn { .. })
        ));
    }
}
