//! 表データ（ヘッダー行 + データ行）
//!
//! Excel/CSVの読み書きと集計ビューの両方で使う最小限の表構造。

use crate::types::Cell;
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_headers(headers: &[&str]) -> Self {
        Self::new(headers.iter().map(|h| h.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列名から列番号を取得（前後の空白は無視）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name.trim())
    }

    /// 行を追加（列数が足りない場合は空セルで埋める）
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), Cell::Empty);
        }
        self.rows.push(row);
    }

    /// 列がなければ末尾に追加して列番号を返す
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, Cell::Empty);
        }
        width - 1
    }

    /// セル値を取得（範囲外は Empty）
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// セル値を設定（行が短い場合は拡張）
    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) {
        if let Some(r) = self.rows.get_mut(row) {
            if r.len() <= col {
                r.resize(col + 1, Cell::Empty);
            }
            r[col] = value;
        }
    }
}

/// シート名付きの表（ワークブック出力単位）
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    pub name: String,
    pub table: Table,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_column_extends_rows() {
        let mut table = Table::with_headers(&["a", "b"]);
        table.push_row(vec![Cell::from("x")]);
        let idx = table.ensure_column("temp0.0");
        assert_eq!(idx, 2);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.ensure_column("b"), 1);
    }

    #[test]
    fn test_set_and_get_cell() {
        let mut table = Table::with_headers(&["a"]);
        table.push_row(vec![]);
        table.set_cell(0, 0, Cell::from("v"));
        assert_eq!(table.cell(0, 0).as_text(), "v");
        assert_eq!(table.cell(5, 5), &Cell::Empty);
    }
}
