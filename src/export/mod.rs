//! 評価結果ワークブックの出力
//!
//! - 評価実行: 全結果 + 4つの集計シート
//! - 平均追加: 既存ワークブックの先頭シートから温度/参照元別平均を再計算して追加

use crate::error::{EvalError, Result};
use crate::tabular::{read_workbook, require_column, write_workbook};
use std::path::{Path, PathBuf};
use summary_eval_common::aggregate::{self, average_by_temp_ref, SHEET_ALL};
use summary_eval_common::{average_sheets, evaluation_sheets, NamedTable, ParamValue, ScoreResult, Table};

pub const DEFAULT_OUTPUT_NAME: &str = "evaluation_results.xlsx";

/// 出力先がディレクトリ（または拡張子なし）なら既定のファイル名を付ける
///
/// ワークブックは常にxlsxなので、他の拡張子は .xlsx に置き換える。
pub fn output_path(output: &Path) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        return output.join(DEFAULT_OUTPUT_NAME);
    }
    let is_xlsx = output
        .extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);
    if is_xlsx {
        output.to_path_buf()
    } else {
        output.with_extension("xlsx")
    }
}

/// 評価ワークブックを書き出す
pub fn export_evaluation(results: &[ScoreResult], temps: &[ParamValue], path: &Path) -> Result<()> {
    if results.is_empty() {
        return Err(EvalError::NoResults);
    }
    let sheets = evaluation_sheets(results, temps);
    for sheet in &sheets {
        println!("   ✔ Sheet '{}': {} rows", sheet.name, sheet.table.len());
    }
    write_workbook(&sheets, path)
}

/// 既存の評価ワークブックに平均シートを追加（同名シートは置き換え）
pub fn add_averages(path: &Path) -> Result<Vec<NamedTable>> {
    let sheets = read_workbook(path)?;
    let first = sheets
        .first()
        .ok_or_else(|| EvalError::InvalidTable(format!("シートがありません: {}", path.display())))?;
    let results = results_from_table(&first.table)?;
    if results.is_empty() {
        return Err(EvalError::NoResults);
    }

    let averages = average_sheets(&results);
    let mut merged: Vec<NamedTable> = sheets
        .into_iter()
        .filter(|s| !averages.iter().any(|a| a.name == s.name))
        .collect();
    merged.extend(averages.iter().cloned());

    write_workbook(&merged, path)?;
    Ok(averages)
}

/// 結果シート（BERTScore_All 形式）からスコア結果を復元
pub fn results_from_table(table: &Table) -> Result<Vec<ScoreResult>> {
    let col = |name: &str| require_column(table, name, SHEET_ALL);
    let video_col = col("video_id")?;
    let category_col = col("category")?;
    let duration_col = table.column_index("duration_min");
    let temp_col = col("whisper_temp")?;
    let tool_col = col("reference_tool")?;
    let precision_col = col("precision")?;
    let recall_col = col("recall")?;
    let f1_col = col("f1")?;
    let cand_col = col("cand_length")?;
    let ref_col = col("ref_length")?;

    let number = |row: usize, c: usize, name: &str| {
        table.cell(row, c).as_f64().ok_or_else(|| {
            EvalError::InvalidTable(format!("{}行目: {} が数値ではありません", row + 2, name))
        })
    };

    (0..table.len())
        .map(|row| -> Result<ScoreResult> {
            Ok(ScoreResult {
                video_id: table.cell(row, video_col).as_text(),
                category: table.cell(row, category_col).as_text(),
                duration_min: duration_col.and_then(|c| table.cell(row, c).as_f64()),
                whisper_temp: ParamValue::new(number(row, temp_col, "whisper_temp")?),
                reference_tool: table.cell(row, tool_col).as_text(),
                precision: number(row, precision_col, "precision")?,
                recall: number(row, recall_col, "recall")?,
                f1: number(row, f1_col, "f1")?,
                cand_length: number(row, cand_col, "cand_length")? as usize,
                ref_length: number(row, ref_col, "ref_length")? as usize,
            })
        })
        .collect()
}

/// 表をコンソール向けの固定幅テキストに整形
pub fn format_table(table: &Table) -> String {
    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            table
                .rows
                .iter()
                .map(|r| r.get(col).map(|c| c.as_text().chars().count()).unwrap_or(0))
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:>width$}", c, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut out = vec![line(table.headers.clone())];
    for row in &table.rows {
        out.push(line(
            (0..table.headers.len())
                .map(|c| row.get(c).map(|v| v.as_text()).unwrap_or_default())
                .collect(),
        ));
    }
    out.join("\n")
}

/// 実行後に表示する簡易サマリ（温度×参照元の平均F1）
pub fn quick_summary(results: &[ScoreResult]) -> String {
    format_table(&aggregate::average_by_temp_table(&average_by_temp_ref(results)))
}
