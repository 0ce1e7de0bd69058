//! 集計モジュール
//!
//! フラットなスコア結果集合から派生ビューを作る。
//! どの関数も入力を読むだけの純関数で、同じ入力からは常に同じ出力になる。
//!
//! - 動画別ピボット（F1）
//! - 温度×参照元 / 温度のみ / 参照元のみ の平均
//! - カテゴリ×温度 の平均F1（カテゴリ行 × 温度列）
//! - 温度ごとの要約統計

use crate::table::{NamedTable, Table};
use crate::types::{round4, Cell, ParamValue, ScoreResult};
use std::collections::{BTreeMap, BTreeSet};

pub const SHEET_ALL: &str = "BERTScore_All";
pub const SHEET_PIVOT_BY_VIDEO: &str = "Pivot_by_Video";
pub const SHEET_AVERAGE_BY_TEMP: &str = "Average_by_Temp";
pub const SHEET_AVERAGE_BY_CATEGORY: &str = "Average_by_Category";
pub const SHEET_SUMMARY_STATS: &str = "Summary_Stats";
pub const SHEET_AVG_BY_TEMP_REF: &str = "avg_by_temp_ref";
pub const SHEET_AVG_BY_TEMP: &str = "avg_by_temp";
pub const SHEET_AVG_BY_REF: &str = "avg_by_ref";

/// グループ内の平均値（4桁丸め）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMeans {
    pub count: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub cand_length: f64,
    pub ref_length: f64,
}

impl GroupMeans {
    fn from_rows(rows: &[&ScoreResult]) -> Self {
        let n = rows.len().max(1) as f64;
        let sum = |f: fn(&ScoreResult) -> f64| rows.iter().map(|r| f(r)).sum::<f64>() / n;
        Self {
            count: rows.len(),
            precision: round4(sum(|r| r.precision)),
            recall: round4(sum(|r| r.recall)),
            f1: round4(sum(|r| r.f1)),
            cand_length: round4(sum(|r| r.cand_length as f64)),
            ref_length: round4(sum(|r| r.ref_length as f64)),
        }
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Number(self.precision),
            Cell::Number(self.recall),
            Cell::Number(self.f1),
            Cell::Number(self.cand_length),
            Cell::Number(self.ref_length),
        ]
    }
}

/// 温度×参照元の平均
#[derive(Debug, Clone, PartialEq)]
pub struct TempRefAverage {
    pub whisper_temp: ParamValue,
    pub reference_tool: String,
    pub means: GroupMeans,
}

/// 温度のみの平均
#[derive(Debug, Clone, PartialEq)]
pub struct TempAverage {
    pub whisper_temp: ParamValue,
    pub means: GroupMeans,
}

/// 参照元のみの平均
#[derive(Debug, Clone, PartialEq)]
pub struct RefAverage {
    pub reference_tool: String,
    pub means: GroupMeans,
}

/// 動画別ピボットの1行
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPivotRow {
    pub video_id: String,
    pub category: String,
    /// `VideoPivot::columns` と同じ順序のF1（該当なしは None）
    pub f1: Vec<Option<f64>>,
}

/// 動画別ピボット（行: 動画×カテゴリ、列: 温度×参照元）
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPivot {
    pub columns: Vec<(ParamValue, String)>,
    pub rows: Vec<VideoPivotRow>,
}

/// カテゴリ別ピボットの1行
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub category: String,
    pub avg_f1: Vec<Option<f64>>,
}

/// カテゴリ×温度の平均F1（行: カテゴリ、列: 温度）
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPivot {
    pub temps: Vec<ParamValue>,
    pub rows: Vec<CategoryRow>,
}

/// 温度ごとの要約統計
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub whisper_temp: ParamValue,
    pub count: usize,
    pub f1_mean: f64,
    /// 標本標準偏差（1件のみの場合は None）
    pub f1_std: Option<f64>,
    pub f1_min: f64,
    pub f1_max: f64,
    pub precision_mean: f64,
    pub recall_mean: f64,
}

fn group_by<'a, K: Ord>(
    results: &'a [ScoreResult],
    key: impl Fn(&ScoreResult) -> K,
) -> BTreeMap<K, Vec<&'a ScoreResult>> {
    let mut groups: BTreeMap<K, Vec<&ScoreResult>> = BTreeMap::new();
    for result in results {
        groups.entry(key(result)).or_default().push(result);
    }
    groups
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn average_by_temp_ref(results: &[ScoreResult]) -> Vec<TempRefAverage> {
    group_by(results, |r| (r.whisper_temp, r.reference_tool.clone()))
        .into_iter()
        .map(|((whisper_temp, reference_tool), rows)| TempRefAverage {
            whisper_temp,
            reference_tool,
            means: GroupMeans::from_rows(&rows),
        })
        .collect()
}

pub fn average_by_temp(results: &[ScoreResult]) -> Vec<TempAverage> {
    group_by(results, |r| r.whisper_temp)
        .into_iter()
        .map(|(whisper_temp, rows)| TempAverage {
            whisper_temp,
            means: GroupMeans::from_rows(&rows),
        })
        .collect()
}

pub fn average_by_ref(results: &[ScoreResult]) -> Vec<RefAverage> {
    group_by(results, |r| r.reference_tool.clone())
        .into_iter()
        .map(|(reference_tool, rows)| RefAverage {
            reference_tool,
            means: GroupMeans::from_rows(&rows),
        })
        .collect()
}

pub fn pivot_by_video(results: &[ScoreResult]) -> VideoPivot {
    let columns: Vec<(ParamValue, String)> = results
        .iter()
        .map(|r| (r.whisper_temp, r.reference_tool.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = group_by(results, |r| (r.video_id.clone(), r.category.clone()))
        .into_iter()
        .map(|((video_id, category), rows)| {
            let f1 = columns
                .iter()
                .map(|(temp, tool)| {
                    let values: Vec<f64> = rows
                        .iter()
                        .filter(|r| r.whisper_temp == *temp && &r.reference_tool == tool)
                        .map(|r| r.f1)
                        .collect();
                    mean(&values).map(round4)
                })
                .collect();
            VideoPivotRow {
                video_id,
                category,
                f1,
            }
        })
        .collect();

    VideoPivot { columns, rows }
}

pub fn average_by_category(results: &[ScoreResult]) -> CategoryPivot {
    let temps: Vec<ParamValue> = results
        .iter()
        .map(|r| r.whisper_temp)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = group_by(results, |r| r.category.clone())
        .into_iter()
        .map(|(category, rows)| {
            let avg_f1 = temps
                .iter()
                .map(|temp| {
                    let values: Vec<f64> = rows
                        .iter()
                        .filter(|r| r.whisper_temp == *temp)
                        .map(|r| r.f1)
                        .collect();
                    mean(&values).map(round4)
                })
                .collect();
            CategoryRow { category, avg_f1 }
        })
        .collect();

    CategoryPivot { temps, rows }
}

/// 既知の温度リストを順に走査し、結果がある温度のみ統計を出す
pub fn summary_stats(results: &[ScoreResult], temps: &[ParamValue]) -> Vec<SummaryStats> {
    temps
        .iter()
        .filter_map(|temp| {
            let rows: Vec<&ScoreResult> =
                results.iter().filter(|r| r.whisper_temp == *temp).collect();
            if rows.is_empty() {
                return None;
            }
            let f1: Vec<f64> = rows.iter().map(|r| r.f1).collect();
            let precision: Vec<f64> = rows.iter().map(|r| r.precision).collect();
            let recall: Vec<f64> = rows.iter().map(|r| r.recall).collect();
            Some(SummaryStats {
                whisper_temp: *temp,
                count: rows.len(),
                f1_mean: round4(mean(&f1)?),
                f1_std: sample_std(&f1).map(round4),
                f1_min: f1.iter().copied().fold(f64::INFINITY, f64::min),
                f1_max: f1.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                precision_mean: round4(mean(&precision)?),
                recall_mean: round4(mean(&recall)?),
            })
        })
        .collect()
}

// =============================================
// 表への変換
// =============================================

pub fn results_table(results: &[ScoreResult]) -> Table {
    let mut table = Table::with_headers(&ScoreResult::COLUMNS);
    for result in results {
        table.push_row(result.to_cells());
    }
    table
}

impl VideoPivot {
    pub fn to_table(&self) -> Table {
        let mut headers = vec!["video_id".to_string(), "category".to_string()];
        headers.extend(
            self.columns
                .iter()
                .map(|(temp, tool)| format!("{}_{}", temp.label(), tool)),
        );
        let mut table = Table::new(headers);
        for row in &self.rows {
            let mut cells = vec![Cell::text(row.video_id.clone()), Cell::text(row.category.clone())];
            cells.extend(row.f1.iter().map(|v| Cell::number(*v)));
            table.push_row(cells);
        }
        table
    }
}

impl CategoryPivot {
    pub fn to_table(&self) -> Table {
        let mut headers = vec!["category".to_string()];
        headers.extend(self.temps.iter().map(|t| t.label()));
        let mut table = Table::new(headers);
        for row in &self.rows {
            let mut cells = vec![Cell::text(row.category.clone())];
            cells.extend(row.avg_f1.iter().map(|v| Cell::number(*v)));
            table.push_row(cells);
        }
        table
    }
}

/// 評価シート用: 温度×参照元の平均（precision/recall/f1のみ）
pub fn average_by_temp_table(averages: &[TempRefAverage]) -> Table {
    let mut table = Table::with_headers(&[
        "whisper_temp",
        "reference_tool",
        "avg_precision",
        "avg_recall",
        "avg_f1",
    ]);
    for avg in averages {
        table.push_row(vec![
            Cell::Number(avg.whisper_temp.value()),
            Cell::text(avg.reference_tool.clone()),
            Cell::Number(avg.means.precision),
            Cell::Number(avg.means.recall),
            Cell::Number(avg.means.f1),
        ]);
    }
    table
}

pub fn summary_stats_table(stats: &[SummaryStats]) -> Table {
    let mut table = Table::with_headers(&[
        "whisper_temp",
        "count",
        "f1_mean",
        "f1_std",
        "f1_min",
        "f1_max",
        "precision_mean",
        "recall_mean",
    ]);
    for s in stats {
        table.push_row(vec![
            Cell::Number(s.whisper_temp.value()),
            Cell::from(s.count),
            Cell::Number(s.f1_mean),
            Cell::number(s.f1_std),
            Cell::Number(s.f1_min),
            Cell::Number(s.f1_max),
            Cell::Number(s.precision_mean),
            Cell::Number(s.recall_mean),
        ]);
    }
    table
}

const MEAN_COLUMNS: [&str; 5] = ["precision", "recall", "f1", "cand_length", "ref_length"];

fn headers_with_means(keys: &[&str]) -> Table {
    let headers: Vec<&str> = keys.iter().chain(MEAN_COLUMNS.iter()).copied().collect();
    Table::with_headers(&headers)
}

pub fn avg_by_temp_ref_table(averages: &[TempRefAverage]) -> Table {
    let mut table = headers_with_means(&["whisper_temp", "reference_tool"]);
    for avg in averages {
        let mut cells = vec![
            Cell::Number(avg.whisper_temp.value()),
            Cell::text(avg.reference_tool.clone()),
        ];
        cells.extend(avg.means.cells());
        table.push_row(cells);
    }
    table
}

pub fn avg_by_temp_table(averages: &[TempAverage]) -> Table {
    let mut table = headers_with_means(&["whisper_temp"]);
    for avg in averages {
        let mut cells = vec![Cell::Number(avg.whisper_temp.value())];
        cells.extend(avg.means.cells());
        table.push_row(cells);
    }
    table
}

pub fn avg_by_ref_table(averages: &[RefAverage]) -> Table {
    let mut table = headers_with_means(&["reference_tool"]);
    for avg in averages {
        let mut cells = vec![Cell::text(avg.reference_tool.clone())];
        cells.extend(avg.means.cells());
        table.push_row(cells);
    }
    table
}

/// 評価ワークブックの5シート（全結果・動画別・温度別・カテゴリ別・要約統計）
pub fn evaluation_sheets(results: &[ScoreResult], temps: &[ParamValue]) -> Vec<NamedTable> {
    vec![
        NamedTable::new(SHEET_ALL, results_table(results)),
        NamedTable::new(SHEET_PIVOT_BY_VIDEO, pivot_by_video(results).to_table()),
        NamedTable::new(
            SHEET_AVERAGE_BY_TEMP,
            average_by_temp_table(&average_by_temp_ref(results)),
        ),
        NamedTable::new(
            SHEET_AVERAGE_BY_CATEGORY,
            average_by_category(results).to_table(),
        ),
        NamedTable::new(
            SHEET_SUMMARY_STATS,
            summary_stats_table(&summary_stats(results, temps)),
        ),
    ]
}

/// 平均追加用の3シート
pub fn average_sheets(results: &[ScoreResult]) -> Vec<NamedTable> {
    vec![
        NamedTable::new(
            SHEET_AVG_BY_TEMP_REF,
            avg_by_temp_ref_table(&average_by_temp_ref(results)),
        ),
        NamedTable::new(SHEET_AVG_BY_TEMP, avg_by_temp_table(&average_by_temp(results))),
        NamedTable::new(SHEET_AVG_BY_REF, avg_by_ref_table(&average_by_ref(results))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(video: &str, category: &str, temp: f64, tool: &str, f1: f64) -> ScoreResult {
        ScoreResult {
            video_id: video.to_string(),
            category: category.to_string(),
            duration_min: Some(5.0),
            whisper_temp: ParamValue::new(temp),
            reference_tool: tool.to_string(),
            precision: f1 + 0.01,
            recall: f1 - 0.01,
            f1,
            cand_length: 100,
            ref_length: 200,
        }
    }

    fn sample() -> Vec<ScoreResult> {
        vec![
            result("vid00000001", "News", 0.0, "ChatGPT", 0.5),
            result("vid00000001", "News", 0.0, "Gemini", 0.7),
            result("vid00000001", "News", 0.2, "ChatGPT", 0.6),
            result("vid00000001", "News", 0.2, "Gemini", 0.8),
            result("vid00000002", "Edu", 0.0, "ChatGPT", 0.3),
            result("vid00000002", "Edu", 0.0, "Gemini", 0.1),
            result("vid00000002", "Edu", 0.2, "ChatGPT", 0.4),
            result("vid00000002", "Edu", 0.2, "Gemini", 0.2),
        ]
    }

    #[test]
    fn test_average_by_temp_ref() {
        let avgs = average_by_temp_ref(&sample());
        assert_eq!(avgs.len(), 4);
        assert_eq!(avgs[0].whisper_temp, ParamValue::new(0.0));
        assert_eq!(avgs[0].reference_tool, "ChatGPT");
        assert_eq!(avgs[0].means.f1, 0.4);
        assert_eq!(avgs[0].means.count, 2);
    }

    #[test]
    fn test_grouping_hierarchy_is_consistent() {
        let results = sample();
        let by_temp_ref = average_by_temp_ref(&results);
        for by_temp in average_by_temp(&results) {
            let rows: Vec<f64> = by_temp_ref
                .iter()
                .filter(|a| a.whisper_temp == by_temp.whisper_temp)
                .map(|a| a.means.f1)
                .collect();
            let avg = rows.iter().sum::<f64>() / rows.len() as f64;
            assert!((avg - by_temp.means.f1).abs() < 1e-3);
            assert_eq!(by_temp.means.cand_length, 100.0);
        }
    }

    /// 件数が偏ったグループ: 温度別平均は参照元別平均の件数加重平均（丸め誤差内）
    #[test]
    fn test_grouping_hierarchy_with_unbalanced_groups() {
        let results = vec![
            result("a0000000001", "News", 0.0, "ChatGPT", 0.2),
            result("b0000000001", "News", 0.0, "ChatGPT", 0.4),
            result("c0000000001", "News", 0.0, "ChatGPT", 0.6),
            result("a0000000001", "News", 0.0, "Gemini", 0.9),
            result("a0000000001", "News", 0.2, "ChatGPT", 0.1),
            result("b0000000001", "News", 0.2, "ChatGPT", 0.2),
            result("c0000000001", "News", 0.2, "ChatGPT", 0.2),
            result("a0000000001", "News", 0.2, "Gemini", 0.3),
        ];
        let by_temp_ref = average_by_temp_ref(&results);
        let by_temp = average_by_temp(&results);

        let weighted = |temp: ParamValue| {
            let groups: Vec<&TempRefAverage> =
                by_temp_ref.iter().filter(|a| a.whisper_temp == temp).collect();
            let total: usize = groups.iter().map(|a| a.means.count).sum();
            groups.iter().map(|a| a.means.f1 * a.means.count as f64).sum::<f64>() / total as f64
        };
        let unweighted = |temp: ParamValue| {
            let groups: Vec<f64> = by_temp_ref
                .iter()
                .filter(|a| a.whisper_temp == temp)
                .map(|a| a.means.f1)
                .collect();
            groups.iter().sum::<f64>() / groups.len() as f64
        };

        // 0.0: グループ平均が割り切れるので加重平均は一致
        assert_eq!(by_temp[0].means.f1, 0.525);
        assert!((weighted(by_temp[0].whisper_temp) - 0.525).abs() < 1e-12);
        // 単純平均は一致しない
        assert!((unweighted(by_temp[0].whisper_temp) - 0.65).abs() < 1e-12);

        // 0.2: ChatGPT の平均 0.1667 が丸められるので一致は丸め誤差内
        assert_eq!(by_temp[1].means.f1, 0.2);
        let w = weighted(by_temp[1].whisper_temp);
        assert_ne!(w, 0.2);
        assert!((w - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_average_by_ref() {
        let avgs = average_by_ref(&sample());
        let tools: Vec<&str> = avgs.iter().map(|a| a.reference_tool.as_str()).collect();
        assert_eq!(tools, vec!["ChatGPT", "Gemini"]);
        assert_eq!(avgs[0].means.f1, 0.45);
    }

    #[test]
    fn test_pivot_by_video() {
        let pivot = pivot_by_video(&sample());
        assert_eq!(pivot.columns.len(), 4);
        assert_eq!(pivot.rows.len(), 2);
        assert_eq!(pivot.rows[0].video_id, "vid00000001");
        assert_eq!(pivot.rows[0].f1[0], Some(0.5));

        let table = pivot.to_table();
        assert_eq!(table.headers[2], "0.0_ChatGPT");
        assert_eq!(table.headers.len(), 6);
    }

    #[test]
    fn test_pivot_missing_combination_is_blank() {
        let results = vec![
            result("a0000000001", "News", 0.0, "ChatGPT", 0.5),
            result("b0000000001", "News", 0.2, "ChatGPT", 0.6),
        ];
        let pivot = pivot_by_video(&results);
        assert_eq!(pivot.rows[0].f1, vec![Some(0.5), None]);
        assert_eq!(pivot.rows[1].f1, vec![None, Some(0.6)]);
    }

    #[test]
    fn test_pivot_duplicate_key_takes_mean() {
        let results = vec![
            result("a0000000001", "News", 0.0, "ChatGPT", 0.5),
            result("a0000000001", "News", 0.0, "ChatGPT", 0.7),
        ];
        let pivot = pivot_by_video(&results);
        assert_eq!(pivot.rows[0].f1, vec![Some(0.6)]);
    }

    #[test]
    fn test_average_by_category() {
        let pivot = average_by_category(&sample());
        assert_eq!(pivot.temps.len(), 2);
        assert_eq!(pivot.rows[0].category, "Edu");
        assert_eq!(pivot.rows[0].avg_f1, vec![Some(0.2), Some(0.3)]);
        assert_eq!(pivot.to_table().headers, vec!["category", "0.0", "0.2"]);
    }

    #[test]
    fn test_summary_stats_skips_absent_temps() {
        let temps = [0.0, 0.2, 0.4, 0.6].map(ParamValue::new);
        let stats = summary_stats(&sample(), &temps);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].count, 4);
        assert_eq!(stats[0].f1_min, 0.1);
        assert_eq!(stats[0].f1_max, 0.7);
        assert_eq!(stats[0].f1_mean, 0.4);
        assert!(stats[0].f1_std.is_some());
    }

    #[test]
    fn test_summary_stats_single_row_has_no_std() {
        let results = vec![result("a0000000001", "News", 0.4, "ChatGPT", 0.5)];
        let stats = summary_stats(&results, &[ParamValue::new(0.4)]);
        assert_eq!(stats[0].f1_std, None);
        assert_eq!(summary_stats_table(&stats).rows[0][3], Cell::Empty);
    }

    #[test]
    fn test_views_are_idempotent() {
        let results = sample();
        let temps = [0.0, 0.2].map(ParamValue::new);
        assert_eq!(evaluation_sheets(&results, &temps), evaluation_sheets(&results, &temps));
        assert_eq!(average_sheets(&results), average_sheets(&results));
    }

    #[test]
    fn test_evaluation_sheet_names() {
        let sheets = evaluation_sheets(&sample(), &[ParamValue::new(0.0)]);
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                SHEET_ALL,
                SHEET_PIVOT_BY_VIDEO,
                SHEET_AVERAGE_BY_TEMP,
                SHEET_AVERAGE_BY_CATEGORY,
                SHEET_SUMMARY_STATS
            ]
        );
        assert_eq!(sheets[0].table.len(), 8);
    }
}
