//! 温度別要約の照合
//!
//! マッパー（主表）の各動画について、統計データ（副表）から同じ動画IDの行を探し、
//! 温度ごとに最初の行の要約ファイルを読み込んで `temp{温度}` 列に書き込む。
//! 各行は独立に処理する（行をまたぐ状態を持たない）。

mod types;

pub use types::{ItemMatch, MatchStats, SecondaryRecord};

use crate::config::ColumnNames;
use crate::error::Result;
use crate::resolver::ContentResolver;
use crate::tabular::require_column;
use indicatif::ProgressBar;
use std::collections::HashMap;
use summary_eval_common::{normalize_video_id, Cell, ParamValue, Table};

/// 動画ID → 副表行（元の順序を保持）
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    records: Vec<SecondaryRecord>,
    by_id: HashMap<String, Vec<usize>>,
    invalid_params: usize,
}

impl RecordIndex {
    /// 副表から索引を作る
    pub fn from_table(table: &Table, columns: &ColumnNames) -> Result<Self> {
        let url_col = require_column(table, &columns.record_url, "統計データ")?;
        let temp_col = require_column(table, &columns.record_temp, "統計データ")?;
        let path_col = require_column(table, &columns.record_path, "統計データ")?;

        let mut records = Vec::with_capacity(table.len());
        let mut invalid_params = 0;

        for row in 0..table.len() {
            let url = table.cell(row, url_col).as_text();
            let param = match table.cell(row, temp_col).as_f64() {
                Some(v) => ParamValue::new(v),
                None => {
                    invalid_params += 1;
                    continue;
                }
            };
            records.push(SecondaryRecord {
                video_id: normalize_video_id(Some(&url)),
                param,
                content_ref: table.cell(row, path_col).as_text(),
            });
        }

        let mut index = Self::from_records(records);
        index.invalid_params = invalid_params;
        Ok(index)
    }

    pub fn from_records(records: Vec<SecondaryRecord>) -> Self {
        let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            if !record.video_id.is_empty() {
                by_id.entry(record.video_id.clone()).or_default().push(i);
            }
        }
        Self {
            records,
            by_id,
            invalid_params: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn invalid_params(&self) -> usize {
        self.invalid_params
    }

    /// 副表に現れる温度（重複除去・昇順）
    pub fn available_params(&self) -> Vec<ParamValue> {
        let mut params: Vec<ParamValue> = self.records.iter().map(|r| r.param).collect();
        params.sort();
        params.dedup();
        params
    }

    /// 動画IDに一致する副表行（元の順序）
    pub fn lookup(&self, video_id: &str) -> Vec<&SecondaryRecord> {
        self.by_id
            .get(video_id)
            .map(|idx| idx.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// 1件の動画を照合する
    ///
    /// 同じ（ID, 温度）の行が複数あれば元の順序で最初の行を採用する。
    pub fn match_item(&self, video_id: &str, params: &[ParamValue]) -> ItemMatch<'_> {
        if video_id.is_empty() {
            return ItemMatch::Missing;
        }
        let matching = self.lookup(video_id);
        if matching.is_empty() {
            return ItemMatch::Missing;
        }

        let mut duplicates = 0;
        let variants = params
            .iter()
            .map(|param| {
                let mut same_param = matching.iter().filter(|r| r.param.matches(param.value()));
                let first = same_param.next().copied();
                duplicates += same_param.count();
                (*param, first)
            })
            .collect();

        ItemMatch::Found {
            variants,
            duplicates,
        }
    }
}

/// 主表に温度別の要約列を追加して埋める
///
/// 一致しない行も削除せず、要約列は空のまま残す。
pub fn enrich_table(
    table: &mut Table,
    index: &RecordIndex,
    params: &[ParamValue],
    resolver: &ContentResolver,
    columns: &ColumnNames,
    progress: &ProgressBar,
) -> Result<MatchStats> {
    let url_col = require_column(table, &columns.url, "マッパー")?;

    // 要約列は毎回空で初期化
    let variant_cols: Vec<usize> = params
        .iter()
        .map(|p| table.ensure_column(&p.column_name()))
        .collect();
    for row in 0..table.len() {
        for &col in &variant_cols {
            table.set_cell(row, col, Cell::Empty);
        }
    }

    let mut stats = MatchStats {
        invalid_params: index.invalid_params(),
        ..Default::default()
    };

    progress.set_length(table.len() as u64);
    for row in 0..table.len() {
        let url = table.cell(row, url_col).as_text();
        let video_id = normalize_video_id(Some(&url));

        match index.match_item(&video_id, params) {
            ItemMatch::Missing => {
                stats.missing += 1;
                let preview: String = url.chars().take(50).collect();
                tracing::warn!(row = row + 2, url = %preview, "一致する統計データがありません");
            }
            ItemMatch::Found {
                variants,
                duplicates,
            } => {
                stats.matched += 1;
                if duplicates > 0 {
                    stats.duplicates += duplicates;
                    tracing::warn!(
                        video_id = %video_id,
                        duplicates,
                        "同じ動画・温度の行が複数あります（先頭行を採用）"
                    );
                }
                for ((_, record), &col) in variants.iter().zip(&variant_cols) {
                    if let Some(record) = record {
                        let content = resolver.read(&record.content_ref);
                        table.set_cell(row, col, Cell::text(content));
                    }
                }
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(stats)
}
