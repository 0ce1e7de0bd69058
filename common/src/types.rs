//! 共通型定義
//!
//! 表のセル値、パラメータ値（生成温度）、スコア結果を定義する。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// 小数点以下4桁に丸める
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// 表のセル値
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn number(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// 文字列表現（整数値の数値は小数部なしで表示）
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// 数値として解釈（文字列の場合はパースを試みる）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::number(Some(value))
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number(value as f64)
    }
}

/// パラメータ値（Whisper温度）
///
/// f64を全順序・ハッシュ可能にしたラッパー。集計のグループキーとして使う。
#[derive(Debug, Clone, Copy)]
pub struct ParamValue(f64);

impl ParamValue {
    pub fn new(value: f64) -> Self {
        // -0.0 と 0.0 を同一キーにする
        if value == 0.0 {
            Self(0.0)
        } else {
            Self(value)
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 表示ラベル（整数値でも小数1桁を残す: 0.0, 0.2）
    pub fn label(&self) -> String {
        if self.0.fract() == 0.0 {
            format!("{:.1}", self.0)
        } else {
            self.0.to_string()
        }
    }

    /// 候補テキスト列名（temp0.0 形式）
    pub fn column_name(&self) -> String {
        format!("temp{}", self.label())
    }

    /// 浮動小数の誤差を許容して一致判定
    pub fn matches(&self, other: f64) -> bool {
        (self.0 - other).abs() < 1e-9
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for ParamValue {}

impl PartialOrd for ParamValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParamValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// スコアリングサービスの出力
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Scores {
    /// 保存用に4桁へ丸める
    pub fn rounded(&self) -> Self {
        Self {
            precision: round4(self.precision),
            recall: round4(self.recall),
            f1: round4(self.f1),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.precision.is_finite() && self.recall.is_finite() && self.f1.is_finite()
    }
}

/// 1組（候補バリアント × 参照バリアント）の評価結果
///
/// フラットな結果集合が全ての集計ビューの唯一の入力になる。
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub video_id: String,
    pub category: String,
    pub duration_min: Option<f64>,
    pub whisper_temp: ParamValue,
    pub reference_tool: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub cand_length: usize,
    pub ref_length: usize,
}

impl ScoreResult {
    /// 結果シートの列名（出力順）
    pub const COLUMNS: [&'static str; 10] = [
        "video_id",
        "category",
        "duration_min",
        "whisper_temp",
        "reference_tool",
        "precision",
        "recall",
        "f1",
        "cand_length",
        "ref_length",
    ];

    pub fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(self.video_id.clone()),
            Cell::text(self.category.clone()),
            Cell::number(self.duration_min),
            Cell::Number(self.whisper_temp.value()),
            Cell::text(self.reference_tool.clone()),
            Cell::Number(self.precision),
            Cell::Number(self.recall),
            Cell::Number(self.f1),
            Cell::from(self.cand_length),
            Cell::from(self.ref_length),
        ]
    }
}
