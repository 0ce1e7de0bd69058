use std::collections::HashMap;
use summary_eval_common::{ParamValue, ScoreResult};

/// 評価対象の1動画
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// マッパー上の行番号（0始まり、ヘッダー除く）
    pub row: usize,
    pub video_id: String,
    pub category: String,
    pub duration_min: Option<f64>,
    /// 列名 → テキスト（参照列・候補列）
    pub texts: HashMap<String, String>,
}

impl Item {
    pub fn text(&self, column: &str) -> &str {
        self.texts.get(column).map(String::as_str).unwrap_or("")
    }
}

/// テキストの使用可否
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCheck {
    Usable,
    Empty,
    /// 欠損値の文字列表現
    MissingMarker,
    /// 文字数不足（実際の文字数）
    TooShort(usize),
}

impl TextCheck {
    pub fn is_usable(&self) -> bool {
        matches!(self, TextCheck::Usable)
    }
}

impl std::fmt::Display for TextCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextCheck::Usable => write!(f, "使用可"),
            TextCheck::Empty => write!(f, "空"),
            TextCheck::MissingMarker => write!(f, "欠損値"),
            TextCheck::TooShort(n) => write!(f, "短すぎる（{}文字）", n),
        }
    }
}

/// スキップ理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Reference(TextCheck),
    Candidate(TextCheck),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Reference(check) => write!(f, "参照要約: {}", check),
            SkipReason::Candidate(check) => write!(f, "候補要約: {}", check),
        }
    }
}

/// 1組の評価結果
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Scored(ScoreResult),
    Skipped {
        video_id: String,
        param: ParamValue,
        reference_tool: String,
        reason: SkipReason,
    },
    Failed {
        video_id: String,
        param: ParamValue,
        reference_tool: String,
        error: String,
    },
}

impl PairOutcome {
    pub fn result(&self) -> Option<&ScoreResult> {
        match self {
            PairOutcome::Scored(r) => Some(r),
            _ => None,
        }
    }
}

/// 評価実行の集計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// 処理した動画数
    pub items: usize,
    /// スコア結果（フラット）
    pub results: Vec<ScoreResult>,
    /// テキスト不足でスキップした組数
    pub skipped: usize,
    /// スコアラー失敗でスキップした組数
    pub failed: usize,
}

impl EvaluationReport {
    pub fn from_outcomes(items: usize, outcomes: Vec<PairOutcome>) -> Self {
        let mut report = Self {
            items,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                PairOutcome::Scored(r) => report.results.push(r),
                PairOutcome::Skipped { .. } => report.skipped += 1,
                PairOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report
    }
}
