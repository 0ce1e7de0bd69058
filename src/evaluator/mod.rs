//! 温度×参照元の総当たり評価
//!
//! 各動画について（参照列, 候補列）の全組み合わせを独立した作業単位として扱い、
//! 両方のテキストが使える組だけをスコアラーに渡す。
//! 使えないテキスト・スコアラーの失敗はその組のスキップとして記録し、処理を続ける。

mod types;

pub use types::{EvaluationReport, Item, PairOutcome, SkipReason, TextCheck};

use crate::config::{reference_label, Config, ColumnNames};
use crate::error::Result;
use crate::scorer::{ScoreRequest, Scorer};
use crate::tabular::require_column;
use indicatif::ProgressBar;
use std::collections::HashMap;
use summary_eval_common::{normalize_video_id, ParamValue, ScoreResult, Table};

/// 欠損値の文字列表現（pandas 由来の表で空セルがこの文字列になる）
const MISSING_MARKER: &str = "nan";

/// 評価対象の列とスコアラー設定
#[derive(Debug, Clone)]
pub struct EvalPlan {
    /// (参照列名, 参照元ラベル)
    pub references: Vec<(String, String)>,
    /// (候補列名, 温度)
    pub candidates: Vec<(String, ParamValue)>,
    pub lang: String,
    pub rescale_with_baseline: bool,
    pub min_text_chars: usize,
}

impl EvalPlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            references: config
                .reference_columns
                .iter()
                .map(|c| (c.clone(), reference_label(c)))
                .collect(),
            candidates: config
                .params()
                .into_iter()
                .map(|p| (p.column_name(), p))
                .collect(),
            lang: config.scorer.lang.clone(),
            rescale_with_baseline: config.scorer.rescale_with_baseline,
            min_text_chars: config.min_text_chars,
        }
    }

    fn text_columns(&self) -> impl Iterator<Item = &str> {
        self.references
            .iter()
            .map(|(c, _)| c.as_str())
            .chain(self.candidates.iter().map(|(c, _)| c.as_str()))
    }
}

/// テキストが比較に使えるか判定（trim後の文字数で判定）
pub fn check_text(text: &str, min_chars: usize) -> TextCheck {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        TextCheck::Empty
    } else if trimmed == MISSING_MARKER {
        TextCheck::MissingMarker
    } else {
        let chars = trimmed.chars().count();
        if chars < min_chars {
            TextCheck::TooShort(chars)
        } else {
            TextCheck::Usable
        }
    }
}

/// 拡張済みマッパーから評価対象を読み出す
///
/// 参照列・候補列が表にない場合は全行で空テキストとして扱う。
pub fn load_items(table: &Table, columns: &ColumnNames, plan: &EvalPlan) -> Result<Vec<Item>> {
    let url_col = require_column(table, &columns.url, "マッパー")?;
    let category_col = table.column_index(&columns.category);
    let duration_col = table.column_index(&columns.duration);

    let text_cols: Vec<(String, Option<usize>)> = plan
        .text_columns()
        .map(|name| {
            let idx = table.column_index(name);
            if idx.is_none() {
                tracing::warn!(column = name, "列がありません（空として扱います）");
            }
            (name.to_string(), idx)
        })
        .collect();

    let items = (0..table.len())
        .map(|row| {
            let url = table.cell(row, url_col).as_text();
            let texts: HashMap<String, String> = text_cols
                .iter()
                .map(|(name, idx)| {
                    let text = idx.map(|i| table.cell(row, i).as_text()).unwrap_or_default();
                    (name.clone(), text)
                })
                .collect();
            Item {
                row,
                video_id: normalize_video_id(Some(&url)),
                category: category_col
                    .map(|i| table.cell(row, i).as_text())
                    .unwrap_or_default(),
                duration_min: duration_col.and_then(|i| table.cell(row, i).as_f64()),
                texts,
            }
        })
        .collect();

    Ok(items)
}

/// 1件の動画の全組み合わせを評価する
pub fn evaluate_item(item: &Item, plan: &EvalPlan, scorer: &mut dyn Scorer) -> Vec<PairOutcome> {
    let mut outcomes = Vec::with_capacity(plan.references.len() * plan.candidates.len());

    for (ref_col, ref_label) in &plan.references {
        let reference = item.text(ref_col).trim();
        let ref_check = check_text(reference, plan.min_text_chars);

        for (cand_col, param) in &plan.candidates {
            let candidate = item.text(cand_col).trim();
            let cand_check = check_text(candidate, plan.min_text_chars);

            let skip = if !ref_check.is_usable() {
                Some(SkipReason::Reference(ref_check))
            } else if !cand_check.is_usable() {
                Some(SkipReason::Candidate(cand_check))
            } else {
                None
            };

            if let Some(reason) = skip {
                tracing::warn!(
                    video_id = %item.video_id,
                    reference = %ref_label,
                    candidate = %cand_col,
                    reason = %reason,
                    "スキップ"
                );
                outcomes.push(PairOutcome::Skipped {
                    video_id: item.video_id.clone(),
                    param: *param,
                    reference_tool: ref_label.clone(),
                    reason,
                });
                continue;
            }

            let request = ScoreRequest {
                candidate,
                reference,
                lang: &plan.lang,
                rescale_with_baseline: plan.rescale_with_baseline,
            };

            match scorer.score(&request) {
                Ok(scores) => {
                    let scores = scores.rounded();
                    tracing::debug!(
                        video_id = %item.video_id,
                        "temp{} vs {}: F1={:.4}",
                        param.label(),
                        ref_label,
                        scores.f1
                    );
                    outcomes.push(PairOutcome::Scored(ScoreResult {
                        video_id: item.video_id.clone(),
                        category: item.category.clone(),
                        duration_min: item.duration_min,
                        whisper_temp: *param,
                        reference_tool: ref_label.clone(),
                        precision: scores.precision,
                        recall: scores.recall,
                        f1: scores.f1,
                        cand_length: candidate.chars().count(),
                        ref_length: reference.chars().count(),
                    }));
                }
                Err(e) => {
                    tracing::warn!(
                        video_id = %item.video_id,
                        reference = %ref_label,
                        candidate = %cand_col,
                        scorer = scorer.name(),
                        error = %e,
                        "スコア計算エラー"
                    );
                    outcomes.push(PairOutcome::Failed {
                        video_id: item.video_id.clone(),
                        param: *param,
                        reference_tool: ref_label.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    outcomes
}

/// 全動画を評価してスコア結果を集める
///
/// 出力順は 動画（入力順）→ 参照列 → 候補列 で安定している。
pub fn evaluate_items(
    items: &[Item],
    plan: &EvalPlan,
    scorer: &mut dyn Scorer,
    progress: &ProgressBar,
) -> EvaluationReport {
    progress.set_length(items.len() as u64);

    let outcomes: Vec<PairOutcome> = items
        .iter()
        .flat_map(|item| {
            progress.set_message(format!("{} ({})", item.video_id, item.category));
            let outcomes = evaluate_item(item, plan, &mut *scorer);
            progress.inc(1);
            outcomes
        })
        .collect();

    progress.finish_and_clear();
    EvaluationReport::from_outcomes(items.len(), outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use summary_eval_common::Scores;

    struct FixedScorer;

    impl Scorer for FixedScorer {
        fn score(&mut self, _request: &ScoreRequest<'_>) -> Result<Scores> {
            Ok(Scores {
                precision: 0.712345,
                recall: 0.654321,
                f1: 0.681818,
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn score(&mut self, _request: &ScoreRequest<'_>) -> Result<Scores> {
            Err(EvalError::ScorerExecution("model not loaded".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn plan() -> EvalPlan {
        EvalPlan::from_config(&Config {
            temperatures: vec![0.0, 0.2],
            reference_columns: vec!["ref_ChatGPT".into()],
            ..Default::default()
        })
    }

    fn item(texts: &[(&str, &str)]) -> Item {
        Item {
            row: 0,
            video_id: "abc12345678".into(),
            category: "News".into(),
            duration_min: Some(4.5),
            texts: texts
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_check_text() {
        assert_eq!(check_text("   ", 10), TextCheck::Empty);
        assert_eq!(check_text("nan", 10), TextCheck::MissingMarker);
        assert_eq!(check_text(" short ", 10), TextCheck::TooShort(5));
        assert_eq!(check_text("สรุปเนื้อหาวิดีโอ", 10), TextCheck::Usable);
        assert_eq!(check_text("0123456789", 10), TextCheck::Usable);
    }

    #[test]
    fn test_short_candidate_produces_no_result() {
        let item = item(&[
            ("ref_ChatGPT", "a usable reference summary"),
            ("temp0.0", "too short"),
        ]);
        let outcomes = evaluate_item(&item, &plan(), &mut FixedScorer);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result().is_none()));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_skip_reason_visible_at_default_level() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let item = item(&[
            ("ref_ChatGPT", "a usable reference summary"),
            ("temp0.0", "too short"),
        ]);
        tracing::subscriber::with_default(subscriber, || {
            evaluate_item(&item, &plan(), &mut FixedScorer);
        });

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("スキップ"));
        assert!(output.contains("temp0.0"));
        assert!(output.contains(&SkipReason::Candidate(TextCheck::TooShort(9)).to_string()));
    }

    #[test]
    fn test_usable_pair_produces_rounded_result() {
        let item = item(&[
            ("ref_ChatGPT", "a usable reference summary"),
            ("temp0.2", "  a usable candidate summary  "),
        ]);
        let outcomes = evaluate_item(&item, &plan(), &mut FixedScorer);
        let results: Vec<&ScoreResult> = outcomes.iter().filter_map(|o| o.result()).collect();
        assert_eq!(results.len(), 1);

        let r = results[0];
        assert_eq!(r.whisper_temp, ParamValue::new(0.2));
        assert_eq!(r.reference_tool, "ChatGPT");
        assert_eq!(r.precision, 0.7123);
        assert_eq!(r.recall, 0.6543);
        assert_eq!(r.f1, 0.6818);
        assert_eq!(r.cand_length, "a usable candidate summary".len());
        assert_eq!(r.ref_length, "a usable reference summary".len());
        assert_eq!(r.duration_min, Some(4.5));
    }

    #[test]
    fn test_unusable_reference_skips_all_candidates() {
        let item = item(&[
            ("ref_ChatGPT", "nan"),
            ("temp0.0", "a usable candidate summary"),
            ("temp0.2", "another usable candidate"),
        ]);
        let outcomes = evaluate_item(&item, &plan(), &mut FixedScorer);
        assert!(outcomes.iter().all(|o| matches!(
            o,
            PairOutcome::Skipped {
                reason: SkipReason::Reference(TextCheck::MissingMarker),
                ..
            }
        )));
    }

    #[test]
    fn test_scorer_failure_is_contained() {
        let items = vec![item(&[
            ("ref_ChatGPT", "a usable reference summary"),
            ("temp0.0", "a usable candidate summary"),
            ("temp0.2", "another usable candidate"),
        ])];
        let report = evaluate_items(&items, &plan(), &mut FailingScorer, &ProgressBar::hidden());
        assert!(report.results.is_empty());
        assert_eq!(report.failed, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.items, 1);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let items = vec![item(&[
            ("ref_ChatGPT", "a usable reference summary"),
            ("temp0.0", "a usable candidate summary"),
            ("temp0.2", "another usable candidate"),
        ])];
        let first = evaluate_items(&items, &plan(), &mut FixedScorer, &ProgressBar::hidden());
        let second = evaluate_items(&items, &plan(), &mut FixedScorer, &ProgressBar::hidden());
        assert_eq!(first.results, second.results);
        assert_eq!(first.results.len(), 2);
    }

    #[test]
    fn test_load_items_missing_columns_are_empty() {
        let mut table = Table::with_headers(&["YoutubeUrl", "Category", "Duration(min)"]);
        table.push_row(vec![
            "https://www.youtube.com/watch?v=abc12345678&t=5".into(),
            "News".into(),
            12.0.into(),
        ]);
        let items = load_items(&table, &ColumnNames::default(), &plan()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].video_id, "abc12345678");
        assert_eq!(items[0].duration_min, Some(12.0));
        assert_eq!(items[0].text("temp0.0"), "");
        assert_eq!(items[0].text("ref_ChatGPT"), "");
    }

    #[test]
    fn test_load_items_requires_url_column() {
        let table = Table::with_headers(&["Category"]);
        assert!(load_items(&table, &ColumnNames::default(), &plan()).is_err());
    }
}
