//! 文字bigram一致スコアラー
//!
//! 空白を除いた文字bigramの多重集合の一致数から precision/recall/F1 を計算する。
//! タイ語のように単語区切りのない言語でもそのまま使える。外部依存なしの試行用。

use super::{ScoreRequest, Scorer};
use crate::error::Result;
use std::collections::HashMap;
use summary_eval_common::Scores;

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapScorer;

fn bigrams(text: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut counts = HashMap::new();
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

fn f1_score(precision: f64, recall: f64) -> f64 {
    if (precision + recall).abs() <= f64::EPSILON {
        0.0
    } else {
        (2.0 * precision * recall) / (precision + recall)
    }
}

pub fn overlap_scores(candidate: &str, reference: &str) -> Scores {
    let cand = bigrams(candidate);
    let refs = bigrams(reference);
    let cand_total: usize = cand.values().sum();
    let ref_total: usize = refs.values().sum();

    let overlap: usize = cand
        .iter()
        .map(|(gram, &count)| count.min(refs.get(gram).copied().unwrap_or(0)))
        .sum();

    let precision = if cand_total == 0 { 0.0 } else { overlap as f64 / cand_total as f64 };
    let recall = if ref_total == 0 { 0.0 } else { overlap as f64 / ref_total as f64 };

    Scores {
        precision,
        recall,
        f1: f1_score(precision, recall),
    }
}

impl Scorer for OverlapScorer {
    fn score(&mut self, request: &ScoreRequest<'_>) -> Result<Scores> {
        Ok(overlap_scores(request.candidate, request.reference))
    }

    fn name(&self) -> &str {
        "overlap"
    }
}
