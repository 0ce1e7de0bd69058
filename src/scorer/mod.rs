//! スコアリングサービス境界
//!
//! 候補テキストと参照テキストから (precision, recall, F1) を得る。
//! 実装は外部コマンド（BERTScore等）、組み込みの文字bigram一致、
//! およびそれらを包む永続キャッシュ。

pub mod cache;
mod command;
mod overlap;

pub use cache::{CachedScorer, ScoreCache};
pub use command::CommandScorer;
pub use overlap::OverlapScorer;

use crate::error::Result;
use serde::Serialize;
use summary_eval_common::Scores;

/// 1回のスコア計算要求
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest<'a> {
    pub candidate: &'a str,
    pub reference: &'a str,
    pub lang: &'a str,
    pub rescale_with_baseline: bool,
}

pub trait Scorer {
    /// 1組のテキストを採点する（失敗はその組だけの失敗として扱われる）
    fn score(&mut self, request: &ScoreRequest<'_>) -> Result<Scores>;

    /// ログ表示用の名前
    fn name(&self) -> &str;

    /// キャッシュキーに含める識別子（同じ値なら同じスコアを返すこと）
    fn cache_id(&self) -> String {
        self.name().to_string()
    }
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn score(&mut self, request: &ScoreRequest<'_>) -> Result<Scores> {
        (**self).score(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn cache_id(&self) -> String {
        (**self).cache_id()
    }
}
