//! 外部コマンド連携スコアラー
//!
//! 設定されたプログラムを1組ごとに起動し、標準入力にJSON要求を渡して
//! 標準出力のJSON `{"precision":..,"recall":..,"f1":..}` を読む。

use super::{ScoreRequest, Scorer};
use crate::error::{EvalError, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use summary_eval_common::Scores;

pub struct CommandScorer {
    program: String,
    args: Vec<String>,
    verbose: bool,
}

impl CommandScorer {
    pub fn new(command: &[String], verbose: bool) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| EvalError::Config("スコアラーコマンドが設定されていません".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            verbose,
        })
    }

    fn run(&self, input: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EvalError::ScorerExecution(format!("{} の起動に失敗: {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(input) {
                drop(stdin);
                // 早期終了した子プロセスを回収する
                let _ = child.kill();
                let status = child.wait();
                return Err(EvalError::ScorerExecution(format!(
                    "標準入力への書き込みエラー: {} (終了状態: {:?})",
                    e,
                    status.ok().and_then(|s| s.code())
                )));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| EvalError::ScorerExecution(format!("スコアラー待機エラー: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvalError::ScorerExecution(format!(
                "{} failed (code {:?}): {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let response = String::from_utf8_lossy(&output.stdout).to_string();

        if self.verbose {
            let preview: String = response.chars().take(200).collect();
            tracing::debug!(response = %preview, "スコアラー応答");
        }

        Ok(response)
    }
}

impl Scorer for CommandScorer {
    fn score(&mut self, request: &ScoreRequest<'_>) -> Result<Scores> {
        let input = serde_json::to_vec(request)?;
        let response = self.run(&input)?;
        parse_scores(&response)
    }

    fn name(&self) -> &str {
        &self.program
    }

    fn cache_id(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 応答からJSONオブジェクト部分を抽出
///
/// ログ等の前後の出力があっても最初の `{` から最後の `}` までを使う。
fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// スコアラー応答をパース
pub(crate) fn parse_scores(response: &str) -> Result<Scores> {
    let json = extract_json_object(response)
        .ok_or_else(|| EvalError::ScorerResponse("JSONが見つかりません".into()))?;
    let scores: Scores = serde_json::from_str(json)
        .map_err(|e| EvalError::ScorerResponse(format!("JSONパースエラー: {}", e)))?;
    if !scores.is_finite() {
        return Err(EvalError::ScorerResponse(format!("数値が不正: {:?}", scores)));
    }
    Ok(scores)
}
