use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "summary-eval")]
#[command(about = "要約テキストの温度別・参照別スコア評価ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 統計データから温度別の要約を抽出してマッパーに追加
    Extract {
        /// マッパー（主表、xlsx/csv）
        #[arg(short, long, required = true)]
        mapper: PathBuf,

        /// 統計データ（副表、csv/xlsx）
        #[arg(short, long, required = true)]
        stats: PathBuf,

        /// 出力ファイル（デフォルト: マッパーを上書き、xlsx）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 要約を参照要約と比較してスコアを計算
    Evaluate {
        /// 要約列を追加済みの表（xlsx/csv）
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// 出力ワークブック（デフォルト: evaluation_results.xlsx）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// スコアラー (command/overlap)
        #[arg(long, default_value = "command")]
        scorer: ScorerKind,

        /// キャッシュを使用（計算済みの組をスキップ）
        #[arg(long)]
        use_cache: bool,
    },

    /// 評価ワークブックに温度/参照元別の平均シートを追加
    Averages {
        /// 評価ワークブック
        #[arg(required = true)]
        input: PathBuf,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// パス置換の置換元（空文字で無効化）
        #[arg(long)]
        set_remap_from: Option<String>,

        /// パス置換の置換先
        #[arg(long)]
        set_remap_to: Option<String>,

        /// スコアラーコマンド（空白区切り）
        #[arg(long)]
        set_scorer_command: Option<String>,

        /// 言語ヒント
        #[arg(long)]
        set_lang: Option<String>,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

/// スコアラーの種類
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ScorerKind {
    /// 外部コマンド（BERTScore等）
    #[default]
    Command,
    /// 文字bigram一致（外部依存なし）
    Overlap,
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerKind::Command => write!(f, "command"),
            ScorerKind::Overlap => write!(f, "overlap"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate_defaults() {
        let cli = Cli::try_parse_from(["summary-eval", "evaluate", "-i", "mapper.xlsx"]).unwrap();
        match cli.command {
            Commands::Evaluate {
                input,
                output,
                scorer,
                use_cache,
            } => {
                assert_eq!(input, PathBuf::from("mapper.xlsx"));
                assert!(output.is_none());
                assert_eq!(scorer, ScorerKind::Command);
                assert!(!use_cache);
            }
            _ => panic!("evaluate expected"),
        }
    }

    #[test]
    fn test_parse_overlap_scorer_and_verbose() {
        let cli = Cli::try_parse_from([
            "summary-eval",
            "evaluate",
            "-i",
            "in.csv",
            "--scorer",
            "overlap",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Evaluate {
                scorer: ScorerKind::Overlap,
                ..
            }
        ));
    }

    #[test]
    fn test_extract_requires_stats() {
        assert!(Cli::try_parse_from(["summary-eval", "extract", "-m", "mapper.xlsx"]).is_err());
    }
}
