use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("表の形式が不正: {0}")]
    InvalidTable(String),

    #[error("列 '{column}' が見つかりません: {table}")]
    MissingColumn { table: String, column: String },

    #[error("ワークブック読み込みエラー: {0}")]
    Workbook(#[from] calamine::Error),

    #[error(transparent)]
    Common(#[from] summary_eval_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("スコアラー実行エラー: {0}")]
    ScorerExecution(String),

    #[error("スコアラー応答が不正: {0}")]
    ScorerResponse(String),

    #[error("評価結果がありません")]
    NoResults,
}

pub type Result<T> = std::result::Result<T, EvalError>;
