use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use summary_eval_common::ParamValue;

/// 設定ファイルの場所を上書きする環境変数
pub const CONFIG_ENV: &str = "SUMMARY_EVAL_CONFIG";

/// 入力表の列名
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnNames {
    /// マッパー（主表）: YouTube URL
    pub url: String,
    /// マッパー: カテゴリ
    pub category: String,
    /// マッパー: 長さ（分）
    pub duration: String,
    /// 統計データ（副表）: YouTube URL
    pub record_url: String,
    /// 統計データ: Whisper温度
    pub record_temp: String,
    /// 統計データ: 要約ファイルのパス
    pub record_path: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            url: "YoutubeUrl".into(),
            category: "Category".into(),
            duration: "Duration(min)".into(),
            record_url: "youtubeUrl".into(),
            record_temp: "whisperTemp".into(),
            record_path: "summaryPath".into(),
        }
    }
}

/// パスのルート置換（コンテナ内パス → ローカルパス）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathRemap {
    pub from: String,
    pub to: String,
}

/// 外部スコアラー設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScorerConfig {
    /// 実行コマンド（プログラム + 引数）
    pub command: Vec<String>,
    /// 言語ヒント
    pub lang: String,
    /// ベースライン補正
    pub rescale_with_baseline: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".into(), "scripts/bertscore_cli.py".into()],
            lang: "th".into(),
            rescale_with_baseline: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub temperatures: Vec<f64>,
    pub reference_columns: Vec<String>,
    pub columns: ColumnNames,
    pub path_remap: Option<PathRemap>,
    pub scorer: ScorerConfig,
    pub min_text_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temperatures: vec![0.0, 0.2, 0.4, 0.6],
            reference_columns: vec!["ref_ChatGPT".into(), "ref_Gemini".into()],
            columns: ColumnNames::default(),
            path_remap: Some(PathRemap {
                from: "/app/outputs".into(),
                to: "outputs".into(),
            }),
            scorer: ScorerConfig::default(),
            min_text_chars: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let home = dirs::home_dir()
            .ok_or_else(|| EvalError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("summary-eval").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.temperatures.is_empty() {
            return Err(EvalError::Config("temperatures が空です".into()));
        }
        if let Some(t) = self.temperatures.iter().find(|t| !t.is_finite()) {
            return Err(EvalError::Config(format!("不正な温度: {}", t)));
        }
        if self.reference_columns.is_empty() {
            return Err(EvalError::Config("reference_columns が空です".into()));
        }
        Ok(())
    }

    /// 既知の温度（パラメータ値）一覧
    pub fn params(&self) -> Vec<ParamValue> {
        self.temperatures.iter().copied().map(ParamValue::new).collect()
    }

    /// 候補テキスト列名の一覧（temp0.0 形式）
    pub fn variant_columns(&self) -> Vec<String> {
        self.params().iter().map(|p| p.column_name()).collect()
    }

    pub fn set_remap(&mut self, from: Option<String>, to: Option<String>) -> Result<()> {
        let current = self.path_remap.clone().unwrap_or(PathRemap {
            from: String::new(),
            to: String::new(),
        });
        let remap = PathRemap {
            from: from.unwrap_or(current.from),
            to: to.unwrap_or(current.to),
        };
        self.path_remap = if remap.from.is_empty() { None } else { Some(remap) };
        self.save()
    }

    pub fn set_scorer_command(&mut self, command: &str) -> Result<()> {
        let parts: Vec<String> = command.split_whitespace().map(String::from).collect();
        if parts.is_empty() {
            return Err(EvalError::Config("スコアラーコマンドが空です".into()));
        }
        self.scorer.command = parts;
        self.save()
    }

    /// 実行時に使うスコアラーコマンド（相対パスを実行ファイル基準でも探す）
    pub fn resolved_scorer_command(&self) -> Vec<String> {
        resolve_command_paths(&self.scorer.command, &executable_search_dirs())
    }

    pub fn set_lang(&mut self, lang: String) -> Result<()> {
        self.scorer.lang = lang;
        self.save()
    }
}

/// スコアラーコマンドの相対パス引数を解決する
///
/// カレントディレクトリに存在しない相対パスは、`search_dirs` の順に探して
/// 最初に見つかった場所に置き換える。見つからなければそのまま。
pub fn resolve_command_paths(command: &[String], search_dirs: &[PathBuf]) -> Vec<String> {
    command
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            let path = Path::new(arg);
            if i == 0 || arg.starts_with('-') || path.is_absolute() || path.exists() {
                return arg.clone();
            }
            search_dirs
                .iter()
                .map(|dir| dir.join(path))
                .find(|candidate| candidate.exists())
                .map(|found| found.to_string_lossy().to_string())
                .unwrap_or_else(|| arg.clone())
        })
        .collect()
}

/// 実行ファイルの場所とその上位（target/release → リポジトリ直下）
pub fn executable_search_dirs() -> Vec<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map(|dir| dir.ancestors().take(3).map(Path::to_path_buf).collect())
        .unwrap_or_default()
}

/// 参照列名から参照元ラベルを得る（ref_ChatGPT → ChatGPT）
pub fn reference_label(column: &str) -> String {
    column.strip_prefix("ref_").unwrap_or(column).to_string()
}
