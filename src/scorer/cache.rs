//! スコアキャッシュモジュール
//!
//! (スコアラー識別子, 言語, ベースライン補正, 候補, 参照) のSHA-256をキーにスコアを保存し、
//! 同じ組の再計算をスキップする。

use super::{ScoreRequest, Scorer};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use summary_eval_common::Scores;

const CACHE_FILE_NAME: &str = ".score-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCache {
    /// バージョン（互換性チェック用）
    version: u32,
    /// 要求ハッシュ → スコア
    entries: HashMap<String, Scores>,
}

impl ScoreCache {
    const CURRENT_VERSION: u32 = 2;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（壊れている場合は空で開始）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, ScoreCache>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                tracing::warn!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "キャッシュファイルが壊れています、再生成します");
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// キャッシュファイルを削除（存在しなければ false）
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, key: &str) -> Option<Scores> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: String, scores: Scores) {
        self.entries.insert(key, scores);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// 要求のキャッシュキー
pub fn request_key(scorer_id: &str, request: &ScoreRequest<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scorer_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(request.lang.as_bytes());
    hasher.update([0u8, request.rescale_with_baseline as u8, 0u8]);
    hasher.update(request.candidate.as_bytes());
    hasher.update([0u8]);
    hasher.update(request.reference.as_bytes());
    hex::encode(hasher.finalize())
}

/// キャッシュ付きスコアラー
pub struct CachedScorer<S> {
    inner: S,
    cache: ScoreCache,
    folder: PathBuf,
    hits: usize,
    misses: usize,
}

impl<S: Scorer> CachedScorer<S> {
    pub fn new(inner: S, folder: &Path) -> Self {
        Self {
            inner,
            cache: ScoreCache::load(folder),
            folder: folder.to_path_buf(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// キャッシュを保存
    pub fn flush(&self) -> Result<()> {
        self.cache.save(&self.folder)
    }
}

impl<S: Scorer> Scorer for CachedScorer<S> {
    fn score(&mut self, request: &ScoreRequest<'_>) -> Result<Scores> {
        let key = request_key(&self.inner.cache_id(), request);
        if let Some(scores) = self.cache.get(&key) {
            self.hits += 1;
            return Ok(scores);
        }

        // 失敗はキャッシュしない
        let scores = self.inner.score(request)?;
        self.misses += 1;
        self.cache.insert(key, scores);
        Ok(scores)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cache_id(&self) -> String {
        self.inner.cache_id()
    }
}
