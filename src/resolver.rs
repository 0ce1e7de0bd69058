//! 要約ファイル読み込み
//!
//! 統計データに記録されたパスは別環境（Dockerコンテナ）のルートで書かれているため、
//! ルート置換と区切り文字の正規化をしてから読み込む。
//! ファイルがない・読めない場合は警告を出して空文字列を返す（致命的エラーにしない）。

use crate::config::PathRemap;
use std::path::{PathBuf, MAIN_SEPARATOR};

#[derive(Debug, Clone, Default)]
pub struct ContentResolver {
    remap: Option<PathRemap>,
}

impl ContentResolver {
    pub fn new(remap: Option<PathRemap>) -> Self {
        Self { remap }
    }

    /// 参照文字列をこの環境のパスに変換
    pub fn resolve_path(&self, reference: &str) -> PathBuf {
        let mut path = reference.trim().to_string();
        if let Some(remap) = &self.remap {
            if !remap.from.is_empty() {
                path = path.replace(&remap.from, &remap.to);
            }
        }
        let normalized: String = path
            .chars()
            .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
            .collect();
        PathBuf::from(normalized)
    }

    /// 内容を読み込む（失敗時は空文字列）
    pub fn read(&self, reference: &str) -> String {
        if reference.trim().is_empty() {
            return String::new();
        }

        let path = self.resolve_path(reference);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "要約ファイルが見つかりません");
            return String::new();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "要約ファイル読み込みエラー");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path_remaps_root() {
        let resolver = ContentResolver::new(Some(PathRemap {
            from: "/app/outputs".into(),
            to: "/data/outputs".into(),
        }));
        let resolved = resolver.resolve_path("/app/outputs/run1/summary.txt");
        let expected: PathBuf = ["/data", "outputs", "run1", "summary.txt"].iter().collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_resolve_path_normalizes_backslashes() {
        let resolver = ContentResolver::new(None);
        let resolved = resolver.resolve_path(r"outputs\run1\summary.txt");
        let expected: PathBuf = ["outputs", "run1", "summary.txt"].iter().collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_read_empty_reference() {
        assert_eq!(ContentResolver::default().read("   "), "");
    }

    #[test]
    fn test_read_missing_file_returns_empty() {
        let resolver = ContentResolver::default();
        assert_eq!(resolver.read("/nonexistent/path/summary-12345.txt"), "");
    }

    #[test]
    fn test_read_remapped_file() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("run1")).unwrap();
        std::fs::write(dir.path().join("run1").join("s.txt"), "  สรุปเนื้อหา\n").unwrap();

        let resolver = ContentResolver::new(Some(PathRemap {
            from: "/app/outputs".into(),
            to: dir.path().display().to_string(),
        }));
        assert_eq!(resolver.read("/app/outputs/run1/s.txt"), "สรุปเนื้อหา");
    }

    #[test]
    fn test_read_invalid_utf8_returns_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let resolver = ContentResolver::default();
        assert_eq!(resolver.read(&path.display().to_string()), "");
    }
}
