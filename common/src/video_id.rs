//! 動画ID正規化モジュール
//!
//! YouTube URL（watch?v=、youtu.be、embed、shorts、素のID）から
//! 11文字の動画IDを取り出し、2つのデータセットの結合キーにする。
//!
//! ルール表は先頭から順に評価し、最初に一致したルールの捕捉値を返す。
//! どのルールにも一致しない場合は trim した入力をそのまま返す。

use regex::Regex;

/// 識別子抽出ルール
pub struct IdRule {
    /// ルール名（ログ・テスト用）
    pub name: &'static str,
    /// 1番目の捕捉グループがIDになる正規表現
    pub pattern: Regex,
}

impl IdRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("invalid id rule pattern"),
        }
    }

    /// 一致すれば捕捉したIDを返す
    pub fn extract<'a>(&self, input: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(input)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_RULES: Vec<IdRule> = vec![
        IdRule::new("query", r"[?&]v=([A-Za-z0-9_-]{11})"),
        IdRule::new("path_v", r"/v/([A-Za-z0-9_-]{11})"),
        IdRule::new("short_link", r"youtu\.be/([A-Za-z0-9_-]{11})"),
        IdRule::new("embed", r"/embed/([A-Za-z0-9_-]{11})"),
        IdRule::new("shorts", r"/shorts/([A-Za-z0-9_-]{11})"),
        IdRule::new("bare", r"^([A-Za-z0-9_-]{11})$"),
    ];
}

/// 既定のルール表
pub fn default_rules() -> &'static [IdRule] {
    &DEFAULT_RULES
}

/// ルール表を指定して正規化
pub fn normalize_with(rules: &[IdRule], input: Option<&str>) -> String {
    let input = match input {
        Some(s) => s.trim(),
        None => return String::new(),
    };
    if input.is_empty() {
        return String::new();
    }

    rules
        .iter()
        .find_map(|rule| rule.extract(input))
        .unwrap_or(input)
        .to_string()
}

/// URLを正規化して動画IDを返す
///
/// # Examples
/// ```
/// use summary_eval_common::normalize_video_id;
///
/// assert_eq!(normalize_video_id(Some("https://youtu.be/abc12345678")), "abc12345678");
/// assert_eq!(normalize_video_id(None), "");
/// ```
pub fn normalize_video_id(input: Option<&str>) -> String {
    normalize_with(default_rules(), input)
}
